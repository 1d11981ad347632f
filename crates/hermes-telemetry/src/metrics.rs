//! Prometheus export.
//!
//! [`MetricRegistry`](crate::MetricRegistry) mirrors every update to the
//! `metrics` facade. Installing the Prometheus recorder here makes those
//! updates scrapeable over HTTP and through [`render_metrics`].

use crate::error::TelemetryError;
use crate::TelemetryResult;
use metrics_exporter_prometheus::{
    ExporterFuture, PrometheusBuilder, PrometheusHandle, PrometheusRecorder,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::OnceLock;
use std::thread;
use tracing::{error, info, warn};

/// Global metrics handle for rendering.
static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Metrics configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MetricsConfig {
    /// Whether metrics are exported.
    pub enabled: bool,

    /// Address to expose metrics on (e.g., "0.0.0.0:9090").
    pub addr: String,

    /// Histogram buckets, in seconds, for method timers.
    pub duration_buckets: Vec<f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            addr: "0.0.0.0:9090".to_string(),
            // 1ms, 5ms, 10ms, 25ms, 50ms, 100ms, 250ms, 500ms, 1s, 2.5s, 5s, 10s
            duration_buckets: vec![
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
            ],
        }
    }
}

/// Installs the Prometheus recorder and serves the scrape endpoint on
/// `config.addr`.
///
/// The listener runs on the current Tokio runtime if there is one, and on a
/// dedicated background thread otherwise. Only the first call installs a
/// recorder; later calls log a warning and leave it in place.
///
/// # Errors
///
/// Returns `TelemetryError::InvalidAddress` for an unparsable address and
/// `TelemetryError::MetricsInit` if the listener cannot be bound or another
/// recorder is already installed.
pub fn init_metrics(config: &MetricsConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }
    if METRICS_HANDLE.get().is_some() {
        warn!(addr = %config.addr, "Prometheus recorder already installed, keeping it");
        return Ok(());
    }

    let addr: SocketAddr = config
        .addr
        .parse()
        .map_err(|e| TelemetryError::InvalidAddress(format!("{}: {e}", config.addr)))?;

    let mut builder = PrometheusBuilder::new().with_http_listener(addr);
    if !config.duration_buckets.is_empty() {
        builder = builder
            .set_buckets(&config.duration_buckets)
            .map_err(|e| TelemetryError::InvalidConfig(e.to_string()))?;
    }

    let recorder = start_exporter(builder)?;
    let handle = recorder.handle();
    ::metrics::set_global_recorder(recorder)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;

    if METRICS_HANDLE.set(handle).is_err() {
        warn!("Prometheus handle was set concurrently, keeping the first one");
    }
    info!(%addr, "Prometheus exporter listening");

    Ok(())
}

/// Builds the recorder and spawns its HTTP exporter.
fn start_exporter(builder: PrometheusBuilder) -> TelemetryResult<PrometheusRecorder> {
    if let Ok(runtime) = tokio::runtime::Handle::try_current() {
        let _entered = runtime.enter();
        let (recorder, exporter) = builder
            .build()
            .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
        runtime.spawn(serve(exporter));
        return Ok(recorder);
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    let (recorder, exporter) = {
        let _entered = runtime.enter();
        builder
            .build()
            .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?
    };
    thread::Builder::new()
        .name("hermes-metrics".to_string())
        .spawn(move || runtime.block_on(serve(exporter)))
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;

    Ok(recorder)
}

async fn serve(exporter: ExporterFuture) {
    if let Err(e) = exporter.await {
        error!(error = ?e, "Prometheus exporter stopped");
    }
}

/// Returns the global metrics handle if initialized.
pub fn get_metrics_handle() -> Option<&'static PrometheusHandle> {
    METRICS_HANDLE.get()
}

/// Renders metrics in Prometheus format.
///
/// Returns `None` if metrics are not initialized.
#[must_use]
pub fn render_metrics() -> Option<String> {
    METRICS_HANDLE.get().map(PrometheusHandle::render)
}
