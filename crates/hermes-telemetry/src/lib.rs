//! Metrics and logging for Hermes.
//!
//! - **Metric sink**: [`MetricRegistry`] holds the named timers and meters the
//!   pipeline's metric stages update. It is process-wide and safe for
//!   concurrent use from any number of calls.
//! - **Export**: every update is mirrored to the `metrics` facade;
//!   [`init_metrics`] installs a Prometheus recorder for it.
//! - **Logging**: [`init_logging`] installs a JSON or pretty `tracing`
//!   subscriber.
//!
//! # Metric names
//!
//! Names come from the tagged service methods:
//!
//! | Tag | Kind | Default name |
//! |-----|------|--------------|
//! | timed | timer (histogram, seconds) | `<type>.<method>` |
//! | metered | meter (counter) | `<type>.<method>` |
//! | exception-metered | meter (counter) | `<type>.<method>.exceptions` |
//!
//! # Example
//!
//! ```rust,ignore
//! use hermes_telemetry::{init_telemetry, TelemetryConfig};
//!
//! let config = TelemetryConfig::builder()
//!     .service_name("people")
//!     .metrics_addr("0.0.0.0:9090")
//!     .build();
//! init_telemetry(&config)?;
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
mod registry;

pub use config::{TelemetryConfig, TelemetryConfigBuilder};
pub use error::TelemetryError;
pub use logging::{init_logging, LogConfig};
pub use metrics::{init_metrics, render_metrics, MetricsConfig};
pub use registry::{Meter, MetricRegistry, RegistrySnapshot, Timer, TimerContext, TimerSnapshot};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Initializes logging, then metrics export.
///
/// # Errors
///
/// Returns `TelemetryError` if either subsystem fails to initialize.
pub fn init_telemetry(config: &TelemetryConfig) -> TelemetryResult<()> {
    init_logging(&config.logging)?;
    init_metrics(&config.metrics)?;
    tracing::info!(service = %config.service_name, "telemetry initialized");
    Ok(())
}
