//! The process-wide metric sink.
//!
//! [`MetricRegistry`] hands out named [`Timer`]s and [`Meter`]s. Handles are
//! created on first use and shared by every call that uses the same name.
//! Counts are kept in atomics so concurrent calls never lose an update, and
//! each update is mirrored to the `metrics` facade for export. Timers export
//! as `<name>.seconds` histograms and meters as `<name>.total` counters, so
//! a method that is both timed and metered under one name exports cleanly.

use dashmap::DashMap;
use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

static GLOBAL: OnceLock<Arc<MetricRegistry>> = OnceLock::new();

/// Named timers and meters shared across all endpoints.
///
/// # Example
///
/// ```
/// use hermes_telemetry::MetricRegistry;
///
/// let registry = MetricRegistry::new();
/// registry.meter("svc.echo").mark();
/// {
///     let timer = registry.timer("svc.echo.time");
///     let _timing = timer.time();
/// }
/// assert_eq!(registry.meter_count("svc.echo"), 1);
/// assert_eq!(registry.timer_count("svc.echo.time"), 1);
/// ```
#[derive(Debug, Default)]
pub struct MetricRegistry {
    timers: DashMap<String, Arc<Timer>>,
    meters: DashMap<String, Arc<Meter>>,
}

impl MetricRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the process-wide registry.
    pub fn global() -> Arc<Self> {
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(Self::new())))
    }

    /// Returns the timer named `name`, creating it on first use.
    pub fn timer(&self, name: &str) -> Arc<Timer> {
        if let Some(timer) = self.timers.get(name) {
            return Arc::clone(timer.value());
        }
        let entry = self.timers.entry(name.to_string()).or_insert_with(|| {
            let timer = Timer::new(name);
            describe_histogram!(timer.export_name.clone(), Unit::Seconds, "Method call duration");
            Arc::new(timer)
        });
        Arc::clone(entry.value())
    }

    /// Returns the meter named `name`, creating it on first use.
    pub fn meter(&self, name: &str) -> Arc<Meter> {
        if let Some(meter) = self.meters.get(name) {
            return Arc::clone(meter.value());
        }
        let entry = self.meters.entry(name.to_string()).or_insert_with(|| {
            let meter = Meter::new(name);
            describe_counter!(meter.export_name.clone(), Unit::Count, "Method call events");
            Arc::new(meter)
        });
        Arc::clone(entry.value())
    }

    /// Returns how many times `name` recorded, or 0 if it does not exist.
    #[must_use]
    pub fn timer_count(&self, name: &str) -> u64 {
        self.timers.get(name).map_or(0, |t| t.count())
    }

    /// Returns how many times `name` was marked, or 0 if it does not exist.
    #[must_use]
    pub fn meter_count(&self, name: &str) -> u64 {
        self.meters.get(name).map_or(0, |m| m.count())
    }

    /// Returns a point-in-time copy of every metric.
    #[must_use]
    pub fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            timers: self
                .timers
                .iter()
                .map(|entry| (entry.key().clone(), entry.value().snapshot()))
                .collect(),
            meters: self
                .meters
                .iter()
                .map(|entry| (entry.key().clone(), entry.value().count()))
                .collect(),
        }
    }
}

/// Records call durations under one name.
#[derive(Debug)]
pub struct Timer {
    name: String,
    export_name: String,
    count: AtomicU64,
    total_nanos: AtomicU64,
    max_nanos: AtomicU64,
}

impl Timer {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            export_name: format!("{name}.seconds"),
            count: AtomicU64::new(0),
            total_nanos: AtomicU64::new(0),
            max_nanos: AtomicU64::new(0),
        }
    }

    /// Returns the timer name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Starts timing; the elapsed time is recorded when the returned
    /// context is stopped or dropped.
    #[must_use = "the call is timed until the context is dropped"]
    pub fn time(&self) -> TimerContext<'_> {
        TimerContext {
            timer: self,
            started_at: Instant::now(),
            stopped: false,
        }
    }

    /// Records one observation.
    pub fn record(&self, elapsed: Duration) {
        let nanos = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        self.count.fetch_add(1, Ordering::Relaxed);
        self.total_nanos.fetch_add(nanos, Ordering::Relaxed);
        self.max_nanos.fetch_max(nanos, Ordering::Relaxed);
        histogram!(self.export_name.clone()).record(elapsed.as_secs_f64());
    }

    /// Returns the number of observations.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    /// Returns the sum of all observations.
    #[must_use]
    pub fn total(&self) -> Duration {
        Duration::from_nanos(self.total_nanos.load(Ordering::Relaxed))
    }

    /// Returns the longest observation.
    #[must_use]
    pub fn max(&self) -> Duration {
        Duration::from_nanos(self.max_nanos.load(Ordering::Relaxed))
    }

    fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            count: self.count(),
            total_ms: self.total().as_secs_f64() * 1000.0,
            max_ms: self.max().as_secs_f64() * 1000.0,
        }
    }
}

/// An in-progress timing.
///
/// Records on [`stop`](Self::stop) or, failing that, on drop, so the time is
/// captured on every exit path including unwinding.
#[derive(Debug)]
pub struct TimerContext<'a> {
    timer: &'a Timer,
    started_at: Instant,
    stopped: bool,
}

impl TimerContext<'_> {
    /// Stops timing and returns the recorded duration.
    pub fn stop(mut self) -> Duration {
        self.finish()
    }

    fn finish(&mut self) -> Duration {
        let elapsed = self.started_at.elapsed();
        if !self.stopped {
            self.stopped = true;
            self.timer.record(elapsed);
        }
        elapsed
    }
}

impl Drop for TimerContext<'_> {
    fn drop(&mut self) {
        self.finish();
    }
}

/// Counts events under one name.
#[derive(Debug)]
pub struct Meter {
    name: String,
    export_name: String,
    count: AtomicU64,
}

impl Meter {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            export_name: format!("{name}.total"),
            count: AtomicU64::new(0),
        }
    }

    /// Returns the meter name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Records one event.
    pub fn mark(&self) {
        self.mark_n(1);
    }

    /// Records `n` events.
    pub fn mark_n(&self, n: u64) {
        self.count.fetch_add(n, Ordering::Relaxed);
        counter!(self.export_name.clone()).increment(n);
    }

    /// Returns the number of events.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }
}

/// Serializable copy of a timer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimerSnapshot {
    /// Observations.
    pub count: u64,
    /// Sum of observations in milliseconds.
    pub total_ms: f64,
    /// Longest observation in milliseconds.
    pub max_ms: f64,
}

/// Serializable copy of a registry, sorted by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RegistrySnapshot {
    /// Timers by name.
    pub timers: BTreeMap<String, TimerSnapshot>,
    /// Meter counts by name.
    pub meters: BTreeMap<String, u64>,
}
