//! Call timing stage.

use crate::layer::{Layer, Next};
use crate::target::TargetMethods;
use hermes_core::{InvocationContext, InvokeResult};
use hermes_telemetry::MetricRegistry;
use std::sync::Arc;

/// Layer that times timed methods.
///
/// The timer starts immediately before delegating and records when its
/// context drops, so failed calls and unwinding calls are timed too.
pub struct TimingLayer {
    targets: TargetMethods,
    registry: Arc<MetricRegistry>,
}

impl TimingLayer {
    /// Creates the stage.
    #[must_use]
    pub fn new(targets: TargetMethods, registry: Arc<MetricRegistry>) -> Self {
        Self { targets, registry }
    }
}

impl Layer for TimingLayer {
    fn name(&self) -> &'static str {
        "timing"
    }

    fn invoke(&self, ctx: &mut InvocationContext, next: Next<'_>) -> InvokeResult {
        let Some(name) = self.targets.policy(ctx).and_then(|p| p.timed.as_deref()) else {
            return next.run(ctx);
        };
        let timer = self.registry.timer(name);
        let _timing = timer.time();
        next.run(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{Pipeline, Stage};
    use crate::test_support::{echo, person_targets, ping};
    use hermes_core::Invoker;

    const ECHO_TIMER: &str = "com.example.PersonService.echo";

    fn pipeline(registry: &Arc<MetricRegistry>) -> Pipeline {
        let (_, descriptor, targets) = person_targets();
        Pipeline::builder(descriptor)
            .stage(Stage::Timing, TimingLayer::new(targets, Arc::clone(registry)))
            .build()
    }

    #[test]
    fn test_success_and_failure_are_timed() {
        let registry = Arc::new(MetricRegistry::new());
        let pipeline = pipeline(&registry);

        pipeline.invoke(&mut echo("hello")).unwrap();
        assert_eq!(registry.timer_count(ECHO_TIMER), 1);

        pipeline.invoke(&mut echo("reject")).unwrap_err();
        assert_eq!(registry.timer_count(ECHO_TIMER), 2);
    }

    #[test]
    fn test_untimed_method_records_nothing() {
        let registry = Arc::new(MetricRegistry::new());
        let pipeline = pipeline(&registry);

        pipeline.invoke(&mut ping()).unwrap();

        assert_eq!(registry.snapshot().timers.len(), 0);
    }
}
