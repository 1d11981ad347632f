//! Call counting stage.

use crate::layer::{Layer, Next};
use crate::target::TargetMethods;
use hermes_core::{InvocationContext, InvokeResult};
use hermes_telemetry::MetricRegistry;
use std::sync::Arc;

/// Layer that counts calls to metered methods.
///
/// The meter is marked before delegating, whatever the outcome.
pub struct CallRateLayer {
    targets: TargetMethods,
    registry: Arc<MetricRegistry>,
}

impl CallRateLayer {
    /// Creates the stage.
    #[must_use]
    pub fn new(targets: TargetMethods, registry: Arc<MetricRegistry>) -> Self {
        Self { targets, registry }
    }
}

impl Layer for CallRateLayer {
    fn name(&self) -> &'static str {
        "call_rate"
    }

    fn invoke(&self, ctx: &mut InvocationContext, next: Next<'_>) -> InvokeResult {
        if let Some(name) = self.targets.policy(ctx).and_then(|p| p.metered.as_deref()) {
            self.registry.meter(name).mark();
        }
        next.run(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{Pipeline, Stage};
    use crate::test_support::{echo, person_targets, ping};
    use hermes_core::Invoker;

    #[test]
    fn test_calls_counted_regardless_of_outcome() {
        let registry = Arc::new(MetricRegistry::new());
        let (_, descriptor, targets) = person_targets();
        let pipeline = Pipeline::builder(descriptor)
            .stage(Stage::CallRate, CallRateLayer::new(targets, Arc::clone(&registry)))
            .build();

        pipeline.invoke(&mut echo("one")).unwrap();
        pipeline.invoke(&mut echo("reject")).unwrap_err();
        pipeline.invoke(&mut ping()).unwrap();

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.meters.len(), 1);
        assert_eq!(snapshot.meters["com.example.PersonService.echo"], 2);
    }
}
