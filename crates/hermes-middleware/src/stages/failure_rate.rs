//! Failure counting stage.
//!
//! On failure the stage inspects the error as the service method raised it
//! and that error's immediate cause. The meter is marked once if either
//! matches the declared error type. The error itself is returned unchanged.

use crate::layer::{Layer, Next};
use crate::target::TargetMethods;
use hermes_core::{InvocationContext, InvokeResult};
use hermes_telemetry::MetricRegistry;
use std::sync::Arc;
use tracing::debug;

/// Layer that counts failures of exception-metered methods.
pub struct FailureRateLayer {
    targets: TargetMethods,
    registry: Arc<MetricRegistry>,
}

impl FailureRateLayer {
    /// Creates the stage.
    #[must_use]
    pub fn new(targets: TargetMethods, registry: Arc<MetricRegistry>) -> Self {
        Self { targets, registry }
    }
}

impl Layer for FailureRateLayer {
    fn name(&self) -> &'static str {
        "failure_rate"
    }

    fn invoke(&self, ctx: &mut InvocationContext, next: Next<'_>) -> InvokeResult {
        let Some(policy) = self
            .targets
            .policy(ctx)
            .and_then(|p| p.exception_metered.as_ref())
        else {
            return next.run(ctx);
        };

        let result = next.run(ctx);
        if let Err(error) = &result {
            if policy.cause.matches_error_or_cause(error.thrown()) {
                debug!(metric = %policy.name, error = %error, "Failure counted");
                self.registry.meter(&policy.name).mark();
            }
        }
        result
    }
}
