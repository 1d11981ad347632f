//! Fixed-order invoker pipeline.
//!
//! A [`Pipeline`] owns the layers of one published endpoint and the raw
//! dispatch they wrap. Layers are ordered by their [`Stage`], never by the
//! order they were added in, and the pipeline cannot change once built.
//!
//! ## Pipeline Stages
//!
//! 1. **Validation** - Reject calls whose arguments violate constraints
//! 2. **Transaction** - Run the call in a unit of work
//! 3. **Timing** - Time the call
//! 4. **Call rate** - Count the call
//! 5. **Failure rate** - Count matching failures
//!
//! Invalid calls never open a session and are never counted; failures of
//! transactional calls are counted; metrics see exactly the work the outer
//! stages let through.

use crate::layer::{Layer, Next};
use hermes_core::{InvocationContext, InvokeResult, Invoker};
use std::fmt;
use std::sync::Arc;
use tracing::debug_span;

/// The assembled invoker chain of one endpoint.
///
/// # Example
///
/// ```
/// use hermes_core::{FnInvoker, InvocationContext, Invoker, MethodIdentity, Value};
/// use hermes_middleware::{FnLayer, Pipeline, Stage};
/// use std::sync::Arc;
///
/// let root = Arc::new(FnInvoker::new(|_: &mut InvocationContext| Ok(Value::unit())));
/// let pipeline = Pipeline::builder(root)
///     .stage(Stage::Timing, FnLayer::new("timing", |ctx, next| next.run(ctx)))
///     .stage(Stage::Validation, FnLayer::new("validation", |ctx, next| next.run(ctx)))
///     .build();
///
/// assert_eq!(pipeline.stage_names(), vec!["validation", "timing"]);
///
/// let mut ctx = InvocationContext::new(MethodIdentity::new("ping"), Vec::new());
/// assert!(pipeline.invoke(&mut ctx).is_ok());
/// ```
pub struct Pipeline {
    /// Stages present, in order.
    stages: Vec<Stage>,

    /// Layers, parallel to `stages`.
    layers: Vec<Arc<dyn Layer>>,

    /// Raw dispatch at the bottom of the chain.
    root: Arc<dyn Invoker>,
}

impl Pipeline {
    /// Creates a new pipeline builder around the raw dispatch.
    #[must_use]
    pub fn builder(root: Arc<dyn Invoker>) -> PipelineBuilder {
        PipelineBuilder::new(root)
    }

    /// Returns the names of the layers present, in order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.layers.iter().map(|layer| layer.name()).collect()
    }

    /// Returns the stages present, in order.
    #[must_use]
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Returns `true` if `stage` was materialized.
    #[must_use]
    pub fn has_stage(&self, stage: Stage) -> bool {
        self.stages.contains(&stage)
    }

    /// Returns the number of layers.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.layers.len()
    }
}

impl Invoker for Pipeline {
    fn invoke(&self, ctx: &mut InvocationContext) -> InvokeResult {
        let span = debug_span!("invoke", call_id = %ctx.call_id(), method = %ctx.method());
        let _entered = span.enter();
        Next::new(&self.layers, self.root.as_ref()).run(ctx)
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stages)
            .finish_non_exhaustive()
    }
}

/// Builder for constructing a [`Pipeline`].
pub struct PipelineBuilder {
    root: Arc<dyn Invoker>,
    entries: Vec<(Stage, Arc<dyn Layer>)>,
}

impl PipelineBuilder {
    /// Creates a builder with no layers.
    #[must_use]
    pub fn new(root: Arc<dyn Invoker>) -> Self {
        Self {
            root,
            entries: Vec::new(),
        }
    }

    /// Sets the layer for `stage`, replacing any layer already set for it.
    #[must_use]
    pub fn stage<L: Layer>(self, stage: Stage, layer: L) -> Self {
        self.stage_arc(stage, Arc::new(layer))
    }

    /// Sets a shared layer for `stage`.
    #[must_use]
    pub fn stage_arc(mut self, stage: Stage, layer: Arc<dyn Layer>) -> Self {
        self.entries.retain(|(s, _)| *s != stage);
        self.entries.push((stage, layer));
        self
    }

    /// Builds the pipeline, ordering layers by stage.
    #[must_use]
    pub fn build(mut self) -> Pipeline {
        self.entries.sort_by_key(|(stage, _)| *stage);
        let (stages, layers) = self.entries.into_iter().unzip();
        Pipeline {
            stages,
            layers,
            root: self.root,
        }
    }
}

/// Pipeline stage marker.
///
/// The discriminant is the stage position, outermost first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Stage {
    /// Stage 1: argument validation
    Validation = 1,
    /// Stage 2: unit of work
    Transaction = 2,
    /// Stage 3: call timing
    Timing = 3,
    /// Stage 4: call counting
    CallRate = 4,
    /// Stage 5: failure counting
    FailureRate = 5,
}

impl Stage {
    /// Returns the stage name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Transaction => "transaction",
            Self::Timing => "timing",
            Self::CallRate => "call_rate",
            Self::FailureRate => "failure_rate",
        }
    }

    /// Returns `true` for the stages that only record metrics.
    #[must_use]
    pub const fn is_metrics(self) -> bool {
        (self as u8) >= 3
    }

    /// Returns all stages in order.
    #[must_use]
    pub const fn all() -> [Stage; 5] {
        [
            Self::Validation,
            Self::Transaction,
            Self::Timing,
            Self::CallRate,
            Self::FailureRate,
        ]
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::FnLayer;
    use hermes_core::{FnInvoker, MethodIdentity, Value};
    use std::sync::Mutex;

    fn tracking(
        name: &'static str,
        order: &Arc<Mutex<Vec<String>>>,
    ) -> impl Layer {
        let order = Arc::clone(order);
        FnLayer::new(name, move |ctx, next| {
            order.lock().unwrap().push(format!("before:{name}"));
            let result = next.run(ctx);
            order.lock().unwrap().push(format!("after:{name}"));
            result
        })
    }

    #[test]
    fn test_pipeline_orders_by_stage_not_insertion() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let root_order = Arc::clone(&order);
        let root = Arc::new(FnInvoker::new(move |_: &mut InvocationContext| {
            root_order.lock().unwrap().push("dispatch".to_string());
            Ok(Value::unit())
        }));

        let pipeline = Pipeline::builder(root)
            .stage(Stage::FailureRate, tracking("failure_rate", &order))
            .stage(Stage::Validation, tracking("validation", &order))
            .stage(Stage::Timing, tracking("timing", &order))
            .build();

        let mut ctx = InvocationContext::new(MethodIdentity::new("call"), Vec::new());
        pipeline.invoke(&mut ctx).unwrap();

        assert_eq!(
            *order.lock().unwrap(),
            vec![
                "before:validation",
                "before:timing",
                "before:failure_rate",
                "dispatch",
                "after:failure_rate",
                "after:timing",
                "after:validation",
            ]
        );
        assert_eq!(
            pipeline.stages(),
            &[Stage::Validation, Stage::Timing, Stage::FailureRate]
        );
    }

    #[test]
    fn test_stage_replaced_not_duplicated() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let root = Arc::new(FnInvoker::new(|_: &mut InvocationContext| Ok(Value::unit())));
        let pipeline = Pipeline::builder(root)
            .stage(Stage::Timing, tracking("first", &order))
            .stage(Stage::Timing, tracking("second", &order))
            .build();
        assert_eq!(pipeline.stage_names(), vec!["second"]);
        assert!(pipeline.has_stage(Stage::Timing));
        assert!(!pipeline.has_stage(Stage::Transaction));
    }

    #[test]
    fn test_empty_pipeline_dispatches() {
        let root = Arc::new(FnInvoker::new(|_: &mut InvocationContext| {
            Ok(Value::new("handler"))
        }));
        let pipeline = Pipeline::builder(root).build();
        assert_eq!(pipeline.stage_count(), 0);

        let mut ctx = InvocationContext::new(MethodIdentity::new("call"), Vec::new());
        let value = pipeline.invoke(&mut ctx).unwrap();
        assert_eq!(value.downcast_ref::<&str>(), Some(&"handler"));
    }

    #[test]
    fn test_stage_ordering() {
        assert!(Stage::Validation < Stage::Transaction);
        assert!(Stage::Transaction < Stage::Timing);
        assert!(Stage::Timing < Stage::CallRate);
        assert!(Stage::CallRate < Stage::FailureRate);
    }

    #[test]
    fn test_stage_categories() {
        assert!(!Stage::Validation.is_metrics());
        assert!(!Stage::Transaction.is_metrics());
        assert!(Stage::Timing.is_metrics());
        assert!(Stage::CallRate.is_metrics());
        assert!(Stage::FailureRate.is_metrics());
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(Stage::Validation.name(), "validation");
        assert_eq!(Stage::Transaction.name(), "transaction");
        assert_eq!(Stage::Timing.name(), "timing");
        assert_eq!(Stage::CallRate.name(), "call_rate");
        assert_eq!(Stage::FailureRate.to_string(), "failure_rate");
    }
}
