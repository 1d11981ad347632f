//! Builds the pipeline of a published endpoint.
//!
//! The assembler resolves the service's policies once and materializes only
//! the stages some method actually needs. A service with no unit-of-work
//! methods never gets a transaction stage, and a service with no tags at all
//! gets a pipeline that is the raw dispatch.

use crate::pipeline::{Pipeline, Stage};
use crate::stages::{
    CallRateLayer, FailureRateLayer, TimingLayer, TransactionLayer, ValidationLayer,
};
use crate::target::TargetMethods;
use hermes_core::{
    ConstraintValidator, Invoker, MethodMetadataIndex, ServiceDescriptor, SessionFactory,
    Validator,
};
use hermes_telemetry::MetricRegistry;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Capabilities shared by every pipeline it assembles.
///
/// # Example
///
/// ```
/// use hermes_core::fixtures::{self, RecordingSessionFactory};
/// use hermes_middleware::{PipelineAssembler, Stage};
/// use hermes_telemetry::MetricRegistry;
/// use std::sync::Arc;
///
/// let (_, descriptor) = fixtures::person_service().unwrap();
/// let pipeline = PipelineAssembler::new(Arc::new(MetricRegistry::new()))
///     .with_session_factory(Arc::new(RecordingSessionFactory::new()))
///     .assemble(descriptor);
///
/// assert_eq!(
///     pipeline.stage_names(),
///     vec!["validation", "transaction", "timing", "call_rate", "failure_rate"]
/// );
/// ```
#[derive(Clone)]
pub struct PipelineAssembler {
    registry: Arc<MetricRegistry>,
    validator: Arc<dyn Validator>,
    session_factory: Option<Arc<dyn SessionFactory>>,
}

impl PipelineAssembler {
    /// Creates an assembler recording into `registry`, validating with
    /// [`ConstraintValidator`] and without a session factory.
    #[must_use]
    pub fn new(registry: Arc<MetricRegistry>) -> Self {
        Self {
            registry,
            validator: Arc::new(ConstraintValidator),
            session_factory: None,
        }
    }

    /// Replaces the validator.
    #[must_use]
    pub fn with_validator(mut self, validator: Arc<dyn Validator>) -> Self {
        self.validator = validator;
        self
    }

    /// Sets the factory that opens unit-of-work sessions.
    #[must_use]
    pub fn with_session_factory(mut self, factory: Arc<dyn SessionFactory>) -> Self {
        self.session_factory = Some(factory);
        self
    }

    /// Returns the metric registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<MetricRegistry> {
        &self.registry
    }

    /// Assembles the pipeline for `descriptor`.
    #[must_use]
    pub fn assemble(&self, descriptor: Arc<ServiceDescriptor>) -> Pipeline {
        let index = MethodMetadataIndex::build(&descriptor);
        let targets = TargetMethods::new(Arc::new(index));
        let index = targets.index();

        let root: Arc<dyn Invoker> = descriptor.clone();
        let mut builder = Pipeline::builder(root);

        if index.has_validated() {
            builder = builder.stage(
                Stage::Validation,
                ValidationLayer::new(targets.clone(), Arc::clone(&self.validator)),
            );
        }

        if index.has_transactional() {
            match &self.session_factory {
                Some(factory) => {
                    builder = builder.stage(
                        Stage::Transaction,
                        TransactionLayer::new(targets.clone(), Arc::clone(factory)),
                    );
                }
                None => warn!(
                    service = descriptor.type_name(),
                    "No session factory supplied; unit-of-work methods run without sessions"
                ),
            }
        }

        if index.has_timed() {
            builder = builder.stage(
                Stage::Timing,
                TimingLayer::new(targets.clone(), Arc::clone(&self.registry)),
            );
        }

        if index.has_metered() {
            builder = builder.stage(
                Stage::CallRate,
                CallRateLayer::new(targets.clone(), Arc::clone(&self.registry)),
            );
        }

        if index.has_exception_metered() {
            builder = builder.stage(
                Stage::FailureRate,
                FailureRateLayer::new(targets.clone(), Arc::clone(&self.registry)),
            );
        }

        let pipeline = builder.build();
        debug!(
            service = descriptor.type_name(),
            tagged_methods = index.len(),
            stages = ?pipeline.stage_names(),
            "Pipeline assembled"
        );
        pipeline
    }
}

impl fmt::Debug for PipelineAssembler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineAssembler")
            .field("session_factory", &self.session_factory.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hermes_core::fixtures::{self, RecordingSessionFactory};
    use hermes_core::{
        Argument, InvocationContext, MethodIdentity, MethodSpec, Timed, TxOptions, Value,
    };

    struct Svc;

    #[test]
    fn test_all_stages_for_fully_tagged_service() {
        let (_, descriptor) = fixtures::person_service().unwrap();
        let pipeline = PipelineAssembler::new(Arc::new(MetricRegistry::new()))
            .with_session_factory(Arc::new(RecordingSessionFactory::new()))
            .assemble(descriptor);

        assert_eq!(pipeline.stages(), &Stage::all());
    }

    #[test]
    fn test_no_session_factory_skips_transaction_stage() {
        let (service, descriptor) = fixtures::person_service().unwrap();
        let pipeline = PipelineAssembler::new(Arc::new(MetricRegistry::new())).assemble(descriptor);

        assert!(!pipeline.has_stage(Stage::Transaction));
        assert_eq!(pipeline.stage_count(), 4);

        let mut ctx = InvocationContext::new(
            MethodIdentity::new("createPerson").param::<fixtures::Person>(),
            vec![Argument::value(fixtures::Person::new("Ada", "Engineer"))],
        );
        pipeline.invoke(&mut ctx).unwrap();
        assert_eq!(service.dispatched(), 1);
    }

    #[test]
    fn test_only_present_policies_materialize() {
        let descriptor = ServiceDescriptor::builder("app.Svc", Svc)
            .method(
                MethodSpec::new("timed")
                    .timed(Timed::new())
                    .handler(|_: &Svc, _| Ok(Value::unit())),
            )
            .method(
                MethodSpec::new("work")
                    .unit_of_work(TxOptions::default())
                    .handler(|_: &Svc, _| Ok(Value::unit())),
            )
            .build()
            .unwrap();

        let pipeline = PipelineAssembler::new(Arc::new(MetricRegistry::new()))
            .with_session_factory(Arc::new(RecordingSessionFactory::new()))
            .assemble(Arc::new(descriptor));

        assert_eq!(pipeline.stage_names(), vec!["transaction", "timing"]);
    }

    #[test]
    fn test_untagged_service_is_raw_dispatch() {
        let descriptor = ServiceDescriptor::builder("app.Svc", Svc)
            .method(MethodSpec::new("ping").handler(|_: &Svc, _| Ok(Value::new("pong"))))
            .build()
            .unwrap();

        let factory = Arc::new(RecordingSessionFactory::new());
        let registry = Arc::new(MetricRegistry::new());
        let pipeline = PipelineAssembler::new(Arc::clone(&registry))
            .with_session_factory(Arc::clone(&factory) as Arc<dyn SessionFactory>)
            .assemble(Arc::new(descriptor));

        assert_eq!(pipeline.stage_count(), 0);

        let mut ctx = InvocationContext::new(MethodIdentity::new("ping"), Vec::new());
        let value = pipeline.invoke(&mut ctx).unwrap();
        assert_eq!(value.downcast_ref::<&str>(), Some(&"pong"));
        assert_eq!(factory.stats().opens(), 0);
        assert_eq!(registry.snapshot(), Default::default());
    }

    #[test]
    fn test_unknown_method_is_method_not_found() {
        let (_, descriptor) = fixtures::person_service().unwrap();
        let pipeline = PipelineAssembler::new(Arc::new(MetricRegistry::new())).assemble(descriptor);

        let mut ctx = InvocationContext::new(MethodIdentity::new("missing"), Vec::new());
        let err = pipeline.invoke(&mut ctx).unwrap_err();
        assert!(matches!(err, hermes_core::HermesError::MethodNotFound { .. }));
    }
}
