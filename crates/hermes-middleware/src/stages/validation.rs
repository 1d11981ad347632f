//! Argument validation stage.
//!
//! Runs first, so a call with invalid arguments never opens a session and is
//! never counted. Every violation across every validated parameter is
//! collected before failing, not just the first one.
//!
//! ## Asynchronous methods
//!
//! A method following the asynchronous convention declares a trailing
//! response callback. The callback is not a domain value and is never
//! handed to the validator.
//!
//! A validated parameter that is missing or null is a violation, as is an
//! argument count that does not match the method's parameters.

use crate::layer::{Layer, Next};
use crate::target::TargetMethods;
use hermes_core::{InvocationContext, InvokeResult, ValidationError, Validator, Violation};
use std::sync::Arc;
use tracing::debug;

/// Layer that rejects calls whose arguments violate their constraints.
///
/// # Behavior
///
/// 1. Look up the target method's policy
/// 2. Pass through if no parameter is validated
/// 3. Validate each validated domain argument
/// 4. Fail with [`ValidationError`] carrying all violations, without
///    delegating, if any were found
pub struct ValidationLayer {
    targets: TargetMethods,
    validator: Arc<dyn Validator>,
}

impl ValidationLayer {
    /// Creates the stage.
    #[must_use]
    pub fn new(targets: TargetMethods, validator: Arc<dyn Validator>) -> Self {
        Self { targets, validator }
    }

    fn violations(&self, ctx: &InvocationContext) -> Vec<Violation> {
        let Some(policy) = self.targets.policy(ctx).filter(|p| p.validated) else {
            return Vec::new();
        };
        let arguments = ctx.arguments();
        let expected = policy.value_params.len();
        let supplied = match arguments.last() {
            Some(last) if last.as_callback().is_some() => arguments.len() - 1,
            _ => arguments.len(),
        };

        let mut violations = Vec::new();
        if supplied != expected {
            violations.push(Violation::new(
                "",
                format!("expected {expected} arguments, got {supplied}"),
            ));
        }
        for (index, param) in policy.value_params.iter().enumerate() {
            if !param.is_validated() {
                continue;
            }
            match arguments.get(index).filter(|a| a.as_value().is_some()) {
                Some(argument) => violations.extend(self.validator.validate(param, argument)),
                None => violations.push(Violation::new(param.name(), "must not be null")),
            }
        }
        violations
    }
}

impl Layer for ValidationLayer {
    fn name(&self) -> &'static str {
        "validation"
    }

    fn invoke(&self, ctx: &mut InvocationContext, next: Next<'_>) -> InvokeResult {
        let violations = self.violations(ctx);
        if violations.is_empty() {
            return next.run(ctx);
        }

        debug!(
            method = %ctx.method(),
            violations = violations.len(),
            "Call rejected by validation"
        );
        Err(ValidationError::new(violations).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{Pipeline, Stage};
    use crate::test_support::{person_targets, ping};
    use hermes_core::fixtures::{Person, PersonService};
    use hermes_core::{
        Argument, ConstraintValidator, HermesError, Invoker, MethodIdentity, ParamSpec,
        ResponseCallback,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct CountingValidator {
        calls: AtomicUsize,
    }

    impl Validator for CountingValidator {
        fn validate(&self, param: &ParamSpec, argument: &Argument) -> Vec<Violation> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            ConstraintValidator.validate(param, argument)
        }
    }

    fn pipeline(validator: Arc<dyn Validator>) -> (Arc<PersonService>, Pipeline) {
        let (service, descriptor, targets) = person_targets();
        let pipeline = Pipeline::builder(descriptor)
            .stage(Stage::Validation, ValidationLayer::new(targets, validator))
            .build();
        (service, pipeline)
    }

    fn create_person(person: Person) -> InvocationContext {
        InvocationContext::new(
            MethodIdentity::new("createPerson").param::<Person>(),
            vec![Argument::value(person)],
        )
    }

    #[test]
    fn test_invalid_argument_never_dispatches() {
        let (service, pipeline) = pipeline(Arc::new(ConstraintValidator));

        let err = pipeline
            .invoke(&mut create_person(Person::new("", "Engineer")))
            .unwrap_err();

        let HermesError::Validation(validation) = &err else {
            panic!("expected validation error, got {err:?}");
        };
        assert_eq!(validation.messages(), vec!["person.fullName must not be empty"]);
        assert_eq!(service.dispatched(), 0);
    }

    #[test]
    fn test_all_violations_are_reported() {
        let (_, pipeline) = pipeline(Arc::new(ConstraintValidator));

        let err = pipeline
            .invoke(&mut create_person(Person::new(" ", "")))
            .unwrap_err();

        assert_eq!(err.status_code().as_u16(), 400);
        let message = err.to_string();
        assert!(message.contains("person.fullName must not be empty"));
        assert!(message.contains("person.jobTitle must not be empty"));
    }

    #[test]
    fn test_valid_argument_dispatches() {
        let (service, pipeline) = pipeline(Arc::new(ConstraintValidator));

        let value = pipeline
            .invoke(&mut create_person(Person::new("Ada", "Engineer")))
            .unwrap();

        assert_eq!(value.downcast_ref::<Person>().unwrap().full_name, "Ada");
        assert_eq!(service.dispatched(), 1);
    }

    #[test]
    fn test_async_callback_is_not_validated() {
        let validator = Arc::new(CountingValidator::default());
        let (service, pipeline) = pipeline(Arc::clone(&validator) as Arc<dyn Validator>);
        let completed = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&completed);

        let mut ctx = InvocationContext::new(
            MethodIdentity::new("createPersonAsync")
                .param::<Person>()
                .param::<Arc<dyn ResponseCallback>>(),
            vec![
                Argument::value(Person::new("Ada", "Engineer")),
                Argument::callback(move |result: &InvokeResult| {
                    sink.lock().unwrap().push(result.is_ok());
                }),
            ],
        );
        pipeline.invoke(&mut ctx).unwrap();

        assert_eq!(validator.calls.load(Ordering::SeqCst), 1);
        assert_eq!(*completed.lock().unwrap(), vec![true]);
        assert_eq!(service.dispatched(), 1);
    }

    #[test]
    fn test_async_invalid_argument_skips_callback() {
        let (service, pipeline) = pipeline(Arc::new(ConstraintValidator));
        let completed = Arc::new(AtomicUsize::new(0));
        let sink = Arc::clone(&completed);

        let mut ctx = InvocationContext::new(
            MethodIdentity::new("createPersonAsync")
                .param::<Person>()
                .param::<Arc<dyn ResponseCallback>>(),
            vec![
                Argument::value(Person::new("Ada", "")),
                Argument::callback(move |_: &InvokeResult| {
                    sink.fetch_add(1, Ordering::SeqCst);
                }),
            ],
        );
        let err = pipeline.invoke(&mut ctx).unwrap_err();

        assert!(matches!(err, HermesError::Validation(_)));
        assert_eq!(completed.load(Ordering::SeqCst), 0);
        assert_eq!(service.dispatched(), 0);
    }

    #[test]
    fn test_unvalidated_methods_skip_validator() {
        let validator = Arc::new(CountingValidator::default());
        let (service, pipeline) = pipeline(Arc::clone(&validator) as Arc<dyn Validator>);

        pipeline.invoke(&mut ping()).unwrap();

        assert_eq!(validator.calls.load(Ordering::SeqCst), 0);
        assert_eq!(service.dispatched(), 1);
    }

    #[test]
    fn test_null_or_missing_argument_is_a_violation() {
        let (service, pipeline) = pipeline(Arc::new(ConstraintValidator));

        let mut null = InvocationContext::new(
            MethodIdentity::new("createPerson").param::<Person>(),
            vec![Argument::Null],
        );
        let err = pipeline.invoke(&mut null).unwrap_err();
        let HermesError::Validation(validation) = &err else {
            panic!("expected validation error, got {err:?}");
        };
        assert_eq!(validation.messages(), vec!["person must not be null"]);

        let mut missing = InvocationContext::new(
            MethodIdentity::new("createPerson").param::<Person>(),
            Vec::new(),
        );
        let err = pipeline.invoke(&mut missing).unwrap_err();
        let HermesError::Validation(validation) = &err else {
            panic!("expected validation error, got {err:?}");
        };
        assert_eq!(
            validation.messages(),
            vec!["expected 1 arguments, got 0", "person must not be null"]
        );
        assert_eq!(service.dispatched(), 0);
    }

    #[test]
    fn test_extra_argument_is_a_violation() {
        let (service, pipeline) = pipeline(Arc::new(ConstraintValidator));
        let mut ctx = InvocationContext::new(
            MethodIdentity::new("createPerson").param::<Person>(),
            vec![
                Argument::value(Person::new("Ada", "Engineer")),
                Argument::value(1_i64),
            ],
        );

        let err = pipeline.invoke(&mut ctx).unwrap_err();

        assert!(matches!(err, HermesError::Validation(_)));
        assert_eq!(service.dispatched(), 0);
    }
}
