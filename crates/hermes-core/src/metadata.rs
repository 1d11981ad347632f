//! Per-method policy index.
//!
//! [`MethodMetadataIndex::build`] walks a [`ServiceDescriptor`] once, when the
//! endpoint is published, and resolves each method's tags into a
//! [`MethodPolicy`] with final metric names. Methods carrying no tag and no
//! validated parameter are left out entirely, so calls to them pass through
//! every stage untouched.

use crate::method::{
    choose_metric_name, metric_name, ErrorMatcher, MethodIdentity, TxOptions, EXCEPTIONS_SUFFIX,
};
use crate::service::{ParamSpec, RegisteredMethod, ServiceDescriptor};
use std::collections::HashMap;

/// Resolved failure-rate policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExceptionMeterPolicy {
    /// Meter name.
    pub name: String,
    /// Which failures are counted.
    pub cause: ErrorMatcher,
}

/// Resolved policy for one method.
#[derive(Debug, Clone)]
pub struct MethodPolicy {
    /// Base metric name, `<declaring type>.<method>`.
    pub metrics_name: String,
    /// Timer name, if timed.
    pub timed: Option<String>,
    /// Call meter name, if metered.
    pub metered: Option<String>,
    /// Failure meter, if exception-metered.
    pub exception_metered: Option<ExceptionMeterPolicy>,
    /// Unit-of-work settings, if transactional.
    pub transactional: Option<TxOptions>,
    /// Whether any parameter carries constraints.
    pub validated: bool,
    /// Parameters carrying domain values, trailing callback excluded.
    pub value_params: Vec<ParamSpec>,
}

impl MethodPolicy {
    fn resolve(declaring_type: &str, method: &RegisteredMethod) -> Option<Self> {
        let name = method.identity().name();
        let value_params = method.value_params().to_vec();
        let validated = value_params.iter().any(ParamSpec::is_validated);

        let policy = Self {
            metrics_name: metric_name(&[declaring_type, name]),
            timed: method.timed().map(|t| {
                choose_metric_name(t.name.as_deref(), t.absolute, declaring_type, name, "")
            }),
            metered: method.metered().map(|m| {
                choose_metric_name(m.name.as_deref(), m.absolute, declaring_type, name, "")
            }),
            exception_metered: method.exception_metered().map(|e| ExceptionMeterPolicy {
                name: choose_metric_name(
                    e.name.as_deref(),
                    e.absolute,
                    declaring_type,
                    name,
                    EXCEPTIONS_SUFFIX,
                ),
                cause: e.cause,
            }),
            transactional: method.unit_of_work().copied(),
            validated,
            value_params,
        };

        policy.is_tagged().then_some(policy)
    }

    /// Returns `true` if any stage applies to the method.
    #[must_use]
    pub const fn is_tagged(&self) -> bool {
        self.timed.is_some()
            || self.metered.is_some()
            || self.exception_metered.is_some()
            || self.transactional.is_some()
            || self.validated
    }
}

/// Immutable map from method identity to resolved policy.
///
/// # Example
///
/// ```
/// use hermes_core::{
///     MethodIdentity, MethodMetadataIndex, MethodSpec, ServiceDescriptor, Timed, Value,
/// };
///
/// struct Svc;
///
/// let descriptor = ServiceDescriptor::builder("app.Svc", Svc)
///     .method(MethodSpec::new("slow").timed(Timed::new()).handler(|_: &Svc, _| Ok(Value::unit())))
///     .method(MethodSpec::new("plain").handler(|_: &Svc, _| Ok(Value::unit())))
///     .build()
///     .unwrap();
///
/// let index = MethodMetadataIndex::build(&descriptor);
/// let policy = index.get(&MethodIdentity::new("slow")).unwrap();
/// assert_eq!(policy.timed.as_deref(), Some("app.Svc.slow"));
/// assert!(index.get(&MethodIdentity::new("plain")).is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct MethodMetadataIndex {
    policies: HashMap<MethodIdentity, MethodPolicy>,
}

impl MethodMetadataIndex {
    /// Resolves the policy of every tagged method of `descriptor`.
    #[must_use]
    pub fn build(descriptor: &ServiceDescriptor) -> Self {
        let policies = descriptor
            .methods()
            .filter_map(|method| {
                MethodPolicy::resolve(descriptor.type_name(), method)
                    .map(|policy| (method.identity().clone(), policy))
            })
            .collect();
        Self { policies }
    }

    /// Returns the policy of `method`, if it carries any.
    #[must_use]
    pub fn get(&self, method: &MethodIdentity) -> Option<&MethodPolicy> {
        self.policies.get(method)
    }

    /// Iterates over tagged methods and their policies.
    pub fn iter(&self) -> impl Iterator<Item = (&MethodIdentity, &MethodPolicy)> {
        self.policies.iter()
    }

    /// Returns the number of tagged methods.
    #[must_use]
    pub fn len(&self) -> usize {
        self.policies.len()
    }

    /// Returns `true` if no method is tagged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    /// Returns `true` if any method is timed.
    #[must_use]
    pub fn has_timed(&self) -> bool {
        self.policies.values().any(|p| p.timed.is_some())
    }

    /// Returns `true` if any method is metered.
    #[must_use]
    pub fn has_metered(&self) -> bool {
        self.policies.values().any(|p| p.metered.is_some())
    }

    /// Returns `true` if any method is exception-metered.
    #[must_use]
    pub fn has_exception_metered(&self) -> bool {
        self.policies.values().any(|p| p.exception_metered.is_some())
    }

    /// Returns `true` if any method runs in a unit of work.
    #[must_use]
    pub fn has_transactional(&self) -> bool {
        self.policies.values().any(|p| p.transactional.is_some())
    }

    /// Returns `true` if any method has validated parameters.
    #[must_use]
    pub fn has_validated(&self) -> bool {
        self.policies.values().any(|p| p.validated)
    }
}
