//! Service descriptors and explicit method registration.
//!
//! A [`ServiceDescriptor`] pairs a service implementation with the set of
//! methods it exposes. Each method is registered through a [`MethodSpec`]
//! that names it, declares its parameters and attaches its policy tags.
//!
//! # Example
//!
//! ```
//! use hermes_core::{
//!     Argument, InvocationContext, Invoker, Metered, MethodIdentity, MethodSpec,
//!     ServiceDescriptor, Value,
//! };
//!
//! struct Greeter;
//!
//! impl Greeter {
//!     fn greet(&self, name: &str) -> String {
//!         format!("hello {name}")
//!     }
//! }
//!
//! let descriptor = ServiceDescriptor::builder("example.Greeter", Greeter)
//!     .method(
//!         MethodSpec::new("greet")
//!             .param::<String>("name")
//!             .metered(Metered::new())
//!             .handler(|svc: &Greeter, ctx| Ok(Value::new(svc.greet(ctx.arg::<String>(0)?)))),
//!     )
//!     .build()
//!     .unwrap();
//!
//! let mut ctx = InvocationContext::new(
//!     MethodIdentity::new("greet").param::<String>(),
//!     vec![Argument::value(String::from("ann"))],
//! );
//! let reply = descriptor.invoke(&mut ctx).unwrap();
//! assert_eq!(reply.downcast_ref::<String>().unwrap(), "hello ann");
//! ```

use crate::context::InvocationContext;
use crate::error::{HermesError, HermesResult};
use crate::invoker::Invoker;
use crate::method::{ExceptionMetered, Metered, MethodIdentity, Timed, TxOptions};
use crate::validation::{Validate, Violations};
use crate::value::{InvokeResult, ResponseCallback, Value};
use std::any::{type_name, Any};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

type ConstraintFn = fn(&(dyn Any + Send + Sync), &mut Violations);

type ErasedHandler = Arc<dyn Fn(&InvocationContext) -> InvokeResult + Send + Sync>;

type TypedHandler<S> = Box<dyn Fn(&S, &InvocationContext) -> InvokeResult + Send + Sync>;

fn check_as<T: Validate + Any>(value: &(dyn Any + Send + Sync), violations: &mut Violations) {
    if let Some(typed) = value.downcast_ref::<T>() {
        typed.validate(violations);
    }
}

/// What a declared parameter carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// A domain value.
    Value,
    /// The trailing response callback of the asynchronous convention.
    ResponseCallback,
}

/// One declared method parameter.
#[derive(Clone)]
pub struct ParamSpec {
    name: String,
    type_name: &'static str,
    kind: ParamKind,
    constraints: Option<ConstraintFn>,
}

impl ParamSpec {
    /// A plain parameter of type `T`.
    #[must_use]
    pub fn new<T: Any>(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name::<T>(),
            kind: ParamKind::Value,
            constraints: None,
        }
    }

    /// A parameter of type `T` whose constraints are checked before dispatch.
    #[must_use]
    pub fn validated<T: Validate + Any>(name: impl Into<String>) -> Self {
        Self {
            constraints: Some(check_as::<T>),
            ..Self::new::<T>(name)
        }
    }

    /// A trailing response callback.
    #[must_use]
    pub fn callback(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name::<Arc<dyn ResponseCallback>>(),
            kind: ParamKind::ResponseCallback,
            constraints: None,
        }
    }

    /// Returns the parameter name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the declared type name.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Returns the parameter kind.
    #[must_use]
    pub const fn kind(&self) -> ParamKind {
        self.kind
    }

    /// Returns `true` if the parameter carries constraints.
    #[must_use]
    pub const fn is_validated(&self) -> bool {
        self.constraints.is_some()
    }

    /// Returns `true` for the trailing response callback.
    #[must_use]
    pub fn is_callback(&self) -> bool {
        self.kind == ParamKind::ResponseCallback
    }

    /// Checks `value` against the parameter's constraints.
    ///
    /// Values of another type are ignored.
    pub fn check_constraints(&self, value: &Value, violations: &mut Violations) {
        if let Some(check) = self.constraints {
            check(value.as_any(), violations);
        }
    }
}

impl fmt::Debug for ParamSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParamSpec")
            .field("name", &self.name)
            .field("type_name", &self.type_name)
            .field("kind", &self.kind)
            .field("validated", &self.is_validated())
            .finish()
    }
}

/// Registration of one method of service `S`.
pub struct MethodSpec<S> {
    name: String,
    params: Vec<ParamSpec>,
    timed: Option<Timed>,
    metered: Option<Metered>,
    exception_metered: Option<ExceptionMetered>,
    unit_of_work: Option<TxOptions>,
    handler: Option<TypedHandler<S>>,
}

impl<S: Send + Sync + 'static> MethodSpec<S> {
    /// Starts registering the method `name`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            timed: None,
            metered: None,
            exception_metered: None,
            unit_of_work: None,
            handler: None,
        }
    }

    /// Declares a plain parameter.
    #[must_use]
    pub fn param<T: Any>(mut self, name: impl Into<String>) -> Self {
        self.params.push(ParamSpec::new::<T>(name));
        self
    }

    /// Declares a parameter whose constraints are checked before dispatch.
    #[must_use]
    pub fn validated_param<T: Validate + Any>(mut self, name: impl Into<String>) -> Self {
        self.params.push(ParamSpec::validated::<T>(name));
        self
    }

    /// Declares the trailing response callback of the asynchronous convention.
    #[must_use]
    pub fn callback_param(mut self, name: impl Into<String>) -> Self {
        self.params.push(ParamSpec::callback(name));
        self
    }

    /// Declares the method as an asynchronous variant, appending a response
    /// callback named `asyncHandler`.
    #[must_use]
    pub fn async_variant(self) -> Self {
        self.callback_param("asyncHandler")
    }

    /// Times every call.
    #[must_use]
    pub fn timed(mut self, tag: Timed) -> Self {
        self.timed = Some(tag);
        self
    }

    /// Meters the call rate.
    #[must_use]
    pub fn metered(mut self, tag: Metered) -> Self {
        self.metered = Some(tag);
        self
    }

    /// Meters matching failures.
    #[must_use]
    pub fn exception_metered(mut self, tag: ExceptionMetered) -> Self {
        self.exception_metered = Some(tag);
        self
    }

    /// Runs every call inside a unit of work.
    #[must_use]
    pub fn unit_of_work(mut self, options: TxOptions) -> Self {
        self.unit_of_work = Some(options);
        self
    }

    /// Sets the function dispatching calls to the service.
    #[must_use]
    pub fn handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&S, &InvocationContext) -> InvokeResult + Send + Sync + 'static,
    {
        self.handler = Some(Box::new(handler));
        self
    }

    fn identity(&self) -> MethodIdentity {
        MethodIdentity::with_params(
            self.name.clone(),
            self.params.iter().map(ParamSpec::type_name).collect(),
        )
    }
}

/// A registered method with its tags and erased handler.
pub struct RegisteredMethod {
    identity: MethodIdentity,
    params: Vec<ParamSpec>,
    timed: Option<Timed>,
    metered: Option<Metered>,
    exception_metered: Option<ExceptionMetered>,
    unit_of_work: Option<TxOptions>,
    handler: ErasedHandler,
}

impl RegisteredMethod {
    /// Returns the method identity.
    #[must_use]
    pub const fn identity(&self) -> &MethodIdentity {
        &self.identity
    }

    /// Returns every declared parameter, including a trailing callback.
    #[must_use]
    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    /// Returns `true` if the method follows the asynchronous convention.
    #[must_use]
    pub fn is_async(&self) -> bool {
        self.params.last().is_some_and(ParamSpec::is_callback)
    }

    /// Returns the parameters carrying domain values.
    #[must_use]
    pub fn value_params(&self) -> &[ParamSpec] {
        if self.is_async() {
            &self.params[..self.params.len() - 1]
        } else {
            &self.params
        }
    }

    /// Returns the timing tag.
    #[must_use]
    pub const fn timed(&self) -> Option<&Timed> {
        self.timed.as_ref()
    }

    /// Returns the call-rate tag.
    #[must_use]
    pub const fn metered(&self) -> Option<&Metered> {
        self.metered.as_ref()
    }

    /// Returns the failure-rate tag.
    #[must_use]
    pub const fn exception_metered(&self) -> Option<&ExceptionMetered> {
        self.exception_metered.as_ref()
    }

    /// Returns the unit-of-work tag.
    #[must_use]
    pub const fn unit_of_work(&self) -> Option<&TxOptions> {
        self.unit_of_work.as_ref()
    }
}

impl fmt::Debug for RegisteredMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredMethod")
            .field("identity", &self.identity)
            .field("params", &self.params)
            .field("timed", &self.timed)
            .field("metered", &self.metered)
            .field("exception_metered", &self.exception_metered)
            .field("unit_of_work", &self.unit_of_work)
            .finish_non_exhaustive()
    }
}

/// Collects method registrations for a service.
pub struct ServiceBuilder<S> {
    type_name: String,
    service: Arc<S>,
    methods: Vec<MethodSpec<S>>,
}

impl<S: Send + Sync + 'static> ServiceBuilder<S> {
    /// Registers a method.
    #[must_use]
    pub fn method(mut self, spec: MethodSpec<S>) -> Self {
        self.methods.push(spec);
        self
    }

    /// Validates the registrations and builds the descriptor.
    ///
    /// Fails with a configuration error for a blank type name, a blank
    /// method name, a method without handler, a response callback that is
    /// not the last parameter, or two registrations with the same identity.
    pub fn build(self) -> HermesResult<ServiceDescriptor> {
        if self.type_name.trim().is_empty() {
            return Err(HermesError::configuration("service type name must not be blank"));
        }

        let mut methods = HashMap::with_capacity(self.methods.len());
        let mut order = Vec::with_capacity(self.methods.len());

        for spec in self.methods {
            if spec.name.trim().is_empty() {
                return Err(HermesError::configuration(format!(
                    "{}: method name must not be blank",
                    self.type_name
                )));
            }
            let identity = spec.identity();
            if let Some(pos) = spec.params.iter().position(ParamSpec::is_callback) {
                if pos + 1 != spec.params.len() {
                    return Err(HermesError::configuration(format!(
                        "{}.{identity}: response callback must be the last parameter",
                        self.type_name
                    )));
                }
            }
            let Some(handler) = spec.handler else {
                return Err(HermesError::configuration(format!(
                    "{}.{identity}: no handler registered",
                    self.type_name
                )));
            };
            if methods.contains_key(&identity) {
                return Err(HermesError::configuration(format!(
                    "{}.{identity}: registered twice",
                    self.type_name
                )));
            }

            let service = Arc::clone(&self.service);
            let erased: ErasedHandler =
                Arc::new(move |ctx: &InvocationContext| handler(&*service, ctx));

            order.push(identity.clone());
            methods.insert(
                identity.clone(),
                RegisteredMethod {
                    identity,
                    params: spec.params,
                    timed: spec.timed,
                    metered: spec.metered,
                    exception_metered: spec.exception_metered,
                    unit_of_work: spec.unit_of_work,
                    handler: erased,
                },
            );
        }

        Ok(ServiceDescriptor {
            type_name: self.type_name,
            service: self.service,
            methods,
            order,
        })
    }
}

/// A service implementation plus its registered method set.
///
/// Immutable once built. Acts as the root [`Invoker`] of every pipeline:
/// invoking it dispatches straight to the registered handler.
pub struct ServiceDescriptor {
    type_name: String,
    service: Arc<dyn Any + Send + Sync>,
    methods: HashMap<MethodIdentity, RegisteredMethod>,
    order: Vec<MethodIdentity>,
}

impl ServiceDescriptor {
    /// Starts describing `service`, declared as type `type_name`.
    ///
    /// The type name namespaces synthesized metric names.
    #[must_use]
    pub fn builder<S: Send + Sync + 'static>(
        type_name: impl Into<String>,
        service: S,
    ) -> ServiceBuilder<S> {
        Self::builder_from_arc(type_name, Arc::new(service))
    }

    /// Like [`builder`](Self::builder) for an already shared service.
    #[must_use]
    pub fn builder_from_arc<S: Send + Sync + 'static>(
        type_name: impl Into<String>,
        service: Arc<S>,
    ) -> ServiceBuilder<S> {
        ServiceBuilder {
            type_name: type_name.into(),
            service,
            methods: Vec::new(),
        }
    }

    /// Returns the declaring type name.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Returns the service implementation as `S`.
    #[must_use]
    pub fn service<S: Any>(&self) -> Option<&S> {
        (*self.service).downcast_ref::<S>()
    }

    /// Returns a registered method.
    #[must_use]
    pub fn method(&self, identity: &MethodIdentity) -> Option<&RegisteredMethod> {
        self.methods.get(identity)
    }

    /// Iterates over methods in registration order.
    pub fn methods(&self) -> impl Iterator<Item = &RegisteredMethod> {
        self.order.iter().filter_map(|id| self.methods.get(id))
    }

    /// Returns the number of registered methods.
    #[must_use]
    pub fn len(&self) -> usize {
        self.methods.len()
    }

    /// Returns `true` if no method is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    /// Dispatches the call to the registered handler.
    pub fn dispatch(&self, ctx: &InvocationContext) -> InvokeResult {
        let method = self
            .methods
            .get(ctx.method())
            .ok_or_else(|| HermesError::MethodNotFound {
                method: ctx.method().clone(),
            })?;
        (method.handler)(ctx)
    }
}

impl Invoker for ServiceDescriptor {
    fn invoke(&self, ctx: &mut InvocationContext) -> InvokeResult {
        self.dispatch(ctx)
    }
}

impl fmt::Debug for ServiceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceDescriptor")
            .field("type_name", &self.type_name)
            .field("methods", &self.order)
            .finish_non_exhaustive()
    }
}
