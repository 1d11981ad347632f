//! Per-call context types.
//!
//! An [`InvocationContext`] is created for each inbound call, flows down the
//! invoker chain by `&mut` reference and is dropped when the call completes.
//! It is never shared between calls.

use crate::error::{HermesError, HermesResult};
use crate::identity::Principal;
use crate::method::MethodIdentity;
use crate::session::SessionHandle;
use crate::value::{Argument, ResponseCallback};
use serde::{Deserialize, Serialize};
use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// A unique identifier for each call, using UUID v7.
///
/// UUID v7 is time-ordered, which keeps log correlation simple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallId(Uuid);

impl CallId {
    /// Creates a new unique call ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for CallId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for CallId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Call-scoped state shared between the transport, the pipeline and the
/// dispatched method.
///
/// Holds the authenticated [`Principal`], the session bound by the
/// transaction stage, and arbitrary typed extensions.
///
/// # Example
///
/// ```
/// use hermes_core::{Exchange, Principal};
///
/// let mut exchange = Exchange::new();
/// exchange.set_principal(Principal::new("alice"));
/// assert_eq!(exchange.principal().map(Principal::name), Some("alice"));
/// ```
#[derive(Default)]
pub struct Exchange {
    principal: Option<Principal>,
    session: Option<SessionHandle>,
    extensions: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl Exchange {
    /// Creates an empty exchange.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the authenticated principal, if any.
    #[must_use]
    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    /// Stores the authenticated principal.
    pub fn set_principal(&mut self, principal: Principal) {
        self.principal = Some(principal);
    }

    /// Returns the session bound to this call, if any.
    #[must_use]
    pub fn session(&self) -> Option<&SessionHandle> {
        self.session.as_ref()
    }

    /// Binds a session to this call.
    pub fn bind_session(&mut self, session: SessionHandle) {
        self.session = Some(session);
    }

    /// Unbinds and returns the call's session.
    pub fn unbind_session(&mut self) -> Option<SessionHandle> {
        self.session.take()
    }

    /// Stores a typed extension value, replacing any previous one.
    pub fn set_extension<T: Send + Sync + 'static>(&mut self, value: T) {
        self.extensions.insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Retrieves a typed extension value.
    #[must_use]
    pub fn get_extension<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions
            .get(&TypeId::of::<T>())
            .and_then(|v| v.downcast_ref())
    }

    /// Removes and returns a typed extension value.
    pub fn remove_extension<T: Send + Sync + 'static>(&mut self) -> Option<T> {
        self.extensions
            .remove(&TypeId::of::<T>())
            .and_then(|v| v.downcast().ok())
            .map(|b| *b)
    }

    /// Checks if an extension of the given type exists.
    #[must_use]
    pub fn has_extension<T: Send + Sync + 'static>(&self) -> bool {
        self.extensions.contains_key(&TypeId::of::<T>())
    }
}

impl fmt::Debug for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Exchange")
            .field("principal", &self.principal)
            .field("session_bound", &self.session.is_some())
            .field("extensions", &self.extensions.len())
            .finish()
    }
}

/// Per-call value carrying the resolved target method and its arguments.
///
/// The target method is fixed at construction and cannot change while the
/// context flows down the chain.
///
/// # Example
///
/// ```
/// use hermes_core::{Argument, InvocationContext, MethodIdentity};
///
/// let ctx = InvocationContext::new(
///     MethodIdentity::new("echo").param::<String>(),
///     vec![Argument::value(String::from("hi"))],
/// );
/// assert_eq!(ctx.arg::<String>(0).unwrap(), "hi");
/// ```
#[derive(Debug)]
pub struct InvocationContext {
    call_id: CallId,
    method: MethodIdentity,
    arguments: Vec<Argument>,
    exchange: Exchange,
    started_at: Instant,
}

impl InvocationContext {
    /// Creates a context with a fresh exchange.
    #[must_use]
    pub fn new(method: MethodIdentity, arguments: Vec<Argument>) -> Self {
        Self::with_exchange(method, arguments, Exchange::new())
    }

    /// Creates a context around an exchange prepared by the transport.
    #[must_use]
    pub fn with_exchange(
        method: MethodIdentity,
        arguments: Vec<Argument>,
        exchange: Exchange,
    ) -> Self {
        Self {
            call_id: CallId::new(),
            method,
            arguments,
            exchange,
            started_at: Instant::now(),
        }
    }

    /// Returns the call ID.
    #[must_use]
    pub const fn call_id(&self) -> CallId {
        self.call_id
    }

    /// Returns the resolved target method.
    #[must_use]
    pub const fn method(&self) -> &MethodIdentity {
        &self.method
    }

    /// Returns all arguments in declaration order.
    #[must_use]
    pub fn arguments(&self) -> &[Argument] {
        &self.arguments
    }

    /// Returns the argument at `index`, if present.
    #[must_use]
    pub fn argument(&self, index: usize) -> Option<&Argument> {
        self.arguments.get(index)
    }

    /// Returns the argument at `index` as a `T`.
    ///
    /// Fails with [`HermesError::Argument`] when the argument is missing,
    /// null, a callback, or of another type.
    pub fn arg<T: Any>(&self, index: usize) -> HermesResult<&T> {
        self.opt_arg(index)?.ok_or(HermesError::Argument {
            index,
            expected: type_name::<T>(),
        })
    }

    /// Returns the argument at `index` as a `T`, or `None` when it is null.
    pub fn opt_arg<T: Any>(&self, index: usize) -> HermesResult<Option<&T>> {
        let mismatch = || HermesError::Argument {
            index,
            expected: type_name::<T>(),
        };
        match self.arguments.get(index) {
            Some(Argument::Null) => Ok(None),
            Some(Argument::Value(v)) => v.downcast_ref::<T>().map(Some).ok_or_else(mismatch),
            Some(Argument::Callback(_)) | None => Err(mismatch()),
        }
    }

    /// Returns the response callback at `index`.
    pub fn callback(&self, index: usize) -> HermesResult<&Arc<dyn ResponseCallback>> {
        self.arguments
            .get(index)
            .and_then(Argument::as_callback)
            .ok_or(HermesError::Argument {
                index,
                expected: "response callback",
            })
    }

    /// Returns the call's exchange.
    #[must_use]
    pub const fn exchange(&self) -> &Exchange {
        &self.exchange
    }

    /// Returns the call's exchange for mutation.
    pub fn exchange_mut(&mut self) -> &mut Exchange {
        &mut self.exchange
    }

    /// Returns the authenticated principal, if any.
    #[must_use]
    pub fn principal(&self) -> Option<&Principal> {
        self.exchange.principal()
    }

    /// Returns the session bound to this call, if any.
    #[must_use]
    pub fn session(&self) -> Option<&SessionHandle> {
        self.exchange.session()
    }

    /// Returns the time since the call entered the chain.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{InvokeResult, Value};

    fn ctx(args: Vec<Argument>) -> InvocationContext {
        InvocationContext::new(MethodIdentity::new("m"), args)
    }

    #[test]
    fn test_call_ids_are_unique() {
        assert_ne!(CallId::new(), CallId::new());
    }

    #[test]
    fn test_typed_argument_access() {
        let c = ctx(vec![Argument::value(42_i64), Argument::Null]);
        assert_eq!(*c.arg::<i64>(0).unwrap(), 42);
        assert!(c.opt_arg::<String>(1).unwrap().is_none());
    }

    #[test]
    fn test_argument_errors() {
        let c = ctx(vec![
            Argument::value(42_i64),
            Argument::Null,
            Argument::callback(|_: &InvokeResult| {}),
        ]);
        assert!(matches!(
            c.arg::<String>(0),
            Err(HermesError::Argument { index: 0, .. })
        ));
        assert!(matches!(c.arg::<String>(1), Err(HermesError::Argument { .. })));
        assert!(c.arg::<String>(2).is_err());
        assert!(c.arg::<String>(9).is_err());
        assert!(c.callback(2).is_ok());
        assert!(c.callback(0).is_err());
    }

    #[test]
    fn test_exchange_principal_and_extensions() {
        #[derive(Debug, PartialEq)]
        struct Tenant(&'static str);

        let mut c = ctx(Vec::new());
        assert!(c.principal().is_none());
        c.exchange_mut().set_principal(Principal::new("alice"));
        assert_eq!(c.principal().unwrap().name(), "alice");

        c.exchange_mut().set_extension(Tenant("acme"));
        assert!(c.exchange().has_extension::<Tenant>());
        assert_eq!(c.exchange().get_extension::<Tenant>(), Some(&Tenant("acme")));
        assert_eq!(c.exchange_mut().remove_extension::<Tenant>(), Some(Tenant("acme")));
        assert!(!c.exchange().has_extension::<Tenant>());
    }

    #[test]
    fn test_values_are_shared_not_copied() {
        let value = Value::new(String::from("payload"));
        let c = ctx(vec![Argument::Value(value.clone())]);
        assert_eq!(c.arg::<String>(0).unwrap(), "payload");
        assert_eq!(value.downcast_ref::<String>().unwrap(), "payload");
    }
}
