//! Type-erased call arguments and results.

use crate::error::HermesError;
use std::any::{type_name, Any};
use std::fmt;
use std::sync::Arc;

/// Result of one invocation through the chain.
pub type InvokeResult = Result<Value, HermesError>;

/// Shared, immutable, type-erased payload.
///
/// Arguments handed in by the transport and results returned by service
/// methods are both carried as `Value`s.
#[derive(Clone)]
pub struct Value {
    inner: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl Value {
    /// Wraps a concrete value.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            inner: Arc::new(value),
            type_name: type_name::<T>(),
        }
    }

    /// The value returned by methods with no result.
    #[must_use]
    pub fn unit() -> Self {
        Self::new(())
    }

    /// Returns a reference to the payload if it is a `T`.
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        (*self.inner).downcast_ref::<T>()
    }

    /// Returns `true` if the payload is a `T`.
    #[must_use]
    pub fn is<T: Any>(&self) -> bool {
        (*self.inner).is::<T>()
    }

    /// Returns the payload's type name.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Returns the payload as `Any`.
    #[must_use]
    pub fn as_any(&self) -> &(dyn Any + Send + Sync) {
        &*self.inner
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Value")
            .field("type", &self.type_name)
            .finish_non_exhaustive()
    }
}

/// Receives the outcome of a call made with the asynchronous convention.
pub trait ResponseCallback: Send + Sync {
    /// Called with the method's result.
    fn complete(&self, result: &InvokeResult);
}

impl<F> ResponseCallback for F
where
    F: Fn(&InvokeResult) + Send + Sync,
{
    fn complete(&self, result: &InvokeResult) {
        self(result);
    }
}

/// One positional call argument.
#[derive(Clone)]
pub enum Argument {
    /// Absent value.
    Null,
    /// Domain value.
    Value(Value),
    /// Trailing response callback of an asynchronous-convention method.
    Callback(Arc<dyn ResponseCallback>),
}

impl Argument {
    /// Wraps a domain value.
    pub fn value<T: Any + Send + Sync>(value: T) -> Self {
        Self::Value(Value::new(value))
    }

    /// Wraps a response callback.
    pub fn callback(callback: impl ResponseCallback + 'static) -> Self {
        Self::Callback(Arc::new(callback))
    }

    /// Returns `true` for [`Argument::Null`].
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the domain value, if any.
    #[must_use]
    pub const fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Value(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the response callback, if any.
    #[must_use]
    pub fn as_callback(&self) -> Option<&Arc<dyn ResponseCallback>> {
        match self {
            Self::Callback(cb) => Some(cb),
            _ => None,
        }
    }
}

impl fmt::Debug for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("Null"),
            Self::Value(v) => f.debug_tuple("Value").field(&v.type_name()).finish(),
            Self::Callback(_) => f.write_str("Callback"),
        }
    }
}

impl From<Value> for Argument {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}
