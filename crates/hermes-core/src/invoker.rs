//! The invoker abstraction.

use crate::context::InvocationContext;
use crate::value::InvokeResult;
use std::sync::Arc;

/// Executes one call and returns its result or error.
///
/// Implemented by [`ServiceDescriptor`](crate::ServiceDescriptor) for raw
/// dispatch and by assembled pipelines. Implementations are shared across
/// concurrent calls and carry no per-call state.
pub trait Invoker: Send + Sync {
    /// Invokes the call described by `ctx`.
    fn invoke(&self, ctx: &mut InvocationContext) -> InvokeResult;
}

impl<I: Invoker + ?Sized> Invoker for Arc<I> {
    fn invoke(&self, ctx: &mut InvocationContext) -> InvokeResult {
        (**self).invoke(ctx)
    }
}

/// An invoker backed by a closure.
///
/// Mostly useful as a spy in tests.
pub struct FnInvoker<F>(F);

impl<F> FnInvoker<F>
where
    F: Fn(&mut InvocationContext) -> InvokeResult + Send + Sync,
{
    /// Wraps `f`.
    pub const fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> Invoker for FnInvoker<F>
where
    F: Fn(&mut InvocationContext) -> InvokeResult + Send + Sync,
{
    fn invoke(&self, ctx: &mut InvocationContext) -> InvokeResult {
        (self.0)(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::method::MethodIdentity;
    use crate::value::Value;

    #[test]
    fn test_fn_invoker_through_arc() {
        let inner: Arc<dyn Invoker> = Arc::new(FnInvoker::new(|ctx: &mut InvocationContext| {
            Ok(Value::new(ctx.method().name().to_string()))
        }));
        let mut ctx = InvocationContext::new(MethodIdentity::new("ping"), Vec::new());
        let out = inner.invoke(&mut ctx).unwrap();
        assert_eq!(out.downcast_ref::<String>().unwrap(), "ping");
    }
}
