//! The layer trait and the chain continuation.
//!
//! A [`Layer`] wraps everything below it. It receives the call context and a
//! [`Next`] that runs the rest of the chain, and decides what to do before
//! and after delegating.
//!
//! # Example
//!
//! ```
//! use hermes_core::{InvocationContext, InvokeResult};
//! use hermes_middleware::{Layer, Next};
//!
//! struct Logging;
//!
//! impl Layer for Logging {
//!     fn name(&self) -> &'static str {
//!         "logging"
//!     }
//!
//!     fn invoke(&self, ctx: &mut InvocationContext, next: Next<'_>) -> InvokeResult {
//!         tracing::debug!(method = %ctx.method(), "before");
//!         let result = next.run(ctx);
//!         tracing::debug!(ok = result.is_ok(), "after");
//!         result
//!     }
//! }
//! ```

use hermes_core::{InvocationContext, InvokeResult, Invoker};
use std::fmt;
use std::sync::Arc;

/// One decorator in the invoker chain.
///
/// # Invariants
///
/// - A layer calls `next.run()` at most once
/// - A layer never wraps or replaces an error coming from below
/// - Cleanup a layer starts before delegating runs on every exit path
pub trait Layer: Send + Sync + 'static {
    /// Returns the stage name, used in logs.
    fn name(&self) -> &'static str;

    /// Runs the layer around the rest of the chain.
    fn invoke(&self, ctx: &mut InvocationContext, next: Next<'_>) -> InvokeResult;
}

/// The rest of the chain below the current layer.
///
/// Consumed by [`run`](Self::run), so it can only be called once. A layer
/// that returns without calling it short-circuits the call.
pub struct Next<'a> {
    layers: &'a [Arc<dyn Layer>],
    root: &'a dyn Invoker,
}

impl<'a> Next<'a> {
    /// Creates a continuation over `layers` ending in `root`.
    pub(crate) fn new(layers: &'a [Arc<dyn Layer>], root: &'a dyn Invoker) -> Self {
        Self { layers, root }
    }

    /// Runs the next layer, or the raw dispatch once the layers are exhausted.
    pub fn run(self, ctx: &mut InvocationContext) -> InvokeResult {
        match self.layers.split_first() {
            Some((layer, rest)) => layer.invoke(ctx, Next::new(rest, self.root)),
            None => self.root.invoke(ctx),
        }
    }

    /// Returns how many layers remain before dispatch.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.layers.len()
    }
}

impl fmt::Debug for Next<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next")
            .field(
                "layers",
                &self.layers.iter().map(|l| l.name()).collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

/// A layer built from a closure.
///
/// ```
/// use hermes_middleware::FnLayer;
///
/// let layer = FnLayer::new("noop", |ctx, next| next.run(ctx));
/// # let _ = layer;
/// ```
pub struct FnLayer<F> {
    name: &'static str,
    func: F,
}

impl<F> FnLayer<F>
where
    F: Fn(&mut InvocationContext, Next<'_>) -> InvokeResult + Send + Sync + 'static,
{
    /// Creates a closure-based layer.
    pub const fn new(name: &'static str, func: F) -> Self {
        Self { name, func }
    }
}

impl<F> Layer for FnLayer<F>
where
    F: Fn(&mut InvocationContext, Next<'_>) -> InvokeResult + Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn invoke(&self, ctx: &mut InvocationContext, next: Next<'_>) -> InvokeResult {
        (self.func)(ctx, next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hermes_core::{FnInvoker, HermesError, MethodIdentity, Value};

    fn ctx() -> InvocationContext {
        InvocationContext::new(MethodIdentity::new("test"), Vec::new())
    }

    #[test]
    fn test_empty_chain_dispatches() {
        let root = FnInvoker::new(|_: &mut InvocationContext| Ok(Value::new(7_u32)));
        let result = Next::new(&[], &root).run(&mut ctx()).unwrap();
        assert_eq!(result.downcast_ref::<u32>(), Some(&7));
    }

    #[test]
    fn test_layers_run_outer_to_inner() {
        let layers: Vec<Arc<dyn Layer>> = vec![
            Arc::new(FnLayer::new("outer", |ctx, next| {
                ctx.exchange_mut().set_extension(vec!["outer"]);
                next.run(ctx)
            })),
            Arc::new(FnLayer::new("inner", |ctx, next| {
                let seen = ctx.exchange().get_extension::<Vec<&str>>().cloned();
                assert_eq!(seen, Some(vec!["outer"]));
                assert_eq!(next.remaining(), 0);
                next.run(ctx)
            })),
        ];
        let root = FnInvoker::new(|_: &mut InvocationContext| Ok(Value::unit()));
        let next = Next::new(&layers, &root);
        assert_eq!(next.remaining(), 2);
        assert!(next.run(&mut ctx()).is_ok());
    }

    #[test]
    fn test_short_circuit_skips_dispatch() {
        let layers: Vec<Arc<dyn Layer>> = vec![Arc::new(FnLayer::new("refuse", |_, _| {
            Err(HermesError::configuration("refused"))
        }))];
        let root = FnInvoker::new(|_: &mut InvocationContext| -> InvokeResult {
            panic!("dispatch must not run")
        });
        let result = Next::new(&layers, &root).run(&mut ctx());
        assert!(matches!(result, Err(HermesError::Configuration { .. })));
    }

    #[test]
    fn test_fn_layer_name() {
        let layer = FnLayer::new("named", |ctx, next| next.run(ctx));
        assert_eq!(layer.name(), "named");
    }
}
