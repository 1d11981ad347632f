use hermes_core::{InvocationContext, MethodMetadataIndex, MethodPolicy};
use std::sync::Arc;

/// Resolves the policy of the method a call targets.
///
/// Every stage embeds one; they all share the same index built when the
/// endpoint was published.
#[derive(Debug, Clone)]
pub struct TargetMethods {
    index: Arc<MethodMetadataIndex>,
}

impl TargetMethods {
    /// Wraps a built index.
    #[must_use]
    pub const fn new(index: Arc<MethodMetadataIndex>) -> Self {
        Self { index }
    }

    /// Returns the policy of the call's target method, if it carries one.
    #[must_use]
    pub fn policy(&self, ctx: &InvocationContext) -> Option<&MethodPolicy> {
        self.index.get(ctx.method())
    }

    /// Returns the underlying index.
    #[must_use]
    pub fn index(&self) -> &MethodMetadataIndex {
        &self.index
    }
}
