//! Authenticated caller identity.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An authenticated caller identity.
///
/// Produced by an authenticator once credentials check out and stored in the
/// call's [`Exchange`](crate::Exchange), where the dispatched method reads it.
///
/// # Example
///
/// ```
/// use hermes_core::Principal;
///
/// let principal = Principal::new("alice");
/// assert_eq!(principal.name(), "alice");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Principal {
    identity: String,
}

impl Principal {
    /// Exchange key under which transports expose the principal.
    pub const EXCHANGE_KEY: &'static str = "hermes.principal";

    /// Creates a principal for the given identity.
    #[must_use]
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
        }
    }

    /// Returns the identity string.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.identity
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.identity)
    }
}
