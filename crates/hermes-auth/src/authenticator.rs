//! Authenticator contract and endpoint authentication settings.

use crate::credentials::BasicCredentials;
use crate::error::AuthenticationError;
use hermes_core::Principal;
use std::fmt;
use std::sync::Arc;

/// Resolves credentials to a caller.
///
/// Returns `Ok(None)` when the credentials are wrong and `Err` when they
/// could not be checked at all.
pub trait Authenticator: Send + Sync {
    /// Looks up the caller behind `credentials`.
    ///
    /// # Errors
    ///
    /// Returns an error if the credential store cannot be consulted.
    fn authenticate(
        &self,
        credentials: &BasicCredentials,
    ) -> Result<Option<Principal>, AuthenticationError>;
}

struct FnAuthenticator<F>(F);

impl<F> Authenticator for FnAuthenticator<F>
where
    F: Fn(&BasicCredentials) -> Result<Option<Principal>, AuthenticationError> + Send + Sync,
{
    fn authenticate(
        &self,
        credentials: &BasicCredentials,
    ) -> Result<Option<Principal>, AuthenticationError> {
        (self.0)(credentials)
    }
}

/// An authenticator together with the realm announced in challenges.
#[derive(Clone)]
pub struct BasicAuthentication {
    authenticator: Arc<dyn Authenticator>,
    realm: String,
}

impl BasicAuthentication {
    /// Creates settings from an authenticator implementation.
    pub fn new(authenticator: impl Authenticator + 'static, realm: impl Into<String>) -> Self {
        Self::from_arc(Arc::new(authenticator), realm)
    }

    /// Creates settings from a shared authenticator.
    pub fn from_arc(authenticator: Arc<dyn Authenticator>, realm: impl Into<String>) -> Self {
        Self {
            authenticator,
            realm: realm.into(),
        }
    }

    /// Creates settings from a closure.
    pub fn from_fn<F>(authenticate: F, realm: impl Into<String>) -> Self
    where
        F: Fn(&BasicCredentials) -> Result<Option<Principal>, AuthenticationError>
            + Send
            + Sync
            + 'static,
    {
        Self::new(FnAuthenticator(authenticate), realm)
    }

    /// Returns the authenticator.
    #[must_use]
    pub fn authenticator(&self) -> &dyn Authenticator {
        self.authenticator.as_ref()
    }

    /// Returns the realm.
    #[must_use]
    pub fn realm(&self) -> &str {
        &self.realm
    }
}

impl fmt::Debug for BasicAuthentication {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicAuthentication")
            .field("realm", &self.realm)
            .finish_non_exhaustive()
    }
}
