//! The authentication interceptor.

use crate::authenticator::BasicAuthentication;
use crate::credentials::BasicCredentials;
use crate::error::AuthenticationError;
use hermes_core::{InboundCall, Interceptor, InterceptorOutcome, Rejection};
use http::header::{HeaderValue, WWW_AUTHENTICATE};
use http::StatusCode;
use tracing::{debug, error, warn};

/// Interceptor that refuses calls without valid credentials.
///
/// On success the resolved principal is stored in the call's exchange, where
/// service methods read it through the invocation context.
#[derive(Debug, Clone)]
pub struct AuthenticationGate {
    authentication: BasicAuthentication,
    challenge: HeaderValue,
}

impl AuthenticationGate {
    /// Creates the gate.
    ///
    /// # Errors
    ///
    /// Returns [`AuthenticationError::InvalidRealm`] if the realm cannot be
    /// sent in a `WWW-Authenticate` header.
    pub fn new(authentication: BasicAuthentication) -> Result<Self, AuthenticationError> {
        let challenge = HeaderValue::from_str(&format!("Basic realm={}", authentication.realm()))
            .map_err(|_| AuthenticationError::InvalidRealm {
                realm: authentication.realm().to_string(),
            })?;
        Ok(Self {
            authentication,
            challenge,
        })
    }

    /// Returns the authentication settings.
    #[must_use]
    pub const fn authentication(&self) -> &BasicAuthentication {
        &self.authentication
    }

    fn reject(&self, status: StatusCode, reason: &str) -> InterceptorOutcome {
        InterceptorOutcome::Abort(
            Rejection::new(status, reason).with_header(WWW_AUTHENTICATE, self.challenge.clone()),
        )
    }
}

impl Interceptor for AuthenticationGate {
    fn name(&self) -> &'static str {
        "authentication"
    }

    fn intercept(&self, call: &mut InboundCall) -> InterceptorOutcome {
        let Some(credentials) = BasicCredentials::extract(call) else {
            warn!(method = call.method().name(), "Call without credentials refused");
            return self.reject(StatusCode::UNAUTHORIZED, "missing credentials");
        };

        match self.authentication.authenticator().authenticate(&credentials) {
            Ok(Some(principal)) => {
                debug!(
                    method = call.method().name(),
                    principal = principal.name(),
                    "Caller authenticated"
                );
                call.exchange_mut().set_principal(principal);
                InterceptorOutcome::Continue
            }
            Ok(None) => {
                warn!(
                    method = call.method().name(),
                    username = credentials.username(),
                    "Invalid credentials refused"
                );
                self.reject(StatusCode::UNAUTHORIZED, "invalid credentials")
            }
            Err(err) => {
                error!(
                    method = call.method().name(),
                    username = credentials.username(),
                    error = %err,
                    "Authenticator failed"
                );
                self.reject(StatusCode::INTERNAL_SERVER_ERROR, "authenticator failed")
            }
        }
    }
}
