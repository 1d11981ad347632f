//! Authentication error types.

use hermes_core::BoxError;
use thiserror::Error;

/// Errors raised by authenticators and gate setup.
///
/// Wrong credentials are not an error: an authenticator reports them by
/// resolving no principal.
#[derive(Debug, Error)]
pub enum AuthenticationError {
    /// The credential store could not be consulted.
    #[error("Authentication backend unavailable: {message}")]
    Unavailable {
        /// Human-readable error message.
        message: String,
        /// Underlying failure, if any.
        #[source]
        source: Option<BoxError>,
    },

    /// The realm cannot be sent in a challenge header.
    #[error("Invalid realm {realm:?}: not a valid header value")]
    InvalidRealm {
        /// The rejected realm.
        realm: String,
    },
}

impl AuthenticationError {
    /// Creates an unavailable-backend error.
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an unavailable-backend error with its cause.
    pub fn unavailable_with(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Unavailable {
            message: message.into(),
            source: Some(source.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_display() {
        assert_eq!(
            AuthenticationError::unavailable("ldap down").to_string(),
            "Authentication backend unavailable: ldap down"
        );
        let err = AuthenticationError::InvalidRealm {
            realm: "a\nb".to_string(),
        };
        assert!(err.to_string().contains("Invalid realm"));
    }

    #[test]
    fn test_source_is_kept() {
        let err = AuthenticationError::unavailable_with(
            "lookup failed",
            std::io::Error::other("timeout"),
        );
        assert_eq!(err.source().unwrap().to_string(), "timeout");
        assert!(AuthenticationError::unavailable("x").source().is_none());
    }
}
