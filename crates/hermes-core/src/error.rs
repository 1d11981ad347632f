//! Error types for Hermes.
//!
//! [`HermesError`] is the single error type carried through every pipeline
//! layer. Errors raised by a dispatched service method travel inside
//! [`HermesError::Fault`] untouched: no layer wraps, translates or swallows
//! them, so the caller sees the exact error value the method produced.

use crate::method::MethodIdentity;
use crate::validation::ValidationError;
use http::StatusCode;
use serde::{Deserialize, Serialize};
use std::error::Error as StdError;
use thiserror::Error;

/// Boxed error raised by domain code or by a consumed capability.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Result type alias using [`HermesError`].
pub type HermesResult<T> = Result<T, HermesError>;

/// Categories of errors for classification and fault reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Arguments violated declared constraints.
    Validation,
    /// Missing or invalid credentials.
    Authentication,
    /// Startup wiring problem or a call to an unregistered method.
    Configuration,
    /// Arguments did not match the method's declared parameter shape.
    Client,
    /// Commit of a unit of work failed.
    Transaction,
    /// Error raised by the dispatched service method.
    Fault,
}

impl ErrorCategory {
    /// Returns the default HTTP status code for this error category.
    #[must_use]
    pub const fn default_status_code(&self) -> StatusCode {
        match self {
            Self::Validation | Self::Client => StatusCode::BAD_REQUEST,
            Self::Authentication => StatusCode::UNAUTHORIZED,
            Self::Configuration | Self::Transaction | Self::Fault => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Standard error type for Hermes.
///
/// # Example
///
/// ```
/// use hermes_core::{ErrorCategory, HermesError};
///
/// let err = HermesError::fault(std::io::Error::other("disk full"));
/// assert_eq!(err.category(), ErrorCategory::Fault);
/// assert!(err.downcast_fault_ref::<std::io::Error>().is_some());
/// ```
#[derive(Error, Debug)]
pub enum HermesError {
    /// One or more argument constraints were violated.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The call could not be authenticated.
    #[error("Authentication error: {message}")]
    Authentication {
        /// Human-readable error message.
        message: String,
    },

    /// Wiring error detected while publishing an endpoint.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Human-readable error message.
        message: String,
    },

    /// The call targeted a method the service never registered.
    #[error("Method not found: {method}")]
    MethodNotFound {
        /// Identity the transport resolved for the call.
        method: MethodIdentity,
    },

    /// An argument was missing or had the wrong type.
    #[error("Argument {index} is not a {expected}")]
    Argument {
        /// Zero-based argument position.
        index: usize,
        /// Declared parameter type.
        expected: &'static str,
    },

    /// The unit of work could not be committed.
    #[error("Transaction error: {message}")]
    Transaction {
        /// Human-readable error message.
        message: String,
        /// Underlying session error.
        #[source]
        source: Option<BoxError>,
    },

    /// Error raised by the service method, propagated as-is.
    #[error(transparent)]
    Fault(BoxError),
}

impl HermesError {
    /// Wraps a domain error raised by a service method.
    pub fn fault(error: impl Into<BoxError>) -> Self {
        Self::Fault(error.into())
    }

    /// Creates an authentication error.
    #[must_use]
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
        }
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a transaction error with the session error that caused it.
    pub fn transaction(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Transaction {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Returns the error category.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::Validation(_) => ErrorCategory::Validation,
            Self::Authentication { .. } => ErrorCategory::Authentication,
            Self::Configuration { .. } | Self::MethodNotFound { .. } => {
                ErrorCategory::Configuration
            }
            Self::Argument { .. } => ErrorCategory::Client,
            Self::Transaction { .. } => ErrorCategory::Transaction,
            Self::Fault(_) => ErrorCategory::Fault,
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        self.category().default_status_code()
    }

    /// Returns the error as it was thrown.
    ///
    /// For a [`Fault`](Self::Fault) this is the domain error itself, so
    /// matching against it and its cause sees the same shapes the service
    /// method produced.
    #[must_use]
    pub fn thrown(&self) -> &(dyn StdError + 'static) {
        match self {
            Self::Fault(inner) => inner.as_ref(),
            other => other,
        }
    }

    /// Returns the domain error as `E` when this is a fault of that type.
    #[must_use]
    pub fn downcast_fault_ref<E: StdError + 'static>(&self) -> Option<&E> {
        match self {
            Self::Fault(inner) => inner.downcast_ref::<E>(),
            _ => None,
        }
    }

    /// Returns `true` if this error originated in the service method.
    #[must_use]
    pub const fn is_fault(&self) -> bool {
        matches!(self, Self::Fault(_))
    }

    /// Converts this error to a serializable fault envelope.
    #[must_use]
    pub fn to_envelope(&self, call_id: Option<&str>) -> FaultEnvelope {
        FaultEnvelope {
            code: self.error_code().to_string(),
            message: self.to_string(),
            category: self.category(),
            details: self.error_details(),
            call_id: call_id.map(ToString::to_string),
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Authentication { .. } => "AUTHENTICATION_ERROR",
            Self::Configuration { .. } => "CONFIGURATION_ERROR",
            Self::MethodNotFound { .. } => "METHOD_NOT_FOUND",
            Self::Argument { .. } => "INVALID_ARGUMENT",
            Self::Transaction { .. } => "TRANSACTION_ERROR",
            Self::Fault(_) => "SERVICE_FAULT",
        }
    }

    fn error_details(&self) -> Option<serde_json::Value> {
        match self {
            Self::Validation(err) => serde_json::to_value(err.violations()).ok(),
            Self::MethodNotFound { method } => Some(serde_json::json!({
                "method": method.to_string()
            })),
            Self::Argument { index, expected } => Some(serde_json::json!({
                "index": index,
                "expected": expected
            })),
            _ => None,
        }
    }
}

/// Serializable fault body handed to the transport for encoding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaultEnvelope {
    /// Machine-readable error code.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Error category.
    pub category: ErrorCategory,
    /// Additional error details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    /// Call identifier for correlation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::Violation;

    #[derive(Debug, Error)]
    #[error("lookup failed")]
    struct LookupFailed;

    #[test]
    fn test_fault_is_transparent() {
        let err = HermesError::fault(LookupFailed);
        assert_eq!(err.to_string(), "lookup failed");
        assert!(err.is_fault());
        assert!(err.downcast_fault_ref::<LookupFailed>().is_some());
        assert!(err.thrown().is::<LookupFailed>());
    }

    #[test]
    fn test_thrown_for_non_fault_is_self() {
        let err = HermesError::configuration("bad wiring");
        assert!(err.thrown().is::<HermesError>());
        assert!(err.downcast_fault_ref::<LookupFailed>().is_none());
    }

    #[test]
    fn test_categories_and_status_codes() {
        let validation: HermesError =
            ValidationError::new(vec![Violation::new("person.fullName", "may not be empty")])
                .into();
        assert_eq!(validation.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            HermesError::authentication("nope").status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            HermesError::transaction("commit failed", LookupFailed).category(),
            ErrorCategory::Transaction
        );
        assert_eq!(
            HermesError::MethodNotFound {
                method: MethodIdentity::new("missing")
            }
            .status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_transaction_error_keeps_source() {
        let err = HermesError::transaction("commit failed", LookupFailed);
        let source = err.source().map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("lookup failed"));
    }

    #[test]
    fn test_envelope() {
        let err: HermesError =
            ValidationError::new(vec![Violation::new("person.jobTitle", "may not be empty")])
                .into();
        let envelope = err.to_envelope(Some("call-1"));
        assert_eq!(envelope.code, "VALIDATION_ERROR");
        assert_eq!(envelope.category, ErrorCategory::Validation);
        assert!(envelope.details.is_some());

        let json = serde_json::to_string(&envelope).unwrap();
        assert!(json.contains("\"call_id\":\"call-1\""));
        assert!(json.contains("person.jobTitle"));
    }
}
