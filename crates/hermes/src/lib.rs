//! # Hermes
//!
//! **Invocation middleware for SOAP-style RPC services**
//!
//! Hermes sits between a message transport and service implementations. For
//! every published endpoint it assembles a chain of decorators from the
//! policies each method declares:
//!
//! - **Validation** - constraint-checks tagged arguments before anything else
//! - **Unit of work** - runs the call inside a session, committing or rolling back
//! - **Timing, call rate, failure rate** - records into a shared metric registry
//! - **Authentication** - resolves the caller from Basic credentials or a username token
//!
//! ## Architecture
//!
//! ```text
//! InboundCall → Authentication → Interceptors → Validation → Transaction
//!                                                                 ↓
//! CallOutcome ← FailureRate ← CallRate ← Timing ← dispatch ←──────┘
//! ```
//!
//! Stages a service never asks for are not installed.
//!
//! ## Quick Start
//!
//! ```
//! use hermes::prelude::*;
//! use hermes::core::fixtures;
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = HermesConfig::development();
//! let environment = hermes::bootstrap(&config)?;
//!
//! let (_, descriptor) = fixtures::person_service()?;
//! let endpoint = environment.publish_endpoint(
//!     EndpointBuilder::new("people", descriptor)
//!         .authentication(hermes::authentication(&config, |c| {
//!             Ok((c.password() == "secret").then(|| Principal::new(c.username())))
//!         })),
//! )?;
//! environment.log_endpoints();
//!
//! let outcome = endpoint.handle(InboundCall::new(MethodIdentity::new("ping"), Vec::new()));
//! assert_eq!(outcome.status().as_u16(), 401);
//! # Ok(())
//! # }
//! ```

#![doc(html_root_url = "https://docs.rs/hermes/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

use anyhow::Context as _;
use hermes_auth::{AuthenticationError, BasicAuthentication, BasicCredentials};
use hermes_config::HermesConfig;
use hermes_core::Principal;
use hermes_server::Environment;

pub use hermes_auth as auth;
pub use hermes_config as config;
pub use hermes_core as core;
pub use hermes_middleware as middleware;
pub use hermes_server as server;
pub use hermes_telemetry as telemetry;

/// Validates `config`, initializes logging and metrics export, and returns
/// an environment ready to publish endpoints.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or telemetry cannot be
/// initialized.
pub fn bootstrap(config: &HermesConfig) -> anyhow::Result<Environment> {
    config.validate().context("invalid Hermes configuration")?;
    hermes_telemetry::init_telemetry(&config.telemetry).context("failed to initialize telemetry")?;

    let environment = Environment::from_config(&config.server);
    tracing::info!(
        default_path = environment.default_path(),
        realm = %config.auth.realm,
        "Hermes environment ready"
    );
    Ok(environment)
}

/// Builds Basic authentication settings using the configured realm.
pub fn authentication<F>(config: &HermesConfig, authenticate: F) -> BasicAuthentication
where
    F: Fn(&BasicCredentials) -> Result<Option<Principal>, AuthenticationError>
        + Send
        + Sync
        + 'static,
{
    BasicAuthentication::from_fn(authenticate, config.auth.realm.as_str())
}

/// Prelude module for convenient imports.
///
/// ```
/// use hermes::prelude::*;
/// ```
pub mod prelude {
    pub use hermes_core::{
        Argument, ErrorMatcher, ExceptionMetered, HermesError, HermesResult, InboundCall,
        InvocationContext, InvokeResult, Metered, MethodIdentity, MethodSpec, Principal,
        ServiceDescriptor, Session, SessionFactory, Timed, TxOptions, Validate, Value, Violations,
    };

    pub use hermes_auth::{
        AuthenticationError, AuthenticationGate, Authenticator, BasicAuthentication,
        BasicCredentials,
    };

    pub use hermes_config::{ConfigLoader, HermesConfig};

    pub use hermes_middleware::{Pipeline, PipelineAssembler, Stage};

    pub use hermes_server::{CallOutcome, Endpoint, EndpointBuilder, Environment};

    pub use hermes_telemetry::MetricRegistry;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiet() -> HermesConfig {
        let mut config = HermesConfig::development();
        config.telemetry.logging.enabled = false;
        config
    }

    #[test]
    fn test_bootstrap_uses_server_section() {
        let mut config = quiet();
        config.server.default_path = "/ws/*".to_string();

        let environment = bootstrap(&config).unwrap();
        assert_eq!(environment.default_path(), "/ws");
    }

    #[test]
    fn test_bootstrap_rejects_invalid_config() {
        let mut config = quiet();
        config.auth.realm = String::new();

        let err = bootstrap(&config).unwrap_err();
        assert_eq!(err.to_string(), "invalid Hermes configuration");
        assert!(format!("{err:#}").contains("auth.realm"));
    }

    #[test]
    fn test_authentication_uses_configured_realm() {
        let mut config = quiet();
        config.auth.realm = "billing".to_string();

        let auth = authentication(&config, |_| Ok(None));
        assert_eq!(auth.realm(), "billing");
    }
}
