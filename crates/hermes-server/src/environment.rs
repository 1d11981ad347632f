//! Endpoint registry.

use crate::builder::EndpointBuilder;
use crate::endpoint::Endpoint;
use hermes_auth::AuthenticationGate;
use hermes_config::ServerConfig;
use hermes_core::{ConstraintValidator, HermesError, HermesResult, Interceptor, Validator};
use hermes_middleware::PipelineAssembler;
use hermes_telemetry::MetricRegistry;
use parking_lot::RwLock;
use std::fmt::{self, Write as _};
use std::sync::Arc;
use tracing::info;

/// Publishes endpoints and keeps track of them.
///
/// Every endpoint shares the environment's metric registry and validator.
///
/// # Example
///
/// ```
/// use hermes_core::fixtures;
/// use hermes_server::{EndpointBuilder, Environment};
///
/// let environment = Environment::new("/soap/*")
///     .with_published_endpoint_url_prefix("https://api.example.com/soap");
/// let (_, descriptor) = fixtures::person_service().unwrap();
///
/// let endpoint = environment
///     .publish_endpoint(EndpointBuilder::new("people", descriptor))
///     .unwrap();
///
/// assert_eq!(environment.default_path(), "/soap");
/// assert_eq!(endpoint.published_url(), Some("https://api.example.com/soap/people"));
/// ```
pub struct Environment {
    default_path: String,
    published_endpoint_url_prefix: Option<String>,
    registry: Arc<MetricRegistry>,
    validator: Arc<dyn Validator>,
    endpoints: RwLock<Vec<Arc<Endpoint>>>,
}

impl Environment {
    /// Creates an environment mounted under `default_path`.
    ///
    /// A `/*` wildcard in the path is dropped.
    #[must_use]
    pub fn new(default_path: impl Into<String>) -> Self {
        Self {
            default_path: default_path.into().replace("/*", ""),
            published_endpoint_url_prefix: None,
            registry: Arc::new(MetricRegistry::new()),
            validator: Arc::new(ConstraintValidator),
            endpoints: RwLock::new(Vec::new()),
        }
    }

    /// Creates an environment from the server configuration section.
    #[must_use]
    pub fn from_config(config: &ServerConfig) -> Self {
        let environment = Self::new(config.default_path.as_str());
        match &config.published_endpoint_url_prefix {
            Some(prefix) => environment.with_published_endpoint_url_prefix(prefix.as_str()),
            None => environment,
        }
    }

    /// Sets the prefix used to build published addresses.
    #[must_use]
    pub fn with_published_endpoint_url_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.published_endpoint_url_prefix = Some(prefix.into());
        self
    }

    /// Records metrics into `registry` instead of a private one.
    #[must_use]
    pub fn with_registry(mut self, registry: Arc<MetricRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Replaces the validator.
    #[must_use]
    pub fn with_validator(mut self, validator: Arc<dyn Validator>) -> Self {
        self.validator = validator;
        self
    }

    /// Returns the mount path, without wildcard.
    #[must_use]
    pub fn default_path(&self) -> &str {
        &self.default_path
    }

    /// Returns the metric registry shared by all endpoints.
    #[must_use]
    pub const fn registry(&self) -> &Arc<MetricRegistry> {
        &self.registry
    }

    /// Publishes an endpoint.
    ///
    /// Assembles the pipeline from the service's declared policies and
    /// installs the authentication gate ahead of any other interceptor.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the path is blank or already taken,
    /// or if the authentication realm cannot be sent in a header.
    pub fn publish_endpoint(&self, builder: EndpointBuilder) -> HermesResult<Arc<Endpoint>> {
        let parts = builder.into_parts();
        if parts.path.trim().is_empty() {
            return Err(HermesError::configuration("endpoint path is empty"));
        }

        let mut assembler = PipelineAssembler::new(Arc::clone(&self.registry))
            .with_validator(Arc::clone(&self.validator));
        if let Some(factory) = parts.session_factory {
            assembler = assembler.with_session_factory(factory);
        }
        let service = parts.descriptor.type_name().to_string();
        let pipeline = assembler.assemble(parts.descriptor);

        let mut interceptors: Vec<Arc<dyn Interceptor>> = Vec::new();
        if let Some(authentication) = parts.authentication {
            let gate = AuthenticationGate::new(authentication)
                .map_err(|err| HermesError::configuration(err.to_string()))?;
            interceptors.push(Arc::new(gate));
        }
        interceptors.extend(parts.interceptors);

        let published_url = parts.published_endpoint_url.or_else(|| {
            self.published_endpoint_url_prefix
                .as_ref()
                .map(|prefix| format!("{prefix}{}", parts.path))
        });

        let mut endpoints = self.endpoints.write();
        if endpoints.iter().any(|e| e.path() == parts.path) {
            return Err(HermesError::configuration(format!(
                "an endpoint is already published at {}",
                parts.path
            )));
        }

        let endpoint = Arc::new(Endpoint::new(
            parts.path,
            service,
            published_url,
            pipeline,
            interceptors,
            parts.properties,
        ));
        info!(
            path = endpoint.path(),
            service = endpoint.service(),
            published_url = endpoint.published_url(),
            stages = ?endpoint.pipeline().stage_names(),
            interceptors = ?endpoint.interceptor_names(),
            "Endpoint published"
        );
        endpoints.push(Arc::clone(&endpoint));
        Ok(endpoint)
    }

    /// Returns the endpoint published at `path`.
    #[must_use]
    pub fn endpoint(&self, path: &str) -> Option<Arc<Endpoint>> {
        self.endpoints
            .read()
            .iter()
            .find(|e| e.path() == path)
            .cloned()
    }

    /// Returns all endpoints in publication order.
    #[must_use]
    pub fn endpoints(&self) -> Vec<Arc<Endpoint>> {
        self.endpoints.read().clone()
    }

    /// Logs the published endpoints at info level and returns the listing.
    pub fn log_endpoints(&self) -> String {
        let endpoints = self.endpoints.read();
        if endpoints.is_empty() {
            info!(default_path = %self.default_path, "No service endpoints were registered");
            return String::new();
        }

        let mut listing = String::new();
        for endpoint in endpoints.iter() {
            let _ = writeln!(
                listing,
                "    {}{} ({})",
                self.default_path,
                endpoint.path(),
                endpoint.service()
            );
        }
        info!(
            default_path = %self.default_path,
            count = endpoints.len(),
            "Service endpoints:\n\n{listing}"
        );
        listing
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("default_path", &self.default_path)
            .field(
                "published_endpoint_url_prefix",
                &self.published_endpoint_url_prefix,
            )
            .field("endpoints", &self.endpoints.read().len())
            .finish_non_exhaustive()
    }
}
