//! Endpoint publishing options.

use hermes_auth::BasicAuthentication;
use hermes_core::{Interceptor, ServiceDescriptor, SessionFactory};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Transport prefix of in-process endpoints; such paths are kept verbatim.
pub const LOCAL_TRANSPORT_PREFIX: &str = "local:";

/// Describes one endpoint to publish.
///
/// # Example
///
/// ```
/// use hermes_core::fixtures;
/// use hermes_server::EndpointBuilder;
///
/// let (_, descriptor) = fixtures::person_service().unwrap();
///
/// assert_eq!(EndpointBuilder::new("people", descriptor.clone()).path(), "/people");
/// assert_eq!(EndpointBuilder::new("local://people", descriptor).path(), "local://people");
/// ```
#[derive(Clone)]
pub struct EndpointBuilder {
    path: String,
    descriptor: Arc<ServiceDescriptor>,
    session_factory: Option<Arc<dyn SessionFactory>>,
    authentication: Option<BasicAuthentication>,
    interceptors: Vec<Arc<dyn Interceptor>>,
    published_endpoint_url: Option<String>,
    properties: HashMap<String, String>,
}

impl EndpointBuilder {
    /// Starts describing an endpoint serving `descriptor` at `path`.
    ///
    /// A leading `/` is added unless the path uses the local transport.
    /// Blank paths are refused when the endpoint is published.
    pub fn new(path: impl Into<String>, descriptor: Arc<ServiceDescriptor>) -> Self {
        let path = path.into();
        let keep = path.trim().is_empty()
            || path.starts_with(LOCAL_TRANSPORT_PREFIX)
            || path.starts_with('/');
        let path = if keep {
            path
        } else {
            format!("/{path}")
        };
        Self {
            path,
            descriptor,
            session_factory: None,
            authentication: None,
            interceptors: Vec::new(),
            published_endpoint_url: None,
            properties: HashMap::new(),
        }
    }

    /// Runs unit-of-work methods in sessions opened by `factory`.
    #[must_use]
    pub fn session_factory(mut self, factory: Arc<dyn SessionFactory>) -> Self {
        self.session_factory = Some(factory);
        self
    }

    /// Requires callers to authenticate.
    #[must_use]
    pub fn authentication(mut self, authentication: BasicAuthentication) -> Self {
        self.authentication = Some(authentication);
        self
    }

    /// Adds an inbound interceptor. Interceptors run in insertion order,
    /// after authentication.
    #[must_use]
    pub fn interceptor(self, interceptor: impl Interceptor + 'static) -> Self {
        self.interceptor_arc(Arc::new(interceptor))
    }

    /// Adds a shared inbound interceptor.
    #[must_use]
    pub fn interceptor_arc(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    /// Sets the externally visible address, overriding the environment's
    /// URL prefix.
    #[must_use]
    pub fn published_endpoint_url(mut self, url: impl Into<String>) -> Self {
        self.published_endpoint_url = Some(url.into());
        self
    }

    /// Attaches an endpoint property.
    #[must_use]
    pub fn property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Attaches several endpoint properties.
    #[must_use]
    pub fn properties<I, K, V>(mut self, properties: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.properties
            .extend(properties.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Returns the normalized path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    pub(crate) fn into_parts(self) -> EndpointParts {
        EndpointParts {
            path: self.path,
            descriptor: self.descriptor,
            session_factory: self.session_factory,
            authentication: self.authentication,
            interceptors: self.interceptors,
            published_endpoint_url: self.published_endpoint_url,
            properties: self.properties,
        }
    }
}

impl fmt::Debug for EndpointBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointBuilder")
            .field("path", &self.path)
            .field("service", &self.descriptor.type_name())
            .field("session_factory", &self.session_factory.is_some())
            .field("authentication", &self.authentication)
            .field("interceptors", &self.interceptors.len())
            .field("published_endpoint_url", &self.published_endpoint_url)
            .field("properties", &self.properties)
            .finish()
    }
}

pub(crate) struct EndpointParts {
    pub(crate) path: String,
    pub(crate) descriptor: Arc<ServiceDescriptor>,
    pub(crate) session_factory: Option<Arc<dyn SessionFactory>>,
    pub(crate) authentication: Option<BasicAuthentication>,
    pub(crate) interceptors: Vec<Arc<dyn Interceptor>>,
    pub(crate) published_endpoint_url: Option<String>,
    pub(crate) properties: HashMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use hermes_core::fixtures;

    #[test]
    fn test_path_normalization() {
        let (_, descriptor) = fixtures::person_service().unwrap();
        for (given, expected) in [
            ("people", "/people"),
            ("/people", "/people"),
            ("local://people", "local://people"),
            ("", ""),
        ] {
            assert_eq!(EndpointBuilder::new(given, Arc::clone(&descriptor)).path(), expected);
        }
    }

    #[test]
    fn test_properties_accumulate() {
        let (_, descriptor) = fixtures::person_service().unwrap();
        let parts = EndpointBuilder::new("people", descriptor)
            .property("schema-validation-enabled", "true")
            .properties([("a", "1"), ("b", "2")])
            .property("a", "3")
            .into_parts();

        assert_eq!(parts.properties.len(), 3);
        assert_eq!(parts.properties["a"], "3");
    }
}
