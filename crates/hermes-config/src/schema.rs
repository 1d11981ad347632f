//! Configuration sections.

use serde::{Deserialize, Serialize};

/// Path endpoints are mounted under when none is configured.
pub const DEFAULT_PATH: &str = "/soap";

/// Realm announced in authentication challenges when none is configured.
pub const DEFAULT_REALM: &str = "hermes";

/// Endpoint publishing settings.
///
/// # Example
///
/// ```
/// use hermes_config::ServerConfig;
///
/// let server = ServerConfig::default();
/// assert_eq!(server.default_path, "/soap");
/// assert!(server.published_endpoint_url_prefix.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Path all endpoints are mounted under. A trailing `/*` is accepted.
    pub default_path: String,

    /// Externally visible URL prefix used to build each endpoint's published
    /// address, e.g. `https://api.example.com/soap`.
    pub published_endpoint_url_prefix: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            default_path: DEFAULT_PATH.to_string(),
            published_endpoint_url_prefix: None,
        }
    }
}

/// Authentication settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthConfig {
    /// Realm sent in `WWW-Authenticate` challenges.
    pub realm: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            realm: DEFAULT_REALM.to_string(),
        }
    }
}
