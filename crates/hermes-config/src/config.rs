//! Main configuration types.
//!
//! This module provides the top-level [`HermesConfig`] struct and its builder.

use hermes_telemetry::{LogConfig, TelemetryConfig};
use serde::{Deserialize, Serialize};

use crate::{AuthConfig, ConfigError, ServerConfig};

/// Complete Hermes configuration.
///
/// Use [`ConfigLoader`](crate::ConfigLoader) to load it from files and
/// environment variables.
///
/// # Example
///
/// ```
/// use hermes_config::HermesConfig;
///
/// let config = HermesConfig::default();
/// assert_eq!(config.server.default_path, "/soap");
/// assert_eq!(config.auth.realm, "hermes");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct HermesConfig {
    /// Endpoint publishing configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Authentication configuration.
    #[serde(default)]
    pub auth: AuthConfig,

    /// Telemetry configuration (metrics, logging).
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl HermesConfig {
    /// Create a new configuration builder.
    #[must_use]
    pub fn builder() -> HermesConfigBuilder {
        HermesConfigBuilder::new()
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - The default path is empty or relative
    /// - The published URL prefix is not an absolute URL
    /// - The realm is empty or cannot be sent in a header
    /// - Metrics are enabled with an unparsable address
    /// - The log level is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        let path = self.server.default_path.trim_end_matches("/*");
        if path.is_empty() || !path.starts_with('/') {
            return Err(ConfigError::invalid(
                "server.default_path",
                format!("must be an absolute path: {:?}", self.server.default_path),
            ));
        }

        if let Some(prefix) = &self.server.published_endpoint_url_prefix {
            if !prefix.contains("://") {
                return Err(ConfigError::invalid(
                    "server.published_endpoint_url_prefix",
                    format!("must be an absolute URL: {prefix:?}"),
                ));
            }
        }

        let realm = &self.auth.realm;
        if realm.is_empty() {
            return Err(ConfigError::invalid("auth.realm", "must not be empty"));
        }
        if realm.chars().any(char::is_control) {
            return Err(ConfigError::invalid(
                "auth.realm",
                "must not contain control characters",
            ));
        }

        if self.telemetry.metrics.enabled
            && self
                .telemetry
                .metrics
                .addr
                .parse::<std::net::SocketAddr>()
                .is_err()
        {
            return Err(ConfigError::invalid(
                "telemetry.metrics.addr",
                format!("invalid socket address: {}", self.telemetry.metrics.addr),
            ));
        }

        if self.telemetry.logging.level.trim().is_empty() {
            return Err(ConfigError::invalid(
                "telemetry.logging.level",
                "must not be empty",
            ));
        }

        Ok(())
    }

    /// Local development preset: pretty debug logs, no metrics exporter.
    ///
    /// # Example
    ///
    /// ```
    /// use hermes_config::HermesConfig;
    ///
    /// let config = HermesConfig::development();
    /// assert_eq!(config.telemetry.logging.level, "debug");
    /// assert!(!config.telemetry.metrics.enabled);
    /// ```
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();
        config.telemetry.logging = LogConfig::development();
        config.telemetry.metrics.enabled = false;
        config
    }

    /// Production preset: JSON logs at info level, metrics exported.
    #[must_use]
    pub fn production() -> Self {
        let mut config = Self::default();
        config.telemetry.logging = LogConfig::production();
        config.telemetry.metrics.enabled = true;
        config
    }
}

/// Builder for [`HermesConfig`].
#[derive(Debug, Default)]
pub struct HermesConfigBuilder {
    server: Option<ServerConfig>,
    auth: Option<AuthConfig>,
    telemetry: Option<TelemetryConfig>,
}

impl HermesConfigBuilder {
    /// Create a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the server configuration.
    #[must_use]
    pub fn server(mut self, server: ServerConfig) -> Self {
        self.server = Some(server);
        self
    }

    /// Set the authentication configuration.
    #[must_use]
    pub fn auth(mut self, auth: AuthConfig) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Set the telemetry configuration.
    #[must_use]
    pub fn telemetry(mut self, telemetry: TelemetryConfig) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// Build the configuration. Unset sections use their defaults.
    #[must_use]
    pub fn build(self) -> HermesConfig {
        HermesConfig {
            server: self.server.unwrap_or_default(),
            auth: self.auth.unwrap_or_default(),
            telemetry: self.telemetry.unwrap_or_default(),
        }
    }

    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if validation fails.
    pub fn build_validated(self) -> Result<HermesConfig, ConfigError> {
        let config = self.build();
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(err: ConfigError) -> String {
        match err {
            ConfigError::Invalid { field, .. } => field,
            other => panic!("expected invalid value, got {other:?}"),
        }
    }

    #[test]
    fn test_default_is_valid() {
        HermesConfig::default().validate().unwrap();
        HermesConfig::development().validate().unwrap();
        HermesConfig::production().validate().unwrap();
    }

    #[test]
    fn test_builder_keeps_other_defaults() {
        let config = HermesConfig::builder()
            .auth(AuthConfig {
                realm: "billing".to_string(),
            })
            .build();

        assert_eq!(config.auth.realm, "billing");
        assert_eq!(config.server, ServerConfig::default());
    }

    #[test]
    fn test_wildcard_default_path_is_accepted() {
        let config = HermesConfig::builder()
            .server(ServerConfig {
                default_path: "/services/*".to_string(),
                ..Default::default()
            })
            .build_validated()
            .unwrap();
        assert_eq!(config.server.default_path, "/services/*");
    }

    #[test]
    fn test_invalid_values_name_their_field() {
        let relative = HermesConfig::builder().server(ServerConfig {
            default_path: "soap".to_string(),
            ..Default::default()
        });
        assert_eq!(field(relative.build_validated().unwrap_err()), "server.default_path");

        let prefix = HermesConfig::builder().server(ServerConfig {
            published_endpoint_url_prefix: Some("api.example.com".to_string()),
            ..Default::default()
        });
        assert_eq!(
            field(prefix.build_validated().unwrap_err()),
            "server.published_endpoint_url_prefix"
        );

        for realm in ["", "bad\nrealm"] {
            let auth = HermesConfig::builder().auth(AuthConfig {
                realm: realm.to_string(),
            });
            assert_eq!(field(auth.build_validated().unwrap_err()), "auth.realm");
        }

        let mut config = HermesConfig::production();
        config.telemetry.metrics.addr = "not-an-address".to_string();
        assert_eq!(field(config.validate().unwrap_err()), "telemetry.metrics.addr");

        config.telemetry.metrics.enabled = false;
        config.validate().unwrap();
    }
}
