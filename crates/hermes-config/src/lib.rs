//! Typed configuration for Hermes.
//!
//! Configuration is layered, later layers overriding earlier ones:
//! defaults, then a TOML or JSON file, then `PREFIX__SECTION__KEY`
//! environment variables (optionally read from a `.env` file). Unknown fields
//! are rejected.
//!
//! - [`ServerConfig`] - Where endpoints are mounted and published
//! - [`AuthConfig`] - Realm used in authentication challenges
//! - [`TelemetryConfig`](hermes_telemetry::TelemetryConfig) - Logging and metrics export
//!
//! # Example
//!
//! ```no_run
//! use hermes_config::ConfigLoader;
//!
//! # fn main() -> Result<(), hermes_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_file("hermes.toml")?
//!     .with_env_prefix("HERMES")
//!     .load()?;
//!
//! println!("Endpoints mounted under {}", config.server.default_path);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration File Format
//!
//! ```toml
//! [server]
//! default_path = "/soap"
//! published_endpoint_url_prefix = "https://api.example.com/soap"
//!
//! [auth]
//! realm = "billing"
//!
//! [telemetry]
//! service_name = "billing-service"
//!
//! [telemetry.metrics]
//! enabled = true
//! addr = "0.0.0.0:9090"
//!
//! [telemetry.logging]
//! level = "info"
//! json_format = true
//! ```

#![warn(missing_docs)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::{HermesConfig, HermesConfigBuilder};
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::{AuthConfig, ServerConfig, DEFAULT_PATH, DEFAULT_REALM};
