//! Errors raised while loading or validating a [`HermesConfig`](crate::HermesConfig).

use std::path::PathBuf;
use thiserror::Error;

/// Why a Hermes configuration could not be produced.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// No file at the given path.
    #[error("no Hermes configuration at {}", path.display())]
    MissingFile {
        /// The path that was given.
        path: PathBuf,
    },

    /// The file exists but could not be read.
    #[error("could not read Hermes configuration at {}", path.display())]
    Unreadable {
        /// The path that was given.
        path: PathBuf,
        /// The I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The TOML document does not match the configuration schema.
    #[error("malformed TOML configuration: {0}")]
    Toml(#[from] toml::de::Error),

    /// The JSON document does not match the configuration schema.
    #[error("malformed JSON configuration: {0}")]
    Json(#[from] serde_json::Error),

    /// Neither TOML nor JSON.
    #[error("configuration must be TOML or JSON, got {format}")]
    UnsupportedFormat {
        /// The format name or file path.
        format: String,
    },

    /// A setting failed validation.
    #[error("{field} {reason}")]
    Invalid {
        /// Dotted setting path, e.g. `auth.realm`.
        field: String,
        /// What the setting must satisfy.
        reason: String,
    },

    /// An environment override could not be applied.
    #[error("environment override {var}: {reason}")]
    EnvOverride {
        /// The variable, e.g. `HERMES__TELEMETRY__METRICS__ENABLED`.
        var: String,
        /// What the value must look like.
        reason: String,
    },

    /// A `.env` file exists but is malformed.
    #[error("could not load .env overrides: {0}")]
    Dotenv(#[from] dotenvy::Error),
}

impl ConfigError {
    /// No file at `path`.
    pub fn missing_file(path: impl Into<PathBuf>) -> Self {
        Self::MissingFile { path: path.into() }
    }

    /// Reading `path` failed.
    pub fn unreadable(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Unreadable {
            path: path.into(),
            source,
        }
    }

    /// `format` is not a supported document format.
    pub fn unsupported_format(format: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            format: format.into(),
        }
    }

    /// The setting at `field` is invalid.
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// The override in `var` has a bad value.
    pub fn env_override(var: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::EnvOverride {
            var: var.into(),
            reason: reason.into(),
        }
    }

    /// Returns the top-level section (`server`, `auth` or `telemetry`) the
    /// error concerns, when it concerns a single setting.
    #[must_use]
    pub fn section(&self) -> Option<String> {
        match self {
            Self::Invalid { field, .. } => field.split('.').next().map(str::to_string),
            Self::EnvOverride { var, .. } => var.split("__").nth(1).map(str::to_ascii_lowercase),
            _ => None,
        }
    }
}
