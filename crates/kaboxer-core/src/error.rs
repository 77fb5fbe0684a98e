//! Error types for kaboxer-core

use thiserror::Error;

/// Result type alias using kaboxer-core's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for Kaboxer
#[derive(Error, Debug)]
pub enum Error {
    /// No descriptor declares the requested application
    #[error("Could not find appropriate config file for {app}")]
    ConfigNotFound { app: String },

    /// Invalid descriptor content
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    YamlParse(#[from] serde_yaml_ng::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A version string that does not follow the dotted-numeric grammar
    #[error("Malformed version: {version:?}")]
    MalformedVersion { version: String },

    /// Upstream version outside of the packaging bounds
    #[error("Unsupported upstream version {version} {relation} {bound}")]
    UnsupportedUpstreamVersion {
        version: String,
        relation: &'static str,
        bound: String,
    },
}

impl Error {
    /// Create a config not found error
    pub fn config_not_found(app: impl Into<String>) -> Self {
        Self::ConfigNotFound { app: app.into() }
    }

    /// Create an invalid config error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create a malformed version error
    pub fn malformed_version(version: impl Into<String>) -> Self {
        Self::MalformedVersion {
            version: version.into(),
        }
    }
}
