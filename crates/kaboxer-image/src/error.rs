//! Error types for kaboxer-image

use crate::types::HookPhase;
use thiserror::Error;

/// Result type alias using kaboxer-image's error type
pub type Result<T> = std::result::Result<T, ResolveError>;

/// Failures that abort the resolution of one application
#[derive(Error, Debug)]
pub enum ResolveError {
    /// A version string that could not be parsed
    #[error("{app}: malformed version {version:?} (from {origin})")]
    MalformedVersion {
        app: String,
        version: String,
        origin: String,
    },

    /// An explicit pin disagrees with the installed version and upgrading was not requested
    #[error("{app} is at version {installed}, can't run {app}={requested}")]
    VersionPinConflict {
        app: String,
        installed: String,
        requested: String,
    },

    /// Nothing local, remote or shipped can supply the target image
    #[error("{app}: cannot prepare image for version {version}, no local image, registry or tarball provides it")]
    NoSourceForImage { app: String, version: String },

    /// An explicitly requested pull failed
    #[error("{app}: could not pull {image}, wrong URL? ({reason})")]
    PullFailure {
        app: String,
        image: String,
        reason: String,
    },

    /// A migration script exists but did not succeed
    #[error("{app}: {phase} script failed in {image} with exit code {code}")]
    MigrationScriptFailure {
        app: String,
        phase: HookPhase,
        image: String,
        code: i64,
    },

    /// The requested file is in none of the archive's layers
    #[error("{path} not found in {archive}")]
    MetaFileNotFound { path: String, archive: String },

    /// The archive is not a readable image export
    #[error("{archive} is not a valid image archive: {message}")]
    InvalidArchive { archive: String, message: String },

    /// Descriptor or version error from kaboxer-core
    #[error(transparent)]
    Config(#[from] kaboxer_core::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Any other container engine failure
    #[error(transparent)]
    Engine(#[from] anyhow::Error),
}

impl ResolveError {
    /// Attach application and origin context to a version parse failure
    pub fn malformed(app: &str, origin: &str, version: &str) -> Self {
        Self::MalformedVersion {
            app: app.to_string(),
            version: version.to_string(),
            origin: origin.to_string(),
        }
    }

    pub fn no_source(app: &str, version: impl Into<String>) -> Self {
        Self::NoSourceForImage {
            app: app.to_string(),
            version: version.into(),
        }
    }

    pub fn invalid_archive(archive: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidArchive {
            archive: archive.into(),
            message: message.into(),
        }
    }
}
