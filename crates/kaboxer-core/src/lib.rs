//! # kaboxer-core
//!
//! Core library for Kaboxer providing:
//! - Application descriptor parsing (`*.kaboxer.yaml`) and discovery
//! - Runtime settings with file and environment overrides
//! - Upstream version parsing and ordering

pub mod config;
pub mod error;
pub mod version;

pub use config::{AppConfig, ConfigLoader, LoadedConfig, RuntimeSettings};
pub use error::{Error, Result};
pub use version::{is_reserved_label, Version, CURRENT_LABEL, LATEST_LABEL};
