//! Container image management for Kaboxer
//!
//! This crate provides functionality for:
//! - Listing published versions from OCI, Docker Hub and GitLab registries
//! - Reading metadata out of shipped image archives
//! - Deciding which version of an application should be current, fetching
//!   it and running upgrade migration scripts
//!
//! # Example
//!
//! ```no_run
//! use kaboxer_core::RuntimeSettings;
//! use kaboxer_image::{DockerEngine, OriginRegistry, RegistryHttp, ResolutionRequest, VersionResolver};
//! use std::sync::Arc;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = RuntimeSettings::load()?;
//!     let engine = Arc::new(DockerEngine::connect(&settings.docker_binary).await?);
//!     let registry = Arc::new(OriginRegistry::new(RegistryHttp::new(&settings.user_agent)?));
//!
//!     let resolver = VersionResolver::new(engine, registry, &settings);
//!     let result = resolver.resolve_app(&"kbx-demo".parse()?).await?;
//!
//!     println!("kbx-demo is at {}", result.resolved);
//!     Ok(())
//! }
//! ```

pub mod docker;
pub mod engine;
pub mod error;
pub mod hooks;
pub mod inventory;
pub mod manage;
pub mod registry;
pub mod resolver;
pub mod store;
pub mod tarball;
pub mod types;

// Re-export main types for convenience
pub use docker::DockerEngine;
pub use engine::ContainerEngine;
pub use error::{ResolveError, Result};
pub use hooks::UpgradeHookRunner;
pub use inventory::{AppStatus, Inventory};
pub use manage::ImageManager;
pub use registry::{
    DockerHubRegistry, GitLabRegistry, OciRegistry, OriginRegistry, Registry, RegistryClient,
    RegistryHttp,
};
pub use resolver::{choose_target, GatheredSources, VersionResolver};
pub use store::ImageStore;
pub use tarball::TarballSource;
pub use types::{
    ContainerExit, ContainerSpec, HookPhase, ImageCoordinate, InvalidRequest, LocalImage, Mount,
    ResolutionRequest, ResolutionResult, Target, VersionSource,
};
