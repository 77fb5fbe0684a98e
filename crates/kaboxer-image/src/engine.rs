//! Container engine capability
//!
//! Everything that touches the local image namespace or runs containers goes
//! through [`ContainerEngine`]. Callers receive an already connected engine;
//! nothing in this crate opens a connection on its own.

use crate::types::{ContainerExit, ContainerSpec, LocalImage};
use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;

#[async_trait]
pub trait ContainerEngine: Send + Sync {
    /// Every local image with its tags
    async fn list_images(&self) -> Result<Vec<LocalImage>>;

    /// Add tag `target` (`repo:tag`) to the image identified by `source`
    /// (an id or an existing name)
    async fn tag(&self, source: &str, target: &str) -> Result<()>;

    /// Remove an image name; `Ok(false)` when no such name exists
    async fn remove_image(&self, name: &str) -> Result<bool>;

    /// Pull `reference` from its registry
    async fn pull(&self, reference: &str) -> Result<LocalImage>;

    /// Load an image archive, returning the loaded images
    async fn load(&self, archive: &Path) -> Result<Vec<LocalImage>>;

    /// Contents of `path` inside `image`, or `None` if the file is absent
    async fn read_file(&self, image: &str, path: &str) -> Result<Option<String>>;

    /// Create, start, await, stop and remove a container.
    ///
    /// The container is removed on every path, including failures.
    async fn run_ephemeral(&self, spec: &ContainerSpec) -> Result<ContainerExit>;

    /// Remove dangling images
    async fn prune_dangling(&self) -> Result<()>;
}
