//! CLI command implementations

pub mod list;
pub mod load;
pub mod meta;
pub mod prepare;
pub mod purge;

use anyhow::{Context, Result};
use kaboxer_core::{ConfigLoader, RuntimeSettings};
use kaboxer_image::{
    DockerEngine, ImageManager, ImageStore, OriginRegistry, RegistryHttp, VersionResolver,
};
use std::sync::Arc;

/// Settings and container engine shared by every command
pub struct Runtime {
    settings: RuntimeSettings,
    engine: Arc<DockerEngine>,
}

impl Runtime {
    pub async fn connect() -> Result<Self> {
        let settings = RuntimeSettings::load().context("Failed to load runtime settings")?;
        let engine = Arc::new(DockerEngine::connect(&settings.docker_binary).await?);
        Ok(Self { settings, engine })
    }

    pub fn resolver(&self) -> Result<VersionResolver> {
        let http = RegistryHttp::new(&self.settings.user_agent)?;
        Ok(VersionResolver::new(
            self.engine.clone(),
            Arc::new(OriginRegistry::new(http)),
            &self.settings,
        ))
    }

    pub fn manager(&self) -> ImageManager {
        ImageManager::new(
            ImageStore::new(self.engine.clone()),
            ConfigLoader::new(self.settings.config_paths.clone()),
        )
    }
}
