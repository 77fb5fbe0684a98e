//! Purge, load and metadata operations on an application's images

use crate::error::{ResolveError, Result};
use crate::store::ImageStore;
use crate::tarball::TarballSource;
use crate::types::{ImageCoordinate, LocalImage};
use camino::Utf8Path;
use kaboxer_core::config::LOCAL_IMAGE_NAMESPACE;
use kaboxer_core::{ConfigLoader, Version, CURRENT_LABEL};
use tracing::{debug, info};

pub struct ImageManager {
    store: ImageStore,
    configs: ConfigLoader,
}

impl ImageManager {
    pub fn new(store: ImageStore, configs: ConfigLoader) -> Self {
        Self { store, configs }
    }

    /// Image repository for `app`, falling back to `kaboxer/<app>` without descriptor
    fn image_name(&self, app: &str) -> String {
        match self.configs.load(app) {
            Ok(loaded) => loaded.config.image_name(),
            Err(e) => {
                debug!("{}: {}, using local image name", app, e);
                format!("{}/{}", LOCAL_IMAGE_NAMESPACE, app)
            }
        }
    }

    /// Remove `current`, the highest versioned tag and the bare image name
    ///
    /// Missing names are skipped. Returns the names actually removed.
    pub async fn purge(&self, app: &str, prune: bool) -> Result<Vec<String>> {
        let image_name = self.image_name(app);
        let mut names = vec![ImageCoordinate::new(&image_name, CURRENT_LABEL).to_string()];
        if let Some(max) = self.store.max_version(&image_name).await? {
            names.push(ImageCoordinate::new(&image_name, max.as_str()).to_string());
        }
        names.push(image_name);

        let mut removed = Vec::new();
        for name in names {
            if self.store.remove_image(&name).await? {
                info!("Removed {}", name);
                removed.push(name);
            }
        }

        if prune {
            debug!("Pruning dangling images");
            self.store.engine().prune_dangling().await?;
        }
        Ok(removed)
    }

    /// Load `tarball` and tag it `kaboxer/<app>:<version>` using the
    /// version recorded inside the archive
    pub async fn load(&self, app: &str, tarball: &Utf8Path) -> Result<Version> {
        let raw = TarballSource::meta_file(tarball, "version")?;
        let raw = raw.trim();
        let version =
            Version::parse(raw).map_err(|_| ResolveError::malformed(app, tarball.as_str(), raw))?;
        info!("Loading {} at version {}", app, version);

        let images: Vec<LocalImage> = self.store.engine().load(tarball.as_std_path()).await?;
        if images.is_empty() {
            return Err(ResolveError::invalid_archive(tarball.as_str(), "no image loaded"));
        }
        let target = format!("{}/{}:{}", LOCAL_IMAGE_NAMESPACE, app, version);
        for image in &images {
            self.store.tag(image, &target).await?;
        }
        Ok(version)
    }

    /// Contents of `/kaboxer/<name>` in the application's current image
    pub async fn meta_file(&self, app: &str, name: &str) -> Result<String> {
        let current = ImageCoordinate::new(self.image_name(app), CURRENT_LABEL).to_string();
        self.store
            .meta_file(&current, name)
            .await?
            .ok_or_else(|| ResolveError::MetaFileNotFound {
                path: format!("/kaboxer/{}", name),
                archive: current,
            })
    }
}
