//! Local tagged-image namespace

use crate::engine::ContainerEngine;
use crate::error::{ResolveError, Result};
use crate::tarball::META_DIR;
use crate::types::{ImageCoordinate, LocalImage};
use kaboxer_core::{is_reserved_label, Version, CURRENT_LABEL};
use std::sync::Arc;
use tracing::{debug, info};

/// Query and mutate local image tags through a [`ContainerEngine`]
#[derive(Clone)]
pub struct ImageStore {
    engine: Arc<dyn ContainerEngine>,
}

/// A locally tagged version of a repository
#[derive(Debug, Clone)]
pub struct TaggedVersion {
    pub version: Version,
    pub image: LocalImage,
}

impl ImageStore {
    pub fn new(engine: Arc<dyn ContainerEngine>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &Arc<dyn ContainerEngine> {
        &self.engine
    }

    /// Find an image by exact `repo:tag`, or by repository with the highest
    /// versioned tag
    ///
    /// An exact match wins immediately. Among prefix matches the first image
    /// seen with the maximum version is returned.
    pub async fn find_image(&self, name: &str) -> Result<Option<LocalImage>> {
        let images = self.engine.list_images().await?;
        if let Some(image) = images.iter().find(|i| i.tags.iter().any(|t| t == name)) {
            return Ok(Some(image.clone()));
        }

        let candidates = versioned_tags(&images, name)?;
        Ok(pick_max(candidates).map(|t| t.image))
    }

    /// Image carrying exactly `name`, without version fallback
    pub async fn find_exact(&self, name: &str) -> Result<Option<LocalImage>> {
        let images = self.engine.list_images().await?;
        Ok(images.into_iter().find(|i| i.tags.iter().any(|t| t == name)))
    }

    /// Every versioned tag of `repository`, reserved labels excluded
    pub async fn versions(&self, repository: &str) -> Result<Vec<TaggedVersion>> {
        let images = self.engine.list_images().await?;
        versioned_tags(&images, repository)
    }

    /// Highest locally tagged version of `repository`
    pub async fn max_version(&self, repository: &str) -> Result<Option<Version>> {
        Ok(pick_max(self.versions(repository).await?).map(|t| t.version))
    }

    /// Add `new_name` to `image`
    pub async fn tag(&self, image: &LocalImage, new_name: &str) -> Result<()> {
        info!("Tagging {} as {}", image.tags.first().unwrap_or(&image.id), new_name);
        self.engine.tag(&image.id, new_name).await?;
        Ok(())
    }

    /// Remove `name`; `false` when it did not exist
    pub async fn remove_image(&self, name: &str) -> Result<bool> {
        let removed = self.engine.remove_image(name).await?;
        if removed {
            debug!("Removed {}", name);
        } else {
            debug!("{} not present, nothing to remove", name);
        }
        Ok(removed)
    }

    /// Image tagged `<repository>:current`
    pub async fn current(&self, repository: &str) -> Result<Option<LocalImage>> {
        self.find_exact(&ImageCoordinate::new(repository, CURRENT_LABEL).to_string())
            .await
    }

    /// Contents of `/kaboxer/<name>` inside `image`, trimmed
    pub async fn meta_file(&self, image: &str, name: &str) -> Result<Option<String>> {
        let path = format!("{}/{}", META_DIR, name);
        Ok(self
            .engine
            .read_file(image, &path)
            .await?
            .map(|content| content.trim().to_string()))
    }

    /// Version recorded in the image's `/kaboxer/version`
    ///
    /// Falls back to a versioned tag on the same image when the file is
    /// missing.
    pub async fn image_version(
        &self,
        repository: &str,
        image: &LocalImage,
    ) -> Result<Option<Version>> {
        let reference = image.tags.first().unwrap_or(&image.id);
        if let Some(raw) = self.meta_file(reference, "version").await? {
            let version = Version::parse(&raw)
                .map_err(|_| ResolveError::malformed(repository, reference, &raw))?;
            return Ok(Some(version));
        }

        debug!("{} has no version file, looking at its tags", reference);
        let sibling = versioned_tags(std::slice::from_ref(image), repository)?;
        Ok(pick_max(sibling).map(|t| t.version))
    }
}

fn versioned_tags(images: &[LocalImage], repository: &str) -> Result<Vec<TaggedVersion>> {
    let mut found = Vec::new();
    for image in images {
        for tag in &image.tags {
            let coordinate = ImageCoordinate::parse(tag);
            if coordinate.repository != repository {
                continue;
            }
            let Some(label) = coordinate.tag.as_deref() else {
                continue;
            };
            if is_reserved_label(label) {
                continue;
            }
            let version = Version::parse(label)
                .map_err(|_| ResolveError::malformed(repository, "local tag", label))?;
            found.push(TaggedVersion {
                version,
                image: image.clone(),
            });
        }
    }
    Ok(found)
}

/// Maximum by version, keeping the first seen among equals
fn pick_max(candidates: Vec<TaggedVersion>) -> Option<TaggedVersion> {
    candidates.into_iter().fold(None, |best, candidate| match best {
        Some(b) if b.version >= candidate.version => Some(b),
        _ => Some(candidate),
    })
}
