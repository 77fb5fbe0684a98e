//! Version resolution and reconciliation
//!
//! For one application the resolver gathers what every source knows (the
//! `current` tag, local versioned tags, a shipped tarball, the registry),
//! chooses a target version, makes sure an image for it exists locally,
//! points `current` at it and runs the migration scripts when the version
//! changed.
//!
//! A target outside the descriptor's upstream version bounds is rejected
//! before any image is pulled, loaded or tagged. For `latest` the bounds can
//! only be checked once the image is local, but still before `current` moves.
//!
//! Retagging and migration are not atomic: an interruption between the two
//! leaves `current` on the new image without the migration having run.

use crate::engine::ContainerEngine;
use crate::error::{ResolveError, Result};
use crate::hooks::UpgradeHookRunner;
use crate::registry::{max_version, RegistryClient};
use crate::store::ImageStore;
use crate::tarball::TarballSource;
use crate::types::{
    ImageCoordinate, LocalImage, ResolutionRequest, ResolutionResult, Target, VersionSource,
};
use camino::Utf8PathBuf;
use kaboxer_core::{AppConfig, ConfigLoader, RuntimeSettings, Version, CURRENT_LABEL};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// The image `current` points at before resolution
#[derive(Debug, Clone)]
pub struct InstalledImage {
    pub image: LocalImage,
    /// `None` when the image carries neither a version file nor a versioned tag
    pub version: Option<Version>,
}

/// Shipped archive matching a tarball origin
#[derive(Debug, Clone)]
pub struct ShippedTarball {
    pub path: Utf8PathBuf,
    pub version: Version,
}

/// Everything known about one application before choosing a target
#[derive(Debug, Clone, Default)]
pub struct GatheredSources {
    pub current: Option<InstalledImage>,
    pub local_max: Option<Version>,
    pub tarball: Option<ShippedTarball>,
    pub registry_max: Option<Version>,
}

impl GatheredSources {
    pub fn current_version(&self) -> Option<&Version> {
        self.current.as_ref().and_then(|c| c.version.as_ref())
    }

    /// Highest version offered by any source other than `current`
    pub fn candidate(&self) -> Option<&Version> {
        [
            self.local_max.as_ref(),
            self.tarball.as_ref().map(|t| &t.version),
            self.registry_max.as_ref(),
        ]
        .into_iter()
        .flatten()
        .max()
    }
}

/// Pick the version that should become current
///
/// # Errors
/// [`ResolveError::MalformedVersion`] for an unparseable pin,
/// [`ResolveError::VersionPinConflict`] when a pin differs from the installed
/// version and upgrading was not requested.
pub fn choose_target(request: &ResolutionRequest, sources: &GatheredSources) -> Result<Target> {
    let installed = sources.current_version();

    if let Some(pin) = &request.pin {
        let pin = Version::parse(pin)
            .map_err(|_| ResolveError::malformed(&request.app, "version pin", pin))?;
        if let Some(installed) = installed {
            if *installed != pin && !request.upgrade {
                return Err(ResolveError::VersionPinConflict {
                    app: request.app.clone(),
                    installed: installed.to_string(),
                    requested: pin.to_string(),
                });
            }
        }
        return Ok(Target::Version(pin));
    }

    let candidate = sources.candidate();
    let target = match installed {
        Some(installed) if request.upgrade => match candidate {
            Some(candidate) if candidate > installed => Some(candidate),
            _ => Some(installed),
        },
        Some(installed) => Some(installed),
        None => candidate,
    };

    Ok(target
        .cloned()
        .map(Target::Version)
        .unwrap_or(Target::Latest))
}

/// Drives resolution for applications described by `*.kaboxer.yaml` files
pub struct VersionResolver {
    store: ImageStore,
    registry: Arc<dyn RegistryClient>,
    tarballs: TarballSource,
    hooks: UpgradeHookRunner,
    configs: ConfigLoader,
}

impl VersionResolver {
    pub fn new(
        engine: Arc<dyn ContainerEngine>,
        registry: Arc<dyn RegistryClient>,
        settings: &RuntimeSettings,
    ) -> Self {
        Self {
            store: ImageStore::new(Arc::clone(&engine)),
            registry,
            tarballs: TarballSource::new(settings.tarball_paths.clone()),
            hooks: UpgradeHookRunner::new(engine),
            configs: ConfigLoader::new(settings.config_paths.clone()),
        }
    }

    pub fn store(&self) -> &ImageStore {
        &self.store
    }

    pub fn configs(&self) -> &ConfigLoader {
        &self.configs
    }

    pub fn tarballs(&self) -> &TarballSource {
        &self.tarballs
    }

    pub fn registry(&self) -> &Arc<dyn RegistryClient> {
        &self.registry
    }

    /// Resolve each request in turn
    ///
    /// A failure is logged and does not stop the remaining requests.
    pub async fn resolve_all(
        &self,
        requests: &[ResolutionRequest],
    ) -> Vec<Result<ResolutionResult>> {
        let mut results = Vec::with_capacity(requests.len());
        for request in requests {
            let result = self.resolve_app(request).await;
            if let Err(e) = &result {
                error!("{}: {}", request.app, e);
            }
            results.push(result);
        }
        results
    }

    /// Load the descriptor for `request.app`, then [`resolve`](Self::resolve)
    pub async fn resolve_app(&self, request: &ResolutionRequest) -> Result<ResolutionResult> {
        let loaded = self.configs.load(&request.app)?;
        self.resolve(request, &loaded.config).await
    }

    /// Resolve one application
    pub async fn resolve(
        &self,
        request: &ResolutionRequest,
        config: &AppConfig,
    ) -> Result<ResolutionResult> {
        let app = request.app.as_str();
        info!("Preparing {}", app);

        let sources = self.gather(app, config).await?;
        debug!(
            "{}: current={:?} local={:?} tarball={:?} registry={:?}",
            app,
            sources.current_version().map(Version::as_str),
            sources.local_max.as_ref().map(Version::as_str),
            sources.tarball.as_ref().map(|t| t.version.as_str()),
            sources.registry_max.as_ref().map(Version::as_str),
        );

        let previous = sources.current_version().cloned();
        let target = choose_target(request, &sources)?;
        info!("{}: target version {}", app, target);

        if let (Target::Version(version), Some(previous)) = (&target, &previous) {
            if version == previous {
                debug!("{} already at {}, nothing to do", app, version);
                return Ok(ResolutionResult {
                    app: app.to_string(),
                    resolved: version.clone(),
                    previous: Some(previous.clone()),
                    source: VersionSource::LocalCurrentTag,
                });
            }
        }

        // reject out-of-bounds targets before touching any image
        if let Target::Version(version) = &target {
            config.check_upstream_version(version)?;
        }

        let (image, source) = self.ensure_image(app, config, &target, &sources).await?;
        let resolved = match &target {
            Target::Version(version) => version.clone(),
            Target::Latest => {
                let version = self.record_latest_version(app, config, &image).await?;
                config.check_upstream_version(&version)?;
                version
            }
        };

        let current_ref = ImageCoordinate::new(config.image_name(), CURRENT_LABEL).to_string();
        self.store.tag(&image, &current_ref).await?;

        if let Some(installed) = &sources.current {
            self.hooks
                .run_migration(
                    app,
                    &installed.image.id,
                    &image.id,
                    installed.version.as_ref(),
                    &resolved,
                )
                .await?;
        }

        info!("{} is now at version {} (from {})", app, resolved, source);
        Ok(ResolutionResult {
            app: app.to_string(),
            resolved,
            previous,
            source,
        })
    }

    /// Read every source of version information for `config`
    pub async fn gather(&self, app: &str, config: &AppConfig) -> Result<GatheredSources> {
        let image_name = config.image_name();

        let current = match self.store.current(&image_name).await? {
            Some(image) => {
                let version = self.store.image_version(&image_name, &image).await?;
                if version.is_none() {
                    warn!("{}: cannot tell the version of the current image", app);
                }
                Some(InstalledImage { image, version })
            }
            None => None,
        };

        let local_max = self.store.max_version(&image_name).await?;
        let tarball = self.shipped_tarball(app, config)?;

        let registry_max = match (config.registry(), config.registry_image()) {
            (Some(origin), Some(image)) => {
                let tags = self.registry.list_versions(&origin.url, image).await;
                max_version(&tags)
            }
            _ => None,
        };

        Ok(GatheredSources {
            current,
            local_max,
            tarball,
            registry_max,
        })
    }

    fn shipped_tarball(&self, app: &str, config: &AppConfig) -> Result<Option<ShippedTarball>> {
        let Some(file_name) = config.tarball() else {
            return Ok(None);
        };
        let Some(path) = self.tarballs.locate(file_name) else {
            debug!("{}: tarball {} not found in search paths", app, file_name);
            return Ok(None);
        };

        let raw = match TarballSource::meta_file(&path, "version") {
            Ok(raw) => raw.trim().to_string(),
            Err(e) => {
                warn!("{}: cannot read version from {}: {}", app, path, e);
                return Ok(None);
            }
        };
        let version =
            Version::parse(&raw).map_err(|_| ResolveError::malformed(app, path.as_str(), &raw))?;
        Ok(Some(ShippedTarball { path, version }))
    }

    /// Make an image for `target` available locally
    ///
    /// An exact local `image:target` tag is used as is. Otherwise, as a
    /// policy choice, a registry origin takes precedence over a tarball
    /// origin and a failed pull does not fall back to the tarball. A tarball
    /// origin only supplies the target when the version recorded in its
    /// `/kaboxer/version` equals it, so a pin for another version is never
    /// satisfied by relabelling the shipped image. `<app-id>.tar` in the
    /// tarball search path is the last resort.
    async fn ensure_image(
        &self,
        app: &str,
        config: &AppConfig,
        target: &Target,
        sources: &GatheredSources,
    ) -> Result<(LocalImage, VersionSource)> {
        let target_ref = ImageCoordinate::new(config.image_name(), target.tag()).to_string();

        if let Some(image) = self.store.find_exact(&target_ref).await? {
            debug!("{} already present locally", target_ref);
            return Ok((image, VersionSource::LocalVersionedTag));
        }

        if config.registry().is_some() {
            info!("Pulling {} image from registry", target_ref);
            let image = self
                .store
                .engine()
                .pull(&target_ref)
                .await
                .map_err(|e| ResolveError::PullFailure {
                    app: app.to_string(),
                    image: target_ref.clone(),
                    reason: format!("{:#}", e),
                })?;
            return Ok((image, VersionSource::RemoteRegistry));
        }

        if let Some(tarball) = &sources.tarball {
            if target.version() == Some(&tarball.version) {
                let image = self.load_and_tag(&tarball.path, &target_ref).await?;
                return Ok((image, VersionSource::LocalTarball));
            }
            debug!(
                "{}: {} ships version {}, not {}",
                app, tarball.path, tarball.version, target
            );
        }

        if let Some(path) = self.tarballs.locate(&format!("{}.tar", config.app_id())) {
            let image = self.load_and_tag(&path, &target_ref).await?;
            return Ok((image, VersionSource::LocalTarball));
        }

        Err(ResolveError::no_source(app, target.tag()))
    }

    async fn load_and_tag(&self, path: &Utf8PathBuf, target_ref: &str) -> Result<LocalImage> {
        info!("Loading image from {}", path);
        let mut image = self
            .store
            .engine()
            .load(path.as_std_path())
            .await?
            .pop()
            .ok_or_else(|| ResolveError::invalid_archive(path.as_str(), "no image loaded"))?;
        self.store.tag(&image, target_ref).await?;
        image.tags.push(target_ref.to_string());
        Ok(image)
    }

    /// Read the version of an image obtained as `latest` and tag it with it
    async fn record_latest_version(
        &self,
        app: &str,
        config: &AppConfig,
        image: &LocalImage,
    ) -> Result<Version> {
        let raw = self
            .store
            .meta_file(&image.id, "version")
            .await?
            .ok_or_else(|| ResolveError::malformed(app, "/kaboxer/version", ""))?;
        let version = Version::parse(&raw)
            .map_err(|_| ResolveError::malformed(app, "/kaboxer/version", &raw))?;

        let versioned = ImageCoordinate::new(config.image_name(), version.as_str()).to_string();
        if self.store.find_exact(&versioned).await?.is_none() {
            self.store.tag(image, &versioned).await?;
        }
        Ok(version)
    }
}
