//! Installed, available and upgradeable applications

use crate::error::Result;
use crate::registry::max_version;
use crate::resolver::VersionResolver;
use crate::store::ImageStore;
use crate::tarball::TarballSource;
use crate::types::ImageCoordinate;
use kaboxer_core::{AppConfig, Version, CURRENT_LABEL};
use tracing::{debug, warn};

/// What is known about one configured application
#[derive(Debug, Clone, Default)]
pub struct AppStatus {
    pub app: String,
    /// Version of the image tagged `current`
    pub installed: Option<Version>,
    pub packaging_revision_image: Option<String>,
    pub packaging_revision_config: Option<String>,
    /// Highest locally tagged version
    pub local_max: Option<Version>,
    /// Version shipped in the tarball origin
    pub tarball: Option<Version>,
    pub has_registry: bool,
    /// Raw registry tags (empty unless remotes were queried)
    pub registry_versions: Vec<String>,
    pub registry_max: Option<Version>,
}

impl AppStatus {
    /// Highest version available from the registry or local tags
    pub fn available(&self) -> Option<&Version> {
        self.registry_max.as_ref().max(self.local_max.as_ref())
    }

    /// Version an upgrade would move to, if newer than the installed one
    ///
    /// The registry is authoritative when configured, the tarball otherwise.
    pub fn upgradeable(&self) -> Option<&Version> {
        let installed = self.installed.as_ref()?;
        let offered = if self.has_registry {
            self.registry_max.as_ref()
        } else {
            self.tarball.as_ref()
        }?;
        (offered > installed).then_some(offered)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Inventory {
    apps: Vec<AppStatus>,
}

impl Inventory {
    /// Inspect every discovered application (or only `restrict`)
    ///
    /// Registries are queried only with `with_remotes`. Problems with a
    /// single application are logged and leave its fields empty.
    pub async fn collect(
        resolver: &VersionResolver,
        restrict: Option<&[String]>,
        with_remotes: bool,
    ) -> Result<Self> {
        let mut apps = Vec::new();
        for loaded in resolver.configs().discover(restrict)? {
            let status = match status_for(resolver, &loaded.config, with_remotes).await {
                Ok(status) => status,
                Err(e) => {
                    warn!("{}: {}", loaded.app_id(), e);
                    AppStatus {
                        app: loaded.app_id().to_string(),
                        packaging_revision_config: loaded.config.packaging.revision.clone(),
                        ..Default::default()
                    }
                }
            };
            apps.push(status);
        }
        Ok(Self { apps })
    }

    pub fn from_statuses(apps: Vec<AppStatus>) -> Self {
        Self { apps }
    }

    pub fn all(&self) -> &[AppStatus] {
        &self.apps
    }

    pub fn installed(&self) -> impl Iterator<Item = &AppStatus> {
        self.apps.iter().filter(|a| a.installed.is_some())
    }

    pub fn available(&self) -> impl Iterator<Item = &AppStatus> {
        self.apps.iter().filter(|a| a.available().is_some())
    }

    pub fn upgradeable(&self) -> impl Iterator<Item = &AppStatus> {
        self.apps.iter().filter(|a| a.upgradeable().is_some())
    }
}

async fn status_for(
    resolver: &VersionResolver,
    config: &AppConfig,
    with_remotes: bool,
) -> Result<AppStatus> {
    let app = config.app_id();
    let image_name = config.image_name();
    let store: &ImageStore = resolver.store();

    let mut status = AppStatus {
        app: app.to_string(),
        packaging_revision_config: config.packaging.revision.clone(),
        has_registry: config.registry().is_some(),
        ..Default::default()
    };

    if let Some(current) = store.current(&image_name).await? {
        status.installed = store.image_version(&image_name, &current).await?;
        let reference = ImageCoordinate::new(&image_name, CURRENT_LABEL).to_string();
        status.packaging_revision_image = store.meta_file(&reference, "packaging-revision").await?;
    }
    status.local_max = store.max_version(&image_name).await?;

    if let Some(file_name) = config.tarball() {
        if let Some(path) = resolver.tarballs().locate(file_name) {
            match TarballSource::meta_file(&path, "version") {
                Ok(raw) => status.tarball = Version::parse(raw.trim()).ok(),
                Err(e) => debug!("{}: {}", app, e),
            }
        }
    }

    if with_remotes {
        if let (Some(origin), Some(image)) = (config.registry(), config.registry_image()) {
            status.registry_versions = resolver.registry().list_versions(&origin.url, image).await;
            status.registry_max = max_version(&status.registry_versions);
            debug!("{}: maximal registry version {:?}", app, status.registry_max);
        }
    }

    Ok(status)
}
