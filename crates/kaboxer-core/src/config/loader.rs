//! Descriptor discovery and loading

use super::types::AppConfig;
use crate::error::{Error, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::collections::HashSet;
use std::fs;
use tracing::{debug, warn};

/// Directories searched for descriptors, in priority order
pub const DEFAULT_CONFIG_PATHS: &[&str] = &[
    ".",
    "/etc/kaboxer",
    "/usr/local/share/kaboxer",
    "/usr/share/kaboxer",
];

/// Generic descriptor file name
const GENERIC_CONFIG_FILE: &str = "kaboxer.yaml";

/// Suffix of per-application descriptor files
const APP_CONFIG_SUFFIX: &str = ".kaboxer.yaml";

/// A descriptor together with the file it was read from
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: AppConfig,
    pub path: Utf8PathBuf,
}

impl LoadedConfig {
    pub fn app_id(&self) -> &str {
        self.config.app_id()
    }
}

/// Finds application descriptors across the configured search directories
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    search_paths: Vec<Utf8PathBuf>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIG_PATHS.iter().map(Utf8PathBuf::from).collect())
    }
}

impl ConfigLoader {
    /// Create a loader over explicit search directories
    pub fn new(search_paths: Vec<Utf8PathBuf>) -> Self {
        Self { search_paths }
    }

    pub fn search_paths(&self) -> &[Utf8PathBuf] {
        &self.search_paths
    }

    /// Read and parse a single descriptor file
    pub fn load_file(path: &Utf8Path) -> Result<LoadedConfig> {
        let content = fs::read_to_string(path)?;
        let config = AppConfig::from_yaml(&content)?;
        Ok(LoadedConfig {
            config,
            path: path.to_owned(),
        })
    }

    /// Load the descriptor declaring `app`
    ///
    /// Each directory is tried with `<app>.kaboxer.yaml` first, then
    /// `kaboxer.yaml`; the first file whose `application.id` matches wins.
    pub fn load(&self, app: &str) -> Result<LoadedConfig> {
        let file_names = [format!("{}{}", app, APP_CONFIG_SUFFIX), GENERIC_CONFIG_FILE.to_string()];

        for dir in &self.search_paths {
            for name in &file_names {
                let path = dir.join(name);
                if !path.is_file() {
                    continue;
                }
                match Self::load_file(&path) {
                    Ok(loaded) if loaded.app_id() == app => {
                        debug!("Using {} for {}", path, app);
                        return Ok(loaded);
                    }
                    Ok(_) => {}
                    Err(e) => warn!("Failed to parse {} as YAML: {}", path, e),
                }
            }
        }

        Err(Error::config_not_found(app))
    }

    /// Collect descriptors found in one directory
    ///
    /// Only `kaboxer.yaml` and `*.kaboxer.yaml` are considered. With
    /// `restrict`, only those application ids are kept; unless
    /// `allow_duplicate` is set, the first descriptor of each id wins.
    pub fn find_configs_in_dir(
        dir: &Utf8Path,
        restrict: Option<&[String]>,
        allow_duplicate: bool,
    ) -> Result<Vec<LoadedConfig>> {
        let mut files = Vec::new();
        let generic = dir.join(GENERIC_CONFIG_FILE);
        if generic.is_file() {
            files.push(generic);
        }

        let entries = match dir.read_dir_utf8() {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut named: Vec<Utf8PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.into_path())
            .filter(|path| {
                path.file_name()
                    .map(|name| name.ends_with(APP_CONFIG_SUFFIX) && name != APP_CONFIG_SUFFIX)
                    .unwrap_or(false)
                    && path.is_file()
            })
            .collect();
        named.sort();
        files.extend(named);

        let mut seen = HashSet::new();
        let mut configs = Vec::new();
        for path in files {
            let loaded = match Self::load_file(&path) {
                Ok(loaded) => loaded,
                Err(e) => {
                    warn!("Skipping {}: {}", path, e);
                    continue;
                }
            };
            if let Some(ids) = restrict {
                if !ids.iter().any(|id| id == loaded.app_id()) {
                    continue;
                }
            }
            if !allow_duplicate && !seen.insert(loaded.app_id().to_string()) {
                continue;
            }
            configs.push(loaded);
        }

        Ok(configs)
    }

    /// Collect descriptors across every search directory
    ///
    /// An application id declared in several directories resolves to the
    /// first directory in search order.
    pub fn discover(&self, restrict: Option<&[String]>) -> Result<Vec<LoadedConfig>> {
        let mut seen = HashSet::new();
        let mut configs = Vec::new();
        for dir in &self.search_paths {
            for loaded in Self::find_configs_in_dir(dir, restrict, false)? {
                if seen.insert(loaded.app_id().to_string()) {
                    configs.push(loaded);
                }
            }
        }
        Ok(configs)
    }
}
