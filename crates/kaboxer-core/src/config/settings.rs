//! Runtime settings for operational parameters
//!
//! Precedence (low to high): built-in defaults, the runtime settings file
//! (`$KABOXER_RUNTIME_CONFIG` or `/etc/kaboxer/kaboxer-runtime.yaml`), then
//! `KABOXER_CONFIG_PATHS`.

use super::loader::DEFAULT_CONFIG_PATHS;
use crate::error::Result;
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use tracing::debug;

/// Default location of the runtime settings file
pub const DEFAULT_RUNTIME_CONFIG: &str = "/etc/kaboxer/kaboxer-runtime.yaml";

/// Environment variable pointing at an alternative runtime settings file
pub const RUNTIME_CONFIG_ENV: &str = "KABOXER_RUNTIME_CONFIG";

/// Environment variable overriding the descriptor search path (colon separated)
pub const CONFIG_PATHS_ENV: &str = "KABOXER_CONFIG_PATHS";

/// Directories searched for shipped image tarballs
pub const DEFAULT_TARBALL_PATHS: &[&str] = &[".", "/usr/local/share/kaboxer", "/usr/share/kaboxer"];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RuntimeSettings {
    /// Descriptor search directories
    #[serde(default = "default_config_paths")]
    pub config_paths: Vec<Utf8PathBuf>,

    /// Tarball search directories
    #[serde(default = "default_tarball_paths")]
    pub tarball_paths: Vec<Utf8PathBuf>,

    /// User agent string for registry requests
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Container engine CLI
    #[serde(default = "default_docker_binary")]
    pub docker_binary: String,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            config_paths: default_config_paths(),
            tarball_paths: default_tarball_paths(),
            user_agent: default_user_agent(),
            docker_binary: default_docker_binary(),
        }
    }
}

fn default_config_paths() -> Vec<Utf8PathBuf> {
    DEFAULT_CONFIG_PATHS.iter().map(Utf8PathBuf::from).collect()
}
fn default_tarball_paths() -> Vec<Utf8PathBuf> {
    DEFAULT_TARBALL_PATHS.iter().map(Utf8PathBuf::from).collect()
}
fn default_user_agent() -> String {
    format!(
        "kaboxer/{} ({}; {})",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS,
        std::env::consts::ARCH
    )
}
fn default_docker_binary() -> String {
    "docker".to_string()
}

impl RuntimeSettings {
    /// Load settings with file and environment overrides applied
    pub fn load() -> Result<Self> {
        let path = env::var(RUNTIME_CONFIG_ENV)
            .map(Utf8PathBuf::from)
            .unwrap_or_else(|_| Utf8PathBuf::from(DEFAULT_RUNTIME_CONFIG));

        let settings = if path.is_file() {
            Self::load_file(&path)?
        } else {
            Self::default()
        };

        Ok(settings.apply_env_overrides(env::var(CONFIG_PATHS_ENV).ok().as_deref()))
    }

    /// Load settings from a specific YAML file
    pub fn load_file(path: &Utf8Path) -> Result<Self> {
        debug!("Loading runtime settings from {}", path);
        let content = fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml_ng::from_str(&content)?)
    }

    fn apply_env_overrides(mut self, config_paths: Option<&str>) -> Self {
        if let Some(paths) = config_paths {
            let paths: Vec<Utf8PathBuf> = paths
                .split(':')
                .filter(|p| !p.is_empty())
                .map(Utf8PathBuf::from)
                .collect();
            if !paths.is_empty() {
                debug!("Descriptor search path overridden from {}", CONFIG_PATHS_ENV);
                self.config_paths = paths;
            }
        }
        self
    }
}
