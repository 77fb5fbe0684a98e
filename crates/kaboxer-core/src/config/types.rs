//! Application descriptor types (`*.kaboxer.yaml`)
//!
//! Optional sections deserialize to explicit `Option`/defaulted fields so the
//! rest of the code never checks for missing keys.

use crate::error::{Error, Result};
use crate::version::Version;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Namespace under which every locally built or loaded image lives
pub const LOCAL_IMAGE_NAMESPACE: &str = "kaboxer";

/// Parsed application descriptor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub application: ApplicationSection,

    #[serde(default)]
    pub packaging: PackagingSection,

    #[serde(default)]
    pub container: ContainerSection,

    /// Component definitions, consumed by the run layer
    #[serde(default)]
    pub components: BTreeMap<String, serde_yaml_ng::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationSection {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PackagingSection {
    /// Packaging revision, written either as a number or a string
    #[serde(
        default,
        deserialize_with = "scalar_as_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub revision: Option<String>,

    #[serde(
        default,
        deserialize_with = "scalar_as_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub min_upstream_version: Option<String>,

    #[serde(
        default,
        deserialize_with = "scalar_as_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_upstream_version: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerSection {
    #[serde(rename = "type", default = "default_container_type")]
    pub kind: String,

    #[serde(default)]
    pub origin: OriginSection,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_component: Option<String>,
}

impl Default for ContainerSection {
    fn default() -> Self {
        Self {
            kind: default_container_type(),
            origin: OriginSection::default(),
            default_component: None,
        }
    }
}

fn default_container_type() -> String {
    "docker".to_string()
}

/// Where the application's image is published
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OriginSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry: Option<RegistryOrigin>,

    /// File name of a shipped image archive
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tarball: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryOrigin {
    pub url: String,

    /// Image path inside the registry; defaults to the application id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Accept YAML numbers for fields that are really version-like strings
/// (`revision: 3`, `min_upstream_version: 1.2`).
fn scalar_as_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_yaml_ng::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_yaml_ng::Value::Null) => None,
        Some(serde_yaml_ng::Value::String(s)) => Some(s),
        Some(serde_yaml_ng::Value::Number(n)) => Some(n.to_string()),
        Some(serde_yaml_ng::Value::Bool(b)) => Some(b.to_string()),
        Some(other) => {
            return Err(serde::de::Error::custom(format!(
                "expected a scalar, found {:?}",
                other
            )))
        }
    })
}

impl AppConfig {
    /// Parse a descriptor from YAML text
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: AppConfig = serde_yaml_ng::from_str(content)?;
        if config.application.id.trim().is_empty() {
            return Err(Error::invalid_config("application.id must not be empty"));
        }
        Ok(config)
    }

    /// Serialize back to YAML
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }

    /// Application identifier
    pub fn app_id(&self) -> &str {
        &self.application.id
    }

    /// Registry origin, if one is configured
    pub fn registry(&self) -> Option<&RegistryOrigin> {
        self.container.origin.registry.as_ref()
    }

    /// Tarball origin file name, if one is configured
    pub fn tarball(&self) -> Option<&str> {
        self.container.origin.tarball.as_deref()
    }

    /// Image path inside the registry (`container.origin.registry.image` or the app id)
    pub fn registry_image(&self) -> Option<&str> {
        self.registry()
            .map(|r| r.image.as_deref().unwrap_or(&self.application.id))
    }

    /// `kaboxer/<app-id>`
    pub fn local_image_name(&self) -> String {
        format!("{}/{}", LOCAL_IMAGE_NAMESPACE, self.application.id)
    }

    /// `<registry-host>[/<path>]/<image>` when a registry origin is configured
    pub fn remote_image_name(&self) -> Option<String> {
        let registry = self.registry()?;
        let host = strip_scheme(&registry.url).trim_end_matches('/');
        if host.is_empty() {
            return None;
        }
        Some(format!("{}/{}", host, self.registry_image()?))
    }

    /// Name under which the application's images are tagged locally
    pub fn image_name(&self) -> String {
        self.remote_image_name()
            .unwrap_or_else(|| self.local_image_name())
    }

    /// Reject upstream versions outside `min_upstream_version..=max_upstream_version`
    pub fn check_upstream_version(&self, version: &Version) -> Result<()> {
        if let Some(min) = &self.packaging.min_upstream_version {
            if version < &Version::parse(min)? {
                return Err(Error::UnsupportedUpstreamVersion {
                    version: version.to_string(),
                    relation: "<",
                    bound: min.clone(),
                });
            }
        }
        if let Some(max) = &self.packaging.max_upstream_version {
            if version > &Version::parse(max)? {
                return Err(Error::UnsupportedUpstreamVersion {
                    version: version.to_string(),
                    relation: ">",
                    bound: max.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Drop a leading `http://` or `https://`
pub fn strip_scheme(url: &str) -> &str {
    url.strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url)
}
