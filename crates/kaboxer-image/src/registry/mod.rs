//! Registry tag discovery
//!
//! [`RegistryClient::list_versions`] never fails: unreachable hosts, HTTP
//! errors and unexpected payloads are logged and yield an empty list.
//!
//! Three backends exist, each taking its own API root as `registry_url`:
//! [`OciRegistry`], [`DockerHubRegistry`] and [`GitLabRegistry`].
//! [`OriginRegistry`] takes the `container.origin.registry.url` of a
//! descriptor instead and picks the backend from the host name.

mod docker_hub;
mod gitlab;
mod http;
mod oci;

pub use docker_hub::{DockerHubRegistry, DOCKER_HUB_API};
pub use gitlab::{possible_gitlab_project_paths, GitLabRegistry};
pub use http::RegistryHttp;
pub use oci::OciRegistry;

use async_trait::async_trait;
use kaboxer_core::{is_reserved_label, Version};
use tracing::{debug, warn};
use url::Url;

#[async_trait]
pub trait RegistryClient: Send + Sync {
    /// Every tag published for `image`
    async fn list_versions(&self, registry_url: &str, image: &str) -> Vec<String>;
}

const DOCKER_HUB_HOSTS: &[&str] = &[
    "docker.io",
    "registry.hub.docker.com",
    "hub.docker.com",
    "index.docker.io",
    "registry-1.docker.io",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryKind {
    Oci,
    DockerHub,
    GitLab,
}

/// Where and how to ask for the tags of one configured image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryEndpoint {
    pub kind: RegistryKind,
    /// API root handed to the backend
    pub api_url: String,
    /// Image path relative to the registry host
    pub image: String,
}

impl RegistryEndpoint {
    /// Derive the endpoint for `image` published under `registry_url`
    ///
    /// A URL without scheme is taken as plain `http://`. Path segments of the
    /// registry URL prefix the image path (`registry.gitlab.com/group/project`
    /// with image `app` is the coordinate `group/project/app`).
    pub fn resolve(registry_url: &str, image: &str) -> Option<Self> {
        let with_scheme = if registry_url.contains("://") {
            registry_url.to_string()
        } else {
            format!("http://{}", registry_url)
        };
        let url = match Url::parse(&with_scheme) {
            Ok(url) => url,
            Err(e) => {
                warn!("Ignoring invalid registry URL {}: {}", registry_url, e);
                return None;
            }
        };
        let host = url.host_str()?.to_ascii_lowercase();

        let prefix = url.path().trim_matches('/');
        let image = image.trim_matches('/');
        let image = if prefix.is_empty() {
            image.to_string()
        } else {
            format!("{}/{}", prefix, image)
        };

        let (kind, api_url) = if let Some(domain) = host.strip_prefix("registry.gitlab.") {
            (RegistryKind::GitLab, format!("https://gitlab.{}/api/v4", domain))
        } else if DOCKER_HUB_HOSTS.contains(&host.as_str()) {
            (RegistryKind::DockerHub, DOCKER_HUB_API.to_string())
        } else {
            let mut base = format!("{}://{}", url.scheme(), host);
            if let Some(port) = url.port() {
                base.push_str(&format!(":{}", port));
            }
            (RegistryKind::Oci, base)
        };

        Some(Self {
            kind,
            api_url,
            image,
        })
    }
}

/// The registry backends as one closed set
#[derive(Debug, Clone)]
pub enum Registry {
    Oci(OciRegistry),
    DockerHub(DockerHubRegistry),
    GitLab(GitLabRegistry),
}

impl Registry {
    pub fn new(kind: RegistryKind, http: RegistryHttp) -> Self {
        match kind {
            RegistryKind::Oci => Registry::Oci(OciRegistry::new(http)),
            RegistryKind::DockerHub => Registry::DockerHub(DockerHubRegistry::new(http)),
            RegistryKind::GitLab => Registry::GitLab(GitLabRegistry::new(http)),
        }
    }
}

#[async_trait]
impl RegistryClient for Registry {
    async fn list_versions(&self, registry_url: &str, image: &str) -> Vec<String> {
        match self {
            Registry::Oci(r) => r.list_versions(registry_url, image).await,
            Registry::DockerHub(r) => r.list_versions(registry_url, image).await,
            Registry::GitLab(r) => r.list_versions(registry_url, image).await,
        }
    }
}

/// Registry client addressed by a descriptor's origin URL
#[derive(Debug, Clone)]
pub struct OriginRegistry {
    http: RegistryHttp,
}

impl OriginRegistry {
    pub fn new(http: RegistryHttp) -> Self {
        Self { http }
    }
}

#[async_trait]
impl RegistryClient for OriginRegistry {
    async fn list_versions(&self, registry_url: &str, image: &str) -> Vec<String> {
        let Some(endpoint) = RegistryEndpoint::resolve(registry_url, image) else {
            return Vec::new();
        };
        debug!(
            "Listing {} through {:?} API at {}",
            endpoint.image, endpoint.kind, endpoint.api_url
        );
        let tags = Registry::new(endpoint.kind, self.http.clone())
            .list_versions(&endpoint.api_url, &endpoint.image)
            .await;
        debug!("Registry tags for {}: {:?}", endpoint.image, tags);
        tags
    }
}

/// Highest version among registry tags
///
/// Reserved labels and tags that are not versions are skipped; registries
/// commonly carry tags such as `stable` or `sha-1234` next to releases.
pub fn max_version(tags: &[String]) -> Option<Version> {
    tags.iter()
        .filter(|tag| !is_reserved_label(tag))
        .filter_map(|tag| match Version::parse(tag) {
            Ok(v) => Some(v),
            Err(_) => {
                debug!("Skipping registry tag {:?}, not a version", tag);
                None
            }
        })
        .max()
}
