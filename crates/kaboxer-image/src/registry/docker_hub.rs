use super::http::RegistryHttp;
use super::RegistryClient;
use async_trait::async_trait;
use serde::Deserialize;

/// Docker Hub API endpoint
pub const DOCKER_HUB_API: &str = "https://registry.hub.docker.com";

#[derive(Debug, Deserialize)]
struct TagPage {
    #[serde(default)]
    results: Vec<TagEntry>,
}

#[derive(Debug, Deserialize)]
struct TagEntry {
    name: String,
}

/// Docker Hub's repository API (`/v2/repositories/{image}/tags`)
#[derive(Debug, Clone)]
pub struct DockerHubRegistry {
    http: RegistryHttp,
}

impl DockerHubRegistry {
    pub fn new(http: RegistryHttp) -> Self {
        Self { http }
    }
}

#[async_trait]
impl RegistryClient for DockerHubRegistry {
    async fn list_versions(&self, registry_url: &str, image: &str) -> Vec<String> {
        let url = format!(
            "{}/v2/repositories/{}/tags",
            registry_url.trim_end_matches('/'),
            image.trim_matches('/')
        );
        self.http
            .get_json_or_log::<TagPage>(&url)
            .await
            .map(|page| page.results.into_iter().map(|t| t.name).collect())
            .unwrap_or_default()
    }
}
