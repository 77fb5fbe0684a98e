use super::http::RegistryHttp;
use super::RegistryClient;
use async_trait::async_trait;
use serde::Deserialize;

/// Tags list response from the distribution API
#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    tags: Option<Vec<String>>,
}

/// Any registry implementing the OCI distribution `tags/list` endpoint
#[derive(Debug, Clone)]
pub struct OciRegistry {
    http: RegistryHttp,
}

impl OciRegistry {
    pub fn new(http: RegistryHttp) -> Self {
        Self { http }
    }
}

#[async_trait]
impl RegistryClient for OciRegistry {
    async fn list_versions(&self, registry_url: &str, image: &str) -> Vec<String> {
        let url = format!(
            "{}/v2/{}/tags/list",
            registry_url.trim_end_matches('/'),
            image.trim_matches('/')
        );
        self.http
            .get_json_or_log::<TagsResponse>(&url)
            .await
            .and_then(|r| r.tags)
            .unwrap_or_default()
    }
}
