//! GitLab container registry lookup
//!
//! GitLab addresses registry repositories through the API of the project that
//! owns them. The image coordinate `group/project/foo/bar` does not say where
//! the project path ends, so candidate project paths are tried in turn until
//! one answers with a repository list.

use super::http::RegistryHttp;
use super::RegistryClient;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct Repository {
    id: u64,
    path: String,
    project_id: u64,
}

#[derive(Debug, Deserialize)]
struct Tag {
    name: String,
}

/// GitLab API based registry client; `registry_url` is the API root
/// (`https://gitlab.com/api/v4`)
#[derive(Debug, Clone)]
pub struct GitLabRegistry {
    http: RegistryHttp,
}

impl GitLabRegistry {
    pub fn new(http: RegistryHttp) -> Self {
        Self { http }
    }
}

/// Candidate project paths for an image coordinate, most likely first
///
/// A project path has at least two segments. The coordinate minus its last
/// segment is the usual layout and is tried before the full coordinate.
pub fn possible_gitlab_project_paths(image: &str) -> Vec<String> {
    let mut paths = vec![image.to_string()];
    let mut rest = image;
    while let Some((prefix, _)) = rest.rsplit_once('/') {
        paths.push(prefix.to_string());
        rest = prefix;
    }
    paths.pop();
    if paths.len() >= 2 {
        paths.swap(0, 1);
    }
    paths
}

fn encode_project_path(path: &str) -> String {
    url::form_urlencoded::byte_serialize(path.as_bytes()).collect()
}

#[async_trait]
impl RegistryClient for GitLabRegistry {
    async fn list_versions(&self, registry_url: &str, image: &str) -> Vec<String> {
        let api = registry_url.trim_end_matches('/');
        let image = image.trim_matches('/');

        for project in possible_gitlab_project_paths(image) {
            let url = format!(
                "{}/projects/{}/registry/repositories",
                api,
                encode_project_path(&project)
            );
            let Some(repositories) = self.http.get_json_or_log::<Vec<Repository>>(&url).await
            else {
                continue;
            };

            debug!("Found GitLab project {} for image {}", project, image);
            let Some(repository) = repositories.into_iter().find(|r| r.path == image) else {
                debug!("Project {} has no registry repository {}", project, image);
                return Vec::new();
            };

            let url = format!(
                "{}/projects/{}/registry/repositories/{}/tags",
                api, repository.project_id, repository.id
            );
            return self
                .http
                .get_json_or_log::<Vec<Tag>>(&url)
                .await
                .map(|tags| tags.into_iter().map(|t| t.name).collect())
                .unwrap_or_default();
        }

        debug!("No GitLab project found for image {}", image);
        Vec::new()
    }
}
