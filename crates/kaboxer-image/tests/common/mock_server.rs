//! Wiremock helpers for registry API tests

use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Respond to `GET {path}` with `body`
pub async fn mock_json(server: &MockServer, url_path: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path(url_path))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Respond to `GET {path}` with a 404
pub async fn mock_not_found(server: &MockServer, url_path: &str) {
    Mock::given(method("GET"))
        .and(path(url_path))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({})))
        .mount(server)
        .await;
}

/// OCI distribution `tags/list` for `image`
pub async fn mock_oci_tags(server: &MockServer, image: &str, tags: &[&str]) {
    mock_json(
        server,
        &format!("/v2/{}/tags/list", image),
        json!({ "name": image, "tags": tags }),
    )
    .await;
}

/// Docker Hub repository tags for `image`
pub async fn mock_docker_hub_tags(server: &MockServer, image: &str, tags: &[&str]) {
    let results: Vec<Value> = tags
        .iter()
        .map(|t| json!({ "name": t, "full_size": 1024 }))
        .collect();
    mock_json(
        server,
        &format!("/v2/repositories/{}/tags", image),
        json!({ "count": tags.len(), "next": null, "results": results }),
    )
    .await;
}

/// Path of a GitLab project's repository list, with the project path encoded
pub fn gitlab_repositories_path(project: &str) -> String {
    format!(
        "/api/v4/projects/{}/registry/repositories",
        project.replace('/', "%2F")
    )
}

/// Repositories of project `group/project` (id 9): the project image
/// itself (1), `foo` (2) and `foo/bar` (3)
pub async fn mock_gitlab_project(server: &MockServer) {
    let repository = |id: u64, path: &str, name: &str| {
        json!({
            "id": id,
            "name": name,
            "path": path,
            "project_id": 9,
            "location": format!("registry.gitlab.com/{}", path),
            "created_at": "2020-05-05T11:20:35.497Z",
        })
    };
    mock_json(
        server,
        &gitlab_repositories_path("group/project"),
        json!([
            repository(1, "group/project", ""),
            repository(2, "group/project/foo", "foo"),
            repository(3, "group/project/foo/bar", "foo/bar"),
        ]),
    )
    .await;
}

/// Tags of repository `repo_id` in project `project_id`
pub async fn mock_gitlab_tags(server: &MockServer, project_id: u64, repo_id: u64, tags: &[&str]) {
    let body: Vec<Value> = tags
        .iter()
        .map(|t| json!({ "name": t, "path": format!("group/project:{}", t) }))
        .collect();
    mock_json(
        server,
        &format!(
            "/api/v4/projects/{}/registry/repositories/{}/tags",
            project_id, repo_id
        ),
        Value::Array(body),
    )
    .await;
}

/// API root of the mock GitLab instance
pub fn gitlab_api(server: &MockServer) -> String {
    format!("{}/api/v4", server.uri())
}
