//! In-memory container engine and registry for testing
//!
//! `FakeEngine` keeps images, registry contents and loadable archives in
//! memory and records every pull, load, tag and container run so tests can
//! assert on side effects without a Docker daemon.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use kaboxer_image::{
    ContainerEngine, ContainerExit, ContainerSpec, ImageCoordinate, LocalImage, RegistryClient,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Image content: id plus files readable through `read_file`
#[derive(Clone, Debug)]
pub struct FakeImage {
    pub id: String,
    pub files: HashMap<String, String>,
}

impl FakeImage {
    /// Image whose `/kaboxer/version` holds `version`
    pub fn versioned(id: &str, version: &str) -> Self {
        let mut files = HashMap::new();
        files.insert("/kaboxer/version".to_string(), format!("{}\n", version));
        Self {
            id: id.to_string(),
            files,
        }
    }

    pub fn with_file(mut self, path: &str, content: &str) -> Self {
        self.files.insert(path.to_string(), content.to_string());
        self
    }
}

#[derive(Default)]
struct State {
    images: Vec<LocalImage>,
    contents: HashMap<String, FakeImage>,
    published: HashMap<String, FakeImage>,
    archives: HashMap<PathBuf, FakeImage>,
    script_exits: HashMap<(String, String), ContainerExit>,
    failing_pulls: Vec<String>,
    pulls: Vec<String>,
    loads: Vec<PathBuf>,
    tag_calls: Vec<(String, String)>,
    runs: Vec<ContainerSpec>,
    pruned: bool,
}

impl State {
    fn resolve(&self, name: &str) -> Option<usize> {
        if let Some(idx) = self.images.iter().position(|i| i.id == name) {
            return Some(idx);
        }
        let name = canonical(name);
        self.images
            .iter()
            .position(|i| i.tags.iter().any(|t| *t == name))
    }

    fn ensure_image(&mut self, content: &FakeImage) -> usize {
        self.contents
            .entry(content.id.clone())
            .or_insert_with(|| content.clone());
        match self.images.iter().position(|i| i.id == content.id) {
            Some(idx) => idx,
            None => {
                self.images.push(LocalImage {
                    id: content.id.clone(),
                    tags: Vec::new(),
                });
                self.images.len() - 1
            }
        }
    }

    fn add_tag(&mut self, idx: usize, tag: &str) {
        for image in &mut self.images {
            image.tags.retain(|t| t != tag);
        }
        self.images[idx].tags.push(tag.to_string());
    }
}

/// A bare repository name means its `latest` tag, as with docker
fn canonical(name: &str) -> String {
    let coordinate = ImageCoordinate::parse(name);
    match coordinate.tag {
        Some(_) => name.to_string(),
        None => format!("{}:latest", coordinate.repository),
    }
}

#[derive(Clone, Default)]
pub struct FakeEngine {
    state: Arc<Mutex<State>>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a local image carrying `tags`
    pub fn add_image(&self, content: FakeImage, tags: &[&str]) {
        let mut state = self.state.lock().unwrap();
        let idx = state.ensure_image(&content);
        for tag in tags {
            state.add_tag(idx, tag);
        }
    }

    /// Make `reference` pullable
    pub fn publish(&self, reference: &str, content: FakeImage) {
        self.state
            .lock()
            .unwrap()
            .published
            .insert(reference.to_string(), content);
    }

    /// Make pulling `reference` fail
    pub fn fail_pull(&self, reference: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_pulls
            .push(reference.to_string());
    }

    /// Make `path` loadable as an untagged image
    pub fn add_archive(&self, path: &Path, content: FakeImage) {
        self.state
            .lock()
            .unwrap()
            .archives
            .insert(path.to_path_buf(), content);
    }

    /// Exit status for `script` run in the image with `image_id`
    ///
    /// Scripts without a configured status do not exist in the image.
    pub fn set_script_exit(&self, image_id: &str, script: &str, exit: ContainerExit) {
        self.state
            .lock()
            .unwrap()
            .script_exits
            .insert((image_id.to_string(), script.to_string()), exit);
    }

    pub fn images(&self) -> Vec<LocalImage> {
        self.state.lock().unwrap().images.clone()
    }

    /// Id of the image carrying `tag`
    pub fn image_id_for(&self, tag: &str) -> Option<String> {
        let state = self.state.lock().unwrap();
        state.resolve(tag).map(|idx| state.images[idx].id.clone())
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.images().iter().any(|i| i.tags.iter().any(|t| t == tag))
    }

    pub fn pulls(&self) -> Vec<String> {
        self.state.lock().unwrap().pulls.clone()
    }

    pub fn loads(&self) -> Vec<PathBuf> {
        self.state.lock().unwrap().loads.clone()
    }

    pub fn tag_calls(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().tag_calls.clone()
    }

    pub fn runs(&self) -> Vec<ContainerSpec> {
        self.state.lock().unwrap().runs.clone()
    }

    pub fn pruned(&self) -> bool {
        self.state.lock().unwrap().pruned
    }
}

#[async_trait]
impl ContainerEngine for FakeEngine {
    async fn list_images(&self) -> Result<Vec<LocalImage>> {
        Ok(self.images())
    }

    async fn tag(&self, source: &str, target: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let idx = state
            .resolve(source)
            .ok_or_else(|| anyhow!("No such image: {}", source))?;
        state.tag_calls.push((source.to_string(), target.to_string()));
        state.add_tag(idx, target);
        Ok(())
    }

    async fn remove_image(&self, name: &str) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        let name = canonical(name);
        let Some(idx) = state.resolve(&name) else {
            return Ok(false);
        };
        state.images[idx].tags.retain(|t| *t != name);
        if state.images[idx].tags.is_empty() {
            state.images.remove(idx);
        }
        Ok(true)
    }

    async fn pull(&self, reference: &str) -> Result<LocalImage> {
        let mut state = self.state.lock().unwrap();
        state.pulls.push(reference.to_string());
        if state.failing_pulls.iter().any(|r| r == reference) {
            return Err(anyhow!("manifest for {} not found", reference));
        }
        let content = state
            .published
            .get(reference)
            .cloned()
            .ok_or_else(|| anyhow!("pull access denied for {}", reference))?;
        let idx = state.ensure_image(&content);
        state.add_tag(idx, reference);
        Ok(state.images[idx].clone())
    }

    async fn load(&self, archive: &Path) -> Result<Vec<LocalImage>> {
        let mut state = self.state.lock().unwrap();
        state.loads.push(archive.to_path_buf());
        let content = state
            .archives
            .get(archive)
            .cloned()
            .ok_or_else(|| anyhow!("open {}: no such file", archive.display()))?;
        let idx = state.ensure_image(&content);
        Ok(vec![state.images[idx].clone()])
    }

    async fn read_file(&self, image: &str, path: &str) -> Result<Option<String>> {
        let state = self.state.lock().unwrap();
        let idx = state
            .resolve(image)
            .ok_or_else(|| anyhow!("No such image: {}", image))?;
        let id = &state.images[idx].id;
        Ok(state.contents.get(id).and_then(|c| c.files.get(path).cloned()))
    }

    async fn run_ephemeral(&self, spec: &ContainerSpec) -> Result<ContainerExit> {
        let mut state = self.state.lock().unwrap();
        state.runs.push(spec.clone());
        let idx = state
            .resolve(&spec.image)
            .ok_or_else(|| anyhow!("No such image: {}", spec.image))?;
        let id = state.images[idx].id.clone();
        let script = spec.command.first().cloned().unwrap_or_default();
        Ok(state
            .script_exits
            .get(&(id, script))
            .copied()
            .unwrap_or(ContainerExit::CommandNotFound))
    }

    async fn prune_dangling(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.images.retain(|i| !i.tags.is_empty());
        state.pruned = true;
        Ok(())
    }
}

/// Registry returning fixed tags per image
#[derive(Clone, Default)]
pub struct FakeRegistry {
    tags: Arc<Mutex<HashMap<String, Vec<String>>>>,
    queries: Arc<Mutex<Vec<(String, String)>>>,
}

impl FakeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_tags(&self, image: &str, tags: &[&str]) {
        self.tags.lock().unwrap().insert(
            image.to_string(),
            tags.iter().map(|t| t.to_string()).collect(),
        );
    }

    pub fn queries(&self) -> Vec<(String, String)> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl RegistryClient for FakeRegistry {
    async fn list_versions(&self, registry_url: &str, image: &str) -> Vec<String> {
        self.queries
            .lock()
            .unwrap()
            .push((registry_url.to_string(), image.to_string()));
        self.tags
            .lock()
            .unwrap()
            .get(image)
            .cloned()
            .unwrap_or_default()
    }
}
