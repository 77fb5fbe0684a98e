//! [`ContainerEngine`] implementation over the `docker` CLI

use crate::engine::ContainerEngine;
use crate::types::{ContainerExit, ContainerSpec, LocalImage};
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use tokio::process::Command;
use tracing::{debug, trace, warn};

/// Docker CLI backed engine
#[derive(Debug, Clone)]
pub struct DockerEngine {
    binary: PathBuf,
}

impl DockerEngine {
    /// Locate the docker CLI and check that the daemon answers
    ///
    /// # Errors
    /// Returns an error if the binary is missing or the daemon is unreachable
    pub async fn connect(binary: &str) -> Result<Self> {
        let binary = which::which(binary)
            .with_context(|| format!("{} not found in PATH, is Docker installed?", binary))?;
        debug!("Found container engine CLI at: {:?}", binary);

        let engine = Self { binary };
        let output = engine.docker(&["version", "--format", "{{.Server.Version}}"]).await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!(
                "No access to Docker ({}). Is docker.service running, and are you a member of group docker or kaboxer?",
                stderr.trim()
            ));
        }
        debug!(
            "Docker daemon version {}",
            String::from_utf8_lossy(&output.stdout).trim()
        );
        Ok(engine)
    }

    async fn docker(&self, args: &[&str]) -> Result<Output> {
        trace!("Running: docker {}", args.join(" "));
        Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .with_context(|| format!("Failed to execute docker {}", args.first().unwrap_or(&"")))
    }

    /// Run a docker command and return its stdout, failing on non-zero exit
    async fn docker_ok(&self, args: &[&str]) -> Result<String> {
        let output = self.docker(args).await?;
        if !output.status.success() {
            bail!(
                "docker {} failed: {}",
                args.join(" "),
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn image_id(&self, name: &str) -> Result<String> {
        let id = self
            .docker_ok(&["image", "inspect", "--format", "{{.Id}}", name])
            .await?;
        Ok(id.trim().to_string())
    }

    async fn remove_container(&self, id: &str) {
        if let Err(e) = self.docker_ok(&["rm", "--force", id]).await {
            warn!("Failed to remove container {}: {:#}", id, e);
        }
    }

    async fn start_and_wait(&self, id: &str) -> Result<ContainerExit> {
        let output = Command::new(&self.binary)
            .args(["start", "--attach", id])
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::piped())
            .output()
            .await
            .context("Failed to execute docker start")?;
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            debug!("Container {} stderr: {}", id, stderr.trim());
        }

        if !output.status.success() && is_missing_command(&stderr) {
            return Ok(ContainerExit::CommandNotFound);
        }

        let code = self.docker_ok(&["wait", id]).await?;
        let code: i64 = code
            .trim()
            .parse()
            .with_context(|| format!("Unexpected docker wait output {:?}", code.trim()))?;

        // no-op once the main process has exited
        let _ = self.docker(&["stop", id]).await;
        Ok(ContainerExit::Exited(code))
    }
}

/// Daemon or OCI runtime error for an entrypoint that does not exist in the
/// image
///
/// Output of the container process itself never counts, even when it
/// mentions a missing file.
fn is_missing_command(stderr: &str) -> bool {
    stderr.lines().map(str::trim_start).any(|line| {
        (line.starts_with("Error response from daemon:") || line.starts_with("OCI runtime"))
            && (line.contains("executable file not found")
                || line.contains("no such file or directory"))
    })
}

/// Parse `docker images --format '{{.ID}}\t{{.Repository}}\t{{.Tag}}'` output
fn parse_image_listing(listing: &str) -> Vec<LocalImage> {
    let mut by_id: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for line in listing.lines() {
        let mut fields = line.split('\t');
        let (Some(id), Some(repo), Some(tag)) = (fields.next(), fields.next(), fields.next())
        else {
            continue;
        };
        let tags = by_id.entry(id.to_string()).or_default();
        if repo != "<none>" && tag != "<none>" {
            tags.push(format!("{}:{}", repo, tag));
        }
    }
    by_id
        .into_iter()
        .map(|(id, tags)| LocalImage { id, tags })
        .collect()
}

/// Extract the first regular file of a `docker cp ... -` tar stream
fn first_file_in_tar(stream: &[u8]) -> Result<Option<String>> {
    let mut archive = tar::Archive::new(stream);
    for entry in archive.entries()? {
        let mut entry = entry?;
        if entry.header().entry_type().is_file() {
            let mut content = String::new();
            entry.read_to_string(&mut content)?;
            return Ok(Some(content));
        }
    }
    Ok(None)
}

#[async_trait]
impl ContainerEngine for DockerEngine {
    async fn list_images(&self) -> Result<Vec<LocalImage>> {
        let listing = self
            .docker_ok(&[
                "images",
                "--no-trunc",
                "--format",
                "{{.ID}}\t{{.Repository}}\t{{.Tag}}",
            ])
            .await?;
        Ok(parse_image_listing(&listing))
    }

    async fn tag(&self, source: &str, target: &str) -> Result<()> {
        debug!("Tagging {} as {}", source, target);
        self.docker_ok(&["tag", source, target]).await?;
        Ok(())
    }

    async fn remove_image(&self, name: &str) -> Result<bool> {
        let output = self.docker(&["rmi", name]).await?;
        if output.status.success() {
            return Ok(true);
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        if stderr.contains("No such image") {
            return Ok(false);
        }
        bail!("docker rmi {} failed: {}", name, stderr.trim())
    }

    async fn pull(&self, reference: &str) -> Result<LocalImage> {
        self.docker_ok(&["pull", reference]).await?;
        let id = self.image_id(reference).await?;
        Ok(LocalImage {
            id,
            tags: vec![reference.to_string()],
        })
    }

    async fn load(&self, archive: &Path) -> Result<Vec<LocalImage>> {
        let archive = archive
            .to_str()
            .ok_or_else(|| anyhow!("Archive path is not valid UTF-8: {:?}", archive))?;
        let stdout = self.docker_ok(&["load", "--input", archive]).await?;

        let mut images = Vec::new();
        for line in stdout.lines() {
            if let Some(id) = line.strip_prefix("Loaded image ID: ") {
                images.push(LocalImage {
                    id: id.trim().to_string(),
                    tags: Vec::new(),
                });
            } else if let Some(name) = line.strip_prefix("Loaded image: ") {
                let name = name.trim();
                images.push(LocalImage {
                    id: self.image_id(name).await?,
                    tags: vec![name.to_string()],
                });
            }
        }
        if images.is_empty() {
            bail!("docker load of {} reported no image", archive);
        }
        Ok(images)
    }

    async fn read_file(&self, image: &str, path: &str) -> Result<Option<String>> {
        let id = self
            .docker_ok(&["create", "--entrypoint", "", image, "true"])
            .await?;
        let id = id.trim().to_string();

        let source = format!("{}:{}", id, path);
        let result = self.docker(&["cp", &source, "-"]).await;
        self.remove_container(&id).await;

        let output = result?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if stderr.contains("Could not find the file") || stderr.contains("No such container:path")
            {
                return Ok(None);
            }
            bail!("docker cp {} failed: {}", source, stderr.trim());
        }
        first_file_in_tar(&output.stdout)
    }

    async fn run_ephemeral(&self, spec: &ContainerSpec) -> Result<ContainerExit> {
        let mounts: Vec<String> = spec
            .mounts
            .iter()
            .map(|m| format!("type=bind,source={},target={}", m.source.display(), m.target))
            .collect();

        let mut args: Vec<&str> = vec!["create"];
        for mount in &mounts {
            args.push("--mount");
            args.push(mount);
        }
        args.push(&spec.image);
        args.extend(spec.command.iter().map(String::as_str));

        let id = self.docker_ok(&args).await?;
        let id = id.trim().to_string();
        debug!("Created container {} from {}", id, spec.image);

        let result = self.start_and_wait(&id).await;
        self.remove_container(&id).await;
        result
    }

    async fn prune_dangling(&self) -> Result<()> {
        self.docker_ok(&["image", "prune", "--force", "--filter", "dangling=true"])
            .await?;
        Ok(())
    }
}
