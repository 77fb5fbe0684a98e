use kaboxer_core::{Version, LATEST_LABEL};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Image name split into repository and optional tag
///
/// The repository keeps its registry host (`localhost:5000/app`,
/// `kaboxer/app`); a `:` followed by a `/` belongs to the host port, not to
/// the tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageCoordinate {
    /// Repository including any registry host (e.g., "registry.example.com/app")
    pub repository: String,
    /// Tag (e.g., "1.2", "current")
    pub tag: Option<String>,
}

impl ImageCoordinate {
    pub fn new(repository: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            tag: Some(tag.into()),
        }
    }

    /// Parse a reference string like "kaboxer/app:1.0"
    pub fn parse(s: &str) -> Self {
        if let Some(idx) = s.rfind(':') {
            let after = &s[idx + 1..];
            if !after.contains('/') && !after.is_empty() {
                return Self {
                    repository: s[..idx].to_string(),
                    tag: Some(after.to_string()),
                };
            }
        }
        Self {
            repository: s.to_string(),
            tag: None,
        }
    }
}

impl fmt::Display for ImageCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.tag {
            Some(tag) => write!(f, "{}:{}", self.repository, tag),
            None => f.write_str(&self.repository),
        }
    }
}

/// An image known to the local engine, with every tag pointing at it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalImage {
    /// Engine image id (e.g., "sha256:abc123...")
    pub id: String,
    /// Fully qualified `repo:tag` names
    pub tags: Vec<String>,
}

/// Bind mount into a throwaway container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mount {
    pub source: PathBuf,
    pub target: String,
}

/// Throwaway container to run to completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSpec {
    pub image: String,
    pub command: Vec<String>,
    pub mounts: Vec<Mount>,
}

/// Outcome of an ephemeral container run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerExit {
    /// The command ran and exited with this code
    Exited(i64),
    /// The command does not exist inside the image
    CommandNotFound,
}

/// Migration step around a version change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HookPhase {
    PreUpgrade,
    PostUpgrade,
}

impl HookPhase {
    /// Fixed in-image script path for this phase
    pub fn script_path(self) -> &'static str {
        match self {
            HookPhase::PreUpgrade => "/kaboxer/scripts/pre-upgrade",
            HookPhase::PostUpgrade => "/kaboxer/scripts/post-upgrade",
        }
    }
}

impl fmt::Display for HookPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookPhase::PreUpgrade => f.write_str("pre-upgrade"),
            HookPhase::PostUpgrade => f.write_str("post-upgrade"),
        }
    }
}

/// Where a version (or the image for it) came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VersionSource {
    LocalCurrentTag,
    LocalVersionedTag,
    RemoteRegistry,
    LocalTarball,
}

impl fmt::Display for VersionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VersionSource::LocalCurrentTag => "local current tag",
            VersionSource::LocalVersionedTag => "local versioned tag",
            VersionSource::RemoteRegistry => "registry",
            VersionSource::LocalTarball => "tarball",
        };
        f.write_str(s)
    }
}

/// What a resolution is aiming for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Version(Version),
    /// Nothing advertised a version; take whatever carries the `latest` label
    Latest,
}

impl Target {
    /// Tag under which the target image is addressed
    pub fn tag(&self) -> &str {
        match self {
            Target::Version(v) => v.as_str(),
            Target::Latest => LATEST_LABEL,
        }
    }

    pub fn version(&self) -> Option<&Version> {
        match self {
            Target::Version(v) => Some(v),
            Target::Latest => None,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// One `app` or `app=version` request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionRequest {
    pub app: String,
    /// Exact version pin, kept as written until resolution parses it
    pub pin: Option<String>,
    pub upgrade: bool,
}

impl ResolutionRequest {
    pub fn new(app: impl Into<String>) -> Self {
        Self {
            app: app.into(),
            pin: None,
            upgrade: false,
        }
    }

    pub fn with_pin(mut self, pin: impl Into<String>) -> Self {
        self.pin = Some(pin.into());
        self
    }

    pub fn with_upgrade(mut self, upgrade: bool) -> Self {
        self.upgrade = upgrade;
        self
    }
}

/// Error returned for an `app=version` string that cannot be split
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid application request {0:?}, expected APP or APP=VERSION")]
pub struct InvalidRequest(pub String);

impl FromStr for ResolutionRequest {
    type Err = InvalidRequest;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let invalid = || InvalidRequest(s.to_string());
        match s.split_once('=') {
            None if !s.is_empty() => Ok(Self::new(s)),
            None => Err(invalid()),
            Some((app, pin)) => {
                if app.is_empty() || pin.is_empty() || pin.contains('=') {
                    return Err(invalid());
                }
                Ok(Self::new(app).with_pin(pin))
            }
        }
    }
}

/// Outcome of a successful resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionResult {
    pub app: String,
    pub resolved: Version,
    pub previous: Option<Version>,
    /// Where the image for `resolved` came from
    pub source: VersionSource,
}

impl ResolutionResult {
    /// Whether the `current` tag moved
    pub fn changed(&self) -> bool {
        self.previous.as_ref() != Some(&self.resolved)
    }
}
