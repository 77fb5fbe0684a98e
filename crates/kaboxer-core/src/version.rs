//! Upstream version parsing and ordering
//!
//! Versions are dotted numeric releases (`1`, `1.2`, `2021.3.1`) with an
//! optional pre-release suffix (`1.0-rc1`, `1.0~beta.2`, `1.0rc1`) and an
//! optional local/post suffix (`1.0+kali1`). An optional leading `v` is
//! accepted. Ordering is numeric component by component, with a missing
//! trailing component sorting before a present one (`1.0 < 1.0.1`).
//!
//! `latest` and `current` are tag labels, not versions: [`Version::parse`]
//! rejects them like any other malformed string.

use crate::error::{Error, Result};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// Tag label pointing at the version currently installed
pub const CURRENT_LABEL: &str = "current";

/// Tag label pointing at the newest published image
pub const LATEST_LABEL: &str = "latest";

/// Returns true for tag labels that never take part in version comparison
pub fn is_reserved_label(tag: &str) -> bool {
    tag == CURRENT_LABEL || tag == LATEST_LABEL
}

/// A parsed, totally ordered upstream version
#[derive(Debug, Clone)]
pub struct Version {
    raw: String,
    release: Vec<u64>,
    pre: Vec<Identifier>,
    post: Vec<Identifier>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Identifier {
    Numeric(u64),
    Alpha(String),
}

impl Ord for Identifier {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Identifier::Numeric(a), Identifier::Numeric(b)) => a.cmp(b),
            (Identifier::Numeric(_), Identifier::Alpha(_)) => Ordering::Less,
            (Identifier::Alpha(_), Identifier::Numeric(_)) => Ordering::Greater,
            (Identifier::Alpha(a), Identifier::Alpha(b)) => a.cmp(b),
        }
    }
}

impl PartialOrd for Identifier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Version {
    /// Parse a version string
    ///
    /// # Errors
    /// Returns [`Error::MalformedVersion`] for anything outside the grammar,
    /// including the reserved `latest`/`current` labels.
    pub fn parse(s: &str) -> Result<Self> {
        let malformed = || Error::malformed_version(s);

        let body = s.strip_prefix('v').unwrap_or(s);
        let release_end = body
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(body.len());
        let (release_str, rest) = body.split_at(release_end);

        // A trailing dot directly followed by a suffix ("1.0.rc1") is not allowed
        let release = release_str
            .split('.')
            .map(|part| {
                if part.is_empty() {
                    Err(malformed())
                } else {
                    part.parse::<u64>().map_err(|_| malformed())
                }
            })
            .collect::<Result<Vec<_>>>()?;

        let (pre_str, post_str) = match rest.find('+') {
            Some(idx) => (&rest[..idx], Some(&rest[idx + 1..])),
            None => (rest, None),
        };

        let pre = if pre_str.is_empty() {
            Vec::new()
        } else {
            let pre_str = pre_str
                .strip_prefix('-')
                .or_else(|| pre_str.strip_prefix('~'))
                .unwrap_or(pre_str);
            parse_identifiers(pre_str).ok_or_else(malformed)?
        };

        let post = match post_str {
            Some(p) => parse_identifiers(p).ok_or_else(malformed)?,
            None => Vec::new(),
        };

        Ok(Self {
            raw: s.to_string(),
            release,
            pre,
            post,
        })
    }

    /// Original string this version was parsed from
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Numeric release components
    pub fn release(&self) -> &[u64] {
        &self.release
    }

    /// Whether a pre-release suffix is present
    pub fn is_prerelease(&self) -> bool {
        !self.pre.is_empty()
    }
}

fn parse_identifiers(s: &str) -> Option<Vec<Identifier>> {
    if s.is_empty() {
        return None;
    }
    s.split('.')
        .map(|part| {
            if part.is_empty() || !part.chars().all(|c| c.is_ascii_alphanumeric()) {
                None
            } else if part.chars().all(|c| c.is_ascii_digit()) {
                part.parse().ok().map(Identifier::Numeric)
            } else {
                Some(Identifier::Alpha(part.to_string()))
            }
        })
        .collect()
}

/// Compare two version strings
///
/// # Errors
/// Fails if either side is malformed.
pub fn compare(a: &str, b: &str) -> Result<Ordering> {
    Ok(Version::parse(a)?.cmp(&Version::parse(b)?))
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.release
            .cmp(&other.release)
            .then_with(|| match (self.pre.is_empty(), other.pre.is_empty()) {
                (true, true) => Ordering::Equal,
                // a release sorts after its own pre-releases
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                (false, false) => self.pre.cmp(&other.pre),
            })
            .then_with(|| self.post.cmp(&other.post))
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.release.hash(state);
        self.pre.hash(state);
        self.post.hash(state);
    }
}

impl FromStr for Version {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
