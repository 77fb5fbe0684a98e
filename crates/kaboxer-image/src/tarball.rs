//! Metadata lookup in image archives produced by `docker save`
//!
//! The archive holds a `manifest.json` listing the image layers in order and
//! one tar (optionally gzip compressed) per layer. Files are looked up
//! without loading the image into the engine.

use crate::error::{ResolveError, Result};
use camino::{Utf8Path, Utf8PathBuf};
use flate2::read::GzDecoder;
use serde::Deserialize;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use tracing::{debug, trace};

/// Directory holding kaboxer metadata inside every image
pub const META_DIR: &str = "/kaboxer";

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ManifestEntry {
    #[serde(default)]
    layers: Vec<String>,
}

/// Shipped image archives and the directories they are searched in
#[derive(Debug, Clone)]
pub struct TarballSource {
    search_paths: Vec<Utf8PathBuf>,
}

impl TarballSource {
    pub fn new(search_paths: Vec<Utf8PathBuf>) -> Self {
        Self { search_paths }
    }

    /// First existing `<dir>/<file_name>` across the search directories
    pub fn locate(&self, file_name: &str) -> Option<Utf8PathBuf> {
        self.search_paths
            .iter()
            .map(|dir| dir.join(file_name))
            .find(|candidate| {
                trace!("Looking for tarball at {}", candidate);
                candidate.is_file()
            })
    }

    /// Contents of `/kaboxer/<name>` in the archive
    pub fn meta_file(archive: &Utf8Path, name: &str) -> Result<String> {
        Self::get_meta_file(archive.as_std_path(), &format!("{}/{}", META_DIR, name))
    }

    /// Text content of `file_name` from the first layer that contains it
    ///
    /// Layers are searched in manifest order; later layers do not override
    /// earlier ones.
    ///
    /// # Errors
    /// [`ResolveError::MetaFileNotFound`] if no layer has the file,
    /// [`ResolveError::InvalidArchive`] if the archive has no usable manifest.
    pub fn get_meta_file(archive: &Path, file_name: &str) -> Result<String> {
        let archive_name = archive.display().to_string();
        let wanted = normalize(file_name);

        let layers = read_layers(archive)?;
        debug!("{} has {} layers", archive_name, layers.len());

        let mut found: Option<(usize, String)> = None;
        let mut outer = tar::Archive::new(BufReader::new(File::open(archive)?));
        for entry in outer.entries()? {
            let entry = entry?;
            let name = entry.path()?.to_string_lossy().into_owned();
            let Some(index) = layers.iter().position(|l| normalize(l) == normalize(&name)) else {
                continue;
            };
            if found.as_ref().is_some_and(|(best, _)| *best < index) {
                continue;
            }
            if let Some(content) = find_in_layer(entry, wanted)? {
                trace!("Found {} in layer {}", wanted, name);
                found = Some((index, content));
                if index == 0 {
                    break;
                }
            }
        }

        found.map(|(_, content)| content).ok_or_else(|| ResolveError::MetaFileNotFound {
            path: file_name.to_string(),
            archive: archive_name,
        })
    }
}

fn normalize(path: &str) -> &str {
    let path = path.strip_prefix("./").unwrap_or(path);
    path.trim_start_matches('/')
}

fn read_layers(archive: &Path) -> Result<Vec<String>> {
    let archive_name = archive.display().to_string();
    let mut outer = tar::Archive::new(BufReader::new(File::open(archive)?));
    for entry in outer.entries()? {
        let mut entry = entry?;
        if normalize(&entry.path()?.to_string_lossy()) != "manifest.json" {
            continue;
        }
        let mut content = String::new();
        entry.read_to_string(&mut content)?;
        let manifest: Vec<ManifestEntry> = serde_json::from_str(&content)
            .map_err(|e| ResolveError::invalid_archive(&archive_name, e.to_string()))?;
        return manifest
            .into_iter()
            .next()
            .map(|m| m.layers)
            .ok_or_else(|| ResolveError::invalid_archive(&archive_name, "empty manifest.json"));
    }
    Err(ResolveError::invalid_archive(archive_name, "no manifest.json"))
}

/// Scan one layer tar (plain or gzip) for `wanted`
fn find_in_layer<R: Read>(layer: R, wanted: &str) -> Result<Option<String>> {
    let mut layer = BufReader::new(layer);
    let is_gzip = layer.fill_buf()?.starts_with(&GZIP_MAGIC);

    if is_gzip {
        scan_layer(tar::Archive::new(GzDecoder::new(layer)), wanted)
    } else {
        scan_layer(tar::Archive::new(layer), wanted)
    }
}

fn scan_layer<R: Read>(mut layer: tar::Archive<R>, wanted: &str) -> Result<Option<String>> {
    for entry in layer.entries()? {
        let mut entry = entry?;
        if !entry.header().entry_type().is_file() {
            continue;
        }
        if normalize(&entry.path()?.to_string_lossy()) == wanted {
            let mut content = String::new();
            entry.read_to_string(&mut content)?;
            return Ok(Some(content));
        }
    }
    Ok(None)
}
