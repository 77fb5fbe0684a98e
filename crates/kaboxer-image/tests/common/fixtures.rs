//! Descriptor, settings and image archive builders

use camino::Utf8PathBuf;
use flate2::write::GzEncoder;
use flate2::Compression;
use kaboxer_core::{AppConfig, RuntimeSettings};
use std::fs::File;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Descriptor for `app` with nothing but its id
pub fn local_descriptor(app: &str) -> String {
    format!("application:\n  id: {}\n", app)
}

/// Descriptor for `app` published in `registry_url`
pub fn registry_descriptor(app: &str, registry_url: &str) -> String {
    format!(
        "application:\n  id: {}\ncontainer:\n  origin:\n    registry:\n      url: {}\n",
        app, registry_url
    )
}

/// Descriptor for `app` shipped as `tarball`
pub fn tarball_descriptor(app: &str, tarball: &str) -> String {
    format!(
        "application:\n  id: {}\npackaging:\n  revision: 2\ncontainer:\n  origin:\n    tarball: {}\n",
        app, tarball
    )
}

pub fn parse_descriptor(yaml: &str) -> AppConfig {
    AppConfig::from_yaml(yaml).expect("valid test descriptor")
}

/// Write `<app>.kaboxer.yaml` into `dir`
pub fn write_descriptor(dir: &Path, app: &str, yaml: &str) -> PathBuf {
    let path = dir.join(format!("{}.kaboxer.yaml", app));
    std::fs::write(&path, yaml).expect("write descriptor");
    path
}

/// Settings searching only `dir` for descriptors and tarballs
pub fn settings_for(dir: &TempDir) -> RuntimeSettings {
    let dir = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 temp dir");
    RuntimeSettings {
        config_paths: vec![dir.clone()],
        tarball_paths: vec![dir],
        ..Default::default()
    }
}

fn append_file<W: std::io::Write>(builder: &mut tar::Builder<W>, path: &str, data: &[u8]) {
    let mut header = tar::Header::new_gnu();
    header.set_size(data.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    builder
        .append_data(&mut header, path, data)
        .expect("append tar entry");
}

fn layer_bytes(files: &[(&str, &str)], gzip: bool) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    for (path, content) in files {
        append_file(&mut builder, path, content.as_bytes());
    }
    let tar = builder.into_inner().expect("finish layer");
    if !gzip {
        return tar;
    }
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    std::io::Write::write_all(&mut encoder, &tar).expect("compress layer");
    encoder.finish().expect("finish gzip")
}

/// Write a `docker save` style archive to `path`
///
/// Each element of `layers` is the file list of one layer, in manifest
/// order. Layer tars are written before `manifest.json`, as docker does.
pub fn write_image_archive(path: &Path, layers: &[&[(&str, &str)]], gzip: bool) {
    let mut builder = tar::Builder::new(File::create(path).expect("create archive"));
    let mut names = Vec::new();
    for (idx, files) in layers.iter().enumerate().rev() {
        let name = format!("layer{}/layer.tar", idx);
        append_file(&mut builder, &name, &layer_bytes(files, gzip));
        names.push(name);
    }
    names.reverse();

    let manifest = serde_json::json!([{
        "Config": "config.json",
        "RepoTags": ["kaboxer/test:latest"],
        "Layers": names,
    }]);
    append_file(&mut builder, "manifest.json", manifest.to_string().as_bytes());
    builder.finish().expect("finish archive");
}

/// Single-layer archive with `/kaboxer/version` and `/kaboxer/packaging-revision`
pub fn write_versioned_archive(path: &Path, version: &str) {
    let version = format!("{}\n", version);
    write_image_archive(
        path,
        &[&[
            ("kaboxer/version", version.as_str()),
            ("kaboxer/packaging-revision", "2\n"),
        ]],
        false,
    );
}
