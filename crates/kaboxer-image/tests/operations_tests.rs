//! Purge, load, metadata and listing operations

mod common;

use camino::Utf8PathBuf;
use common::*;
use kaboxer_core::ConfigLoader;
use kaboxer_image::{AppStatus, ImageManager, ImageStore, Inventory, ResolveError, VersionResolver};
use std::sync::Arc;
use tempfile::TempDir;

fn manager(tmp: &TempDir, engine: &FakeEngine) -> ImageManager {
    let settings = settings_for(tmp);
    ImageManager::new(
        ImageStore::new(Arc::new(engine.clone())),
        ConfigLoader::new(settings.config_paths),
    )
}

fn utf8(path: std::path::PathBuf) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(path).unwrap()
}

// ---------------------------------------------------------------------------
// purge
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_purge_removes_current_and_highest_version() {
    let tmp = TempDir::new().unwrap();
    write_descriptor(tmp.path(), "app", &local_descriptor("app"));
    let engine = FakeEngine::new();
    engine.add_image(
        FakeImage::versioned("v10", "1.0"),
        &["kaboxer/app:1.0", "kaboxer/app:current"],
    );
    engine.add_image(FakeImage::versioned("v12", "1.2"), &["kaboxer/app:1.2"]);

    let removed = manager(&tmp, &engine).purge("app", true).await.unwrap();

    assert_eq!(removed, vec!["kaboxer/app:current", "kaboxer/app:1.2"]);
    assert!(!engine.has_tag("kaboxer/app:current"));
    assert!(engine.has_tag("kaboxer/app:1.0"));
    assert!(engine.pruned());
}

#[tokio::test]
async fn test_purge_without_descriptor_uses_local_name() {
    let tmp = TempDir::new().unwrap();
    let engine = FakeEngine::new();
    engine.add_image(FakeImage::versioned("g1", "1.0"), &["kaboxer/ghost:current"]);

    let removed = manager(&tmp, &engine).purge("ghost", false).await.unwrap();

    assert_eq!(removed, vec!["kaboxer/ghost:current"]);
    assert!(engine.images().is_empty());
    assert!(!engine.pruned());
}

#[tokio::test]
async fn test_purge_nothing_installed() {
    let tmp = TempDir::new().unwrap();
    let engine = FakeEngine::new();
    let removed = manager(&tmp, &engine).purge("app", false).await.unwrap();
    assert!(removed.is_empty());
}

// ---------------------------------------------------------------------------
// load
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_load_tags_with_archive_version() {
    let tmp = TempDir::new().unwrap();
    let archive = tmp.path().join("app.tar");
    write_versioned_archive(&archive, "1.4");
    let engine = FakeEngine::new();
    engine.add_archive(&archive, FakeImage::versioned("tar-14", "1.4"));

    let version = manager(&tmp, &engine)
        .load("app", &utf8(archive))
        .await
        .unwrap();

    assert_eq!(version.as_str(), "1.4");
    assert_eq!(engine.image_id_for("kaboxer/app:1.4").as_deref(), Some("tar-14"));
}

#[tokio::test]
async fn test_load_rejects_malformed_version() {
    let tmp = TempDir::new().unwrap();
    let archive = tmp.path().join("app.tar");
    write_versioned_archive(&archive, "nightly");
    let engine = FakeEngine::new();

    let err = manager(&tmp, &engine)
        .load("app", &utf8(archive))
        .await
        .unwrap_err();

    assert!(matches!(err, ResolveError::MalformedVersion { .. }));
    assert!(engine.loads().is_empty());
}

// ---------------------------------------------------------------------------
// get-meta-file
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_meta_file_reads_current_image() {
    let tmp = TempDir::new().unwrap();
    let engine = FakeEngine::new();
    engine.add_image(
        FakeImage::versioned("v10", "1.0").with_file("/kaboxer/packaging-revision", "3\n"),
        &["kaboxer/app:current"],
    );
    let manager = manager(&tmp, &engine);

    assert_eq!(manager.meta_file("app", "packaging-revision").await.unwrap(), "3");
    assert_eq!(manager.meta_file("app", "version").await.unwrap(), "1.0");

    let err = manager.meta_file("app", "missing").await.unwrap_err();
    assert!(matches!(err, ResolveError::MetaFileNotFound { .. }));
}

// ---------------------------------------------------------------------------
// list
// ---------------------------------------------------------------------------

struct Listing {
    tmp: TempDir,
    engine: FakeEngine,
    registry: FakeRegistry,
}

impl Listing {
    fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        let engine = FakeEngine::new();
        let registry = FakeRegistry::new();

        write_descriptor(tmp.path(), "app", &local_descriptor("app"));
        engine.add_image(
            FakeImage::versioned("v10", "1.0"),
            &["kaboxer/app:1.0", "kaboxer/app:current"],
        );
        engine.add_image(FakeImage::versioned("v12", "1.2"), &["kaboxer/app:1.2"]);

        write_descriptor(
            tmp.path(),
            "kbx-demo",
            &registry_descriptor("kbx-demo", "registry.example.com"),
        );
        registry.set_tags("kbx-demo", &["1.0", "2.0", "latest"]);
        engine.add_image(
            FakeImage::versioned("remote-10", "1.0"),
            &["registry.example.com/kbx-demo:1.0", "registry.example.com/kbx-demo:current"],
        );

        write_descriptor(
            tmp.path(),
            "kbx-tar",
            &tarball_descriptor("kbx-tar", "kbx-tar-image.tar"),
        );
        write_versioned_archive(&tmp.path().join("kbx-tar-image.tar"), "1.4");

        Self {
            tmp,
            engine,
            registry,
        }
    }

    async fn collect(&self, restrict: Option<&[String]>, with_remotes: bool) -> Inventory {
        let resolver = VersionResolver::new(
            Arc::new(self.engine.clone()),
            Arc::new(self.registry.clone()),
            &settings_for(&self.tmp),
        );
        Inventory::collect(&resolver, restrict, with_remotes)
            .await
            .unwrap()
    }
}

fn find<'a>(inventory: &'a Inventory, app: &str) -> &'a AppStatus {
    inventory
        .all()
        .iter()
        .find(|s| s.app == app)
        .unwrap_or_else(|| panic!("{} not listed", app))
}

fn names<'a>(apps: impl Iterator<Item = &'a AppStatus>) -> Vec<&'a str> {
    let mut names: Vec<&str> = apps.map(|a| a.app.as_str()).collect();
    names.sort();
    names
}

#[tokio::test]
async fn test_collect_with_remotes() {
    let listing = Listing::new();
    let inventory = listing.collect(None, true).await;

    assert_eq!(inventory.all().len(), 3);

    let app = find(&inventory, "app");
    assert_eq!(app.installed.as_ref().map(|v| v.as_str()), Some("1.0"));
    assert_eq!(app.local_max.as_ref().map(|v| v.as_str()), Some("1.2"));
    assert!(!app.has_registry);

    let demo = find(&inventory, "kbx-demo");
    assert_eq!(demo.registry_versions, vec!["1.0", "2.0", "latest"]);
    assert_eq!(demo.registry_max.as_ref().map(|v| v.as_str()), Some("2.0"));
    assert_eq!(demo.upgradeable().map(|v| v.as_str()), Some("2.0"));

    let tar = find(&inventory, "kbx-tar");
    assert_eq!(tar.installed, None);
    assert_eq!(tar.tarball.as_ref().map(|v| v.as_str()), Some("1.4"));
    assert_eq!(tar.packaging_revision_config.as_deref(), Some("2"));

    assert_eq!(names(inventory.installed()), vec!["app", "kbx-demo"]);
    assert_eq!(names(inventory.upgradeable()), vec!["kbx-demo"]);
}

#[tokio::test]
async fn test_collect_without_remotes_skips_registry() {
    let listing = Listing::new();
    let inventory = listing.collect(None, false).await;

    assert!(listing.registry.queries().is_empty());
    let demo = find(&inventory, "kbx-demo");
    assert!(demo.registry_versions.is_empty());
    assert_eq!(demo.upgradeable(), None);
}

#[tokio::test]
async fn test_collect_restricted() {
    let listing = Listing::new();
    let restrict = vec!["app".to_string()];
    let inventory = listing.collect(Some(&restrict), true).await;

    assert_eq!(names(inventory.all().iter()), vec!["app"]);
    assert!(listing.registry.queries().is_empty());
}
