//! Upgrade migration scripts
//!
//! Moving an application from one version to another runs
//! `/kaboxer/scripts/pre-upgrade` in the old image, then
//! `/kaboxer/scripts/post-upgrade <old-version>` in the new one. Both
//! containers share a scratch directory mounted at `/kaboxer/upgrade-data`.
//! Images without the scripts need no migration.

use crate::engine::ContainerEngine;
use crate::error::{ResolveError, Result};
use crate::types::{ContainerExit, ContainerSpec, HookPhase, Mount};
use kaboxer_core::Version;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Mount point of the shared scratch directory
pub const UPGRADE_DATA_DIR: &str = "/kaboxer/upgrade-data";

pub struct UpgradeHookRunner {
    engine: Arc<dyn ContainerEngine>,
}

impl UpgradeHookRunner {
    pub fn new(engine: Arc<dyn ContainerEngine>) -> Self {
        Self { engine }
    }

    /// Run the migration from `old` (in `old_image`) to `new` (in `new_image`)
    ///
    /// Nothing happens without a previous version or when the versions match.
    /// A failing pre-upgrade script stops the migration before post-upgrade.
    pub async fn run_migration(
        &self,
        app: &str,
        old_image: &str,
        new_image: &str,
        old: Option<&Version>,
        new: &Version,
    ) -> Result<()> {
        let Some(old) = old else {
            return Ok(());
        };
        if old == new {
            return Ok(());
        }

        info!("Running upgrade scripts for {} ({} -> {})", app, old, new);
        let scratch = tempfile::Builder::new().prefix("kaboxer-upgrade-").tempdir()?;
        debug!("Upgrade data directory: {}", scratch.path().display());

        self.run_script(app, HookPhase::PreUpgrade, old_image, scratch.path(), &[])
            .await?;
        self.run_script(
            app,
            HookPhase::PostUpgrade,
            new_image,
            scratch.path(),
            &[old.as_str()],
        )
        .await
    }

    async fn run_script(
        &self,
        app: &str,
        phase: HookPhase,
        image: &str,
        scratch: &Path,
        args: &[&str],
    ) -> Result<()> {
        let mut command = vec![phase.script_path().to_string()];
        command.extend(args.iter().map(|a| a.to_string()));

        let spec = ContainerSpec {
            image: image.to_string(),
            command,
            mounts: vec![Mount {
                source: scratch.to_path_buf(),
                target: UPGRADE_DATA_DIR.to_string(),
            }],
        };

        match self.engine.run_ephemeral(&spec).await? {
            ContainerExit::Exited(0) => {
                debug!("{} {} script succeeded in {}", app, phase, image);
                Ok(())
            }
            ContainerExit::CommandNotFound => {
                debug!("{} has no {} script in {}", app, phase, image);
                Ok(())
            }
            ContainerExit::Exited(code) => Err(ResolveError::MigrationScriptFailure {
                app: app.to_string(),
                phase,
                image: image.to_string(),
                code,
            }),
        }
    }
}
