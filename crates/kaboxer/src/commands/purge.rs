//! purge

use super::Runtime;
use crate::cli::PurgeArgs;
use crate::output;
use anyhow::Result;

pub async fn run(args: PurgeArgs) -> Result<()> {
    let runtime = Runtime::connect().await?;
    let manager = runtime.manager();

    for (idx, app) in args.apps.iter().enumerate() {
        // prune once, after the last application
        let prune = args.prune && idx + 1 == args.apps.len();
        let removed = manager.purge(app, prune).await?;
        if removed.is_empty() {
            output::info(&format!("No images to remove for {}", app));
        } else {
            output::success(&format!("Purged {}: {}", app, removed.join(", ")));
        }
    }
    Ok(())
}
