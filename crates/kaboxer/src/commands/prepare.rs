//! prepare and upgrade

use super::Runtime;
use crate::cli::PrepareArgs;
use crate::output;
use anyhow::{bail, Result};
use kaboxer_image::ResolutionResult;

pub async fn run(args: PrepareArgs, upgrade: bool) -> Result<()> {
    let runtime = Runtime::connect().await?;
    let resolver = runtime.resolver()?;

    let requests: Vec<_> = args
        .apps
        .into_iter()
        .map(|request| request.with_upgrade(upgrade))
        .collect();
    let results = resolver.resolve_all(&requests).await;

    let mut failed = 0;
    for result in results {
        // failures are already logged by the resolver
        match result {
            Ok(result) => report(&result),
            Err(_) => failed += 1,
        }
    }

    if failed > 0 {
        bail!("{} of {} applications could not be prepared", failed, requests.len());
    }
    Ok(())
}

fn report(result: &ResolutionResult) {
    match &result.previous {
        Some(previous) if result.changed() => output::success(&format!(
            "{} upgraded from {} to {}",
            result.app, previous, result.resolved
        )),
        Some(_) => output::info(&format!("{} is at {}", result.app, result.resolved)),
        None => output::success(&format!(
            "{} {} prepared from {}",
            result.app, result.resolved, result.source
        )),
    }
}
