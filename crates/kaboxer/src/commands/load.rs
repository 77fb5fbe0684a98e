//! load

use super::Runtime;
use crate::cli::LoadArgs;
use crate::output;
use anyhow::{bail, Result};

pub async fn run(args: LoadArgs) -> Result<()> {
    if !args.tarball.is_file() {
        bail!("{} does not exist", args.tarball);
    }

    let runtime = Runtime::connect().await?;
    let version = runtime.manager().load(&args.app, &args.tarball).await?;
    output::success(&format!(
        "Loaded {} version {} from {}",
        args.app, version, args.tarball
    ));
    Ok(())
}
