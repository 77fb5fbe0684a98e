//! get-meta-file and get-upstream-version

use super::Runtime;
use anyhow::Result;

pub async fn run(app: &str, file: &str) -> Result<()> {
    let runtime = Runtime::connect().await?;
    let content = runtime.manager().meta_file(app, file).await?;
    println!("{}", content);
    Ok(())
}
