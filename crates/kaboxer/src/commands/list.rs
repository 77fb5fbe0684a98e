//! list

use super::Runtime;
use crate::cli::ListArgs;
use crate::output;
use anyhow::Result;
use kaboxer_core::Version;
use kaboxer_image::{AppStatus, Inventory};
use tabled::builder::Builder;
use tabled::settings::Style;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum View {
    Installed,
    Available,
    Upgradeable,
    All,
}

impl View {
    fn from_args(args: &ListArgs) -> Self {
        if args.all {
            View::All
        } else if args.upgradeable {
            View::Upgradeable
        } else if args.available {
            View::Available
        } else {
            View::Installed
        }
    }

    fn needs_remotes(self) -> bool {
        self != View::Installed
    }

    fn headers(self) -> &'static [&'static str] {
        match self {
            View::Installed => &["APP", "INSTALLED", "PACKAGING REVISION"],
            View::Available => &["APP", "AVAILABLE"],
            View::Upgradeable => &["APP", "INSTALLED", "UPGRADE TO"],
            View::All => &["APP", "INSTALLED", "AVAILABLE", "TARBALL"],
        }
    }

    fn row(self, status: &AppStatus) -> Vec<String> {
        let app = status.app.clone();
        match self {
            View::Installed => vec![
                app,
                cell(status.installed.as_ref()),
                packaging_revision(status),
            ],
            View::Available => vec![app, cell(status.available())],
            View::Upgradeable => vec![
                app,
                cell(status.installed.as_ref()),
                cell(status.upgradeable()),
            ],
            View::All => vec![
                app,
                cell(status.installed.as_ref()),
                cell(status.available()),
                cell(status.tarball.as_ref()),
            ],
        }
    }
}

fn cell(version: Option<&Version>) -> String {
    version.map(ToString::to_string).unwrap_or_else(|| "-".to_string())
}

/// `image/descriptor`, or just one side when the other is unknown
fn packaging_revision(status: &AppStatus) -> String {
    match (
        &status.packaging_revision_image,
        &status.packaging_revision_config,
    ) {
        (Some(image), Some(config)) if image != config => format!("{}/{}", image, config),
        (Some(revision), _) | (None, Some(revision)) => revision.clone(),
        (None, None) => "-".to_string(),
    }
}

pub async fn run(args: ListArgs) -> Result<()> {
    let view = View::from_args(&args);
    let runtime = Runtime::connect().await?;
    let resolver = runtime.resolver()?;

    let restrict = (!args.apps.is_empty()).then_some(args.apps.as_slice());
    let inventory = Inventory::collect(&resolver, restrict, view.needs_remotes()).await?;

    let statuses: Vec<&AppStatus> = match view {
        View::Installed => inventory.installed().collect(),
        View::Available => inventory.available().collect(),
        View::Upgradeable => inventory.upgradeable().collect(),
        View::All => inventory.all().iter().collect(),
    };

    if statuses.is_empty() {
        output::warning("No matching applications");
        return Ok(());
    }

    let mut builder = Builder::default();
    if !args.skip_headers {
        builder.push_record(view.headers().iter().map(|h| h.to_string()));
    }
    for status in statuses {
        builder.push_record(view.row(status));
    }

    let mut table = builder.build();
    table.with(Style::blank());
    println!("{}", table);
    Ok(())
}
