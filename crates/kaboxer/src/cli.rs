//! CLI argument parsing with clap

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use kaboxer_image::ResolutionRequest;

/// Kaboxer - run applications shipped as container images
#[derive(Parser, Debug)]
#[command(name = "kaboxer")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only report errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Make sure an image is available and tagged current for each application
    Prepare(PrepareArgs),

    /// Move applications to the newest available version
    Upgrade(PrepareArgs),

    /// List installed, available or upgradeable applications
    List(ListArgs),

    /// Print a file from /kaboxer in the application's current image
    GetMetaFile(GetMetaFileArgs),

    /// Print the upstream version of the application's current image
    GetUpstreamVersion(AppArgs),

    /// Load an image archive for an application
    Load(LoadArgs),

    /// Remove the application's images
    Purge(PurgeArgs),
}

#[derive(Args, Debug)]
pub struct PrepareArgs {
    /// Applications, as APP or APP=VERSION
    #[arg(required = true, value_name = "APP[=VERSION]")]
    pub apps: Vec<ResolutionRequest>,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Restrict the listing to these applications
    pub apps: Vec<String>,

    /// Installed applications (default)
    #[arg(long)]
    pub installed: bool,

    /// Versions available locally or in registries
    #[arg(long)]
    pub available: bool,

    /// Applications with a newer version than the installed one
    #[arg(long)]
    pub upgradeable: bool,

    /// Installed and available versions of every application
    #[arg(long, conflicts_with_all = ["installed", "available", "upgradeable"])]
    pub all: bool,

    /// Do not print column headers
    #[arg(long)]
    pub skip_headers: bool,
}

#[derive(Args, Debug)]
pub struct GetMetaFileArgs {
    pub app: String,

    /// File name under /kaboxer
    pub file: String,
}

#[derive(Args, Debug)]
pub struct AppArgs {
    pub app: String,
}

#[derive(Args, Debug)]
pub struct LoadArgs {
    pub app: String,

    /// Image archive produced by `docker save`
    pub tarball: Utf8PathBuf,
}

#[derive(Args, Debug)]
pub struct PurgeArgs {
    #[arg(required = true)]
    pub apps: Vec<String>,

    /// Also remove dangling images
    #[arg(long)]
    pub prune: bool,
}
