//! Kaboxer CLI - containerized application images
//!
//! Entry point for preparing, upgrading and inspecting the images of
//! applications described by `*.kaboxer.yaml` files.

mod cli;
mod commands;
mod output;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::{Cli, Commands};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Must happen before any TLS operation
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Prepare(args) => commands::prepare::run(args, false).await,
        Commands::Upgrade(args) => commands::prepare::run(args, true).await,
        Commands::List(args) => commands::list::run(args).await,
        Commands::GetMetaFile(args) => commands::meta::run(&args.app, &args.file).await,
        Commands::GetUpstreamVersion(args) => commands::meta::run(&args.app, "version").await,
        Commands::Load(args) => commands::load::run(args).await,
        Commands::Purge(args) => commands::purge::run(args).await,
    }
}

/// Initialize tracing with appropriate verbosity
fn init_tracing(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("info"),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}
