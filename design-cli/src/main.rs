//! # Design Tool
//!
//! Command-line host for building, compressing, storing and rendering
//! design documents.

use clap::Parser;
use design_cli::{commands, init_tracing, AppConfig, CliArgs};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let args = CliArgs::parse();
    let command = args.command.clone();
    let config = AppConfig::from(args);

    tracing::debug!(data_dir = %config.data_dir.display(), "starting design-tool");
    commands::run(&config, command).await
}
