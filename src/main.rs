use anyhow::Result;
use clap::Parser;

use crate::cli::CliArgs;

mod assets;
mod classify;
mod cli;
mod config;
mod delete;
mod format;
mod pattern;
mod policy;
mod scan;
mod theme;
mod workspace;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse args first to check verbose flag.
    let args = CliArgs::parse();

    // When verbose is set, always use debug level (override RUST_LOG);
    // otherwise respect RUST_LOG or default to warn.
    if args.is_verbose() {
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    args.run().await?;

    Ok(())
}
