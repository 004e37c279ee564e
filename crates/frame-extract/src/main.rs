use std::io;

use anyhow::Result;
use clap::Parser;
use frame_extract::cli::{run, Cli, DEFAULT_LOG_FILTER};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // stdout carries the frames; logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)))
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    run(&cli, &mut handle)?;
    Ok(())
}
