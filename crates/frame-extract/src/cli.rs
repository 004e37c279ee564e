use std::fs;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use crate::boundary::{NeverSplit, SentinelPrefix};
use crate::error::ExtractError;
use crate::extract::{validate, FrameExtractor};
use crate::format::{render, OutputFormat};

/// Log filter when `RUST_LOG` is unset. Logs go to stderr, so the run
/// summary stays visible without touching the frame output.
pub const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Parser, Debug)]
#[command(
    name = "ws-log-to-frames",
    about = "Extract websocket frames from AutoOnline logcat dumps"
)]
pub struct Cli {
    /// Path to the logcat dump.
    #[arg(long)]
    pub input: PathBuf,

    /// File to write frames to. Defaults to stdout.
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Output representation.
    #[arg(long, value_enum, default_value_t = OutputFormat::Python)]
    pub format: OutputFormat,

    /// First character that marks a chunk as the start of a new frame.
    #[arg(long, default_value_t = 'C', conflicts_with = "no_sentinel")]
    pub sentinel: char,

    /// Split frames only on key changes and unrelated lines.
    #[arg(long)]
    pub no_sentinel: bool,
}

/// Summary of one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub lines: usize,
    pub frames: usize,
}

/// Reads the dump, validates the rebuilt frames and writes them out.
/// Nothing is written when any frame fails validation.
pub fn run(cli: &Cli, stdout: &mut dyn Write) -> Result<Outcome> {
    if !cli.input.exists() {
        return Err(ExtractError::MissingInput(cli.input.clone()).into());
    }
    let text = fs::read_to_string(&cli.input).map_err(|source| ExtractError::Io {
        path: cli.input.clone(),
        source,
    })?;
    let lines: Vec<&str> = text.lines().collect();

    let frames = if cli.no_sentinel {
        FrameExtractor::new()
            .with_boundary(NeverSplit)
            .assemble(&lines)
    } else {
        FrameExtractor::new()
            .with_boundary(SentinelPrefix(cli.sentinel))
            .assemble(&lines)
    };
    validate(&frames)?;
    let rendered = render(&frames, cli.format)?;

    match &cli.output {
        Some(path) => fs::write(path, &rendered)
            .with_context(|| format!("failed to write frames to {}", path.display()))?,
        None => stdout
            .write_all(rendered.as_bytes())
            .context("failed to write frames to stdout")?,
    }

    info!(
        lines = lines.len(),
        frames = frames.len(),
        format = %cli.format,
        "frames extracted"
    );
    Ok(Outcome {
        lines: lines.len(),
        frames: frames.len(),
    })
}
