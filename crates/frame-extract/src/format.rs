use std::fmt;
use std::str::FromStr;

use crate::error::{ExtractError, ExtractResult};

/// Output representation for a frame list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Python list literal, ready to paste into a join-sequence module.
    #[default]
    Python,
    /// One base64 frame per line.
    Plain,
    /// Pretty-printed JSON array.
    Json,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Python => "python",
            OutputFormat::Plain => "plain",
            OutputFormat::Json => "json",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = ExtractError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "python" => Ok(OutputFormat::Python),
            "plain" => Ok(OutputFormat::Plain),
            "json" => Ok(OutputFormat::Json),
            other => Err(ExtractError::UnknownFormat(other.to_string())),
        }
    }
}

pub fn render<S: AsRef<str>>(frames: &[S], format: OutputFormat) -> ExtractResult<String> {
    match format {
        OutputFormat::Python => {
            let body = frames
                .iter()
                .map(|frame| format!("\"{}\"", frame.as_ref()))
                .collect::<Vec<_>>()
                .join(",\n    ");
            Ok(format!("[\n    {body}\n]"))
        }
        OutputFormat::Plain => Ok(frames
            .iter()
            .map(|frame| frame.as_ref())
            .collect::<Vec<&str>>()
            .join("\n")),
        OutputFormat::Json => {
            let items: Vec<&str> = frames.iter().map(|frame| frame.as_ref()).collect();
            Ok(serde_json::to_string_pretty(&items)?)
        }
    }
}

/// Reads back a list written by [`render`] in any format.
///
/// The python and json forms are both JSON arrays of strings; everything
/// else is read as plain text with one frame per non-blank line.
pub fn parse_frame_list(text: &str) -> ExtractResult<Vec<String>> {
    let trimmed = text.trim();
    if trimmed.starts_with('[') {
        return Ok(serde_json::from_str(trimmed)?);
    }
    Ok(trimmed
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}
