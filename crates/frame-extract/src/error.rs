use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("frame {position} is not valid base64: {source}")]
    InvalidBase64 {
        /// 1-based position of the frame in the extracted list.
        position: usize,
        #[source]
        source: base64::DecodeError,
    },
    #[error("unknown output format: {0}")]
    UnknownFormat(String),
    #[error("malformed frame list: {0}")]
    MalformedList(#[from] serde_json::Error),
    #[error("input file does not exist: {}", .0.display())]
    MissingInput(PathBuf),
    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type ExtractResult<T> = Result<T, ExtractError>;
