//! Frame Store: the join sequence and heartbeat payload, decoded once.

use std::fs;
use std::path::{Path, PathBuf};

use frame_extract::{parse_frame_list, validate, ExtractError, Frame, FrameExtractor};
use thiserror::Error;
use tracing::{info, warn};

/// Steady-state heartbeat captured right after a successful join.
pub const DEFAULT_HEARTBEAT_B64: &str =
    "ChsKC2lreGRfcm9vbV9kEMK48LSjMyIFZW5fY2EQCxoXc180MzA1NjAyNzA1XzQ0NjM4NDM2OTJa";

/// Where the join sequence comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameSource {
    /// Output of `ws-log-to-frames` in any of its formats.
    List(PathBuf),
    /// A raw logcat dump, run through the extractor at load time.
    TraceLog(PathBuf),
}

impl FrameSource {
    pub fn path(&self) -> &Path {
        match self {
            FrameSource::List(path) | FrameSource::TraceLog(path) => path,
        }
    }
}

#[derive(Debug, Error)]
pub enum FrameStoreError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("join sequence: {0}")]
    Join(#[from] ExtractError),
    #[error("heartbeat payload is not valid base64: {0}")]
    Heartbeat(#[source] base64::DecodeError),
    #[error("heartbeat payload is empty")]
    EmptyHeartbeat,
}

/// Immutable frames for one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameStore {
    pub join: Vec<Frame>,
    pub heartbeat: Frame,
}

impl FrameStore {
    pub fn new(join: Vec<Frame>, heartbeat: Frame) -> Self {
        Self { join, heartbeat }
    }

    /// Decodes base64 join frames and the heartbeat.
    pub fn from_encoded<S: AsRef<str>>(
        join: &[S],
        heartbeat_b64: &str,
    ) -> Result<Self, FrameStoreError> {
        let join = validate(join)?;
        Self::with_heartbeat(join, heartbeat_b64)
    }

    pub fn load(source: &FrameSource, heartbeat_b64: &str) -> Result<Self, FrameStoreError> {
        let path = source.path();
        let text = fs::read_to_string(path).map_err(|source| FrameStoreError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let join = match source {
            FrameSource::List(_) => {
                let encoded = parse_frame_list(&text)?;
                validate(&encoded)?
            }
            FrameSource::TraceLog(_) => FrameExtractor::new().extract(text.lines())?,
        };
        info!(
            path = %path.display(),
            frames = join.len(),
            bytes = join.iter().map(Frame::len).sum::<usize>(),
            "join sequence loaded"
        );
        Self::with_heartbeat(join, heartbeat_b64)
    }

    fn with_heartbeat(join: Vec<Frame>, heartbeat_b64: &str) -> Result<Self, FrameStoreError> {
        if join.is_empty() {
            warn!("join sequence is empty; the session will go straight to heartbeats");
        }
        let heartbeat =
            Frame::from_base64(heartbeat_b64.trim()).map_err(FrameStoreError::Heartbeat)?;
        if heartbeat.is_empty() {
            return Err(FrameStoreError::EmptyHeartbeat);
        }
        Ok(Self::new(join, heartbeat))
    }
}
