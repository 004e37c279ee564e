use tracing::{debug, trace};

use crate::boundary::{FrameStart, SentinelPrefix};
use crate::error::{ExtractError, ExtractResult};
use crate::frame::Frame;
use crate::record::{RecordKey, TracePattern};

/// Chunks believed to belong to one frame, in line order.
#[derive(Debug, Default)]
struct PendingGroup {
    key: Option<RecordKey>,
    chunks: Vec<String>,
}

impl PendingGroup {
    fn flush_into(&mut self, out: &mut Vec<String>) {
        if !self.chunks.is_empty() {
            out.push(self.chunks.concat());
            self.chunks.clear();
        }
        self.key = None;
    }

    fn start(&mut self, key: RecordKey, chunk: &str) {
        self.key = Some(key);
        self.chunks.push(chunk.to_string());
    }
}

/// Turns logcat lines into whole frames.
///
/// A pending group is flushed when an unrelated line appears, when the
/// (time, pid, tid) key changes, or when the boundary rule says the chunk
/// opens a new frame. The remaining chunks of a group are concatenated in the
/// order they were logged.
#[derive(Debug, Clone)]
pub struct FrameExtractor<P = SentinelPrefix> {
    pattern: TracePattern,
    boundary: P,
}

impl FrameExtractor<SentinelPrefix> {
    pub fn new() -> Self {
        Self {
            pattern: TracePattern::default(),
            boundary: SentinelPrefix::default(),
        }
    }
}

impl Default for FrameExtractor<SentinelPrefix> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: FrameStart> FrameExtractor<P> {
    pub fn with_boundary<Q: FrameStart>(self, boundary: Q) -> FrameExtractor<Q> {
        FrameExtractor {
            pattern: self.pattern,
            boundary,
        }
    }

    pub fn with_pattern(mut self, pattern: TracePattern) -> Self {
        self.pattern = pattern;
        self
    }

    /// Groups chunks into base64 strings without decoding them.
    pub fn assemble<I, S>(&self, lines: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut frames = Vec::new();
        let mut group = PendingGroup::default();
        let mut matched = 0usize;

        for line in lines {
            let line = line.as_ref();
            let Some(record) = self.pattern.parse(line) else {
                group.flush_into(&mut frames);
                continue;
            };
            matched += 1;

            let key = record.key();
            let opens_frame = group.key.as_ref() != Some(&key)
                || self.boundary.starts_frame(record.chunk);
            if opens_frame {
                group.flush_into(&mut frames);
                group.start(key, record.chunk);
            } else {
                trace!(
                    target: "frame_extract::group",
                    time = record.time,
                    pid = record.pid,
                    tid = record.tid,
                    "continuation chunk appended"
                );
                group.chunks.push(record.chunk.to_string());
            }
        }
        group.flush_into(&mut frames);

        debug!(
            target: "frame_extract::group",
            matched_lines = matched,
            frames = frames.len(),
            "assembled frames"
        );
        frames
    }

    /// Assembles and decodes every frame; fails on the first bad one.
    pub fn extract<I, S>(&self, lines: I) -> ExtractResult<Vec<Frame>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        validate(&self.assemble(lines))
    }
}

/// Decodes each assembled string, reporting the 1-based position of the
/// first one that is not valid base64.
pub fn validate<S: AsRef<str>>(frames: &[S]) -> ExtractResult<Vec<Frame>> {
    frames
        .iter()
        .enumerate()
        .map(|(idx, encoded)| {
            Frame::from_base64(encoded.as_ref()).map_err(|source| ExtractError::InvalidBase64 {
                position: idx + 1,
                source,
            })
        })
        .collect()
}
