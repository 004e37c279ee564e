//! Deciding when a chunk opens a new frame even though its key matches the
//! pending group.
//!
//! Logcat can stamp two rapid, separate sends with the same millisecond, pid
//! and tid, so the key alone cannot always tell a continuation from a new
//! frame. The default rule is a heuristic taken from observed captures: every
//! outgoing frame begins with protobuf field 1 (tag byte `0x0A`), whose base64
//! image starts with `C`. Continuation chunks can also start with `C` by
//! chance, and other client builds may not share the framing at all, so the
//! rule is swappable.

/// Predicate classifying a chunk as the first piece of a frame.
pub trait FrameStart {
    fn starts_frame(&self, chunk: &str) -> bool;
}

/// Chunk starts a frame when its first character is the sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SentinelPrefix(pub char);

impl Default for SentinelPrefix {
    fn default() -> Self {
        SentinelPrefix('C')
    }
}

impl FrameStart for SentinelPrefix {
    fn starts_frame(&self, chunk: &str) -> bool {
        chunk.starts_with(self.0)
    }
}

/// Never forces a split; only key changes and unrelated lines end a frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NeverSplit;

impl FrameStart for NeverSplit {
    fn starts_frame(&self, _chunk: &str) -> bool {
        false
    }
}

impl<F> FrameStart for F
where
    F: Fn(&str) -> bool,
{
    fn starts_frame(&self, chunk: &str) -> bool {
        self(chunk)
    }
}
