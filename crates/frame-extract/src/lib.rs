//! Frame Extract: rebuilds websocket payloads from `AutoOnline` logcat dumps.
//!
//! Logcat truncates long messages, so one outgoing websocket frame is often
//! logged as several consecutive lines sharing a timestamp, pid and tid. This
//! crate:
//! - matches trace lines and pulls out their base64 chunks
//! - regroups split chunks into whole frames, in log order
//! - validates every rebuilt frame as base64 before handing it out
//! - renders frame lists in the formats the replay tooling reads back

pub mod boundary;
pub mod cli;
pub mod error;
pub mod extract;
pub mod format;
pub mod frame;
pub mod record;

pub use boundary::{FrameStart, NeverSplit, SentinelPrefix};
pub use error::{ExtractError, ExtractResult};
pub use extract::{validate, FrameExtractor};
pub use format::{parse_frame_list, render, OutputFormat};
pub use frame::Frame;
pub use record::{RecordKey, TracePattern, TraceRecord};
