//! Room Replay: brings a captured client session back to life.
//!
//! The flow mirrors what the native client does on startup:
//! 1. announce the room entry over HTTP
//! 2. open the websocket with the client's identity headers
//! 3. replay the captured join frames in order, pausing like the client did
//! 4. keep the seat with a periodic heartbeat until told to stop

pub mod config;
pub mod frames;
pub mod identity;
pub mod room;
pub mod session;
pub mod telemetry;
pub mod transport;

pub use config::{Cli, ConfigError, ReplayConfig};
pub use frames::{FrameSource, FrameStore, FrameStoreError};
pub use session::{HeartbeatExit, Session, SessionEnd, SessionError, SessionState, SessionTiming};
pub use transport::{Connection, TransportError};
