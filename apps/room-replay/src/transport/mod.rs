use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub mod mock;
pub mod websocket;

pub use mock::MockConnection;
pub use websocket::{WebSocketConnection, WsTarget};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("tls setup failed: {0}")]
    Tls(#[from] native_tls::Error),
    #[error("connect timed out after {0:?}")]
    ConnectTimeout(Duration),
    #[error("invalid handshake header {name}: {reason}")]
    InvalidHeader { name: String, reason: String },
    #[error("connection closed")]
    Closed,
    #[error("{0}")]
    Other(String),
}

/// A live, message-oriented duplex connection to the room gateway.
///
/// Each frame goes out as one binary message. Replies are opaque.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Sends one binary message.
    async fn send(&self, frame: &[u8]) -> Result<(), TransportError>;

    /// Waits at most `window` for the next data message. `Ok(None)` means
    /// the window elapsed without one.
    async fn recv_timeout(&self, window: Duration) -> Result<Option<Vec<u8>>, TransportError>;

    /// Closes the connection.
    async fn close(&self) -> Result<(), TransportError>;
}
