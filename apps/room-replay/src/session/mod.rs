//! Session Replay Engine.
//!
//! A session walks `Idle -> Replaying -> SteadyState -> Stopped`. The join
//! frames go out strictly in order, each followed by a bounded listen and a
//! pacing delay; only after the last one has been sent does the heartbeat
//! task start. Every path that ends the session funnels through
//! [`Session::shutdown`], which flips the shared cancellation token and
//! closes the connection exactly once.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::Mutex as AsyncMutex;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::frames::FrameStore;
use crate::transport::{Connection, TransportError};

mod heartbeat;
mod replay;

pub use heartbeat::HeartbeatExit;
pub use replay::ReplayReport;

/// Upper bound on how long teardown waits for the peer to take our close.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Replaying,
    SteadyState,
    Stopped,
}

/// Timing that imitates the captured client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTiming {
    /// How long to wait for a reply after each join frame.
    pub listen_window: Duration,
    /// Pause between join frames.
    pub pacing: Duration,
    /// Interval between heartbeats.
    pub heartbeat_period: Duration,
    /// Optional listen after each heartbeat.
    pub heartbeat_listen: Option<Duration>,
}

impl Default for SessionTiming {
    fn default() -> Self {
        Self {
            listen_window: Duration::from_secs(1),
            pacing: Duration::from_millis(150),
            heartbeat_period: Duration::from_secs(15),
            heartbeat_listen: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("join frame {position}/{total} send failed: {source}")]
    Replay {
        position: usize,
        total: usize,
        #[source]
        source: TransportError,
    },
    #[error("session is {actual:?}, expected {expected:?}")]
    InvalidState {
        expected: SessionState,
        actual: SessionState,
    },
    #[error("heartbeat task ended abnormally: {0}")]
    HeartbeatTask(#[from] tokio::task::JoinError),
}

/// How a session that ran to completion ended.
#[derive(Debug)]
pub enum SessionEnd {
    /// Stopped on request (interrupt or explicit shutdown).
    Shutdown { heartbeats: u64 },
    /// The heartbeat could not be delivered; the session is torn down.
    HeartbeatFailed {
        heartbeats: u64,
        error: TransportError,
    },
}

/// Outcome of one bounded listen.
#[derive(Debug)]
pub(crate) enum Listen {
    Reply(usize),
    Silent,
    Failed(TransportError),
    Cancelled,
}

struct Shared {
    connection: Arc<dyn Connection>,
    send_lock: AsyncMutex<()>,
    cancel: CancellationToken,
    closed: AtomicBool,
    state: Mutex<SessionState>,
    timing: SessionTiming,
}

/// Handle to one replay session. Clones share the same session.
#[derive(Clone)]
pub struct Session {
    shared: Arc<Shared>,
}

impl Session {
    pub fn new(connection: Arc<dyn Connection>, timing: SessionTiming) -> Self {
        Self {
            shared: Arc::new(Shared {
                connection,
                send_lock: AsyncMutex::new(()),
                cancel: CancellationToken::new(),
                closed: AtomicBool::new(false),
                state: Mutex::new(SessionState::Idle),
                timing,
            }),
        }
    }

    pub fn state(&self) -> SessionState {
        *self.shared.state.lock()
    }

    pub fn timing(&self) -> SessionTiming {
        self.shared.timing
    }

    pub fn is_stopped(&self) -> bool {
        self.shared.cancel.is_cancelled()
    }

    /// Resolves once shutdown has been requested by any path.
    pub async fn stopped(&self) {
        self.shared.cancel.cancelled().await
    }

    /// Stops the session: sets the flag, then closes the connection.
    ///
    /// Safe to call from any task, any number of times; only the first call
    /// closes the connection.
    pub async fn shutdown(&self) {
        self.shared.cancel.cancel();
        if self.shared.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        *self.shared.state.lock() = SessionState::Stopped;

        match timeout(CLOSE_TIMEOUT, self.shared.connection.close()).await {
            Ok(Ok(())) => info!("connection closed; offline now"),
            Ok(Err(err)) => warn!(error = %err, "connection close reported an error"),
            Err(_) => warn!(
                timeout = ?CLOSE_TIMEOUT,
                "connection close did not finish; dropping it"
            ),
        }
    }

    /// Replays the join sequence, runs the heartbeat, and waits until
    /// `shutdown_signal` fires or the heartbeat gives up. The connection is
    /// closed on every exit path.
    pub async fn run<F>(
        &self,
        store: &FrameStore,
        shutdown_signal: F,
    ) -> Result<SessionEnd, SessionError>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown_signal);

        let report = tokio::select! {
            biased;
            _ = &mut shutdown_signal => {
                info!("interrupted during join replay");
                self.shutdown().await;
                return Ok(SessionEnd::Shutdown { heartbeats: 0 });
            }
            result = self.replay(&store.join) => result?,
        };
        if !report.completed {
            self.shutdown().await;
            return Ok(SessionEnd::Shutdown { heartbeats: 0 });
        }

        let heartbeat = match self.spawn_heartbeat(store.heartbeat.clone()) {
            Ok(handle) => handle,
            Err(err) => {
                self.shutdown().await;
                return Err(err);
            }
        };
        info!(
            period = ?self.timing().heartbeat_period,
            "keep-alive running; waiting for shutdown"
        );

        tokio::select! {
            _ = &mut shutdown_signal => info!("shutdown requested"),
            _ = self.stopped() => debug!("session stopped from within"),
        }
        self.shutdown().await;

        match heartbeat.await? {
            HeartbeatExit::Stopped { sent } => Ok(SessionEnd::Shutdown { heartbeats: sent }),
            HeartbeatExit::Failed { sent, error } => Ok(SessionEnd::HeartbeatFailed {
                heartbeats: sent,
                error,
            }),
        }
    }

    /// Moves `from -> to`; refuses if the session is elsewhere (typically
    /// already stopped).
    fn transition(&self, from: SessionState, to: SessionState) -> Result<(), SessionError> {
        let mut state = self.shared.state.lock();
        if *state != from {
            return Err(SessionError::InvalidState {
                expected: from,
                actual: *state,
            });
        }
        *state = to;
        Ok(())
    }

    /// Sends one frame. Sends never overlap, and none start once the session
    /// is stopped.
    async fn send_frame(&self, frame: &[u8]) -> Result<(), TransportError> {
        let _guard = self.shared.send_lock.lock().await;
        if self.is_stopped() {
            return Err(TransportError::Closed);
        }
        self.shared.connection.send(frame).await
    }

    /// Waits up to `window` for any incoming message. Purely observational.
    async fn listen(&self, window: Duration) -> Listen {
        tokio::select! {
            biased;
            _ = self.shared.cancel.cancelled() => Listen::Cancelled,
            result = self.shared.connection.recv_timeout(window) => match result {
                Ok(Some(reply)) => Listen::Reply(reply.len()),
                Ok(None) => Listen::Silent,
                Err(err) => Listen::Failed(err),
            },
        }
    }

    /// Sleeps for `delay`; returns false if the session stopped first.
    async fn pause(&self, delay: Duration) -> bool {
        tokio::select! {
            biased;
            _ = self.shared.cancel.cancelled() => false,
            _ = sleep(delay) => true,
        }
    }
}
