use frame_extract::Frame;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{Listen, Session, SessionError, SessionState};
use crate::transport::TransportError;

/// Why the heartbeat task returned.
#[derive(Debug)]
pub enum HeartbeatExit {
    /// The session was stopped.
    Stopped { sent: u64 },
    /// A heartbeat could not be sent; the task stopped the session.
    Failed { sent: u64, error: TransportError },
}

impl Session {
    /// Starts the heartbeat task. Only allowed once the join sequence has
    /// been fully sent.
    pub fn spawn_heartbeat(&self, payload: Frame) -> Result<JoinHandle<HeartbeatExit>, SessionError> {
        let actual = self.state();
        if actual != SessionState::SteadyState {
            return Err(SessionError::InvalidState {
                expected: SessionState::SteadyState,
                actual,
            });
        }
        let session = self.clone();
        Ok(tokio::spawn(async move { session.heartbeat_loop(payload).await }))
    }

    async fn heartbeat_loop(&self, payload: Frame) -> HeartbeatExit {
        let timing = self.timing();
        let mut sent: u64 = 0;

        while self.pause(timing.heartbeat_period).await {
            if let Err(error) = self.send_frame(payload.as_bytes()).await {
                if self.is_stopped() {
                    break;
                }
                warn!(
                    target: "session::heartbeat",
                    sent,
                    error = %error,
                    "heartbeat send failed; ending session"
                );
                self.shutdown().await;
                return HeartbeatExit::Failed { sent, error };
            }
            sent += 1;
            info!(target: "session::heartbeat", seq = sent, "heartbeat sent");

            if let Some(window) = timing.heartbeat_listen {
                match self.listen(window).await {
                    Listen::Reply(len) => {
                        debug!(target: "session::heartbeat", len, "server replied")
                    }
                    Listen::Silent => {}
                    Listen::Failed(err) => {
                        debug!(target: "session::heartbeat", error = %err, "listen failed")
                    }
                    Listen::Cancelled => break,
                }
            }
        }

        debug!(target: "session::heartbeat", sent, "heartbeat task exiting");
        HeartbeatExit::Stopped { sent }
    }
}
