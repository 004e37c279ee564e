use frame_extract::Frame;
use tracing::{debug, error, info, warn};

use super::{Listen, Session, SessionError, SessionState};

/// What the join replay observed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayReport {
    pub sent: usize,
    pub replies: usize,
    pub silent: usize,
    /// False when the session was stopped before the last frame went out.
    pub completed: bool,
}

impl Session {
    /// Sends the join frames once, in order.
    ///
    /// After each send the session listens for up to the listen window; a
    /// reply or silence are both fine and neither is matched against the
    /// frame. A failed send tears the session down and is returned as an
    /// error. A stop request ends the replay early with `completed == false`.
    pub async fn replay(&self, frames: &[Frame]) -> Result<ReplayReport, SessionError> {
        self.transition(SessionState::Idle, SessionState::Replaying)?;
        let timing = self.timing();
        let total = frames.len();
        let mut report = ReplayReport::default();
        info!(target: "session::replay", frames = total, "replaying join sequence");

        for (idx, frame) in frames.iter().enumerate() {
            let position = idx + 1;
            if let Err(source) = self.send_frame(frame.as_bytes()).await {
                if self.is_stopped() {
                    info!(target: "session::replay", position, total, "replay stopped");
                    return Ok(report);
                }
                error!(
                    target: "session::replay",
                    position,
                    total,
                    error = %source,
                    "join frame send failed; aborting replay"
                );
                self.shutdown().await;
                return Err(SessionError::Replay {
                    position,
                    total,
                    source,
                });
            }
            report.sent += 1;

            match self.listen(timing.listen_window).await {
                Listen::Reply(len) => {
                    report.replies += 1;
                    debug!(target: "session::replay", position, total, len, "frame sent (reply)");
                }
                Listen::Silent => {
                    report.silent += 1;
                    debug!(target: "session::replay", position, total, "frame sent (no reply)");
                }
                Listen::Failed(err) => {
                    warn!(
                        target: "session::replay",
                        position,
                        total,
                        error = %err,
                        "listen after frame failed"
                    );
                }
                Listen::Cancelled => return Ok(report),
            }

            if !self.pause(timing.pacing).await {
                return Ok(report);
            }
        }

        if self
            .transition(SessionState::Replaying, SessionState::SteadyState)
            .is_err()
        {
            return Ok(report);
        }
        report.completed = true;
        info!(
            target: "session::replay",
            sent = report.sent,
            replies = report.replies,
            "join sequence complete"
        );
        Ok(report)
    }
}
