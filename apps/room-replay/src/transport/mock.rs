use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;

use super::{Connection, TransportError};

/// One recorded send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentFrame {
    pub bytes: Vec<u8>,
    pub at: Instant,
}

/// In-memory connection that records traffic instead of sending it.
///
/// It never replies unless replies are queued, so each listen window runs to
/// its full length. Used by the session tests and by `--dry-run`.
#[derive(Debug, Default)]
pub struct MockConnection {
    sent: Mutex<Vec<SentFrame>>,
    replies: Mutex<VecDeque<Vec<u8>>>,
    fail_sends_from: Option<usize>,
    send_latency: Option<Duration>,
    close_latency: Option<Duration>,
    send_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    closes: AtomicUsize,
}

impl MockConnection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every send with a 0-based call index of `call` or later fails.
    pub fn failing_from(mut self, call: usize) -> Self {
        self.fail_sends_from = Some(call);
        self
    }

    /// Each send takes this long before it returns.
    pub fn with_send_latency(mut self, latency: Duration) -> Self {
        self.send_latency = Some(latency);
        self
    }

    /// `close` takes this long, widening the window for racing callers.
    pub fn with_close_latency(mut self, latency: Duration) -> Self {
        self.close_latency = Some(latency);
        self
    }

    /// Queues a message the next listen will receive.
    pub fn push_reply(&self, reply: impl Into<Vec<u8>>) {
        self.replies.lock().push_back(reply.into());
    }

    pub fn sent(&self) -> Vec<SentFrame> {
        self.sent.lock().clone()
    }

    pub fn sent_payloads(&self) -> Vec<Vec<u8>> {
        self.sent.lock().iter().map(|frame| frame.bytes.clone()).collect()
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    /// Highest number of sends observed running at the same time.
    pub fn max_concurrent_sends(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connection for MockConnection {
    async fn send(&self, frame: &[u8]) -> Result<(), TransportError> {
        let call = self.send_calls.fetch_add(1, Ordering::SeqCst);
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);

        if let Some(latency) = self.send_latency {
            tokio::time::sleep(latency).await;
        }
        let result = match self.fail_sends_from {
            Some(limit) if call >= limit => Err(TransportError::Other(format!(
                "injected send failure on call {call}"
            ))),
            _ => {
                self.sent.lock().push(SentFrame {
                    bytes: frame.to_vec(),
                    at: Instant::now(),
                });
                Ok(())
            }
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn recv_timeout(&self, window: Duration) -> Result<Option<Vec<u8>>, TransportError> {
        let queued = self.replies.lock().pop_front();
        match queued {
            Some(reply) => Ok(Some(reply)),
            None => {
                tokio::time::sleep(window).await;
                Ok(None)
            }
        }
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.close_latency {
            tokio::time::sleep(latency).await;
        }
        Ok(())
    }
}
