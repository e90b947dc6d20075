//! Push transports for dispatch tests

use async_lock::Mutex;
use async_trait::async_trait;
use carepass_queue::{DeliveryError, PushMessage, PushTransport};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Records every delivered message
#[derive(Debug, Clone, Default)]
pub struct RecordingTransport {
    sent: Arc<Mutex<Vec<PushMessage>>>,
}

impl RecordingTransport {
    /// Empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages delivered so far, in order
    pub async fn sent(&self) -> Vec<PushMessage> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl PushTransport for RecordingTransport {
    async fn send(&self, message: &PushMessage) -> Result<(), DeliveryError> {
        self.sent.lock().await.push(message.clone());
        Ok(())
    }
}

/// Fails deliveries, then optionally recovers
#[derive(Debug, Clone)]
pub struct FailingTransport {
    remaining_failures: Arc<AtomicU32>,
    retryable: bool,
    attempts: Arc<AtomicU32>,
    delivered: RecordingTransport,
}

impl FailingTransport {
    /// Every attempt fails with a retryable error
    pub fn always() -> Self {
        Self::failing_times(u32::MAX)
    }

    /// The first `n` attempts fail with a retryable error, later ones succeed
    pub fn failing_times(n: u32) -> Self {
        Self {
            remaining_failures: Arc::new(AtomicU32::new(n)),
            retryable: true,
            attempts: Arc::new(AtomicU32::new(0)),
            delivered: RecordingTransport::new(),
        }
    }

    /// Every attempt fails with an error no retry can fix
    pub fn permanent() -> Self {
        Self {
            retryable: false,
            ..Self::always()
        }
    }

    /// Attempts made so far, failed or not
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Messages that got through
    pub async fn delivered(&self) -> Vec<PushMessage> {
        self.delivered.sent().await
    }
}

#[async_trait]
impl PushTransport for FailingTransport {
    async fn send(&self, message: &PushMessage) -> Result<(), DeliveryError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .remaining_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if !failing {
            return self.delivered.send(message).await;
        }
        if self.retryable {
            Err(DeliveryError::transient("push provider unavailable"))
        } else {
            Err(DeliveryError::permanent("device token rejected"))
        }
    }
}

/// Never completes within any realistic deadline
#[derive(Debug, Clone)]
pub struct StalledTransport {
    stall: Duration,
}

impl StalledTransport {
    /// Stall every delivery for `stall`
    pub fn new(stall: Duration) -> Self {
        Self { stall }
    }
}

#[async_trait]
impl PushTransport for StalledTransport {
    async fn send(&self, _message: &PushMessage) -> Result<(), DeliveryError> {
        tokio::time::sleep(self.stall).await;
        Ok(())
    }
}
