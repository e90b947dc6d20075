//! Push delivery interface

use crate::error::DeliveryError;
use crate::message::PushMessage;
use async_trait::async_trait;
use std::sync::Arc;

/// Delivers rendered messages to a push provider.
///
/// Delivery is at-least-once: a job whose attempt succeeded may still be
/// re-sent if its completion could not be recorded, so implementations must
/// tolerate duplicates.
#[async_trait]
pub trait PushTransport: Send + Sync {
    /// Send one message
    async fn send(&self, message: &PushMessage) -> Result<(), DeliveryError>;
}

#[async_trait]
impl<T: PushTransport + ?Sized> PushTransport for Arc<T> {
    async fn send(&self, message: &PushMessage) -> Result<(), DeliveryError> {
        (**self).send(message).await
    }
}

/// Transport that only records deliveries in the log.
///
/// The default until a push provider is wired in.
#[derive(Debug, Clone, Default)]
pub struct TracingPushTransport;

#[async_trait]
impl PushTransport for TracingPushTransport {
    async fn send(&self, message: &PushMessage) -> Result<(), DeliveryError> {
        tracing::info!(
            job_id = %message.job_id,
            recipient = %message.recipient,
            notification_type = %message.notification_type,
            devices = message.device_tokens.len(),
            title = %message.title,
            "push notification delivered"
        );
        Ok(())
    }
}
