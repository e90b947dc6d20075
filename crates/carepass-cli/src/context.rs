//! Service wiring for one CLI invocation

use crate::config::CarepassConfig;
use anyhow::{Context, Result};
use carepass_core::effects::PhysicalTimeEffects;
use carepass_core::PhysicalTime;
use carepass_effects::{FilesystemStorageHandler, RealTimeHandler, StaticDirectoryHandler};
use carepass_grant::GrantService;
use carepass_queue::{NotificationQueue, TracingPushTransport};
use carepass_token::TokenCodec;
use std::sync::Arc;

/// Services built from the configuration, sharing one store and one clock
pub struct Engine {
    /// Token codec
    pub codec: Arc<TokenCodec>,
    /// Notification queue
    pub queue: NotificationQueue,
    /// Grant service, enqueuing onto `queue`
    pub grants: GrantService,
    time: Arc<RealTimeHandler>,
}

impl Engine {
    /// Open the record store under `storage.data_dir` and load the roster
    pub async fn from_config(config: &CarepassConfig) -> Result<Self> {
        let storage = Arc::new(FilesystemStorageHandler::new(&config.storage.data_dir));
        let time = Arc::new(RealTimeHandler::new());

        let directory = match &config.storage.roster {
            Some(path) => StaticDirectoryHandler::load(path)
                .await
                .with_context(|| format!("failed to load roster {}", path.display()))?,
            None => {
                tracing::warn!("no directory roster configured; grant requests will not resolve");
                StaticDirectoryHandler::default()
            }
        };

        let codec = Arc::new(TokenCodec::new(config.tokens.clone()));
        let queue = NotificationQueue::new(
            storage.clone(),
            time.clone(),
            Arc::new(TracingPushTransport),
            config.queue.clone(),
        );
        let grants = GrantService::new(
            storage,
            Arc::new(directory),
            time.clone(),
            queue.clone(),
            codec.clone(),
            config.grants.clone(),
        );

        tracing::debug!(data_dir = %config.storage.data_dir.display(), "engine ready");
        Ok(Self {
            codec,
            queue,
            grants,
            time,
        })
    }

    /// Current wall-clock time
    pub async fn now(&self) -> Result<PhysicalTime> {
        Ok(self.time.physical_time().await?)
    }
}
