use std::sync::Arc;

use healthgateway_core::BannerChangeEvent;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::service::CommunicationService;

/// Consumes change events from a broadcast channel and applies them to the
/// communication cache.
///
/// Events are handled one at a time, in the order they were sent.
pub struct ChangeDispatcher {
    service: Arc<CommunicationService>,
}

impl ChangeDispatcher {
    pub fn new(service: Arc<CommunicationService>) -> Self {
        Self { service }
    }

    /// Run the dispatcher until the channel is closed.
    ///
    /// A lagged receiver has lost events, so the cache can no longer be
    /// trusted and is cleared.
    pub async fn run(self, mut receiver: broadcast::Receiver<BannerChangeEvent>) {
        info!("Starting communication change dispatcher");

        loop {
            match receiver.recv().await {
                Ok(event) => {
                    self.service.process_change(&event).await;
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(missed = n, "Dispatcher lagged, clearing communication cache");
                    self.service.clear_cache().await;
                }
                Err(broadcast::error::RecvError::Closed) => {
                    info!("Change channel closed, stopping dispatcher");
                    break;
                }
            }
        }
    }

    /// Spawn [`run`](Self::run) on the runtime.
    pub fn start(self, receiver: broadcast::Receiver<BannerChangeEvent>) -> JoinHandle<()> {
        tokio::spawn(self.run(receiver))
    }

    pub fn service(&self) -> &Arc<CommunicationService> {
        &self.service
    }
}
