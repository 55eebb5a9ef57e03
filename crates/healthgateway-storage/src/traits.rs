//! Storage seams used by the communication service.

use std::sync::Arc;

use async_trait::async_trait;
use healthgateway_core::{BannerChangeEvent, Communication, CommunicationType};
use tokio::sync::broadcast;

use crate::types::DbResult;

/// Read access to stored communications.
#[async_trait]
pub trait CommunicationStorage: Send + Sync {
    /// Returns the unexpired communication of `communication_type` with the
    /// earliest effective date, or an empty payload when none exists.
    ///
    /// "Unexpired" means the current UTC time is before the expiry
    /// timestamp; rows that are not effective yet still qualify.
    async fn get_next(&self, communication_type: CommunicationType) -> DbResult<Option<Communication>>;

    /// Short backend name for logs.
    fn backend_name(&self) -> &'static str;
}

/// Shared storage handle.
pub type DynCommunicationStorage = Arc<dyn CommunicationStorage>;

/// A source of committed communication changes.
///
/// Every subscriber receives its own copy of each event, in commit order.
pub trait ChangeFeed: Send + Sync {
    fn subscribe(&self) -> broadcast::Receiver<BannerChangeEvent>;
}
