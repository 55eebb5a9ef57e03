//! PostgreSQL LISTEN/NOTIFY listener for communication changes.
//!
//! The `BannerChange` trigger publishes every committed insert, update and
//! delete on `gateway."Communication"`. This module decodes those
//! notifications and forwards them to subscribers.
//!
//! # Example
//!
//! ```ignore
//! use healthgateway_storage::BannerChangeListener;
//! use std::sync::Arc;
//!
//! let listener = Arc::new(BannerChangeListener::new(pool));
//! let mut rx = listener.subscribe();
//!
//! // Start listening in background
//! listener.clone().start();
//!
//! while let Ok(event) = rx.recv().await {
//!     println!("Communication changed: {:?}", event.action);
//! }
//! ```

use std::sync::Arc;
use std::time::Duration;

use healthgateway_core::{BannerChangeEvent, ChangeAction};
use serde::Deserialize;
use sqlx_postgres::{PgListener, PgPool};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};

use crate::error::StorageError;
use crate::record::CommunicationRecord;
use crate::traits::ChangeFeed;

/// PostgreSQL channel the communication trigger notifies on.
pub const BANNER_CHANGE_CHANNEL: &str = "BannerChange";

/// Reconnection delay on error.
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Broadcast channel capacity.
const CHANNEL_CAPACITY: usize = 100;

/// Payload from the `BannerChange` trigger.
#[derive(Debug, Deserialize)]
struct NotifyPayload {
    #[serde(rename = "Table", default)]
    table: Option<String>,
    #[serde(rename = "Action")]
    action: String,
    #[serde(rename = "Data", default)]
    data: Option<CommunicationRecord>,
}

impl NotifyPayload {
    fn to_change_action(&self) -> ChangeAction {
        self.action.parse().unwrap_or_else(|_| {
            warn!(action = %self.action, "Unknown action type, treating as Update");
            ChangeAction::Update
        })
    }

    /// Converts to an event. A notification without row data yields `None`.
    fn into_event(self) -> Result<Option<BannerChangeEvent>, StorageError> {
        let action = self.to_change_action();
        match self.data {
            Some(record) => Ok(Some(BannerChangeEvent::new(
                action,
                record.into_communication()?,
            ))),
            None => Ok(None),
        }
    }
}

/// Decodes a `BannerChange` notification payload.
///
/// Returns `Ok(None)` for notifications that carry no row.
pub fn parse_notification(payload: &str) -> Result<Option<BannerChangeEvent>, StorageError> {
    let parsed: NotifyPayload = serde_json::from_str(payload)?;
    if let Some(table) = &parsed.table {
        debug!(table = %table, action = %parsed.action, "Decoding change notification");
    }
    parsed.into_event()
}

/// PostgreSQL LISTEN/NOTIFY listener for communication changes.
///
/// Shared as `Arc<BannerChangeListener>`; every subscriber receives its own
/// copy of each event.
pub struct BannerChangeListener {
    pool: PgPool,
    channel: String,
    sender: broadcast::Sender<BannerChangeEvent>,
}

impl BannerChangeListener {
    /// Creates a listener on [`BANNER_CHANGE_CHANNEL`].
    ///
    /// Call `start()` to begin listening.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self::with_channel(pool, BANNER_CHANGE_CHANNEL)
    }

    #[must_use]
    pub fn with_channel(pool: PgPool, channel: impl Into<String>) -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            pool,
            channel: channel.into(),
            sender,
        }
    }

    /// Starts the listener in the background.
    ///
    /// The spawned task connects with LISTEN, decodes each NOTIFY and
    /// forwards it to subscribers. On connection errors it reconnects after
    /// a delay. Notifications sent while disconnected are lost.
    #[instrument(skip(self), name = "banner_change_listener")]
    pub fn start(self: Arc<Self>) -> JoinHandle<()> {
        info!(channel = %self.channel, "Starting communication change listener");

        tokio::spawn(async move {
            loop {
                match self.listen_loop().await {
                    Ok(()) => {
                        info!("Communication listener stopped gracefully");
                        break;
                    }
                    Err(e) => {
                        error!(
                            error = %e,
                            delay_secs = RECONNECT_DELAY.as_secs(),
                            "Communication listener error, reconnecting"
                        );
                        sleep(RECONNECT_DELAY).await;
                    }
                }
            }
        })
    }

    async fn listen_loop(&self) -> Result<(), StorageError> {
        let mut listener = PgListener::connect_with(&self.pool).await?;
        listener.listen(&self.channel).await?;

        info!(channel = %self.channel, "Listening for communication changes");

        loop {
            let notification = listener.recv().await?;
            let payload = notification.payload();

            debug!(payload = %payload, "Received communication NOTIFY");

            match parse_notification(payload) {
                Ok(Some(event)) => {
                    info!(
                        action = %event.action,
                        communication_id = %event.data.id,
                        communication_type = %event.data.communication_type_code,
                        "Communication changed"
                    );

                    if self.sender.send(event).is_err() {
                        warn!("Failed to send communication change event - no subscribers");
                    }
                }
                Ok(None) => {
                    warn!(payload = %payload, "Communication NOTIFY carried no row, skipping");
                }
                Err(e) => {
                    warn!(
                        error = %e,
                        payload = %payload,
                        "Failed to parse communication NOTIFY payload"
                    );
                }
            }
        }
    }
}

impl ChangeFeed for BannerChangeListener {
    fn subscribe(&self) -> broadcast::Receiver<BannerChangeEvent> {
        self.sender.subscribe()
    }
}
