//! In-memory communication storage.
//!
//! Rows live in a `DashMap`. Every write emits a [`BannerChangeEvent`] to
//! subscribers, the same way the PostgreSQL trigger does, so the change
//! propagation path can run without a database.

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use healthgateway_core::{
    BannerChangeEvent, ChangeAction, Communication, CommunicationType, SharedClock,
};
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

use crate::traits::{ChangeFeed, CommunicationStorage};
use crate::types::DbResult;

/// Broadcast channel capacity.
const CHANNEL_CAPACITY: usize = 100;

pub struct InMemoryCommunicationStorage {
    rows: DashMap<Uuid, Communication>,
    sender: broadcast::Sender<BannerChangeEvent>,
    clock: SharedClock,
}

impl InMemoryCommunicationStorage {
    pub fn new(clock: SharedClock) -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            rows: DashMap::new(),
            sender,
            clock,
        }
    }

    /// Inserts or replaces a communication and emits the matching event.
    ///
    /// Replacing bumps `version`. Returns the action that was emitted.
    pub fn upsert(&self, mut communication: Communication) -> ChangeAction {
        // The entry guard keeps the shard locked until the event is sent, so
        // events for one row go out in write order.
        match self.rows.entry(communication.id) {
            Entry::Occupied(mut occupied) => {
                communication.version = occupied.get().version.wrapping_add(1);
                occupied.insert(communication.clone());
                self.emit(BannerChangeEvent::updated(communication));
                ChangeAction::Update
            }
            Entry::Vacant(vacant) => {
                vacant.insert(communication.clone());
                self.emit(BannerChangeEvent::inserted(communication));
                ChangeAction::Insert
            }
        }
    }

    /// Removes a communication, emitting a delete event with the removed row.
    pub fn delete(&self, id: Uuid) -> Option<Communication> {
        let (_, removed) = self.rows.remove(&id)?;
        self.emit(BannerChangeEvent::deleted(removed.clone()));
        Some(removed)
    }

    pub fn get(&self, id: Uuid) -> Option<Communication> {
        self.rows.get(&id).map(|row| row.value().clone())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn emit(&self, event: BannerChangeEvent) {
        let action = event.action;
        let id = event.data.id;
        match self.sender.send(event) {
            Ok(subscribers) => {
                debug!(action = %action, communication_id = %id, subscribers, "Emitted communication change")
            }
            Err(_) => debug!(action = %action, communication_id = %id, "No change subscribers"),
        }
    }
}

#[async_trait]
impl CommunicationStorage for InMemoryCommunicationStorage {
    async fn get_next(&self, communication_type: CommunicationType) -> DbResult<Option<Communication>> {
        let now = self.clock.now_utc();
        let next = self
            .rows
            .iter()
            .filter(|row| {
                row.communication_type_code == communication_type && !row.is_expired_at(now)
            })
            .min_by_key(|row| (row.effective_date_time, row.id))
            .map(|row| row.value().clone());

        DbResult::read(next)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

impl ChangeFeed for InMemoryCommunicationStorage {
    fn subscribe(&self) -> broadcast::Receiver<BannerChangeEvent> {
        self.sender.subscribe()
    }
}
