//! Redis Pub/Sub for cross-instance cache invalidation.

use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::backend::CachedEntry;

/// Channel carrying keys whose L1 copies must be dropped.
pub const INVALIDATION_CHANNEL: &str = "cache:invalidate";

const MAX_BACKOFF: Duration = Duration::from_secs(300);

/// A key changed by one instance, as published on [`INVALIDATION_CHANNEL`].
///
/// The payload is `"<origin uuid> <key>"`. Keys may contain spaces; the
/// origin never does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invalidation {
    pub origin: Uuid,
    pub key: String,
}

impl Invalidation {
    pub fn new(origin: Uuid, key: impl Into<String>) -> Self {
        Self {
            origin,
            key: key.into(),
        }
    }

    pub fn to_payload(&self) -> String {
        format!("{} {}", self.origin, self.key)
    }

    /// Returns `None` for payloads without a valid origin.
    pub fn parse(payload: &str) -> Option<Self> {
        let (origin, key) = payload.split_once(' ')?;
        let origin = Uuid::parse_str(origin).ok()?;
        Some(Self::new(origin, key))
    }
}

/// Cache invalidation listener that subscribes to Redis Pub/Sub.
///
/// ```text
/// Instance 1: cache.set("Communication:Banner", ..)
///   ↓
/// Redis Pub/Sub: PUBLISH cache:invalidate "<instance 1> Communication:Banner"
///   ↓
/// Instance 2: Listener receives key → removes from L1
/// Instance 1: Listener sees its own id → keeps its fresh L1 copy
/// ```
pub struct CacheInvalidationListener {
    pub redis_url: String,
    pub local_cache: Arc<DashMap<String, CachedEntry>>,
    pub instance_id: Uuid,
}

impl CacheInvalidationListener {
    /// Start listening in a background task.
    ///
    /// Reconnects with exponential backoff if the connection is lost.
    pub fn start(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut backoff = Duration::from_secs(1);

            loop {
                match self.run().await {
                    Ok(()) => {
                        backoff = Duration::from_secs(1);
                    }
                    Err(e) => {
                        tracing::error!(
                            error = %e,
                            backoff_secs = backoff.as_secs(),
                            "Cache invalidation listener error, reconnecting..."
                        );
                        tokio::time::sleep(backoff).await;
                        backoff = (backoff * 2).min(MAX_BACKOFF);
                    }
                }
            }
        })
    }

    /// Drops the L1 copy of a key another instance changed.
    fn apply(&self, payload: &str) {
        match Invalidation::parse(payload) {
            Some(message) if message.origin == self.instance_id => {}
            Some(message) => {
                tracing::debug!(key = %message.key, origin = %message.origin, "received cache invalidation");
                self.local_cache.remove(&message.key);
            }
            None => tracing::warn!(payload = %payload, "ignoring malformed invalidation"),
        }
    }

    async fn run(&self) -> Result<(), String> {
        use futures_util::StreamExt;

        let client = redis::Client::open(self.redis_url.clone())
            .map_err(|e| format!("failed to create Redis client: {e}"))?;

        let mut pubsub = client
            .get_async_pubsub()
            .await
            .map_err(|e| format!("failed to get pub/sub connection: {e}"))?;

        pubsub
            .subscribe(INVALIDATION_CHANNEL)
            .await
            .map_err(|e| format!("failed to subscribe: {e}"))?;

        tracing::info!(channel = INVALIDATION_CHANNEL, "Subscribed to cache invalidation");

        let mut stream = pubsub.on_message();
        loop {
            match stream.next().await {
                Some(msg) => match msg.get_payload::<String>() {
                    Ok(payload) => self.apply(&payload),
                    Err(_) => tracing::warn!("failed to parse invalidation message payload"),
                },
                None => {
                    return Err("pub/sub connection closed".to_string());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listener(instance_id: Uuid) -> CacheInvalidationListener {
        let local_cache = Arc::new(DashMap::new());
        local_cache.insert(
            "Communication:Banner".to_string(),
            CachedEntry::new(b"banner".to_vec(), None),
        );
        CacheInvalidationListener {
            redis_url: "redis://localhost:6379".into(),
            local_cache,
            instance_id,
        }
    }

    #[test]
    fn test_payload_round_trip_keeps_key_with_spaces() {
        let message = Invalidation::new(Uuid::new_v4(), "Communication:In App");
        assert_eq!(Invalidation::parse(&message.to_payload()), Some(message));
    }

    #[test]
    fn test_parse_rejects_payload_without_origin() {
        assert_eq!(Invalidation::parse("Communication:Banner"), None);
        assert_eq!(Invalidation::parse("not-a-uuid Communication:Banner"), None);
    }

    #[test]
    fn test_own_invalidation_keeps_local_copy() {
        let own = Uuid::new_v4();
        let listener = listener(own);

        listener.apply(&Invalidation::new(own, "Communication:Banner").to_payload());

        assert!(listener.local_cache.contains_key("Communication:Banner"));
    }

    #[test]
    fn test_other_instance_invalidation_evicts_local_copy() {
        let listener = listener(Uuid::new_v4());

        listener.apply(&Invalidation::new(Uuid::new_v4(), "Communication:Banner").to_payload());

        assert!(!listener.local_cache.contains_key("Communication:Banner"));
    }
}
