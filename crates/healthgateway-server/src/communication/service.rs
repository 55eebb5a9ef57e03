//! Cache-aside lookup of the active communication.
//!
//! The cache holds one [`RequestResult`] per banner type:
//!
//! | stored row                     | cached payload | count | TTL              |
//! |--------------------------------|----------------|-------|------------------|
//! | none, or `now >= expiry`       | none           | 0     | none             |
//! | `now < effective`              | the row        | 0     | `effective - now`|
//! | `effective <= now < expiry`    | the row        | 1     | `expiry - now`   |
//!
//! A future-dated row is cached so it becomes visible on its own once the
//! entry expires, but callers always see an empty result for it.

use std::sync::Arc;
use std::time::Duration;

use healthgateway_cache::{CacheProvider, add_typed, get_typed};
use healthgateway_core::{
    BannerChangeEvent, Communication, CommunicationType, ErrorTranslator, ErrorType,
    RequestResult, ServiceType, SharedClock,
};
use healthgateway_storage::{DbStatusCode, DynCommunicationStorage};
use tracing::{debug, info, instrument, warn};

use super::error::CommunicationError;

const STORAGE_ERRORS_TOTAL: &str = "healthgateway_communication_storage_errors_total";

/// Cached value for one banner type.
type CacheEntry = RequestResult<Communication>;

pub struct CommunicationService {
    storage: DynCommunicationStorage,
    cache: Arc<dyn CacheProvider>,
    errors: ErrorTranslator,
    clock: SharedClock,
}

impl CommunicationService {
    pub fn new(
        storage: DynCommunicationStorage,
        cache: Arc<dyn CacheProvider>,
        errors: ErrorTranslator,
        clock: SharedClock,
    ) -> Self {
        Self {
            storage,
            cache,
            errors,
            clock,
        }
    }

    /// Returns the communication of `communication_type` that is active now.
    ///
    /// "Nothing active" is a success with no payload. A storage failure is
    /// an error result carrying the storage message and a database error
    /// code; nothing is cached in that case.
    ///
    /// # Errors
    ///
    /// [`CommunicationError::InvalidCommunicationType`] for types other than
    /// `Banner` and `InApp`.
    #[instrument(skip_all, fields(communication_type = %communication_type))]
    pub async fn get_active_banner(
        &self,
        communication_type: CommunicationType,
    ) -> Result<RequestResult<Communication>, CommunicationError> {
        let key = communication_type
            .cache_key()
            .ok_or(CommunicationError::InvalidCommunicationType(communication_type))?;

        let entry = match self.cached(key).await {
            Some(entry) => entry,
            None => {
                info!("Active communication not found in cache, reading storage");
                let db_result = self.storage.get_next(communication_type).await;
                match db_result.status {
                    DbStatusCode::Read | DbStatusCode::NotFound => {
                        self.add_to_cache(key, db_result.payload).await
                    }
                    DbStatusCode::Error => {
                        let message = db_result.message.unwrap_or_default();
                        info!(message = %message, "Error getting communication from storage");
                        ::metrics::counter!(STORAGE_ERRORS_TOTAL).increment(1);
                        return Ok(RequestResult::error(
                            message,
                            self.errors
                                .service_error(ErrorType::CommunicationInternal, ServiceType::Database),
                        ));
                    }
                }
            }
        };

        let now = self.clock.now_utc();
        if entry
            .resource_payload
            .as_ref()
            .is_some_and(|communication| communication.is_future_at(now))
        {
            debug!("Communication is future dated, returning empty result");
            return Ok(RequestResult::empty());
        }

        Ok(entry)
    }

    /// Applies a committed storage change to the cached entry for its type.
    ///
    /// Events for types that are never cached are ignored.
    #[instrument(
        skip(self, event),
        fields(action = %event.action, communication_id = %event.data.id)
    )]
    pub async fn process_change(&self, event: &BannerChangeEvent) {
        let communication = &event.data;
        let Some(key) = communication.communication_type_code.cache_key() else {
            debug!(
                communication_type = %communication.communication_type_code,
                "Change for uncached communication type ignored"
            );
            return;
        };

        let cached = self
            .cached(key)
            .await
            .and_then(|entry| entry.resource_payload);

        match cached {
            Some(cached) if cached.id == communication.id => {
                info!("Change for cached communication");
                self.cache.remove_item(key).await;
                if event.action.is_upsert() {
                    self.add_to_cache(key, Some(communication.clone())).await;
                } else {
                    // The next lookup reads storage; a later communication may be waiting.
                    info!("Cached communication removed");
                }
            }
            Some(cached) => {
                let now = self.clock.now_utc();
                // Any action qualifies here, including a Delete.
                if !communication.is_expired_at(now)
                    && communication.effective_date_time < cached.effective_date_time
                {
                    info!(replaced = %cached.id, "Change replaces cached communication");
                    self.add_to_cache(key, Some(communication.clone())).await;
                } else {
                    info!(cached = %cached.id, "Change ignored");
                }
            }
            None => {
                info!("No communication in cache");
                if event.action.is_upsert() {
                    self.add_to_cache(key, Some(communication.clone())).await;
                }
            }
        }
    }

    /// Evicts the cached entries for every banner type.
    #[instrument(skip(self))]
    pub async fn clear_cache(&self) {
        for communication_type in [CommunicationType::Banner, CommunicationType::InApp] {
            if let Some(key) = communication_type.cache_key() {
                self.cache.remove_item(key).await;
            }
        }
        info!("Communication cache cleared");
    }

    /// Reads the entry under `key`. An entry that fails to decode is
    /// dropped and reported as a miss.
    async fn cached(&self, key: &str) -> Option<CacheEntry> {
        match get_typed::<CacheEntry>(self.cache.as_ref(), key).await {
            Ok(entry) => entry,
            Err(e) => {
                warn!(key = %key, error = %e, "Discarding undecodable cache entry");
                self.cache.remove_item(key).await;
                None
            }
        }
    }

    /// Stores the entry for `communication` under `key` and returns it.
    async fn add_to_cache(&self, key: &str, communication: Option<Communication>) -> CacheEntry {
        let now = self.clock.now_utc();
        let (entry, expiry): (CacheEntry, Option<Duration>) = match communication {
            Some(communication) if !communication.is_expired_at(now) => {
                if communication.is_future_at(now) {
                    info!(
                        communication_id = %communication.id,
                        until = %communication.effective_date_time,
                        "Communication is not effective yet, caching until it is"
                    );
                    let ttl = (communication.effective_date_time - now).unsigned_abs();
                    (RequestResult::success(Some(communication), 0), Some(ttl))
                } else {
                    info!(
                        communication_id = %communication.id,
                        until = %communication.expiry_date_time,
                        "Caching communication until expiry"
                    );
                    let ttl = (communication.expiry_date_time - now).unsigned_abs();
                    (RequestResult::success(Some(communication), 1), Some(ttl))
                }
            }
            _ => {
                info!("Communication is expired or absent, caching empty result without expiry");
                (RequestResult::empty(), None)
            }
        };

        if let Err(e) = add_typed(self.cache.as_ref(), key, &entry, expiry).await {
            warn!(key = %key, error = %e, "Failed to cache communication");
        }

        entry
    }
}
