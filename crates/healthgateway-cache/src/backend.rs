//! Cache backend implementation with L1 (DashMap) and L2 (Redis) tiers.

use dashmap::DashMap;
use deadpool_redis::Pool;
use redis::AsyncCommands;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::metrics::{record_cache_hit, record_cache_miss, set_cache_entries};
use crate::pubsub::{INVALIDATION_CHANNEL, Invalidation};

/// A cached entry with an optional TTL.
///
/// The data is wrapped in `Arc` so cache hits don't copy the payload.
#[derive(Clone, Debug)]
pub struct CachedEntry {
    pub data: Arc<Vec<u8>>,
    pub cached_at: Instant,
    /// `None` keeps the entry until it is removed.
    pub ttl: Option<Duration>,
}

impl CachedEntry {
    pub fn new(data: Vec<u8>, ttl: Option<Duration>) -> Self {
        Self {
            data: Arc::new(data),
            cached_at: Instant::now(),
            ttl,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.ttl.is_some_and(|ttl| self.cached_at.elapsed() > ttl)
    }
}

/// Two-tier cache backend: L1 (DashMap) + L2 (Redis).
///
/// ## Cache Modes
///
/// - **Local**: Single-instance mode using only DashMap
/// - **Redis**: Multi-instance mode with DashMap (L1) + Redis (L2)
#[derive(Clone)]
pub enum CacheBackend {
    /// Single-instance: local DashMap only
    Local(Arc<DashMap<String, CachedEntry>>),

    /// Multi-instance: Redis + local L1
    Redis {
        redis: Pool,
        local: Arc<DashMap<String, CachedEntry>>,
        /// Tags this instance's invalidations so its own listener skips them.
        instance_id: Uuid,
    },
}

impl CacheBackend {
    /// Create a new local-only cache backend.
    pub fn new_local() -> Self {
        CacheBackend::Local(Arc::new(DashMap::new()))
    }

    /// Create a new Redis-backed cache backend.
    pub fn new_redis(redis_pool: Pool) -> Self {
        CacheBackend::Redis {
            redis: redis_pool,
            local: Arc::new(DashMap::new()),
            instance_id: Uuid::new_v4(),
        }
    }

    /// Get a value from the cache.
    ///
    /// ## Lookup Order
    ///
    /// 1. Check L1 (DashMap)
    /// 2. Check L2 (Redis)
    /// 3. Return None if not found
    ///
    /// A value found in L2 is promoted to L1 with the TTL Redis still has
    /// left on it.
    pub async fn get(&self, key: &str) -> Option<Arc<Vec<u8>>> {
        match self {
            CacheBackend::Local(map) => {
                let result = lookup_local(map, key);
                if result.is_some() {
                    tracing::debug!(key = %key, "cache hit (L1)");
                    record_cache_hit("L1");
                } else {
                    record_cache_miss();
                }
                result
            }
            CacheBackend::Redis { redis, local, .. } => {
                if let Some(data) = lookup_local(local, key) {
                    tracing::debug!(key = %key, "cache hit (L1)");
                    record_cache_hit("L1");
                    return Some(data);
                }

                let mut conn = match redis.get().await {
                    Ok(conn) => conn,
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to get Redis connection");
                        record_cache_miss();
                        return None;
                    }
                };

                let fetched: redis::RedisResult<(Option<Vec<u8>>, i64)> = redis::pipe()
                    .get(key)
                    .pttl(key)
                    .query_async(&mut conn)
                    .await;

                match fetched {
                    Ok((Some(data), pttl)) => {
                        tracing::debug!(key = %key, "cache hit (L2)");
                        record_cache_hit("L2");

                        // PTTL is -1 for keys without expiry.
                        let ttl = u64::try_from(pttl).ok().map(Duration::from_millis);
                        let entry = CachedEntry::new(data, ttl);
                        let data_arc = Arc::clone(&entry.data);
                        local.insert(key.to_string(), entry);

                        Some(data_arc)
                    }
                    Ok((None, _)) => {
                        tracing::debug!(key = %key, "cache miss");
                        record_cache_miss();
                        None
                    }
                    Err(e) => {
                        tracing::warn!(key = %key, error = %e, "Redis GET error");
                        record_cache_miss();
                        None
                    }
                }
            }
        }
    }

    /// Set a value in the cache, optionally expiring after `ttl`.
    ///
    /// In Redis mode the write is awaited so that a remove followed by a set
    /// reaches Redis in order. Redis failures are logged; L1 is still
    /// updated.
    pub async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) {
        match self {
            CacheBackend::Local(map) => {
                map.insert(key.to_string(), CachedEntry::new(value, ttl));
                set_cache_entries(map.len());
            }
            CacheBackend::Redis {
                redis,
                local,
                instance_id,
            } => {
                let entry = CachedEntry::new(value, ttl);
                let data_for_redis = Arc::clone(&entry.data);
                local.insert(key.to_string(), entry);
                set_cache_entries(local.len());

                let mut conn = match redis.get().await {
                    Ok(conn) => conn,
                    Err(e) => {
                        tracing::warn!(key = %key, error = %e, "Failed to get Redis connection");
                        return;
                    }
                };

                let written = match ttl {
                    Some(ttl) => {
                        let millis = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1);
                        conn.pset_ex::<_, _, ()>(key, &*data_for_redis, millis).await
                    }
                    None => conn.set::<_, _, ()>(key, &*data_for_redis).await,
                };

                match written {
                    Ok(()) => {
                        tracing::debug!(key = %key, ttl = ?ttl, "cache set (L1+L2)");
                        let message = Invalidation::new(*instance_id, key).to_payload();
                        if let Err(e) = conn
                            .publish::<_, _, ()>(INVALIDATION_CHANNEL, message)
                            .await
                        {
                            tracing::warn!(key = %key, error = %e, "Redis PUBLISH error");
                        }
                    }
                    Err(e) => tracing::warn!(key = %key, error = %e, "Redis SET error"),
                }
            }
        }
    }

    /// Invalidate a cache entry.
    ///
    /// - **Local mode**: Remove from DashMap
    /// - **Redis mode**: Remove from L1 and L2, then publish an invalidation
    pub async fn invalidate(&self, key: &str) {
        match self {
            CacheBackend::Local(map) => {
                map.remove(key);
                set_cache_entries(map.len());
                tracing::debug!(key = %key, "cache invalidated (local)");
            }
            CacheBackend::Redis {
                redis,
                local,
                instance_id,
            } => {
                local.remove(key);
                set_cache_entries(local.len());

                let mut conn = match redis.get().await {
                    Ok(conn) => conn,
                    Err(e) => {
                        tracing::warn!(key = %key, error = %e, "Failed to get Redis connection");
                        return;
                    }
                };

                if let Err(e) = conn.del::<_, ()>(key).await {
                    tracing::warn!(key = %key, error = %e, "Redis DEL error");
                }

                let message = Invalidation::new(*instance_id, key).to_payload();
                if let Err(e) = conn
                    .publish::<_, _, ()>(INVALIDATION_CHANNEL, message)
                    .await
                {
                    tracing::warn!(key = %key, error = %e, "Redis PUBLISH error");
                } else {
                    tracing::debug!(key = %key, "cache invalidated (L1+L2+pub/sub)");
                }
            }
        }
    }

    /// Get cache statistics (L1 only).
    pub fn stats(&self) -> CacheStats {
        match self {
            CacheBackend::Local(map) => CacheStats {
                l1_entries: map.len(),
                mode: "local".to_string(),
            },
            CacheBackend::Redis { local, .. } => CacheStats {
                l1_entries: local.len(),
                mode: "redis".to_string(),
            },
        }
    }

    /// Check if Redis is available (for health checks).
    pub async fn is_redis_available(&self) -> bool {
        match self {
            CacheBackend::Local(_) => false,
            CacheBackend::Redis { redis, .. } => redis.get().await.is_ok(),
        }
    }

    /// Id attached to invalidations this backend publishes. `None` in local
    /// mode, which publishes nothing.
    pub fn instance_id(&self) -> Option<Uuid> {
        match self {
            CacheBackend::Local(_) => None,
            CacheBackend::Redis { instance_id, .. } => Some(*instance_id),
        }
    }

    /// Get the local cache reference (for testing/internal use).
    pub fn local_cache(&self) -> Option<&Arc<DashMap<String, CachedEntry>>> {
        match self {
            CacheBackend::Local(map) => Some(map),
            CacheBackend::Redis { local, .. } => Some(local),
        }
    }
}

impl std::fmt::Debug for CacheBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let stats = self.stats();
        f.debug_struct("CacheBackend")
            .field("mode", &stats.mode)
            .field("l1_entries", &stats.l1_entries)
            .finish()
    }
}

/// Read a live entry from L1, dropping it if it has expired.
fn lookup_local(map: &DashMap<String, CachedEntry>, key: &str) -> Option<Arc<Vec<u8>>> {
    let entry = map.get(key)?;
    if entry.is_expired() {
        drop(entry);
        map.remove(key);
        return None;
    }
    Some(Arc::clone(&entry.data))
}

/// Cache statistics.
#[derive(Debug, Clone)]
pub struct CacheStats {
    pub l1_entries: usize,
    pub mode: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_without_ttl_never_expires() {
        let entry = CachedEntry::new(b"v".to_vec(), None);
        assert!(!entry.is_expired());
    }

    #[test]
    fn test_entry_with_zero_ttl_expires() {
        let mut entry = CachedEntry::new(b"v".to_vec(), Some(Duration::ZERO));
        entry.cached_at = Instant::now() - Duration::from_millis(5);
        assert!(entry.is_expired());
    }

    #[tokio::test]
    async fn test_expired_entry_is_evicted_on_read() {
        let cache = CacheBackend::new_local();
        cache
            .set("k", b"v".to_vec(), Some(Duration::from_millis(1)))
            .await;
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(cache.get("k").await.is_none());
        assert_eq!(cache.stats().l1_entries, 0);
    }
}
