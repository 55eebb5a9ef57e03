//! Two-tier caching for Health Gateway services.
//!
//! ## Architecture
//!
//! - **L1 Cache (DashMap)**: In-memory, per-instance
//! - **L2 Cache (Redis)**: Network, shared across instances
//! - **Pub/Sub**: Cross-instance L1 invalidation
//!
//! ```text
//! get_item → L1 (DashMap) → L2 (Redis) → None
//! ```
//!
//! Entries carry an optional TTL. An entry stored without one lives until it
//! is removed explicitly.
//!
//! If Redis is unavailable or disabled, the backend falls back to L1-only
//! mode.

pub mod backend;
pub mod config;
pub mod error;
pub mod metrics;
pub mod provider;
pub mod pubsub;

use std::time::Duration;

pub use backend::{CacheBackend, CacheStats, CachedEntry};
pub use config::RedisConfig;
pub use error::CacheError;
pub use provider::{CacheProvider, add_typed, get_typed};
pub use pubsub::{CacheInvalidationListener, INVALIDATION_CHANNEL, Invalidation};

/// Build a cache backend from configuration.
///
/// Returns a local-only backend when Redis is disabled or cannot be reached.
/// When Redis is available, an invalidation listener is started so this
/// instance drops L1 entries that other instances change.
pub async fn create_cache_backend(config: &RedisConfig) -> CacheBackend {
    if !config.enabled {
        tracing::info!("Redis disabled, using local cache only");
        return CacheBackend::new_local();
    }

    tracing::info!(url = %config.url, "Connecting to Redis");

    let mut redis_config = deadpool_redis::Config::from_url(&config.url);
    let timeout = Duration::from_millis(config.timeout_ms);
    let mut pool_config = deadpool_redis::PoolConfig::new(config.pool_size);
    pool_config.timeouts.wait = Some(timeout);
    pool_config.timeouts.create = Some(timeout);
    pool_config.timeouts.recycle = Some(timeout);
    redis_config.pool = Some(pool_config);

    let pool = match redis_config.create_pool(Some(deadpool_redis::Runtime::Tokio1)) {
        Ok(pool) => pool,
        Err(e) => {
            tracing::warn!(
                error = %e,
                "Failed to create Redis pool. Falling back to local cache."
            );
            return CacheBackend::new_local();
        }
    };

    match pool.get().await {
        Ok(_) => {
            tracing::info!("Connected to Redis");
            let backend = CacheBackend::new_redis(pool.clone());

            if let (Some(local), Some(instance_id)) = (backend.local_cache(), backend.instance_id()) {
                let listener = CacheInvalidationListener {
                    redis_url: config.url.clone(),
                    local_cache: local.clone(),
                    instance_id,
                };
                listener.start();
            }

            backend
        }
        Err(e) => {
            tracing::warn!(
                error = %e,
                "Redis unreachable. Falling back to local cache."
            );
            CacheBackend::new_local()
        }
    }
}
