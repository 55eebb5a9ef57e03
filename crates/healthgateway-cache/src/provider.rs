//! Key/value cache contract used by services.
//!
//! Values are opaque bytes at this level; [`get_typed`] and [`add_typed`]
//! encode structured values as MessagePack.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::backend::CacheBackend;
use crate::error::CacheError;

/// A key/value store with optional per-key expiry.
///
/// Implementations provide atomic get/set/remove per key; callers do not
/// coordinate read-modify-write sequences.
#[async_trait]
pub trait CacheProvider: Send + Sync {
    /// Returns the live value stored under `key`, if any.
    async fn get_item(&self, key: &str) -> Option<Arc<Vec<u8>>>;

    /// Stores `value` under `key`. `None` keeps it until removed.
    async fn add_item(&self, key: &str, value: Vec<u8>, expiry: Option<Duration>);

    /// Removes `key` if present.
    async fn remove_item(&self, key: &str);
}

#[async_trait]
impl CacheProvider for CacheBackend {
    async fn get_item(&self, key: &str) -> Option<Arc<Vec<u8>>> {
        self.get(key).await
    }

    async fn add_item(&self, key: &str, value: Vec<u8>, expiry: Option<Duration>) {
        self.set(key, value, expiry).await;
    }

    async fn remove_item(&self, key: &str) {
        self.invalidate(key).await;
    }
}

/// Fetch and decode a value.
///
/// Returns `Ok(None)` on a miss and `Err` if the stored bytes can't be
/// decoded as `T`.
pub async fn get_typed<T>(cache: &dyn CacheProvider, key: &str) -> Result<Option<T>, CacheError>
where
    T: DeserializeOwned,
{
    match cache.get_item(key).await {
        Some(data) => Ok(Some(rmp_serde::from_slice(&data)?)),
        None => Ok(None),
    }
}

/// Encode and store a value.
pub async fn add_typed<T>(
    cache: &dyn CacheProvider,
    key: &str,
    value: &T,
    expiry: Option<Duration>,
) -> Result<(), CacheError>
where
    T: Serialize + ?Sized,
{
    let data = rmp_serde::to_vec_named(value)?;
    cache.add_item(key, data, expiry).await;
    Ok(())
}
