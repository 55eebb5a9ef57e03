use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Failed to encode cache value: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    #[error("Failed to decode cache value: {0}")]
    Decode(#[from] rmp_serde::decode::Error),
}
