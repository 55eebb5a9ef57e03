//! Error types for communication storage.

use healthgateway_core::CoreError;
use thiserror::Error;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx_core::Error),

    /// A migration failed to apply.
    #[error("Migration error: {0}")]
    Migration(String),

    /// A stored row could not be turned into a communication.
    #[error("Invalid row: {0}")]
    InvalidRow(#[from] CoreError),

    /// Serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StorageError {
    /// Creates a migration error.
    pub fn migration(message: impl Into<String>) -> Self {
        Self::Migration(message.into())
    }
}

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
