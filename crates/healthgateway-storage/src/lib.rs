//! Communication storage for Health Gateway.
//!
//! Storage is the source of truth for communications. Two backends are
//! provided:
//!
//! - [`PostgresCommunicationStorage`] reads `gateway."Communication"`, and
//!   [`BannerChangeListener`] turns the table's `BannerChange` notifications
//!   into [`BannerChangeEvent`]s.
//! - [`InMemoryCommunicationStorage`] keeps rows in a `DashMap` and emits
//!   the same events when rows are written. Used for tests and local runs.
//!
//! # Example
//!
//! ```ignore
//! use healthgateway_storage::{CommunicationStorage, PostgresCommunicationStorage};
//!
//! let pool = healthgateway_storage::create_pool(&config).await?;
//! let storage = PostgresCommunicationStorage::new(pool, clock);
//! let next = storage.get_next(CommunicationType::Banner).await;
//! ```

pub mod config;
pub mod error;
pub mod listener;
pub mod memory;
pub mod migrations;
pub mod pool;
pub mod postgres;
mod record;
pub mod traits;
pub mod types;

pub use config::PostgresConfig;
pub use error::{Result, StorageError};
pub use listener::{BANNER_CHANGE_CHANNEL, BannerChangeListener};
pub use memory::InMemoryCommunicationStorage;
pub use pool::create_pool;
pub use postgres::PostgresCommunicationStorage;
pub use traits::{ChangeFeed, CommunicationStorage, DynCommunicationStorage};
pub use types::{DbResult, DbStatusCode};

pub use healthgateway_core::{BannerChangeEvent, ChangeAction, Communication, CommunicationType};

/// PostgreSQL connection pool type alias.
pub type PgPool = sqlx_postgres::PgPool;
