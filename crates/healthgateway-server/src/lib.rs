//! Health Gateway communication service.
//!
//! Serves the active banner for each banner type from a cache, falling back
//! to storage on a miss, and keeps the cache in step with storage change
//! notifications.

pub mod communication;
pub mod config;
pub mod handlers;
pub mod metrics;
pub mod observability;
pub mod server;

pub use communication::{ChangeDispatcher, CommunicationError, CommunicationService};
pub use config::{AppConfig, StorageBackend};
pub use observability::{LoggingError, apply_logging_level, init_tracing};
pub use server::{AppState, GatewayServer, ServerBuilder, ServerError, build_app, build_router};
