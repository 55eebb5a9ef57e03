use healthgateway_core::{CommunicationType, CoreError};
use thiserror::Error;

/// Errors raised by the communication service.
///
/// Storage failures are not errors at this level; they come back as a
/// failed `RequestResult`.
#[derive(Debug, Error)]
pub enum CommunicationError {
    /// Only banner-like types have an active communication.
    #[error("Communication type must be Banner or InApp, got {0}")]
    InvalidCommunicationType(CommunicationType),

    /// The requested type could not be parsed.
    #[error(transparent)]
    UnknownCommunicationType(#[from] CoreError),
}

