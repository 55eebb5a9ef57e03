//! Active banner lookup, cache population and change handling.

pub mod dispatcher;
pub mod error;
pub mod service;

pub use dispatcher::ChangeDispatcher;
pub use error::CommunicationError;
pub use service::CommunicationService;
