pub mod clock;
pub mod communication;
pub mod error;
pub mod error_translator;
pub mod events;
pub mod request_result;

pub use communication::{
    BANNER_CACHE_KEY, Communication, CommunicationStatus, CommunicationType, DEFAULT_USER,
    IN_APP_CACHE_KEY, STANDARD_PRIORITY,
};
pub use error::{CoreError, ErrorCategory, Result};
pub use error_translator::{ErrorTranslator, ErrorType, ServiceType};
pub use events::{BannerChangeEvent, ChangeAction};
pub use request_result::{RequestResult, RequestResultError, ResultType};
pub use clock::{Clock, FixedClock, SharedClock, SystemClock};
