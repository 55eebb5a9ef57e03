use thiserror::Error;

/// Core error types for Health Gateway communication handling
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid communication type: {0}")]
    InvalidCommunicationType(String),

    #[error("Invalid communication status: {0}")]
    InvalidCommunicationStatus(String),

    #[error("Invalid change action: {0}")]
    InvalidChangeAction(String),

    #[error("Invalid DateTime: {0}")]
    InvalidDateTime(String),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Time parsing error: {0}")]
    TimeError(#[from] time::error::Parse),
}

impl CoreError {
    /// Create a new InvalidCommunicationType error
    pub fn invalid_communication_type(value: impl Into<String>) -> Self {
        Self::InvalidCommunicationType(value.into())
    }

    /// Create a new InvalidCommunicationStatus error
    pub fn invalid_communication_status(value: impl Into<String>) -> Self {
        Self::InvalidCommunicationStatus(value.into())
    }

    /// Create a new InvalidChangeAction error
    pub fn invalid_change_action(value: impl Into<String>) -> Self {
        Self::InvalidChangeAction(value.into())
    }

    /// Create a new InvalidDateTime error
    pub fn invalid_date_time(value: impl Into<String>) -> Self {
        Self::InvalidDateTime(value.into())
    }

    /// Get error category for logging/monitoring
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidCommunicationType(_)
            | Self::InvalidCommunicationStatus(_)
            | Self::InvalidChangeAction(_)
            | Self::InvalidDateTime(_) => ErrorCategory::Validation,
            Self::JsonError(_) => ErrorCategory::Serialization,
            Self::TimeError(_) => ErrorCategory::System,
        }
    }
}

/// Error categories for logging and monitoring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Serialization,
    System,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation => write!(f, "validation"),
            Self::Serialization => write!(f, "serialization"),
            Self::System => write!(f, "system"),
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CoreError::invalid_communication_type("Fax");
        assert_eq!(err.to_string(), "Invalid communication type: Fax");

        let err = CoreError::invalid_change_action("TRUNCATE");
        assert_eq!(err.to_string(), "Invalid change action: TRUNCATE");
    }

    #[test]
    fn test_error_category() {
        assert_eq!(
            CoreError::invalid_communication_status("Archived").category(),
            ErrorCategory::Validation
        );
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert_eq!(
            CoreError::from(json_err).category(),
            ErrorCategory::Serialization
        );
        assert_eq!(ErrorCategory::Validation.to_string(), "validation");
    }
}
