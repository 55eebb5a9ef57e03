//! Stable error codes returned to clients.
//!
//! Codes have the shape `{application}Server-{error type}-{service}`,
//! e.g. `GatewayApiServer-CI-DB` for an internal communication failure
//! raised by the database.

use std::fmt;

/// Category of failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorType {
    /// Failure while talking to an internal collaborator.
    CommunicationInternal,
    /// Failure while talking to an external system.
    CommunicationExternal,
    /// The request hit a state it cannot proceed from.
    InvalidState,
}

impl ErrorType {
    pub fn code(&self) -> &'static str {
        match self {
            ErrorType::CommunicationInternal => "CI",
            ErrorType::CommunicationExternal => "CE",
            ErrorType::InvalidState => "IS",
        }
    }
}

/// Collaborator that produced the failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceType {
    Database,
    Cache,
    Keycloak,
}

impl ServiceType {
    pub fn code(&self) -> &'static str {
        match self {
            ServiceType::Database => "DB",
            ServiceType::Cache => "CACHE",
            ServiceType::Keycloak => "KC",
        }
    }
}

/// Builds error codes scoped to one application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorTranslator {
    source: String,
}

impl ErrorTranslator {
    /// Create a translator for `application` (for example `GatewayApi`).
    pub fn new(application: impl AsRef<str>) -> Self {
        Self {
            source: format!("{}Server", application.as_ref()),
        }
    }

    /// The prefix shared by every code this translator produces.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Error code for a failure of `error_type` raised by `service`.
    pub fn service_error(&self, error_type: ErrorType, service: ServiceType) -> String {
        format!("{}-{}-{}", self.source, error_type.code(), service.code())
    }
}

impl Default for ErrorTranslator {
    fn default() -> Self {
        Self::new("GatewayApi")
    }
}

impl fmt::Display for ErrorTranslator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}
