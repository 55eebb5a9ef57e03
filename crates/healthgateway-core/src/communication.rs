//! System communications (banners and in-app messages).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::{CoreError, Result};

/// Audit user recorded when the system itself creates or updates a row.
pub const DEFAULT_USER: &str = "System";

/// Priority assigned to communications that don't set one.
/// The lower the value the lower the priority.
pub const STANDARD_PRIORITY: i32 = 10;

/// Cache key for the active public banner.
pub const BANNER_CACHE_KEY: &str = "Communication:Banner";

/// Cache key for the active in-app banner.
pub const IN_APP_CACHE_KEY: &str = "Communication:InApp";

/// Where a communication is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommunicationType {
    /// System-wide banner shown to every visitor.
    Banner,
    /// Message shown only inside the authenticated application.
    InApp,
    /// Email broadcast; never served as a banner.
    Email,
}

impl CommunicationType {
    /// Returns the code stored in the database and used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            CommunicationType::Banner => "Banner",
            CommunicationType::InApp => "InApp",
            CommunicationType::Email => "Email",
        }
    }

    /// Cache key holding the active communication of this type.
    ///
    /// Only banner-like types are cached; `Email` has no key.
    pub fn cache_key(&self) -> Option<&'static str> {
        match self {
            CommunicationType::Banner => Some(BANNER_CACHE_KEY),
            CommunicationType::InApp => Some(IN_APP_CACHE_KEY),
            CommunicationType::Email => None,
        }
    }

    /// Returns true for the types that can be served as an active banner.
    pub fn is_banner(&self) -> bool {
        self.cache_key().is_some()
    }
}

impl fmt::Display for CommunicationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommunicationType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "banner" => Ok(CommunicationType::Banner),
            "inapp" => Ok(CommunicationType::InApp),
            "email" => Ok(CommunicationType::Email),
            _ => Err(CoreError::invalid_communication_type(s)),
        }
    }
}

/// Workflow state of a communication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommunicationStatus {
    New,
    Draft,
    Pending,
    Processing,
    Processed,
    Error,
}

impl CommunicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommunicationStatus::New => "New",
            CommunicationStatus::Draft => "Draft",
            CommunicationStatus::Pending => "Pending",
            CommunicationStatus::Processing => "Processing",
            CommunicationStatus::Processed => "Processed",
            CommunicationStatus::Error => "Error",
        }
    }
}

impl fmt::Display for CommunicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommunicationStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "New" => Ok(CommunicationStatus::New),
            "Draft" => Ok(CommunicationStatus::Draft),
            "Pending" => Ok(CommunicationStatus::Pending),
            "Processing" => Ok(CommunicationStatus::Processing),
            "Processed" => Ok(CommunicationStatus::Processed),
            "Error" => Ok(CommunicationStatus::Error),
            _ => Err(CoreError::invalid_communication_status(s)),
        }
    }
}

/// A system communication.
///
/// The row in storage is authoritative; cached copies are derived from it.
/// Callers guarantee `effective_date_time <= expiry_date_time`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Communication {
    pub id: Uuid,

    #[serde(default)]
    pub text: String,

    #[serde(default)]
    pub subject: String,

    #[serde(with = "time::serde::rfc3339")]
    pub effective_date_time: OffsetDateTime,

    #[serde(with = "time::serde::rfc3339")]
    pub expiry_date_time: OffsetDateTime,

    #[serde(with = "time::serde::rfc3339::option", default)]
    pub scheduled_date_time: Option<OffsetDateTime>,

    pub communication_type_code: CommunicationType,

    pub communication_status_code: CommunicationStatus,

    /// Higher values win.
    pub priority: i32,

    pub created_by: String,

    #[serde(with = "time::serde::rfc3339")]
    pub created_date_time: OffsetDateTime,

    pub updated_by: String,

    #[serde(with = "time::serde::rfc3339")]
    pub updated_date_time: OffsetDateTime,

    /// Optimistic concurrency token.
    #[serde(default)]
    pub version: u32,
}

impl Communication {
    /// Create a new communication with a fresh id and default audit fields.
    pub fn new(
        communication_type: CommunicationType,
        effective_date_time: OffsetDateTime,
        expiry_date_time: OffsetDateTime,
    ) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            id: Uuid::new_v4(),
            text: String::new(),
            subject: String::new(),
            effective_date_time,
            expiry_date_time,
            scheduled_date_time: None,
            communication_type_code: communication_type,
            communication_status_code: CommunicationStatus::New,
            priority: STANDARD_PRIORITY,
            created_by: DEFAULT_USER.to_string(),
            created_date_time: now,
            updated_by: DEFAULT_USER.to_string(),
            updated_date_time: now,
            version: 0,
        }
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// True once `now` has reached the expiry timestamp.
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        now >= self.expiry_date_time
    }

    /// True while `now` is still before the effective timestamp.
    pub fn is_future_at(&self, now: OffsetDateTime) -> bool {
        now < self.effective_date_time
    }

    /// True inside the `[effective, expiry)` window.
    pub fn is_active_at(&self, now: OffsetDateTime) -> bool {
        !self.is_future_at(now) && !self.is_expired_at(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    fn sample(now: OffsetDateTime) -> Communication {
        Communication::new(
            CommunicationType::Banner,
            now - Duration::days(1),
            now + Duration::days(2),
        )
    }

    #[test]
    fn test_type_cache_keys() {
        assert_eq!(
            CommunicationType::Banner.cache_key(),
            Some("Communication:Banner")
        );
        assert_eq!(
            CommunicationType::InApp.cache_key(),
            Some("Communication:InApp")
        );
        assert_eq!(CommunicationType::Email.cache_key(), None);
        assert!(!CommunicationType::Email.is_banner());
    }

    #[test]
    fn test_type_from_str() {
        assert_eq!(
            "InApp".parse::<CommunicationType>().unwrap(),
            CommunicationType::InApp
        );
        assert_eq!(
            "banner".parse::<CommunicationType>().unwrap(),
            CommunicationType::Banner
        );
        assert!("Fax".parse::<CommunicationType>().is_err());
    }

    #[test]
    fn test_status_round_trip_str() {
        for status in [
            CommunicationStatus::New,
            CommunicationStatus::Draft,
            CommunicationStatus::Pending,
            CommunicationStatus::Processing,
            CommunicationStatus::Processed,
            CommunicationStatus::Error,
        ] {
            assert_eq!(status.as_str().parse::<CommunicationStatus>().unwrap(), status);
        }
    }

    #[test]
    fn test_window_predicates() {
        let now = OffsetDateTime::now_utc();
        let comm = sample(now);
        assert!(comm.is_active_at(now));
        assert!(!comm.is_future_at(now));
        assert!(!comm.is_expired_at(now));

        assert!(comm.is_future_at(now - Duration::days(2)));
        assert!(comm.is_expired_at(now + Duration::days(2)));
        assert!(!comm.is_active_at(now + Duration::days(2)));
    }

    #[test]
    fn test_serializes_camel_case_with_string_codes() {
        let now = OffsetDateTime::now_utc();
        let comm = sample(now).with_subject("Outage").with_priority(100);
        let json = serde_json::to_value(&comm).unwrap();

        assert_eq!(json["communicationTypeCode"], "Banner");
        assert_eq!(json["communicationStatusCode"], "New");
        assert_eq!(json["subject"], "Outage");
        assert_eq!(json["priority"], 100);
        assert!(json["effectiveDateTime"].is_string());
        assert!(json["scheduledDateTime"].is_null());
    }
}
