//! Row shape of `gateway."Communication"`.
//!
//! The same shape arrives from two places: query rows and the JSON that
//! `row_to_json` puts in `BannerChange` notifications. Both decode into
//! [`CommunicationRecord`] before becoming a [`Communication`].

use healthgateway_core::{Communication, CoreError};
use serde::{Deserialize, Deserializer};
use sqlx_core::row::Row;
use sqlx_postgres::PgRow;
use time::PrimitiveDateTime;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use uuid::Uuid;

/// Columns selected by every communication query, in PascalCase.
pub(crate) const COMMUNICATION_COLUMNS: &str = r#""CommunicationId", "Text", "Subject",
    "EffectiveDateTime", "ExpiryDateTime", "ScheduledDateTime",
    "CommunicationTypeCode", "CommunicationStatusCode", "Priority",
    "CreatedBy", "CreatedDateTime", "UpdatedBy", "UpdatedDateTime",
    xmin::text::bigint AS "Version""#;

/// `timestamp without time zone` as rendered by `row_to_json`.
const PG_TIMESTAMP: &[BorrowedFormatItem<'static>] = format_description!(
    "[year]-[month]-[day]T[hour]:[minute]:[second][optional [.[subsecond]]]"
);

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct CommunicationRecord {
    pub communication_id: Uuid,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(deserialize_with = "timestamp")]
    pub effective_date_time: PrimitiveDateTime,
    #[serde(deserialize_with = "timestamp")]
    pub expiry_date_time: PrimitiveDateTime,
    #[serde(deserialize_with = "optional_timestamp", default)]
    pub scheduled_date_time: Option<PrimitiveDateTime>,
    pub communication_type_code: String,
    pub communication_status_code: String,
    pub priority: i32,
    pub created_by: String,
    #[serde(deserialize_with = "timestamp")]
    pub created_date_time: PrimitiveDateTime,
    pub updated_by: String,
    #[serde(deserialize_with = "timestamp")]
    pub updated_date_time: PrimitiveDateTime,
    /// Row version (`xmin`); absent from notifications.
    #[serde(default)]
    pub version: i64,
}

impl CommunicationRecord {
    /// Reads a row selected with [`COMMUNICATION_COLUMNS`].
    pub(crate) fn from_row(row: &PgRow) -> Result<Self, sqlx_core::Error> {
        Ok(Self {
            communication_id: row.try_get("CommunicationId")?,
            text: row.try_get("Text")?,
            subject: row.try_get("Subject")?,
            effective_date_time: row.try_get("EffectiveDateTime")?,
            expiry_date_time: row.try_get("ExpiryDateTime")?,
            scheduled_date_time: row.try_get("ScheduledDateTime")?,
            communication_type_code: row.try_get("CommunicationTypeCode")?,
            communication_status_code: row.try_get("CommunicationStatusCode")?,
            priority: row.try_get("Priority")?,
            created_by: row.try_get("CreatedBy")?,
            created_date_time: row.try_get("CreatedDateTime")?,
            updated_by: row.try_get("UpdatedBy")?,
            updated_date_time: row.try_get("UpdatedDateTime")?,
            version: row.try_get("Version")?,
        })
    }

    /// Stored timestamps are UTC.
    pub(crate) fn into_communication(self) -> Result<Communication, CoreError> {
        Ok(Communication {
            id: self.communication_id,
            text: self.text.unwrap_or_default(),
            subject: self.subject.unwrap_or_default(),
            effective_date_time: self.effective_date_time.assume_utc(),
            expiry_date_time: self.expiry_date_time.assume_utc(),
            scheduled_date_time: self.scheduled_date_time.map(PrimitiveDateTime::assume_utc),
            communication_type_code: self.communication_type_code.parse()?,
            communication_status_code: self.communication_status_code.parse()?,
            priority: self.priority,
            created_by: self.created_by,
            created_date_time: self.created_date_time.assume_utc(),
            updated_by: self.updated_by,
            updated_date_time: self.updated_date_time.assume_utc(),
            version: u32::try_from(self.version).unwrap_or_default(),
        })
    }
}

fn timestamp<'de, D>(deserializer: D) -> Result<PrimitiveDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    PrimitiveDateTime::parse(&raw, PG_TIMESTAMP).map_err(serde::de::Error::custom)
}

fn optional_timestamp<'de, D>(deserializer: D) -> Result<Option<PrimitiveDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) => PrimitiveDateTime::parse(&raw, PG_TIMESTAMP)
            .map(Some)
            .map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}
