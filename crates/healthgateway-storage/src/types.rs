//! Result envelope returned by storage reads.

use std::fmt;

use crate::error::StorageError;

/// Outcome of a storage read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbStatusCode {
    /// The read completed; the payload may still be empty.
    Read,
    /// The requested row does not exist.
    NotFound,
    /// The read failed.
    Error,
}

impl fmt::Display for DbStatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DbStatusCode::Read => f.write_str("Read"),
            DbStatusCode::NotFound => f.write_str("NotFound"),
            DbStatusCode::Error => f.write_str("Error"),
        }
    }
}

/// A storage read result: status, payload and an optional message.
///
/// Reads never fail at the type level. A failure is reported with
/// [`DbStatusCode::Error`], a default payload and the error message, so the
/// caller decides how it surfaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbResult<T> {
    pub status: DbStatusCode,
    pub payload: T,
    pub message: Option<String>,
}

impl<T> DbResult<T> {
    /// A successful read.
    pub fn read(payload: T) -> Self {
        Self {
            status: DbStatusCode::Read,
            payload,
            message: None,
        }
    }

    pub fn is_error(&self) -> bool {
        self.status == DbStatusCode::Error
    }
}

impl<T: Default> DbResult<T> {
    /// A failed read carrying `message`.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: DbStatusCode::Error,
            payload: T::default(),
            message: Some(message.into()),
        }
    }
}

impl<T: Default> From<Result<T, StorageError>> for DbResult<T> {
    fn from(result: Result<T, StorageError>) -> Self {
        match result {
            Ok(payload) => DbResult::read(payload),
            Err(e) => DbResult::error(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_result() {
        let result = DbResult::read(Some(3));
        assert_eq!(result.status, DbStatusCode::Read);
        assert_eq!(result.payload, Some(3));
        assert!(!result.is_error());
    }

    #[test]
    fn test_error_from_storage_error() {
        let result: DbResult<Option<i32>> =
            Err(StorageError::migration("missing table")).into();
        assert!(result.is_error());
        assert_eq!(result.payload, None);
        assert_eq!(
            result.message.as_deref(),
            Some("Migration error: missing table")
        );
    }

    #[test]
    fn test_status_display() {
        assert_eq!(DbStatusCode::NotFound.to_string(), "NotFound");
    }
}
