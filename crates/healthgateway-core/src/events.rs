//! Change notifications for communications.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::communication::Communication;
use crate::error::{CoreError, Result};

/// Kind of change applied to a communication row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeAction {
    Insert,
    Update,
    Delete,
}

impl ChangeAction {
    /// Returns the SQL operation name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeAction::Insert => "INSERT",
            ChangeAction::Update => "UPDATE",
            ChangeAction::Delete => "DELETE",
        }
    }

    /// Insert and Update carry a row that should be (re)cached.
    pub fn is_upsert(&self) -> bool {
        matches!(self, ChangeAction::Insert | ChangeAction::Update)
    }
}

impl fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChangeAction {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "INSERT" => Ok(ChangeAction::Insert),
            "UPDATE" => Ok(ChangeAction::Update),
            "DELETE" => Ok(ChangeAction::Delete),
            _ => Err(CoreError::invalid_change_action(s)),
        }
    }
}

/// A communication was inserted, updated or deleted.
///
/// For deletes `data` holds the row as it was before removal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BannerChangeEvent {
    pub action: ChangeAction,
    pub data: Communication,
}

impl BannerChangeEvent {
    pub fn new(action: ChangeAction, data: Communication) -> Self {
        Self { action, data }
    }

    pub fn inserted(data: Communication) -> Self {
        Self::new(ChangeAction::Insert, data)
    }

    pub fn updated(data: Communication) -> Self {
        Self::new(ChangeAction::Update, data)
    }

    pub fn deleted(data: Communication) -> Self {
        Self::new(ChangeAction::Delete, data)
    }
}
