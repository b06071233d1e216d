//! History — the append-only ledger of every version ever written for a key.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::resource::Resource;

/// The kind of write that produced a history row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Created,
    Updated,
    Deleted,
}

impl Action {
    /// Stable numeric code stored in the `action` column.
    #[must_use]
    pub fn code(self) -> i64 {
        match self {
            Self::Created => 1,
            Self::Updated => 2,
            Self::Deleted => 3,
        }
    }

    /// Decode a stored `action` column.
    #[must_use]
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Self::Created),
            2 => Some(Self::Updated),
            3 => Some(Self::Deleted),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Deleted => "deleted",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One immutable history row: the resource snapshot written at `resource.version`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub action: Action,
    /// Version the key had before this write, `None` for a creation.
    pub previous_version: Option<i64>,
    pub resource: Resource,
}

impl HistoryEntry {
    #[must_use]
    pub fn version(&self) -> i64 {
        self.resource.version
    }

    #[must_use]
    pub fn is_deletion(&self) -> bool {
        self.action == Action::Deleted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_roundtrip_action_codes() {
        for action in [Action::Created, Action::Updated, Action::Deleted] {
            assert_eq!(Action::from_code(action.code()), Some(action));
        }
    }

    #[test]
    fn should_reject_unknown_action_code() {
        assert_eq!(Action::from_code(0), None);
        assert_eq!(Action::from_code(42), None);
    }

    #[test]
    fn should_serialize_action_as_snake_case() {
        let json = serde_json::to_string(&Action::Deleted).unwrap();
        assert_eq!(json, "\"deleted\"");
    }
}
