use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use super::member::ParseEnumError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MembershipAction {
    Join,
    Leave,
}

impl MembershipAction {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Join => "join",
            Self::Leave => "leave",
        }
    }
}

impl fmt::Display for MembershipAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MembershipAction {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "join" => Ok(Self::Join),
            "leave" => Ok(Self::Leave),
            _ => Err(ParseEnumError {
                expected: "membership action",
                got: s.to_string(),
            }),
        }
    }
}

/// Append-only audit entry: one per joined or left member per snapshot run.
///
/// `id` is `None` until the store assigns one. `snapshot_id` becomes `None`
/// once the originating snapshot is pruned; the event itself is kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipEvent {
    pub id: Option<i64>,
    pub group_id: i64,
    pub user_id: i64,
    pub display_name_at_time: String,
    pub action: MembershipAction,
    pub snapshot_id: Option<i64>,
    pub timestamp: DateTime<Utc>,
}
