use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::member::{MemberRecord, Role};

/// Group metadata as reported by the bot, plus what the store tracks.
///
/// `last_backup_at` and `updated_at` are only set on records read back from
/// the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupProfile {
    pub group_id: i64,
    #[serde(default)]
    pub group_name: String,
    #[serde(default)]
    pub member_count: usize,
    #[serde(default)]
    pub max_member_count: usize,
    #[serde(default)]
    pub group_level: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_backup_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl GroupProfile {
    #[must_use]
    pub fn new(group_id: i64, group_name: impl Into<String>) -> Self {
        Self {
            group_id,
            group_name: group_name.into(),
            member_count: 0,
            max_member_count: 0,
            group_level: 0,
            last_backup_at: None,
            updated_at: None,
        }
    }

    #[must_use]
    pub const fn with_counts(mut self, member_count: usize, max_member_count: usize) -> Self {
        self.member_count = member_count;
        self.max_member_count = max_member_count;
        self
    }
}

/// Head count of a roster by role.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RoleCounts {
    pub owners: usize,
    pub admins: usize,
    pub members: usize,
    pub total: usize,
}

impl RoleCounts {
    #[must_use]
    pub fn of(roster: &[MemberRecord]) -> Self {
        roster.iter().fold(Self::default(), |mut counts, member| {
            match member.role {
                Role::Owner => counts.owners += 1,
                Role::Admin => counts.admins += 1,
                Role::Member => counts.members += 1,
            }
            counts.total += 1;
            counts
        })
    }
}
