use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, path::PathBuf, str::FromStr};

use super::member::ParseEnumError;

/// Why a snapshot was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotKind {
    #[default]
    Full,
    Incremental,
    Manual,
}

impl SnapshotKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Incremental => "incremental",
            Self::Manual => "manual",
        }
    }
}

/// Snapshot lifecycle. `Running` moves to `Success` or `Failed` exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotStatus {
    Pending,
    Running,
    Success,
    Failed,
}

impl SnapshotStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Failed)
    }
}

impl fmt::Display for SnapshotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for SnapshotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SnapshotKind {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "full" => Ok(Self::Full),
            "incremental" => Ok(Self::Incremental),
            "manual" => Ok(Self::Manual),
            _ => Err(ParseEnumError {
                expected: "snapshot kind",
                got: s.to_string(),
            }),
        }
    }
}

impl FromStr for SnapshotStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "running" => Ok(Self::Running),
            "success" => Ok(Self::Success),
            "failed" => Ok(Self::Failed),
            _ => Err(ParseEnumError {
                expected: "snapshot status",
                got: s.to_string(),
            }),
        }
    }
}

/// Aggregate statistics stored with a successful snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotSummary {
    pub total: usize,
    pub joined_ids: Vec<i64>,
    pub left_ids: Vec<i64>,
    pub owner_count: usize,
    pub admin_count: usize,
}

/// Input for a new snapshot row. The store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSnapshot {
    pub group_id: i64,
    pub kind: SnapshotKind,
    pub notes: String,
    pub started_at: DateTime<Utc>,
}

/// One snapshot record. The captured members live in the store next to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: i64,
    pub group_id: i64,
    pub kind: SnapshotKind,
    pub status: SnapshotStatus,
    pub notes: String,
    pub member_count: usize,
    pub new_member_count: usize,
    pub left_member_count: usize,
    pub file_path: Option<PathBuf>,
    pub file_size: u64,
    pub compressed: bool,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub summary: Option<SnapshotSummary>,
}

impl Snapshot {
    /// A fresh `running` record for `new` under the store-assigned `id`.
    #[must_use]
    pub fn running(id: i64, new: &NewSnapshot) -> Self {
        Self {
            id,
            group_id: new.group_id,
            kind: new.kind,
            status: SnapshotStatus::Running,
            notes: new.notes.clone(),
            member_count: 0,
            new_member_count: 0,
            left_member_count: 0,
            file_path: None,
            file_size: 0,
            compressed: false,
            started_at: new.started_at,
            completed_at: None,
            error_message: None,
            summary: None,
        }
    }

    #[must_use]
    pub fn duration(&self) -> Option<Duration> {
        self.completed_at.map(|done| done - self.started_at)
    }
}
