use std::fmt;

/// Machine-readable error codes for scripted callers and operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigParseError,
    InvalidRate,
    SnapshotNotFound,
    EmptySnapshot,
    GroupMismatch,
    JobAlreadyActive,
    RemoteTransport,
    RemoteRejected,
    RemoteDecode,
    StoreFailure,
    CorruptStore,
    ArchiveWriteFailed,
    ArchiveReadFailed,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ConfigParseError => "E1001",
            Self::InvalidRate => "E1002",
            Self::SnapshotNotFound => "E2001",
            Self::EmptySnapshot => "E2002",
            Self::GroupMismatch => "E2003",
            Self::JobAlreadyActive => "E2004",
            Self::RemoteTransport => "E3001",
            Self::RemoteRejected => "E3002",
            Self::RemoteDecode => "E3003",
            Self::StoreFailure => "E4001",
            Self::CorruptStore => "E4002",
            Self::ArchiveWriteFailed => "E5001",
            Self::ArchiveReadFailed => "E5002",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ConfigParseError => "Config file parse error",
            Self::InvalidRate => "Invalid invite rate",
            Self::SnapshotNotFound => "Snapshot not found",
            Self::EmptySnapshot => "Snapshot has no members",
            Self::GroupMismatch => "Snapshot belongs to another group",
            Self::JobAlreadyActive => "A reconciliation job is already running",
            Self::RemoteTransport => "Bot API unreachable",
            Self::RemoteRejected => "Bot API rejected the call",
            Self::RemoteDecode => "Bot API returned an unreadable payload",
            Self::StoreFailure => "Snapshot store failure",
            Self::CorruptStore => "Corrupt snapshot store row",
            Self::ArchiveWriteFailed => "Snapshot file write failed",
            Self::ArchiveReadFailed => "Snapshot file read failed",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ConfigParseError => Some("Fix syntax in muster.toml and retry."),
            Self::InvalidRate => Some("Set reconcile.invites_per_minute to a value above zero."),
            Self::SnapshotNotFound => Some("Run `muster history <group>` to list snapshot ids."),
            Self::EmptySnapshot => Some("Pick a successful snapshot that captured members."),
            Self::GroupMismatch => {
                Some("Pass the snapshot's own group with --source, or omit --source.")
            }
            Self::JobAlreadyActive => Some("Wait for the running job to finish or cancel it."),
            Self::RemoteTransport => {
                Some("Check onebot.base_url and that the bot implementation is running.")
            }
            Self::RemoteRejected => {
                Some("Check the bot's permissions in the group and the access token.")
            }
            Self::RemoteDecode => Some("Verify the bot implementation speaks OneBot v11."),
            Self::StoreFailure => Some("Check disk space and permissions on the database file."),
            Self::CorruptStore => Some("Restore the database from a backup or delete it."),
            Self::ArchiveWriteFailed => Some("Check disk space and write permissions."),
            Self::ArchiveReadFailed => Some("The snapshot file may have been moved or truncated."),
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Input rejected before any store or remote mutation happens.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("snapshot {0} not found")]
    SnapshotNotFound(i64),

    #[error("snapshot {0} has no members")]
    EmptySnapshot(i64),

    #[error("snapshot {snapshot_id} belongs to group {actual}, not {expected}")]
    GroupMismatch {
        snapshot_id: i64,
        expected: i64,
        actual: i64,
    },

    #[error("invites_per_minute must be greater than zero (got {0})")]
    InvalidRate(u32),
}

impl ValidationError {
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::SnapshotNotFound(_) => ErrorCode::SnapshotNotFound,
            Self::EmptySnapshot(_) => ErrorCode::EmptySnapshot,
            Self::GroupMismatch { .. } => ErrorCode::GroupMismatch,
            Self::InvalidRate(_) => ErrorCode::InvalidRate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ErrorCode, ValidationError};
    use std::collections::HashSet;

    #[test]
    fn all_codes_are_unique() {
        let all = [
            ErrorCode::ConfigParseError,
            ErrorCode::InvalidRate,
            ErrorCode::SnapshotNotFound,
            ErrorCode::EmptySnapshot,
            ErrorCode::GroupMismatch,
            ErrorCode::JobAlreadyActive,
            ErrorCode::RemoteTransport,
            ErrorCode::RemoteRejected,
            ErrorCode::RemoteDecode,
            ErrorCode::StoreFailure,
            ErrorCode::CorruptStore,
            ErrorCode::ArchiveWriteFailed,
            ErrorCode::ArchiveReadFailed,
            ErrorCode::InternalUnexpected,
        ];

        let mut seen = HashSet::new();
        for code in all {
            assert!(seen.insert(code.code()), "duplicate code {}", code.code());
        }
    }

    #[test]
    fn code_format_is_machine_friendly() {
        let code = ErrorCode::GroupMismatch.code();
        assert_eq!(code.len(), 5);
        assert!(code.starts_with('E'));
        assert!(code.chars().skip(1).all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn group_mismatch_names_both_groups() {
        let err = ValidationError::GroupMismatch {
            snapshot_id: 7,
            expected: 100,
            actual: 200,
        };
        let text = err.to_string();
        assert!(text.contains("100"));
        assert!(text.contains("200"));
        assert_eq!(err.error_code(), ErrorCode::GroupMismatch);
    }
}
