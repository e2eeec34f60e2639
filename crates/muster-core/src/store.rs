//! Snapshot persistence.
//!
//! [`SnapshotStore`] is the repository the snapshot manager and the
//! reconciler work against. [`SqliteStore`] is the production implementation
//! on top of the schema in [`crate::db`].

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::db;
use crate::error::ErrorCode;
use crate::model::{
    GroupProfile, MemberRecord, MembershipEvent, NewSnapshot, Snapshot, SnapshotStatus,
    SnapshotSummary,
};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("could not open store: {0:#}")]
    Open(anyhow::Error),

    #[error("snapshot {0} is not running and cannot be completed again")]
    NotRunning(i64),

    #[error("corrupt {table} row: {detail}")]
    Corrupt { table: &'static str, detail: String },
}

impl StoreError {
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::Sqlite(_) | Self::Open(_) => ErrorCode::StoreFailure,
            Self::NotRunning(_) => ErrorCode::InternalUnexpected,
            Self::Corrupt { .. } => ErrorCode::CorruptStore,
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Repository of snapshots, their captured members, the current roster per
/// group, group metadata, and the membership event log.
pub trait SnapshotStore: Send + Sync {
    /// Insert a `running` snapshot row and return its id.
    ///
    /// # Errors
    ///
    /// Returns an error if the row cannot be inserted.
    fn save(&self, new: &NewSnapshot) -> StoreResult<i64>;

    /// Finish a running snapshot: store its final fields and captured
    /// members, replace the group's current roster, and append `events`.
    /// A successful snapshot also stamps the group's `last_backup_at`.
    /// All of it commits together or not at all.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotRunning`] if the snapshot already finished,
    /// or a database error.
    fn complete(
        &self,
        snapshot: &Snapshot,
        members: &[MemberRecord],
        events: &[MembershipEvent],
    ) -> StoreResult<()>;

    /// Record a running snapshot as failed with its error message.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotRunning`] if the snapshot already finished,
    /// or a database error.
    fn mark_failed(&self, snapshot: &Snapshot) -> StoreResult<()>;

    /// # Errors
    ///
    /// Returns an error if the query fails or the row is corrupt.
    fn get(&self, snapshot_id: i64) -> StoreResult<Option<Snapshot>>;

    /// Captured members of a snapshot, in capture order.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a row is corrupt.
    fn load_members(&self, snapshot_id: i64) -> StoreResult<Vec<MemberRecord>>;

    /// Snapshots of a group, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a row is corrupt.
    fn list_by_group(&self, group_id: i64, limit: usize) -> StoreResult<Vec<Snapshot>>;

    /// Delete a snapshot and its captured members. Returns `false` if absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    fn delete(&self, snapshot_id: i64) -> StoreResult<bool>;

    /// The current roster cached for a group, ordered by user id.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a row is corrupt.
    fn current_members(&self, group_id: i64) -> StoreResult<Vec<MemberRecord>>;

    /// Membership events of a group, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a row is corrupt.
    fn events_for_group(&self, group_id: i64, limit: usize) -> StoreResult<Vec<MembershipEvent>>;

    /// Insert or refresh a group's name and counts. `last_backup_at` is
    /// owned by [`SnapshotStore::complete`] and left untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn upsert_group(&self, profile: &GroupProfile) -> StoreResult<()>;

    /// # Errors
    ///
    /// Returns an error if the query fails or the row is corrupt.
    fn get_group(&self, group_id: i64) -> StoreResult<Option<GroupProfile>>;
}

/// [`SnapshotStore`] backed by one SQLite connection.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create the database at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open(path: &Path) -> StoreResult<Self> {
        let conn = db::open_store(path).map_err(StoreError::Open)?;
        Ok(Self::from_connection(conn))
    }

    /// # Errors
    ///
    /// Returns an error if the schema cannot be created.
    pub fn in_memory() -> StoreResult<Self> {
        let conn = db::open_in_memory().map_err(StoreError::Open)?;
        Ok(Self::from_connection(conn))
    }

    #[must_use]
    pub const fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

const SNAPSHOT_COLUMNS: &str = "snapshot_id, group_id, kind, status, notes, member_count, \
     new_member_count, left_member_count, file_path, file_size, compressed, summary_json, \
     error_message, started_at_us, completed_at_us";

fn to_i64(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn to_usize(value: i64) -> usize {
    usize::try_from(value).unwrap_or(0)
}

fn micros(at: DateTime<Utc>) -> i64 {
    at.timestamp_micros()
}

fn conversion_error(
    idx: usize,
    ty: Type,
    error: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, ty, Box::new(error))
}

#[derive(Debug, thiserror::Error)]
#[error("timestamp {0} is out of range")]
struct TimestampOutOfRange(i64);

fn from_micros(idx: usize, us: i64) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::from_timestamp_micros(us)
        .ok_or_else(|| conversion_error(idx, Type::Integer, TimestampOutOfRange(us)))
}

fn optional_from_micros(idx: usize, us: Option<i64>) -> rusqlite::Result<Option<DateTime<Utc>>> {
    us.map(|us| from_micros(idx, us)).transpose()
}

fn parse_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse::<T>()
        .map_err(|error| conversion_error(idx, Type::Text, error))
}

fn snapshot_from_row(row: &Row<'_>) -> rusqlite::Result<Snapshot> {
    let summary_json: Option<String> = row.get(11)?;
    let summary = summary_json
        .map(|raw| serde_json::from_str::<SnapshotSummary>(&raw))
        .transpose()
        .map_err(|error| conversion_error(11, Type::Text, error))?;

    Ok(Snapshot {
        id: row.get(0)?,
        group_id: row.get(1)?,
        kind: parse_column(row, 2)?,
        status: parse_column(row, 3)?,
        notes: row.get(4)?,
        member_count: to_usize(row.get(5)?),
        new_member_count: to_usize(row.get(6)?),
        left_member_count: to_usize(row.get(7)?),
        file_path: row.get::<_, Option<String>>(8)?.map(PathBuf::from),
        file_size: u64::try_from(row.get::<_, i64>(9)?).unwrap_or(0),
        compressed: row.get(10)?,
        summary,
        error_message: row.get(12)?,
        started_at: from_micros(13, row.get(13)?)?,
        completed_at: optional_from_micros(14, row.get(14)?)?,
    })
}

fn member_from_row(row: &Row<'_>) -> rusqlite::Result<MemberRecord> {
    Ok(MemberRecord {
        user_id: row.get(0)?,
        display_name: row.get(1)?,
        group_card: row.get(2)?,
        gender: parse_column(row, 3)?,
        role: parse_column(row, 4)?,
        level: row.get(5)?,
        title: row.get(6)?,
        joined_at: optional_from_micros(7, row.get(7)?)?,
        last_active_at: optional_from_micros(8, row.get(8)?)?,
    })
}

fn group_from_row(row: &Row<'_>) -> rusqlite::Result<GroupProfile> {
    Ok(GroupProfile {
        group_id: row.get(0)?,
        group_name: row.get(1)?,
        member_count: to_usize(row.get(2)?),
        max_member_count: to_usize(row.get(3)?),
        group_level: row.get(4)?,
        last_backup_at: optional_from_micros(5, row.get(5)?)?,
        updated_at: Some(from_micros(6, row.get(6)?)?),
    })
}

fn event_from_row(row: &Row<'_>) -> rusqlite::Result<MembershipEvent> {
    Ok(MembershipEvent {
        id: Some(row.get(0)?),
        group_id: row.get(1)?,
        user_id: row.get(2)?,
        display_name_at_time: row.get(3)?,
        action: parse_column(row, 4)?,
        snapshot_id: row.get(5)?,
        timestamp: from_micros(6, row.get(6)?)?,
    })
}

impl SnapshotStore for SqliteStore {
    fn save(&self, new: &NewSnapshot) -> StoreResult<i64> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO snapshots (group_id, kind, status, notes, started_at_us)
             VALUES (?1, ?2, 'running', ?3, ?4)",
            params![new.group_id, new.kind.as_str(), new.notes, micros(new.started_at)],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn complete(
        &self,
        snapshot: &Snapshot,
        members: &[MemberRecord],
        events: &[MembershipEvent],
    ) -> StoreResult<()> {
        let summary_json = snapshot
            .summary
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|error| StoreError::Corrupt {
                table: "snapshots",
                detail: error.to_string(),
            })?;

        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let updated = tx.execute(
            "UPDATE snapshots
             SET status = ?2, member_count = ?3, new_member_count = ?4, left_member_count = ?5,
                 file_path = ?6, file_size = ?7, compressed = ?8, summary_json = ?9,
                 error_message = NULL, completed_at_us = ?10
             WHERE snapshot_id = ?1 AND status = 'running'",
            params![
                snapshot.id,
                snapshot.status.as_str(),
                to_i64(snapshot.member_count),
                to_i64(snapshot.new_member_count),
                to_i64(snapshot.left_member_count),
                snapshot
                    .file_path
                    .as_ref()
                    .map(|path| path.to_string_lossy().into_owned()),
                i64::try_from(snapshot.file_size).unwrap_or(i64::MAX),
                snapshot.compressed,
                summary_json,
                snapshot.completed_at.map(micros),
            ],
        )?;
        if updated == 0 {
            return Err(StoreError::NotRunning(snapshot.id));
        }

        {
            let mut insert_captured = tx.prepare(
                "INSERT INTO snapshot_members (snapshot_id, position, user_id, record_json)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for (position, member) in members.iter().enumerate() {
                let record_json =
                    serde_json::to_string(member).map_err(|error| StoreError::Corrupt {
                        table: "snapshot_members",
                        detail: error.to_string(),
                    })?;
                insert_captured.execute(params![
                    snapshot.id,
                    to_i64(position),
                    member.user_id,
                    record_json
                ])?;
            }

            tx.execute(
                "DELETE FROM group_members WHERE group_id = ?1",
                [snapshot.group_id],
            )?;
            let updated_at = snapshot.completed_at.unwrap_or_else(Utc::now);
            let mut insert_current = tx.prepare(
                "INSERT OR REPLACE INTO group_members (
                    group_id, user_id, display_name, group_card, gender, role, level, title,
                    joined_at_us, last_active_at_us, updated_at_us
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            )?;
            for member in members {
                insert_current.execute(params![
                    snapshot.group_id,
                    member.user_id,
                    member.display_name,
                    member.group_card,
                    member.gender.as_str(),
                    member.role.as_str(),
                    member.level,
                    member.title,
                    member.joined_at.map(micros),
                    member.last_active_at.map(micros),
                    micros(updated_at),
                ])?;
            }

            let mut insert_event = tx.prepare(
                "INSERT INTO membership_events (
                    group_id, user_id, display_name, action, snapshot_id, created_at_us
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for event in events {
                insert_event.execute(params![
                    event.group_id,
                    event.user_id,
                    event.display_name_at_time,
                    event.action.as_str(),
                    event.snapshot_id,
                    micros(event.timestamp),
                ])?;
            }
        }

        if snapshot.status == SnapshotStatus::Success {
            let backup_at = micros(snapshot.completed_at.unwrap_or_else(Utc::now));
            tx.execute(
                "INSERT INTO groups (group_id, member_count, last_backup_at_us, updated_at_us)
                 VALUES (?1, ?2, ?3, ?3)
                 ON CONFLICT (group_id) DO UPDATE SET
                    member_count = excluded.member_count,
                    last_backup_at_us = excluded.last_backup_at_us,
                    updated_at_us = excluded.updated_at_us",
                params![snapshot.group_id, to_i64(snapshot.member_count), backup_at],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    fn mark_failed(&self, snapshot: &Snapshot) -> StoreResult<()> {
        let conn = self.conn();
        let updated = conn.execute(
            "UPDATE snapshots
             SET status = ?2, error_message = ?3, completed_at_us = ?4
             WHERE snapshot_id = ?1 AND status = 'running'",
            params![
                snapshot.id,
                SnapshotStatus::Failed.as_str(),
                snapshot.error_message,
                snapshot.completed_at.unwrap_or_else(Utc::now).timestamp_micros(),
            ],
        )?;
        if updated == 0 {
            return Err(StoreError::NotRunning(snapshot.id));
        }
        Ok(())
    }

    fn get(&self, snapshot_id: i64) -> StoreResult<Option<Snapshot>> {
        let conn = self.conn();
        let sql = format!("SELECT {SNAPSHOT_COLUMNS} FROM snapshots WHERE snapshot_id = ?1");
        Ok(conn
            .query_row(&sql, [snapshot_id], snapshot_from_row)
            .optional()?)
    }

    fn load_members(&self, snapshot_id: i64) -> StoreResult<Vec<MemberRecord>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT record_json FROM snapshot_members WHERE snapshot_id = ?1 ORDER BY position",
        )?;
        let rows = stmt.query_map([snapshot_id], |row| row.get::<_, String>(0))?;

        let mut members = Vec::new();
        for raw in rows {
            let member = serde_json::from_str(&raw?).map_err(|error| StoreError::Corrupt {
                table: "snapshot_members",
                detail: format!("snapshot {snapshot_id}: {error}"),
            })?;
            members.push(member);
        }
        Ok(members)
    }

    fn list_by_group(&self, group_id: i64, limit: usize) -> StoreResult<Vec<Snapshot>> {
        let conn = self.conn();
        let sql = format!(
            "SELECT {SNAPSHOT_COLUMNS} FROM snapshots
             WHERE group_id = ?1
             ORDER BY started_at_us DESC, snapshot_id DESC
             LIMIT ?2"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![group_id, to_i64(limit)], snapshot_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn delete(&self, snapshot_id: i64) -> StoreResult<bool> {
        let conn = self.conn();
        let removed = conn.execute("DELETE FROM snapshots WHERE snapshot_id = ?1", [snapshot_id])?;
        Ok(removed > 0)
    }

    fn current_members(&self, group_id: i64) -> StoreResult<Vec<MemberRecord>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT user_id, display_name, group_card, gender, role, level, title,
                    joined_at_us, last_active_at_us
             FROM group_members
             WHERE group_id = ?1
             ORDER BY user_id",
        )?;
        let rows = stmt.query_map([group_id], member_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn events_for_group(&self, group_id: i64, limit: usize) -> StoreResult<Vec<MembershipEvent>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT event_id, group_id, user_id, display_name, action, snapshot_id, created_at_us
             FROM membership_events
             WHERE group_id = ?1
             ORDER BY created_at_us DESC, event_id DESC
             LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![group_id, to_i64(limit)], event_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn upsert_group(&self, profile: &GroupProfile) -> StoreResult<()> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO groups (
                group_id, group_name, member_count, max_member_count, group_level, updated_at_us
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT (group_id) DO UPDATE SET
                group_name = excluded.group_name,
                member_count = excluded.member_count,
                max_member_count = excluded.max_member_count,
                group_level = excluded.group_level,
                updated_at_us = excluded.updated_at_us",
            params![
                profile.group_id,
                profile.group_name,
                to_i64(profile.member_count),
                to_i64(profile.max_member_count),
                profile.group_level,
                micros(profile.updated_at.unwrap_or_else(Utc::now)),
            ],
        )?;
        Ok(())
    }

    fn get_group(&self, group_id: i64) -> StoreResult<Option<GroupProfile>> {
        let conn = self.conn();
        Ok(conn
            .query_row(
                "SELECT group_id, group_name, member_count, max_member_count, group_level,
                        last_backup_at_us, updated_at_us
                 FROM groups WHERE group_id = ?1",
                [group_id],
                group_from_row,
            )
            .optional()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MembershipAction, Role, SnapshotKind};

    fn new_snapshot(group_id: i64) -> NewSnapshot {
        NewSnapshot {
            group_id,
            kind: SnapshotKind::Full,
            notes: String::new(),
            started_at: Utc::now(),
        }
    }

    fn completed(store: &SqliteStore, group_id: i64, members: &[MemberRecord]) -> Snapshot {
        let new = new_snapshot(group_id);
        let id = store.save(&new).expect("save");
        let mut snapshot = Snapshot::running(id, &new);
        snapshot.status = SnapshotStatus::Success;
        snapshot.member_count = members.len();
        snapshot.completed_at = Some(Utc::now());
        snapshot.summary = Some(SnapshotSummary {
            total: members.len(),
            ..SnapshotSummary::default()
        });
        store.complete(&snapshot, members, &[]).expect("complete");
        snapshot
    }

    #[test]
    fn saved_snapshot_starts_running() {
        let store = SqliteStore::in_memory().expect("store");
        let id = store.save(&new_snapshot(5)).expect("save");
        let loaded = store.get(id).expect("get").expect("present");
        assert_eq!(loaded.status, SnapshotStatus::Running);
        assert_eq!(loaded.group_id, 5);
        assert!(loaded.completed_at.is_none());
    }

    #[test]
    fn complete_stores_members_in_capture_order() {
        let store = SqliteStore::in_memory().expect("store");
        let members = vec![
            MemberRecord::new(30, "c"),
            MemberRecord::new(10, "a").with_role(Role::Admin),
            MemberRecord::new(20, "b").with_card("Bee"),
        ];
        let snapshot = completed(&store, 1, &members);

        assert_eq!(store.load_members(snapshot.id).expect("load"), members);
        let loaded = store.get(snapshot.id).expect("get").expect("present");
        assert_eq!(loaded.status, SnapshotStatus::Success);
        assert_eq!(loaded.member_count, 3);
        assert_eq!(loaded.summary.map(|s| s.total), Some(3));
    }

    #[test]
    fn current_roster_is_replaced_not_merged() {
        let store = SqliteStore::in_memory().expect("store");
        completed(&store, 1, &[MemberRecord::new(1, "a"), MemberRecord::new(2, "b")]);
        completed(&store, 1, &[MemberRecord::new(2, "b"), MemberRecord::new(3, "c")]);

        let ids: Vec<i64> = store
            .current_members(1)
            .expect("current")
            .iter()
            .map(|m| m.user_id)
            .collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn finished_snapshot_cannot_transition_again() {
        let store = SqliteStore::in_memory().expect("store");
        let mut snapshot = completed(&store, 1, &[]);
        snapshot.status = SnapshotStatus::Failed;
        snapshot.error_message = Some("late".to_string());

        assert!(matches!(
            store.mark_failed(&snapshot),
            Err(StoreError::NotRunning(_))
        ));
        assert!(matches!(
            store.complete(&snapshot, &[], &[]),
            Err(StoreError::NotRunning(_))
        ));
    }

    #[test]
    fn list_is_newest_first_and_limited() {
        let store = SqliteStore::in_memory().expect("store");
        let first = completed(&store, 1, &[]);
        let second = completed(&store, 1, &[]);
        let third = completed(&store, 1, &[]);
        completed(&store, 2, &[]);

        let listed: Vec<i64> = store
            .list_by_group(1, 2)
            .expect("list")
            .iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(listed, vec![third.id, second.id]);
        assert!(!listed.contains(&first.id));
    }

    #[test]
    fn delete_keeps_events_but_detaches_them() {
        let store = SqliteStore::in_memory().expect("store");
        let new = new_snapshot(4);
        let id = store.save(&new).expect("save");
        let mut snapshot = Snapshot::running(id, &new);
        snapshot.status = SnapshotStatus::Success;
        snapshot.completed_at = Some(Utc::now());
        let event = MembershipEvent {
            id: None,
            group_id: 4,
            user_id: 77,
            display_name_at_time: "newbie".to_string(),
            action: MembershipAction::Join,
            snapshot_id: Some(id),
            timestamp: Utc::now(),
        };
        store
            .complete(&snapshot, &[MemberRecord::new(77, "newbie")], &[event])
            .expect("complete");

        assert!(store.delete(id).expect("delete"));
        assert!(!store.delete(id).expect("second delete"));
        assert!(store.get(id).expect("get").is_none());
        assert!(store.load_members(id).expect("members").is_empty());

        let events = store.events_for_group(4, 10).expect("events");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].user_id, 77);
        assert_eq!(events[0].snapshot_id, None);
    }

    #[test]
    fn group_upsert_keeps_last_backup_time() {
        let store = SqliteStore::in_memory().expect("store");
        assert!(store.get_group(8).expect("get").is_none());

        store
            .upsert_group(&GroupProfile::new(8, "Lounge").with_counts(1, 200))
            .expect("insert");
        let first = store.get_group(8).expect("get").expect("present");
        assert_eq!(first.group_name, "Lounge");
        assert!(first.last_backup_at.is_none());

        let snapshot = completed(&store, 8, &[MemberRecord::new(1, "a"), MemberRecord::new(2, "b")]);
        let backed_up = store.get_group(8).expect("get").expect("present");
        assert_eq!(backed_up.member_count, 2);
        assert_eq!(
            backed_up.last_backup_at.map(|at| at.timestamp_micros()),
            snapshot.completed_at.map(|at| at.timestamp_micros())
        );

        store
            .upsert_group(&GroupProfile::new(8, "Lounge 2").with_counts(3, 200))
            .expect("refresh");
        let refreshed = store.get_group(8).expect("get").expect("present");
        assert_eq!(refreshed.group_name, "Lounge 2");
        assert_eq!(refreshed.member_count, 3);
        assert_eq!(refreshed.last_backup_at, backed_up.last_backup_at);
    }

    #[test]
    fn failed_snapshot_does_not_stamp_group() {
        let store = SqliteStore::in_memory().expect("store");
        let new = new_snapshot(9);
        let id = store.save(&new).expect("save");
        let mut snapshot = Snapshot::running(id, &new);
        snapshot.status = SnapshotStatus::Failed;
        snapshot.error_message = Some("timeout".to_string());
        store.mark_failed(&snapshot).expect("mark failed");
        assert!(store.get_group(9).expect("get").is_none());
    }
}
