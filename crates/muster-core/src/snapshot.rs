//! Snapshot orchestration: fetch, diff against the previous roster, persist,
//! and prune.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::archive::{self, ArchiveError, ArchiveSettings, SnapshotDocument};
use crate::diff::{CardChange, MemberDiff, MemberIndex, diff_members, index_members};
use crate::error::{ErrorCode, ValidationError};
use crate::model::{
    GroupProfile, MemberRecord, MembershipAction, MembershipEvent, NewSnapshot, Role, Snapshot, SnapshotKind,
    SnapshotStatus, SnapshotSummary,
};
use crate::remote::{Freshness, GroupApi, RemoteError};
use crate::store::{SnapshotStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl SnapshotError {
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::Remote(err) => err.error_code(),
            Self::Store(err) => err.error_code(),
            Self::Archive(err) => err.error_code(),
            Self::Validation(err) => err.error_code(),
        }
    }
}

/// Outcome of [`SnapshotManager::prune_snapshots`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PruneReport {
    pub group_id: i64,
    pub kept: usize,
    pub deleted_snapshot_ids: Vec<i64>,
    pub removed_files: usize,
    pub missing_files: usize,
}

/// Member-level comparison of two stored snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotComparison {
    pub old_snapshot_id: i64,
    pub new_snapshot_id: i64,
    pub joined: Vec<MemberRecord>,
    pub left: Vec<MemberRecord>,
    pub remained_count: usize,
    pub changed_cards: Vec<CardChange>,
}

/// Takes and maintains snapshots for groups reachable through `A`.
pub struct SnapshotManager<A, S> {
    api: A,
    store: S,
    archive: ArchiveSettings,
}

impl<A: GroupApi, S: SnapshotStore> SnapshotManager<A, S> {
    pub const fn new(api: A, store: S, archive: ArchiveSettings) -> Self {
        Self {
            api,
            store,
            archive,
        }
    }

    pub const fn api(&self) -> &A {
        &self.api
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Capture the live roster of `group_id` as a new snapshot.
    ///
    /// The snapshot row is created as `running` first. Any failure after
    /// that marks it `failed` with the error message, and the error is
    /// returned. There is no retry.
    ///
    /// # Errors
    ///
    /// Returns the remote, store, or archive error that aborted the run.
    pub fn create_snapshot(
        &self,
        group_id: i64,
        kind: SnapshotKind,
        notes: &str,
    ) -> Result<Snapshot, SnapshotError> {
        let new = NewSnapshot {
            group_id,
            kind,
            notes: notes.to_string(),
            started_at: Utc::now(),
        };
        let id = self.store.save(&new)?;
        let mut snapshot = Snapshot::running(id, &new);
        info!(snapshot_id = id, group_id, kind = %kind, "snapshot started");

        match self.capture(&mut snapshot) {
            Ok(()) => {
                info!(
                    snapshot_id = id,
                    group_id,
                    members = snapshot.member_count,
                    joined = snapshot.new_member_count,
                    left = snapshot.left_member_count,
                    bytes = snapshot.file_size,
                    "snapshot completed"
                );
                Ok(snapshot)
            }
            Err(err) => {
                snapshot.status = SnapshotStatus::Failed;
                snapshot.error_message = Some(err.to_string());
                snapshot.completed_at = Some(Utc::now());
                snapshot.file_path = None;
                snapshot.file_size = 0;
                if let Err(mark_err) = self.store.mark_failed(&snapshot) {
                    warn!(snapshot_id = id, error = %mark_err, "could not record snapshot failure");
                }
                warn!(snapshot_id = id, group_id, error = %err, "snapshot failed");
                Err(err)
            }
        }
    }

    /// Fetch the group's metadata from the remote and record it.
    ///
    /// # Errors
    ///
    /// Returns the remote or store error.
    pub fn sync_group_info(&self, group_id: i64) -> Result<GroupProfile, SnapshotError> {
        let mut profile = self.api.group_info(group_id, Freshness::BypassCache)?;
        profile.updated_at = Some(Utc::now());
        self.store.upsert_group(&profile)?;
        debug!(
            group_id,
            name = %profile.group_name,
            members = profile.member_count,
            "group info synced"
        );
        Ok(self.store.get_group(group_id)?.unwrap_or(profile))
    }

    /// The stored metadata of a group, if it was ever synced or backed up.
    ///
    /// # Errors
    ///
    /// Returns an error if the store query fails.
    pub fn group_profile(&self, group_id: i64) -> Result<Option<GroupProfile>, SnapshotError> {
        Ok(self.store.get_group(group_id)?)
    }

    fn capture(&self, snapshot: &mut Snapshot) -> Result<(), SnapshotError> {
        let group_id = snapshot.group_id;
        if let Err(err) = self.sync_group_info(group_id) {
            warn!(group_id, error = %err, "group info not synced");
        }
        let members = self
            .api
            .list_group_members(group_id, Freshness::BypassCache)?;
        let previous = index_members(&self.store.current_members(group_id)?);
        let current = index_members(&members);
        let diff = diff_members(&previous, &current);
        debug!(
            group_id,
            fetched = members.len(),
            previous = previous.len(),
            changed_cards = diff.changed_cards.len(),
            "roster diffed"
        );

        let now = Utc::now();
        let events = membership_events(snapshot, &diff, &previous, &current, now);

        let document = SnapshotDocument::new(snapshot.id, group_id, now, members.clone());
        let (path, size) = archive::write_document(&self.archive, &document)?;

        snapshot.status = SnapshotStatus::Success;
        snapshot.member_count = members.len();
        snapshot.new_member_count = diff.joined.len();
        snapshot.left_member_count = diff.left.len();
        snapshot.file_path = Some(path.clone());
        snapshot.file_size = size;
        snapshot.compressed = self.archive.compress;
        snapshot.completed_at = Some(now);
        snapshot.summary = Some(summarize(&members, &diff));

        if let Err(err) = self.store.complete(snapshot, &members, &events) {
            if let Err(remove_err) = archive::remove_document(&path) {
                warn!(path = %path.display(), error = %remove_err, "orphaned snapshot file");
            }
            return Err(err.into());
        }
        Ok(())
    }

    /// Delete all but the newest `keep_count` snapshots of a group.
    ///
    /// File removal is best-effort: a missing or undeletable file is counted
    /// or logged and the record is deleted anyway.
    ///
    /// # Errors
    ///
    /// Returns an error if listing or deleting records fails.
    pub fn prune_snapshots(
        &self,
        group_id: i64,
        keep_count: usize,
    ) -> Result<PruneReport, SnapshotError> {
        let snapshots = self.store.list_by_group(group_id, usize::MAX)?;
        let mut report = PruneReport {
            group_id,
            kept: snapshots.len().min(keep_count),
            ..PruneReport::default()
        };

        for snapshot in snapshots.iter().skip(keep_count) {
            if let Some(path) = &snapshot.file_path {
                match archive::remove_document(path) {
                    Ok(true) => report.removed_files += 1,
                    Ok(false) => report.missing_files += 1,
                    Err(err) => {
                        warn!(snapshot_id = snapshot.id, error = %err, "could not remove snapshot file");
                    }
                }
            }
            if self.store.delete(snapshot.id)? {
                report.deleted_snapshot_ids.push(snapshot.id);
            }
        }

        if !report.deleted_snapshot_ids.is_empty() {
            info!(
                group_id,
                deleted = report.deleted_snapshot_ids.len(),
                kept = report.kept,
                "pruned snapshots"
            );
        }
        Ok(report)
    }

    /// Compare the captured members of two snapshots.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::SnapshotNotFound`] for an unknown id, or a
    /// store error.
    pub fn diff_snapshots(
        &self,
        old_id: i64,
        new_id: i64,
    ) -> Result<SnapshotComparison, SnapshotError> {
        let old = index_members(&self.members_of(old_id)?);
        let new = index_members(&self.members_of(new_id)?);
        let diff = diff_members(&old, &new);

        Ok(SnapshotComparison {
            old_snapshot_id: old_id,
            new_snapshot_id: new_id,
            joined: diff.joined.iter().filter_map(|id| new.get(id).cloned()).collect(),
            left: diff.left.iter().filter_map(|id| old.get(id).cloned()).collect(),
            remained_count: diff.remained.len(),
            changed_cards: diff.changed_cards,
        })
    }

    fn members_of(&self, snapshot_id: i64) -> Result<Vec<MemberRecord>, SnapshotError> {
        if self.store.get(snapshot_id)?.is_none() {
            return Err(ValidationError::SnapshotNotFound(snapshot_id).into());
        }
        Ok(self.store.load_members(snapshot_id)?)
    }

    /// Snapshot records of a group, newest first.
    ///
    /// # Errors
    ///
    /// Returns a store error.
    pub fn history(&self, group_id: i64, limit: usize) -> Result<Vec<Snapshot>, SnapshotError> {
        Ok(self.store.list_by_group(group_id, limit)?)
    }

    /// # Errors
    ///
    /// Returns a store error.
    pub fn membership_events(
        &self,
        group_id: i64,
        limit: usize,
    ) -> Result<Vec<MembershipEvent>, SnapshotError> {
        Ok(self.store.events_for_group(group_id, limit)?)
    }

    /// The stored document of a snapshot.
    ///
    /// Reads the archive file when one was written, otherwise rebuilds the
    /// document from the captured members in the store.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::SnapshotNotFound`] for an unknown id, or an
    /// archive/store error.
    pub fn load_archive(&self, snapshot_id: i64) -> Result<SnapshotDocument, SnapshotError> {
        let snapshot = self
            .store
            .get(snapshot_id)?
            .ok_or(ValidationError::SnapshotNotFound(snapshot_id))?;

        if let Some(path) = &snapshot.file_path {
            return Ok(archive::read_document(path)?);
        }

        let members = self.store.load_members(snapshot_id)?;
        Ok(SnapshotDocument::new(
            snapshot.id,
            snapshot.group_id,
            snapshot.completed_at.unwrap_or(snapshot.started_at),
            members,
        ))
    }
}

fn membership_events(
    snapshot: &Snapshot,
    diff: &MemberDiff,
    previous: &MemberIndex,
    current: &MemberIndex,
    at: DateTime<Utc>,
) -> Vec<MembershipEvent> {
    let event = |user_id: i64, name: &str, action| MembershipEvent {
        id: None,
        group_id: snapshot.group_id,
        user_id,
        display_name_at_time: name.to_string(),
        action,
        snapshot_id: Some(snapshot.id),
        timestamp: at,
    };

    let joins = diff.joined.iter().filter_map(|id| {
        current
            .get(id)
            .map(|m| event(*id, &m.display_name, MembershipAction::Join))
    });
    let leaves = diff.left.iter().filter_map(|id| {
        previous
            .get(id)
            .map(|m| event(*id, &m.display_name, MembershipAction::Leave))
    });
    joins.chain(leaves).collect()
}

fn summarize(members: &[MemberRecord], diff: &MemberDiff) -> SnapshotSummary {
    SnapshotSummary {
        total: members.len(),
        joined_ids: diff.joined.iter().copied().collect(),
        left_ids: diff.left.iter().copied().collect(),
        owner_count: members.iter().filter(|m| m.role == Role::Owner).count(),
        admin_count: members.iter().filter(|m| m.role == Role::Admin).count(),
    }
}
