use std::sync::Arc;

use muster_core::archive::{self, ArchiveSettings};
use muster_core::error::{ErrorCode, ValidationError};
use muster_core::model::{GroupProfile, MemberRecord, MembershipAction, Role, SnapshotKind, SnapshotStatus};
use muster_core::remote::fake::FakeGroupApi;
use muster_core::snapshot::{SnapshotError, SnapshotManager};
use muster_core::store::{SnapshotStore, SqliteStore};
use tempfile::TempDir;

const GROUP: i64 = 4242;

fn manager(
    dir: &TempDir,
    compress: bool,
) -> (Arc<FakeGroupApi>, SnapshotManager<Arc<FakeGroupApi>, SqliteStore>) {
    let api = Arc::new(FakeGroupApi::new());
    let store = SqliteStore::open(&dir.path().join("muster.sqlite3")).expect("open store");
    let settings = ArchiveSettings {
        dir: dir.path().join("snapshots"),
        compress,
    };
    (Arc::clone(&api), SnapshotManager::new(api, store, settings))
}

fn roster() -> Vec<MemberRecord> {
    vec![
        MemberRecord::new(1, "alice").with_role(Role::Owner),
        MemberRecord::new(2, "bob").with_card("Bobby").with_role(Role::Admin),
        MemberRecord::new(3, "carol"),
    ]
}

#[test]
fn successful_snapshot_fills_counts_summary_and_events() {
    let dir = TempDir::new().expect("tempdir");
    let (api, manager) = manager(&dir, true);
    api.set_roster(GROUP, roster());

    let first = manager
        .create_snapshot(GROUP, SnapshotKind::Full, "nightly")
        .expect("first snapshot");
    assert_eq!(first.status, SnapshotStatus::Success);
    assert_eq!(first.member_count, 3);
    assert_eq!(first.new_member_count, 3);
    assert_eq!(first.left_member_count, 0);
    assert!(first.compressed);
    assert!(first.file_size > 0);
    let summary = first.summary.clone().expect("summary");
    assert_eq!((summary.owner_count, summary.admin_count), (1, 1));

    // carol leaves, dave joins
    api.set_roster(
        GROUP,
        vec![
            MemberRecord::new(1, "alice").with_role(Role::Owner),
            MemberRecord::new(2, "bob").with_card("Bobby").with_role(Role::Admin),
            MemberRecord::new(4, "dave"),
        ],
    );
    let second = manager
        .create_snapshot(GROUP, SnapshotKind::Incremental, "")
        .expect("second snapshot");
    assert_eq!(second.new_member_count, 1);
    assert_eq!(second.left_member_count, 1);

    let events = manager.membership_events(GROUP, 10).expect("events");
    assert_eq!(events.len(), 5);
    let latest: Vec<(i64, MembershipAction)> = events
        .iter()
        .filter(|e| e.snapshot_id == Some(second.id))
        .map(|e| (e.user_id, e.action))
        .collect();
    assert!(latest.contains(&(4, MembershipAction::Join)));
    assert!(latest.contains(&(3, MembershipAction::Leave)));

    let stored = manager.store().get(second.id).expect("get").expect("row");
    assert_eq!(stored.status, SnapshotStatus::Success);
    assert_eq!(stored.member_count, 3);

    let current = manager.store().current_members(GROUP).expect("current");
    let ids: Vec<i64> = current.iter().map(|m| m.user_id).collect();
    assert_eq!(ids, vec![1, 2, 4]);
}

#[test]
fn failed_fetch_leaves_failed_record() {
    let dir = TempDir::new().expect("tempdir");
    let (api, manager) = manager(&dir, false);
    api.fail_roster(GROUP);

    let err = manager
        .create_snapshot(GROUP, SnapshotKind::Manual, "")
        .expect_err("fetch must fail");
    assert!(matches!(err, SnapshotError::Remote(_)));
    assert_eq!(err.error_code(), ErrorCode::RemoteTransport);

    let history = manager.history(GROUP, 10).expect("history");
    assert_eq!(history.len(), 1);
    let failed = &history[0];
    assert_eq!(failed.status, SnapshotStatus::Failed);
    assert!(failed.error_message.as_deref().is_some_and(|m| !m.is_empty()));
    assert!(failed.completed_at.is_some());
    assert!(failed.file_path.is_none());
    assert!(manager.store().load_members(failed.id).expect("members").is_empty());
}

#[test]
fn prune_keeps_newest_and_tolerates_missing_files() {
    let dir = TempDir::new().expect("tempdir");
    let (api, manager) = manager(&dir, false);
    api.set_roster(GROUP, roster());

    let ids: Vec<i64> = (0..4)
        .map(|_| {
            manager
                .create_snapshot(GROUP, SnapshotKind::Full, "")
                .expect("snapshot")
                .id
        })
        .collect();

    let oldest = manager.store().get(ids[0]).expect("get").expect("row");
    std::fs::remove_file(oldest.file_path.expect("path")).expect("remove file");

    let report = manager.prune_snapshots(GROUP, 2).expect("prune");
    assert_eq!(report.kept, 2);
    assert_eq!(report.deleted_snapshot_ids.len(), 2);
    assert!(report.deleted_snapshot_ids.contains(&ids[0]));
    assert!(report.deleted_snapshot_ids.contains(&ids[1]));
    assert_eq!(report.missing_files, 1);
    assert_eq!(report.removed_files, 1);

    let remaining: Vec<i64> = manager
        .history(GROUP, 10)
        .expect("history")
        .iter()
        .map(|s| s.id)
        .collect();
    assert_eq!(remaining, vec![ids[3], ids[2]]);

    // events of pruned snapshots survive with their link cleared
    let events = manager.membership_events(GROUP, 100).expect("events");
    assert_eq!(events.len(), 3);
    assert!(events.iter().all(|e| e.snapshot_id.is_none()));
}

#[test]
fn archives_load_compressed_and_plain() {
    for compress in [true, false] {
        let dir = TempDir::new().expect("tempdir");
        let (api, manager) = manager(&dir, compress);
        api.set_roster(GROUP, roster());

        let snapshot = manager
            .create_snapshot(GROUP, SnapshotKind::Full, "")
            .expect("snapshot");
        let path = snapshot.file_path.clone().expect("path");
        assert_eq!(
            path.extension().and_then(|e| e.to_str()),
            Some(if compress { "gz" } else { "json" })
        );

        let raw = std::fs::read(&path).expect("read");
        assert_eq!(raw.starts_with(&[0x1f, 0x8b]), compress);

        let document = manager.load_archive(snapshot.id).expect("load");
        assert_eq!(document.snapshot_id, snapshot.id);
        assert_eq!(document.member_count, 3);
        assert_eq!(document.members, roster());
        assert_eq!(archive::read_document(&path).expect("direct read"), document);
    }
}

#[test]
fn diff_reports_joined_left_and_card_changes() {
    let dir = TempDir::new().expect("tempdir");
    let (api, manager) = manager(&dir, false);
    api.set_roster(GROUP, roster());
    let old = manager
        .create_snapshot(GROUP, SnapshotKind::Full, "")
        .expect("old");

    api.set_roster(
        GROUP,
        vec![
            MemberRecord::new(1, "alice").with_role(Role::Owner),
            MemberRecord::new(2, "bob").with_card("Robert").with_role(Role::Admin),
            MemberRecord::new(5, "erin"),
        ],
    );
    let new = manager
        .create_snapshot(GROUP, SnapshotKind::Full, "")
        .expect("new");

    let comparison = manager.diff_snapshots(old.id, new.id).expect("diff");
    assert_eq!(comparison.joined.iter().map(|m| m.user_id).collect::<Vec<_>>(), vec![5]);
    assert_eq!(comparison.left.iter().map(|m| m.user_id).collect::<Vec<_>>(), vec![3]);
    assert_eq!(comparison.remained_count, 2);
    assert_eq!(comparison.changed_cards.len(), 1);
    assert_eq!(comparison.changed_cards[0].new_card, "Robert");

    let missing = manager.diff_snapshots(old.id, 999_999).expect_err("unknown id");
    assert!(matches!(
        missing,
        SnapshotError::Validation(ValidationError::SnapshotNotFound(999_999))
    ));
}

#[test]
fn snapshot_records_group_metadata_and_backup_time() {
    let dir = TempDir::new().expect("tempdir");
    let (api, manager) = manager(&dir, false);
    api.set_roster(GROUP, roster());
    api.set_group_info(GroupProfile::new(GROUP, "Book club").with_counts(3, 200));

    let snapshot = manager
        .create_snapshot(GROUP, SnapshotKind::Full, "")
        .expect("snapshot");

    let profile = manager
        .group_profile(GROUP)
        .expect("profile")
        .expect("recorded");
    assert_eq!(profile.group_name, "Book club");
    assert_eq!(profile.max_member_count, 200);
    assert_eq!(profile.member_count, 3);
    assert_eq!(
        profile.last_backup_at.map(|at| at.timestamp_micros()),
        snapshot.completed_at.map(|at| at.timestamp_micros())
    );
}

#[test]
fn group_info_failure_does_not_block_snapshot() {
    let dir = TempDir::new().expect("tempdir");
    let (api, manager) = manager(&dir, false);
    api.set_roster(GROUP, roster());
    api.fail_group_info(GROUP);

    let snapshot = manager
        .create_snapshot(GROUP, SnapshotKind::Manual, "")
        .expect("snapshot still succeeds");
    assert_eq!(snapshot.status, SnapshotStatus::Success);

    let profile = manager
        .group_profile(GROUP)
        .expect("profile")
        .expect("stamped by the backup");
    assert_eq!(profile.group_name, "");
    assert_eq!(profile.member_count, 3);
    assert!(profile.last_backup_at.is_some());
    assert!(manager.sync_group_info(GROUP).is_err());
}
