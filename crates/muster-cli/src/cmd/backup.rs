use std::io::Write;

use clap::Args;
use muster_core::config::MusterConfig;
use muster_core::model::{Snapshot, SnapshotKind};
use muster_core::snapshot::PruneReport;
use serde::Serialize;

use super::{OrReport, manager};
use crate::output::{OutputMode, pretty_kv, pretty_section, render_mode};

#[derive(Args, Debug)]
pub struct BackupArgs {
    /// Group to snapshot.
    pub group: i64,

    /// Snapshot kind recorded with the row.
    #[arg(long, default_value = "manual")]
    pub kind: SnapshotKind,

    /// Free-form note stored with the snapshot.
    #[arg(long, default_value = "")]
    pub note: String,

    /// Skip pruning old snapshots afterwards.
    #[arg(long)]
    pub no_prune: bool,
}

#[derive(Debug, Serialize)]
struct BackupOutput {
    snapshot: Snapshot,
    #[serde(skip_serializing_if = "Option::is_none")]
    pruned: Option<PruneReport>,
}

/// Execute `muster backup`.
pub fn run_backup(args: &BackupArgs, config: &MusterConfig, output: OutputMode) -> anyhow::Result<()> {
    let manager = manager(config, output)?;
    let snapshot = manager
        .create_snapshot(args.group, args.kind, &args.note)
        .or_report(output)?;

    let keep = config.storage.keep_snapshots;
    let pruned = if args.no_prune || keep == 0 {
        None
    } else {
        Some(manager.prune_snapshots(args.group, keep).or_report(output)?)
    };

    let payload = BackupOutput { snapshot, pruned };
    render_mode(output, &payload, render_backup_text, render_backup_pretty)
}

fn render_backup_text(report: &BackupOutput, w: &mut dyn Write) -> std::io::Result<()> {
    let s = &report.snapshot;
    writeln!(
        w,
        "snapshot {} group {} members {} joined {} left {}",
        s.id, s.group_id, s.member_count, s.new_member_count, s.left_member_count
    )?;
    if let Some(pruned) = &report.pruned {
        writeln!(w, "pruned {}", pruned.deleted_snapshot_ids.len())?;
    }
    Ok(())
}

fn render_backup_pretty(report: &BackupOutput, w: &mut dyn Write) -> std::io::Result<()> {
    let s = &report.snapshot;
    pretty_section(w, &format!("Snapshot #{} of group {}", s.id, s.group_id))?;
    pretty_kv(w, "kind", s.kind.to_string())?;
    pretty_kv(w, "members", s.member_count.to_string())?;
    pretty_kv(w, "joined", s.new_member_count.to_string())?;
    pretty_kv(w, "left", s.left_member_count.to_string())?;
    if let Some(path) = &s.file_path {
        pretty_kv(
            w,
            "file",
            format!("{} ({} bytes)", path.display(), s.file_size),
        )?;
    }
    let pruned = report
        .pruned
        .as_ref()
        .filter(|p| !p.deleted_snapshot_ids.is_empty());
    if let Some(pruned) = pruned {
        pretty_kv(
            w,
            "pruned",
            format!(
                "{} old snapshot(s), kept {}",
                pruned.deleted_snapshot_ids.len(),
                pruned.kept
            ),
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmd::testing::scratch_config;
    use muster_core::model::SnapshotStatus;
    use muster_core::store::{SnapshotStore, SqliteStore};

    #[test]
    fn unreachable_bot_records_failed_snapshot() {
        let (_dir, config) = scratch_config();
        let args = BackupArgs {
            group: 5,
            kind: SnapshotKind::Manual,
            note: String::new(),
            no_prune: false,
        };
        let err = run_backup(&args, &config, OutputMode::Json).expect_err("bot unreachable");
        assert!(err.to_string().starts_with("E3001"));

        let store = SqliteStore::open(&config.storage.database).expect("store");
        let history = store.list_by_group(5, 10).expect("history");
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].status, SnapshotStatus::Failed);
    }
}
