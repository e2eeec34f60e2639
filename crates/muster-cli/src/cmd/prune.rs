use std::io::Write;

use clap::Args;
use muster_core::config::MusterConfig;
use muster_core::snapshot::PruneReport;

use super::{OrReport, manager};
use crate::output::{OutputMode, render};

#[derive(Args, Debug)]
pub struct PruneArgs {
    pub group: i64,

    /// Number of newest snapshots to keep.
    #[arg(long)]
    pub keep: usize,
}

pub fn run_prune(args: &PruneArgs, config: &MusterConfig, output: OutputMode) -> anyhow::Result<()> {
    let report = manager(config, output)?
        .prune_snapshots(args.group, args.keep)
        .or_report(output)?;
    render(output, &report, render_prune_human)
}

fn render_prune_human(report: &PruneReport, w: &mut dyn Write) -> std::io::Result<()> {
    writeln!(
        w,
        "group {}: kept {}, deleted {} snapshot(s), removed {} file(s), {} already missing",
        report.group_id,
        report.kept,
        report.deleted_snapshot_ids.len(),
        report.removed_files,
        report.missing_files
    )
}
