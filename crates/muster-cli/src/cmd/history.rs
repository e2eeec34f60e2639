use std::io::Write;

use clap::Args;
use muster_core::config::MusterConfig;
use muster_core::model::Snapshot;

use super::{OrReport, manager, timestamp};
use crate::output::{OutputMode, pretty_rule, pretty_section, render_mode};

#[derive(Args, Debug)]
pub struct HistoryArgs {
    pub group: i64,

    /// Maximum number of snapshots to show.
    #[arg(long, default_value_t = 20)]
    pub limit: usize,
}

pub fn run_history(
    args: &HistoryArgs,
    config: &MusterConfig,
    output: OutputMode,
) -> anyhow::Result<()> {
    let snapshots = manager(config, output)?
        .history(args.group, args.limit)
        .or_report(output)?;
    render_mode(
        output,
        &snapshots,
        |list, w| render_history_text(list, w),
        |list, w| render_history_pretty(args.group, list, w),
    )
}

fn render_history_text(snapshots: &[Snapshot], w: &mut dyn Write) -> std::io::Result<()> {
    for s in snapshots {
        writeln!(
            w,
            "{}\t{}\t{}\t{}\t+{}\t-{}\t{}",
            s.id,
            s.status,
            s.kind,
            s.member_count,
            s.new_member_count,
            s.left_member_count,
            timestamp(s.started_at)
        )?;
    }
    Ok(())
}

fn render_history_pretty(
    group: i64,
    snapshots: &[Snapshot],
    w: &mut dyn Write,
) -> std::io::Result<()> {
    pretty_section(w, &format!("Snapshots of group {group}"))?;
    if snapshots.is_empty() {
        writeln!(w, "  (none)")?;
        return Ok(());
    }
    writeln!(
        w,
        "  {:>6}  {:<8} {:<11} {:>7} {:>6} {:>6}  started",
        "id", "status", "kind", "members", "joined", "left"
    )?;
    for s in snapshots {
        writeln!(
            w,
            "  {:>6}  {:<8} {:<11} {:>7} {:>6} {:>6}  {}",
            s.id,
            s.status.to_string(),
            s.kind.to_string(),
            s.member_count,
            s.new_member_count,
            s.left_member_count,
            timestamp(s.started_at)
        )?;
        if let Some(message) = &s.error_message {
            writeln!(w, "          error: {message}")?;
        }
    }
    pretty_rule(w)
}
