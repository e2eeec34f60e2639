use std::io::Write;

use clap::Args;
use muster_core::config::MusterConfig;
use muster_core::snapshot::SnapshotComparison;

use super::{OrReport, manager};
use crate::output::{OutputMode, pretty_kv, pretty_section, render_mode};

#[derive(Args, Debug)]
pub struct DiffArgs {
    /// Older snapshot id.
    pub old: i64,
    /// Newer snapshot id.
    pub new: i64,
}

pub fn run_diff(args: &DiffArgs, config: &MusterConfig, output: OutputMode) -> anyhow::Result<()> {
    let comparison = manager(config, output)?
        .diff_snapshots(args.old, args.new)
        .or_report(output)?;
    render_mode(output, &comparison, render_diff_text, render_diff_pretty)
}

fn render_diff_text(c: &SnapshotComparison, w: &mut dyn Write) -> std::io::Result<()> {
    for m in &c.joined {
        writeln!(w, "+\t{}\t{}", m.user_id, m.shown_name())?;
    }
    for m in &c.left {
        writeln!(w, "-\t{}\t{}", m.user_id, m.shown_name())?;
    }
    for change in &c.changed_cards {
        writeln!(
            w,
            "~\t{}\t{}\t{}",
            change.user_id, change.old_card, change.new_card
        )?;
    }
    Ok(())
}

fn render_diff_pretty(c: &SnapshotComparison, w: &mut dyn Write) -> std::io::Result<()> {
    pretty_section(
        w,
        &format!("Snapshot #{} -> #{}", c.old_snapshot_id, c.new_snapshot_id),
    )?;
    pretty_kv(w, "joined", c.joined.len().to_string())?;
    pretty_kv(w, "left", c.left.len().to_string())?;
    pretty_kv(w, "remained", c.remained_count.to_string())?;
    pretty_kv(w, "card changes", c.changed_cards.len().to_string())?;

    if !c.joined.is_empty() {
        writeln!(w)?;
        writeln!(w, "Joined")?;
        for m in &c.joined {
            writeln!(w, "  + {:<12} {}", m.user_id, m.shown_name())?;
        }
    }
    if !c.left.is_empty() {
        writeln!(w)?;
        writeln!(w, "Left")?;
        for m in &c.left {
            writeln!(w, "  - {:<12} {}", m.user_id, m.shown_name())?;
        }
    }
    if !c.changed_cards.is_empty() {
        writeln!(w)?;
        writeln!(w, "Card changes")?;
        for change in &c.changed_cards {
            writeln!(
                w,
                "  ~ {:<12} {:?} -> {:?}",
                change.user_id, change.old_card, change.new_card
            )?;
        }
    }
    Ok(())
}
