use std::io::Write;

use clap::Args;
use muster_core::config::MusterConfig;
use muster_core::model::MembershipEvent;

use super::{OrReport, manager, timestamp};
use crate::output::{OutputMode, pretty_section, render_mode};

#[derive(Args, Debug)]
pub struct EventsArgs {
    pub group: i64,

    /// Maximum number of events to show, newest first.
    #[arg(long, default_value_t = 50)]
    pub limit: usize,
}

/// Execute `muster events`: the join/leave audit trail of one group.
pub fn run_events(args: &EventsArgs, config: &MusterConfig, output: OutputMode) -> anyhow::Result<()> {
    let events = manager(config, output)?
        .membership_events(args.group, args.limit)
        .or_report(output)?;
    render_mode(
        output,
        &events,
        |list, w| render_events_text(list, w),
        |list, w| render_events_pretty(args.group, list, w),
    )
}

fn snapshot_ref(event: &MembershipEvent) -> String {
    event
        .snapshot_id
        .map_or_else(|| "-".to_string(), |id| id.to_string())
}

fn render_events_text(events: &[MembershipEvent], w: &mut dyn Write) -> std::io::Result<()> {
    for e in events {
        writeln!(
            w,
            "{}\t{}\t{}\t{}\t{}",
            timestamp(e.timestamp),
            e.action,
            e.user_id,
            snapshot_ref(e),
            e.display_name_at_time
        )?;
    }
    Ok(())
}

fn render_events_pretty(
    group: i64,
    events: &[MembershipEvent],
    w: &mut dyn Write,
) -> std::io::Result<()> {
    pretty_section(w, &format!("Membership events of group {group}"))?;
    if events.is_empty() {
        writeln!(w, "  (none)")?;
    }
    for e in events {
        let marker = match e.action {
            muster_core::model::MembershipAction::Join => '+',
            muster_core::model::MembershipAction::Leave => '-',
        };
        writeln!(
            w,
            "  {} {marker} {:<12} {:<24} snapshot {}",
            timestamp(e.timestamp),
            e.user_id,
            e.display_name_at_time,
            snapshot_ref(e)
        )?;
    }
    Ok(())
}
