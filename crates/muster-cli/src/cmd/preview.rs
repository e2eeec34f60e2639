//! `muster preview`: dry-run of a rebuild. Reads the live group, changes nothing.

use std::io::Write;
use std::sync::Arc;

use clap::Args;
use muster_core::config::MusterConfig;
use muster_core::reconcile::{ReconcileRequest, Reconciler, ReconciliationPreview};

use super::{OrReport, open_store};
use crate::onebot::OneBotClient;
use crate::output::{OutputMode, pretty_kv, pretty_rule, pretty_section, render_mode};

/// Which snapshot to replay onto which group. Shared with `rebuild`.
#[derive(Args, Debug, Clone)]
pub struct SelectionArgs {
    /// Snapshot to replay.
    pub snapshot: i64,

    /// Live group to reconcile against.
    pub target: i64,

    /// Require the snapshot to belong to this group.
    #[arg(long, value_name = "GROUP")]
    pub source: Option<i64>,

    /// Leave this member out (repeatable).
    #[arg(long, value_name = "USER_ID")]
    pub exclude: Vec<i64>,
}

impl SelectionArgs {
    pub fn request(&self) -> ReconcileRequest {
        let request = ReconcileRequest::new(self.snapshot, self.target)
            .excluding(self.exclude.iter().copied());
        match self.source {
            Some(source) => request.with_source(source),
            None => request,
        }
    }
}

#[derive(Args, Debug)]
pub struct PreviewArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,
}

pub fn run_preview(
    args: &PreviewArgs,
    config: &MusterConfig,
    output: OutputMode,
) -> anyhow::Result<()> {
    let store = open_store(config, output)?;
    let engine = Reconciler::new(
        Arc::new(OneBotClient::new(&config.onebot)),
        config.reconcile.options(),
    )
    .or_report(output)?;
    let preview = engine
        .preview(&store, &args.selection.request())
        .or_report(output)?;
    render_mode(output, &preview, render_preview_text, render_preview_pretty)
}

pub fn render_preview_text(p: &ReconciliationPreview, w: &mut dyn Write) -> std::io::Result<()> {
    for item in &p.items {
        writeln!(w, "{}\t{}\t{}", item.user_id, item.bucket, item.reason)?;
    }
    for warning in &p.warnings {
        writeln!(w, "warning\t{warning}")?;
    }
    Ok(())
}

/// Header and bucket counts, without the per-member list.
pub fn render_preview_summary(p: &ReconciliationPreview, w: &mut dyn Write) -> std::io::Result<()> {
    pretty_section(
        w,
        &format!(
            "Snapshot #{} (group {}) -> group {}",
            p.snapshot_id, p.source_group_id, p.target_group_id
        ),
    )?;
    if p.cross_group {
        pretty_kv(w, "mode", "cross-group")?;
    }
    let flags: Vec<&str> = [
        (p.restore_cards, "cards"),
        (p.restore_titles, "titles"),
        (p.restore_admins, "admins"),
    ]
    .iter()
    .filter(|(on, _)| *on)
    .map(|(_, name)| *name)
    .collect();
    pretty_kv(
        w,
        "restoring",
        if flags.is_empty() {
            "nothing".to_string()
        } else {
            flags.join(", ")
        },
    )?;

    let c = &p.counts;
    pretty_kv(w, "members", format!("{} ({} excluded)", c.total, p.excluded))?;
    pretty_kv(w, "live members", c.live_member_count.to_string())?;
    pretty_kv(
        w,
        "restore",
        format!(
            "{} (card {}, title {}, admin {})",
            c.restore, c.restore_card, c.restore_title, c.restore_admin
        ),
    )?;
    pretty_kv(w, "no change", c.no_change.to_string())?;
    pretty_kv(w, "manual invite", c.needs_manual_invite.to_string())?;
    pretty_kv(w, "not invitable", c.cannot_invite.to_string())?;
    pretty_kv(w, "bot itself", c.skip_bot_self.to_string())?;
    for warning in &p.warnings {
        writeln!(w, "warning: {warning}")?;
    }
    Ok(())
}

fn render_preview_pretty(p: &ReconciliationPreview, w: &mut dyn Write) -> std::io::Result<()> {
    render_preview_summary(p, w)?;
    writeln!(w)?;
    pretty_section(w, "Members")?;
    for item in &p.items {
        writeln!(
            w,
            "  {:<12} {:<22} {:<20} {}",
            item.user_id,
            item.display_name,
            item.bucket.to_string(),
            item.reason
        )?;
        for change in &item.changes {
            writeln!(
                w,
                "  {:<12}   {}: {:?} -> {:?}",
                "", change.field, change.current, change.target
            )?;
        }
    }
    pretty_rule(w)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmd::testing::scratch_config;

    #[test]
    fn selection_builds_request() {
        let selection = SelectionArgs {
            snapshot: 4,
            target: 9,
            source: Some(8),
            exclude: vec![1, 2],
        };
        let request = selection.request();
        assert_eq!(request.snapshot_id, 4);
        assert_eq!(request.target_group_id, 9);
        assert_eq!(request.source_group_id, Some(8));
        assert_eq!(request.exclude.len(), 2);
    }

    #[test]
    fn missing_snapshot_is_reported_before_remote_calls() {
        let (_dir, config) = scratch_config();
        let args = PreviewArgs {
            selection: SelectionArgs {
                snapshot: 404,
                target: 1,
                source: None,
                exclude: Vec::new(),
            },
        };
        let err = run_preview(&args, &config, OutputMode::Json).expect_err("missing snapshot");
        assert!(err.to_string().starts_with("E2001"));
    }
}
