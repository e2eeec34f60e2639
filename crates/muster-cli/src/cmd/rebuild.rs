//! `muster rebuild`: replay a snapshot onto a live group.
//!
//! Always previews first and asks before mutating anything. Progress goes
//! to stderr while the job runs; the final job record is rendered to stdout.
//! Ctrl-C cancels at the next member boundary.

use std::io::{self, BufRead, IsTerminal, Write};
use std::sync::Arc;

use clap::Args;
use muster_core::config::MusterConfig;
use muster_core::reconcile::engine::members_for_snapshot;
use muster_core::reconcile::{
    JobEvent, JobHandle, JobStatus, MemberOutcome, ReconcileError, Reconciler, ReconciliationJob,
};
use muster_core::remote::{Freshness, GroupApi};
use tracing::{info, warn};

use super::preview::{SelectionArgs, render_preview_summary};
use super::{OrReport, open_store, timestamp};
use crate::onebot::OneBotClient;
use crate::output::{CliError, OutputMode, pretty_kv, pretty_section, render_error, render_mode};

#[derive(Args, Debug)]
pub struct RebuildArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,

    /// Skip the confirmation prompt.
    #[arg(long, short = 'y')]
    pub yes: bool,
}

pub fn run_rebuild(
    args: &RebuildArgs,
    config: &MusterConfig,
    output: OutputMode,
) -> anyhow::Result<()> {
    let store = open_store(config, output)?;
    let client = Arc::new(OneBotClient::new(&config.onebot));
    let engine =
        Reconciler::new(Arc::clone(&client), config.reconcile.options()).or_report(output)?;
    let request = args.selection.request();

    let preview = engine.preview(&store, &request).or_report(output)?;
    {
        let stderr = io::stderr();
        let mut err = stderr.lock();
        render_preview_summary(&preview, &mut err)?;
        match client.group_info(preview.target_group_id, Freshness::BypassCache) {
            Ok(group) => writeln!(
                err,
                "target: {} ({}/{} members)",
                group.group_name, group.member_count, group.max_member_count
            )?,
            Err(e) => warn!(error = %e, "group info unavailable"),
        }
    }

    if !args.yes {
        if !io::stdin().is_terminal() {
            render_error(
                output,
                &CliError::with_details(
                    "refusing to rebuild without confirmation",
                    "pass --yes to run non-interactively",
                    "confirmation_required",
                ),
            )?;
            anyhow::bail!("confirmation required");
        }
        if !confirm("Apply these changes to the group?")? {
            render_error(output, &CliError::new("rebuild aborted"))?;
            anyhow::bail!("rebuild aborted");
        }
    }

    let selected = members_for_snapshot(&store, &request).or_report(output)?;
    info!(
        snapshot = selected.snapshot.id,
        target = selected.target_group_id,
        members = selected.members.len(),
        "starting rebuild"
    );
    let handle = engine
        .start(selected.target_group_id, selected.members)
        .or_report(output)?;

    let control = handle.control().clone();
    match ctrlc::set_handler(move || control.cancel()) {
        Ok(()) => eprintln!("press Ctrl-C to cancel"),
        Err(err) => warn!(error = %err, "could not install Ctrl-C handler"),
    }

    let job = follow(handle, &mut io::stderr().lock()).or_report(output)?;
    render_mode(output, &job, render_job_text, render_job_pretty)?;
    match job.status {
        JobStatus::Failed => anyhow::bail!(
            "rebuild failed: {}",
            job.error_message.as_deref().unwrap_or("unknown error")
        ),
        JobStatus::Cancelled => anyhow::bail!(
            "rebuild cancelled after {}/{} members",
            job.processed,
            job.total
        ),
        _ => Ok(()),
    }
}

/// Print progress for each event until the job finishes, then join it.
///
/// Progress write errors are ignored; the job keeps running regardless.
fn follow(handle: JobHandle, progress: &mut dyn Write) -> Result<ReconciliationJob, ReconcileError> {
    for event in handle.events() {
        let line = match event {
            JobEvent::MemberProcessed {
                outcome,
                processed,
                total,
                percent,
            } => progress_line(&outcome, processed, total, percent),
            JobEvent::Paused => "paused".to_string(),
            JobEvent::Resumed => "resumed".to_string(),
            JobEvent::Started { .. } => continue,
            JobEvent::Finished(_) => break,
        };
        let _ = writeln!(progress, "{line}");
    }
    handle.wait()
}

fn confirm(question: &str) -> anyhow::Result<bool> {
    eprint!("{question} [y/N] ");
    io::stderr().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

fn progress_line(outcome: &MemberOutcome, processed: usize, total: usize, percent: f64) -> String {
    format!(
        "[{processed}/{total} {percent:>5.1}%] {} {} {}",
        outcome.user_id, outcome.status, outcome.message
    )
}

fn render_job_text(job: &ReconciliationJob, w: &mut dyn Write) -> io::Result<()> {
    for r in &job.results {
        writeln!(w, "{}\t{}\t{}", r.user_id, r.status, r.message)?;
    }
    writeln!(
        w,
        "{}\t{}/{}\tsuccess={}\tfailed={}\tskipped={}",
        job.status, job.processed, job.total, job.success, job.failed, job.skipped
    )
}

fn render_job_pretty(job: &ReconciliationJob, w: &mut dyn Write) -> io::Result<()> {
    pretty_section(w, &format!("Rebuild of group {}", job.target_group_id))?;
    pretty_kv(w, "status", job.status.as_str())?;
    pretty_kv(w, "processed", format!("{}/{}", job.processed, job.total))?;
    pretty_kv(w, "success", job.success.to_string())?;
    pretty_kv(w, "failed", job.failed.to_string())?;
    pretty_kv(w, "skipped", job.skipped.to_string())?;
    pretty_kv(w, "started", timestamp(job.started_at))?;
    if let Some(done) = job.completed_at {
        pretty_kv(w, "completed", timestamp(done))?;
    }
    if let Some(message) = &job.error_message {
        pretty_kv(w, "error", message)?;
    }

    let failures: Vec<&MemberOutcome> = job
        .results
        .iter()
        .filter(|r| r.status == muster_core::reconcile::OutcomeStatus::Failed)
        .collect();
    if !failures.is_empty() {
        writeln!(w)?;
        writeln!(w, "Failures")?;
        for r in failures {
            writeln!(w, "  {:<12} {:<20} {}", r.user_id, r.display_name, r.message)?;
        }
    }
    Ok(())
}
