use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::classify::{
    Bucket, Decision, FieldChange, FieldKind, LiveContext, classify, classify_absent,
    classify_known, invite_metadata,
};
use super::control::{JobControl, JobHandle};
use super::job::{JobEvent, JobStatus, MemberOutcome, OutcomeStatus, ReconciliationJob};
use super::{ReconcileError, ReconcileOptions};
use crate::error::ValidationError;
use crate::model::{MemberRecord, Role, Snapshot};
use crate::remote::{Freshness, GroupApi, RemoteError};
use crate::store::SnapshotStore;

/// Which snapshot to replay onto which group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileRequest {
    pub snapshot_id: i64,
    /// Expected owner of the snapshot. `None` accepts the snapshot's own group.
    pub source_group_id: Option<i64>,
    pub target_group_id: i64,
    pub exclude: BTreeSet<i64>,
}

impl ReconcileRequest {
    #[must_use]
    pub const fn new(snapshot_id: i64, target_group_id: i64) -> Self {
        Self {
            snapshot_id,
            source_group_id: None,
            target_group_id,
            exclude: BTreeSet::new(),
        }
    }

    #[must_use]
    pub const fn with_source(mut self, source_group_id: i64) -> Self {
        self.source_group_id = Some(source_group_id);
        self
    }

    #[must_use]
    pub fn excluding(mut self, ids: impl IntoIterator<Item = i64>) -> Self {
        self.exclude.extend(ids);
        self
    }
}

/// Snapshot members that survived validation and exclusion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedMembers {
    pub snapshot: Snapshot,
    pub source_group_id: i64,
    pub target_group_id: i64,
    pub cross_group: bool,
    pub members: Vec<MemberRecord>,
    pub excluded: usize,
}

/// Load and validate the members a request would replay.
///
/// No remote call is made.
///
/// # Errors
///
/// Returns [`ValidationError::SnapshotNotFound`], [`ValidationError::GroupMismatch`]
/// or [`ValidationError::EmptySnapshot`], or a store error.
pub fn members_for_snapshot<S: SnapshotStore + ?Sized>(
    store: &S,
    request: &ReconcileRequest,
) -> Result<SelectedMembers, ReconcileError> {
    let snapshot = store
        .get(request.snapshot_id)?
        .ok_or(ValidationError::SnapshotNotFound(request.snapshot_id))?;

    if let Some(expected) = request.source_group_id.filter(|&g| g != snapshot.group_id) {
        return Err(ValidationError::GroupMismatch {
            snapshot_id: snapshot.id,
            expected,
            actual: snapshot.group_id,
        }
        .into());
    }

    let all = store.load_members(snapshot.id)?;
    if all.is_empty() {
        return Err(ValidationError::EmptySnapshot(snapshot.id).into());
    }

    let before = all.len();
    let members: Vec<MemberRecord> = all
        .into_iter()
        .filter(|m| !request.exclude.contains(&m.user_id))
        .collect();

    Ok(SelectedMembers {
        source_group_id: snapshot.group_id,
        target_group_id: request.target_group_id,
        cross_group: snapshot.group_id != request.target_group_id,
        excluded: before - members.len(),
        members,
        snapshot,
    })
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PreviewCounts {
    pub total: usize,
    pub live_member_count: usize,
    pub skip_bot_self: usize,
    pub no_change: usize,
    pub restore: usize,
    pub restore_card: usize,
    pub restore_title: usize,
    pub restore_admin: usize,
    pub cannot_invite: usize,
    pub needs_manual_invite: usize,
}

impl PreviewCounts {
    fn tally(&mut self, decision: &Decision) {
        self.total += 1;
        match decision {
            Decision::SkipBotSelf => self.skip_bot_self += 1,
            Decision::NoChangeNeeded => self.no_change += 1,
            Decision::CannotInvite => self.cannot_invite += 1,
            Decision::NeedsManualInvite => self.needs_manual_invite += 1,
            Decision::Restore(changes) => {
                self.restore += 1;
                for change in changes {
                    match change.field {
                        FieldKind::Card => self.restore_card += 1,
                        FieldKind::Title => self.restore_title += 1,
                        FieldKind::Admin => self.restore_admin += 1,
                    }
                }
            }
        }
    }

    /// Members that are not in the target group.
    #[must_use]
    pub const fn absent(&self) -> usize {
        self.cannot_invite + self.needs_manual_invite
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreviewItem {
    pub user_id: i64,
    pub display_name: String,
    pub role: Role,
    pub bucket: Bucket,
    pub reason: String,
    pub changes: Vec<FieldChange>,
}

/// Dry-run report: what a job would do, without touching the group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconciliationPreview {
    pub snapshot_id: i64,
    pub source_group_id: i64,
    pub target_group_id: i64,
    pub cross_group: bool,
    pub excluded: usize,
    pub restore_cards: bool,
    pub restore_titles: bool,
    pub restore_admins: bool,
    pub counts: PreviewCounts,
    pub items: Vec<PreviewItem>,
    pub warnings: Vec<String>,
}

/// One metadata sub-action that failed while the member as a whole went on.
#[derive(Debug, thiserror::Error)]
#[error("restoring {field} for {user_id} failed: {source}")]
pub struct PartialRestoreFailure {
    pub user_id: i64,
    pub field: FieldKind,
    #[source]
    pub source: RemoteError,
}

/// Replays snapshots onto live groups. Runs at most one job at a time.
#[derive(Debug)]
pub struct Reconciler<A> {
    api: Arc<A>,
    options: ReconcileOptions,
    active: Arc<AtomicBool>,
}

impl<A: GroupApi + 'static> Reconciler<A> {
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidRate`] when the options carry a zero rate.
    pub fn new(api: Arc<A>, options: ReconcileOptions) -> Result<Self, ValidationError> {
        options.validate()?;
        Ok(Self {
            api,
            options,
            active: Arc::new(AtomicBool::new(false)),
        })
    }

    #[must_use]
    pub const fn options(&self) -> &ReconcileOptions {
        &self.options
    }

    /// True while a job started from this engine is still running.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Classify every selected member against the live target group.
    ///
    /// Only a failed roster fetch aborts. A missing bot identity or friend
    /// list is reported as a warning.
    ///
    /// # Errors
    ///
    /// Returns a validation or store error from snapshot selection, or the
    /// [`RemoteError`] of the roster fetch.
    pub fn preview<S: SnapshotStore + ?Sized>(
        &self,
        store: &S,
        request: &ReconcileRequest,
    ) -> Result<ReconciliationPreview, ReconcileError> {
        let selected = members_for_snapshot(store, request)?;
        let target = selected.target_group_id;
        let roster = self.api.list_group_members(target, Freshness::BypassCache)?;

        let mut warnings = Vec::new();
        let bot_id = match self.api.login_identity() {
            Ok(identity) => Some(identity.user_id),
            Err(err) => {
                warn!(error = %err, "bot identity unavailable for preview");
                warnings.push(format!("bot identity unknown ({err}); its account is not excluded"));
                None
            }
        };
        let friends = match self.api.list_friends() {
            Ok(friends) => friends,
            Err(err) => {
                warn!(error = %err, "friend list unavailable for preview");
                warnings.push(format!(
                    "friend list unavailable ({err}); absent members are reported as not invitable"
                ));
                Vec::new()
            }
        };
        let ctx = LiveContext::new(&roster, bot_id, friends.iter().map(|f| f.user_id));

        let mut counts = PreviewCounts {
            live_member_count: ctx.member_count(),
            ..PreviewCounts::default()
        };
        let mut items = Vec::with_capacity(selected.members.len());
        let mut owners = 0_usize;
        for member in &selected.members {
            let decision = classify(member, &ctx, &self.options);
            counts.tally(&decision);
            if member.role == Role::Owner && decision != Decision::SkipBotSelf {
                owners += 1;
            }
            let changes = match &decision {
                Decision::Restore(changes) => changes.clone(),
                _ => Vec::new(),
            };
            items.push(PreviewItem {
                user_id: member.user_id,
                display_name: member.shown_name().to_string(),
                role: member.role,
                bucket: decision.bucket(),
                reason: decision.reason(),
                changes,
            });
        }

        if counts.absent() > 0 {
            warnings.push(format!(
                "{} member(s) are not in group {target} and cannot be re-added automatically",
                counts.absent()
            ));
        }
        if owners > 0 {
            warnings.push(format!("{owners} owner account(s) will be skipped during execution"));
        }

        debug!(
            snapshot_id = selected.snapshot.id,
            target_group_id = target,
            total = counts.total,
            restore = counts.restore,
            absent = counts.absent(),
            "preview computed"
        );

        Ok(ReconciliationPreview {
            snapshot_id: selected.snapshot.id,
            source_group_id: selected.source_group_id,
            target_group_id: target,
            cross_group: selected.cross_group,
            excluded: selected.excluded,
            restore_cards: self.options.restore_cards,
            restore_titles: self.options.restore_titles,
            restore_admins: self.options.restore_admins,
            counts,
            items,
            warnings,
        })
    }

    /// Spawn a worker thread that applies `members` to `target_group_id`.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::JobAlreadyActive`] while another job from
    /// this engine runs, a validation error for a zero rate, or
    /// [`ReconcileError::Spawn`] if the thread cannot be created.
    pub fn start(
        &self,
        target_group_id: i64,
        members: Vec<MemberRecord>,
    ) -> Result<JobHandle, ReconcileError> {
        let interval = self.options.interval()?;
        let guard = self.acquire()?;

        let control = JobControl::new();
        let (tx, rx) = mpsc::channel();
        let progress = Arc::new(Mutex::new(ReconciliationJob::new(
            target_group_id,
            members.len(),
        )));
        let worker = Worker {
            api: Arc::clone(&self.api),
            options: self.options.clone(),
            interval,
            target_group_id,
            control: control.clone(),
            events: tx,
            progress: Arc::clone(&progress),
        };

        let thread = thread::Builder::new()
            .name(format!("muster-reconcile-{target_group_id}"))
            .spawn(move || {
                let _guard = guard;
                worker.execute(members)
            })
            .map_err(ReconcileError::Spawn)?;

        Ok(JobHandle::new(control, rx, progress, thread))
    }

    /// Run a job on the calling thread and return its final record.
    ///
    /// # Errors
    ///
    /// Same as [`Reconciler::start`], minus the spawn failure.
    pub fn run(
        &self,
        target_group_id: i64,
        members: Vec<MemberRecord>,
        control: &JobControl,
        events: &Sender<JobEvent>,
    ) -> Result<ReconciliationJob, ReconcileError> {
        let interval = self.options.interval()?;
        let _guard = self.acquire()?;

        let worker = Worker {
            api: Arc::clone(&self.api),
            options: self.options.clone(),
            interval,
            target_group_id,
            control: control.clone(),
            events: events.clone(),
            progress: Arc::new(Mutex::new(ReconciliationJob::new(
                target_group_id,
                members.len(),
            ))),
        };
        Ok(worker.execute(members))
    }

    fn acquire(&self) -> Result<ActiveGuard, ReconcileError> {
        self.active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| ReconcileError::JobAlreadyActive)?;
        Ok(ActiveGuard(Arc::clone(&self.active)))
    }
}

/// Clears the engine's busy flag when the job ends, panics included.
struct ActiveGuard(Arc<AtomicBool>);

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Plain members first, then admins, then owners. Stable within a role.
fn execution_order(mut members: Vec<MemberRecord>) -> Vec<MemberRecord> {
    members.sort_by_key(|m| match m.role {
        Role::Member => 0_u8,
        Role::Admin => 1,
        Role::Owner => 2,
    });
    members
}

struct Worker<A> {
    api: Arc<A>,
    options: ReconcileOptions,
    interval: Duration,
    target_group_id: i64,
    control: JobControl,
    events: Sender<JobEvent>,
    progress: Arc<Mutex<ReconciliationJob>>,
}

impl<A: GroupApi> Worker<A> {
    fn execute(&self, members: Vec<MemberRecord>) -> ReconciliationJob {
        let total = self.update(|job| {
            job.status = JobStatus::Running;
            job.started_at = Utc::now();
            job.total
        });
        self.emit(JobEvent::Started { total });
        info!(
            target_group_id = self.target_group_id,
            total,
            interval_ms = u64::try_from(self.interval.as_millis()).unwrap_or(u64::MAX),
            "reconciliation started"
        );

        let roster = match self
            .api
            .list_group_members(self.target_group_id, Freshness::BypassCache)
        {
            Ok(roster) => roster,
            Err(err) => {
                warn!(target_group_id = self.target_group_id, error = %err, "target roster unavailable");
                self.update(|job| {
                    job.status = JobStatus::Failed;
                    job.error_message = Some(format!("could not fetch target roster: {err}"));
                });
                return self.finish();
            }
        };
        let bot_id = match self.api.login_identity() {
            Ok(identity) => Some(identity.user_id),
            Err(err) => {
                warn!(error = %err, "bot identity unknown, its account is not excluded");
                None
            }
        };
        let ctx = LiveContext::new(&roster, bot_id, []);

        if self.options.announce {
            self.announce(&format!("Member restore started: {total} member(s) queued."));
        }

        let queue = execution_order(members);
        let last = queue.len().saturating_sub(1);
        for (index, member) in queue.iter().enumerate() {
            if !self.checkpoint() {
                break;
            }

            self.update(|job| job.current_user_id = Some(member.user_id));
            let (outcome, attempt_failed) = self.process(member, &ctx);
            let message = outcome.message.clone();
            let event = self.update(|job| {
                job.record(outcome.clone());
                JobEvent::MemberProcessed {
                    outcome,
                    processed: job.processed,
                    total: job.total,
                    percent: job.progress_percent(),
                }
            });
            self.emit(event);

            if attempt_failed && !self.options.continue_on_error {
                warn!(user_id = member.user_id, error = %message, "stopping after failed member");
                self.update(|job| {
                    job.status = JobStatus::Failed;
                    job.error_message = Some(format!("member {}: {message}", member.user_id));
                });
                break;
            }

            if index < last {
                self.throttle();
            }
        }

        self.finish()
    }

    /// Honour cancel and pause before the next member. False means stop.
    fn checkpoint(&self) -> bool {
        if self.control.is_paused() && !self.control.is_cancelled() {
            self.update(|job| job.status = JobStatus::Paused);
            self.emit(JobEvent::Paused);
            info!(target_group_id = self.target_group_id, "reconciliation paused");

            while self.control.is_paused() && !self.control.is_cancelled() {
                thread::sleep(self.options.pause_poll_interval);
            }

            if !self.control.is_cancelled() {
                self.update(|job| job.status = JobStatus::Running);
                self.emit(JobEvent::Resumed);
                info!(target_group_id = self.target_group_id, "reconciliation resumed");
            }
        }

        if self.control.is_cancelled() {
            self.update(|job| job.status = JobStatus::Cancelled);
            info!(target_group_id = self.target_group_id, "reconciliation cancelled");
            return false;
        }
        true
    }

    /// Outcome for one member, plus whether the attempt failed outright.
    fn process(&self, member: &MemberRecord, ctx: &LiveContext) -> (MemberOutcome, bool) {
        let name = member.shown_name();
        let skipped = |message: &str| {
            MemberOutcome::new(member.user_id, name, OutcomeStatus::Skipped, message)
        };

        match classify_known(member, ctx, &self.options) {
            Some(Decision::SkipBotSelf) => (skipped("bot account"), false),
            _ if member.role == Role::Owner => (skipped("group owner left to the live group"), false),
            Some(Decision::NoChangeNeeded) => (skipped("already up to date"), false),
            Some(Decision::Restore(changes)) => {
                let outcome = self.restore(member, &changes);
                let failed = outcome.status == OutcomeStatus::Failed;
                (outcome, failed)
            }
            None | Some(Decision::CannotInvite | Decision::NeedsManualInvite) => self.invite(member),
        }
    }

    fn restore(&self, member: &MemberRecord, changes: &[FieldChange]) -> MemberOutcome {
        let (applied, failures) = self.apply_all(member.user_id, changes);
        let name = member.shown_name();

        if applied.is_empty() {
            return MemberOutcome::new(
                member.user_id,
                name,
                OutcomeStatus::Failed,
                failures.join("; "),
            );
        }

        let mut message = format!("restored {}", applied.join(", "));
        if !failures.is_empty() {
            message.push_str(&format!(" ({})", failures.join("; ")));
        }
        MemberOutcome::new(member.user_id, name, OutcomeStatus::Success, message)
    }

    fn invite(&self, member: &MemberRecord) -> (MemberOutcome, bool) {
        let name = member.shown_name();
        let friends = match self.api.list_friends() {
            Ok(friends) => friends,
            Err(err) => {
                warn!(user_id = member.user_id, error = %err, "friend list unavailable");
                let outcome = MemberOutcome::new(
                    member.user_id,
                    name,
                    OutcomeStatus::Failed,
                    format!("friend list unavailable: {err}"),
                );
                return (outcome, true);
            }
        };

        let is_friend = friends.iter().any(|f| f.user_id == member.user_id);
        let outcome = match classify_absent(is_friend) {
            Decision::NeedsManualInvite => {
                let changes = invite_metadata(member, &self.options);
                let (applied, failures) = self.apply_all(member.user_id, &changes);
                let mut message = if applied.is_empty() {
                    "flagged for manual invite".to_string()
                } else {
                    format!("flagged for manual invite, restored {}", applied.join(", "))
                };
                if !failures.is_empty() {
                    message.push_str(&format!(" ({})", failures.join("; ")));
                }
                MemberOutcome::new(member.user_id, name, OutcomeStatus::Success, message)
            }
            other => MemberOutcome::new(
                member.user_id,
                name,
                OutcomeStatus::Skipped,
                other.reason(),
            ),
        };
        (outcome, false)
    }

    /// Apply each change independently. Returns applied field names and
    /// failure messages.
    fn apply_all(&self, user_id: i64, changes: &[FieldChange]) -> (Vec<&'static str>, Vec<String>) {
        let mut applied = Vec::new();
        let mut failures = Vec::new();
        for change in changes {
            match self.apply(user_id, change) {
                Ok(()) => applied.push(change.field.as_str()),
                Err(source) => {
                    let failure = PartialRestoreFailure {
                        user_id,
                        field: change.field,
                        source,
                    };
                    warn!(
                        target_group_id = self.target_group_id,
                        user_id,
                        field = %change.field,
                        error = %failure,
                        "partial restore failure"
                    );
                    failures.push(failure.to_string());
                }
            }
        }
        (applied, failures)
    }

    fn apply(&self, user_id: i64, change: &FieldChange) -> Result<(), RemoteError> {
        let group = self.target_group_id;
        match change.field {
            FieldKind::Card => self.api.set_group_card(group, user_id, &change.target),
            FieldKind::Title => self.api.set_group_title(group, user_id, &change.target),
            FieldKind::Admin => self.api.set_group_admin(group, user_id, true),
        }
    }

    /// Sleep one interval in slices, returning early on cancel.
    fn throttle(&self) {
        let deadline = Instant::now() + self.interval;
        let slice = self.options.pause_poll_interval.max(Duration::from_millis(1));
        while !self.control.is_cancelled() {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            thread::sleep((deadline - now).min(slice));
        }
    }

    fn finish(&self) -> ReconciliationJob {
        let report = self.update(|job| {
            if job.status == JobStatus::Running {
                job.status = JobStatus::Completed;
            }
            job.completed_at = Some(Utc::now());
            job.current_user_id = None;
            job.clone()
        });

        info!(
            target_group_id = self.target_group_id,
            status = %report.status,
            processed = report.processed,
            success = report.success,
            failed = report.failed,
            skipped = report.skipped,
            "reconciliation finished"
        );

        if self.options.announce {
            self.announce(&format!(
                "Member restore {}: {}/{} processed, {} restored, {} failed, {} skipped.",
                report.status,
                report.processed,
                report.total,
                report.success,
                report.failed,
                report.skipped
            ));
        }

        self.emit(JobEvent::Finished(Box::new(report.clone())));
        report
    }

    fn announce(&self, text: &str) {
        if let Err(err) = self.api.send_group_message(self.target_group_id, text) {
            warn!(target_group_id = self.target_group_id, error = %err, "announcement not delivered");
        }
    }

    fn emit(&self, event: JobEvent) {
        if self.events.send(event).is_err() {
            debug!("job event receiver dropped");
        }
    }

    fn update<R>(&self, f: impl FnOnce(&mut ReconciliationJob) -> R) -> R {
        let mut job = self.progress.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut job)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NewSnapshot, SnapshotKind};
    use crate::store::SqliteStore;

    fn stored(store: &SqliteStore, group_id: i64, members: &[MemberRecord]) -> i64 {
        let new = NewSnapshot {
            group_id,
            kind: SnapshotKind::Manual,
            notes: String::new(),
            started_at: Utc::now(),
        };
        let id = store.save(&new).expect("save");
        let mut snapshot = Snapshot::running(id, &new);
        snapshot.status = crate::model::SnapshotStatus::Success;
        snapshot.member_count = members.len();
        snapshot.completed_at = Some(Utc::now());
        store.complete(&snapshot, members, &[]).expect("complete");
        id
    }

    #[test]
    fn execution_order_puts_owners_last() {
        let ordered = execution_order(vec![
            MemberRecord::new(1, "owner").with_role(Role::Owner),
            MemberRecord::new(2, "admin").with_role(Role::Admin),
            MemberRecord::new(3, "m1"),
            MemberRecord::new(4, "m2"),
        ]);
        let ids: Vec<i64> = ordered.iter().map(|m| m.user_id).collect();
        assert_eq!(ids, vec![3, 4, 2, 1]);
    }

    #[test]
    fn selection_validates_before_remote_calls() {
        let store = SqliteStore::in_memory().expect("store");
        let id = stored(
            &store,
            10,
            &[MemberRecord::new(1, "a"), MemberRecord::new(2, "b")],
        );

        let missing = members_for_snapshot(&store, &ReconcileRequest::new(999, 10));
        assert!(matches!(
            missing,
            Err(ReconcileError::Validation(ValidationError::SnapshotNotFound(999)))
        ));

        let mismatch =
            members_for_snapshot(&store, &ReconcileRequest::new(id, 10).with_source(11));
        assert!(matches!(
            mismatch,
            Err(ReconcileError::Validation(ValidationError::GroupMismatch { expected: 11, actual: 10, .. }))
        ));

        let selected = members_for_snapshot(
            &store,
            &ReconcileRequest::new(id, 20).excluding([2]),
        )
        .expect("selected");
        assert!(selected.cross_group);
        assert_eq!(selected.excluded, 1);
        assert_eq!(selected.members.len(), 1);
        assert_eq!(selected.source_group_id, 10);
    }

    #[test]
    fn empty_snapshot_is_rejected() {
        let store = SqliteStore::in_memory().expect("store");
        let id = stored(&store, 10, &[]);
        let result = members_for_snapshot(&store, &ReconcileRequest::new(id, 10));
        assert!(matches!(
            result,
            Err(ReconcileError::Validation(ValidationError::EmptySnapshot(_)))
        ));
    }

    #[test]
    fn counts_split_restores_by_field() {
        let mut counts = PreviewCounts::default();
        counts.tally(&Decision::Restore(vec![
            FieldChange {
                field: FieldKind::Card,
                current: String::new(),
                target: "x".to_string(),
            },
            FieldChange {
                field: FieldKind::Admin,
                current: "member".to_string(),
                target: "admin".to_string(),
            },
        ]));
        counts.tally(&Decision::CannotInvite);
        counts.tally(&Decision::NeedsManualInvite);

        assert_eq!(counts.total, 3);
        assert_eq!(counts.restore, 1);
        assert_eq!((counts.restore_card, counts.restore_admin), (1, 1));
        assert_eq!(counts.absent(), 2);
    }
}
