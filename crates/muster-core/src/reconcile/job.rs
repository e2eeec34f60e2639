use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// Job lifecycle. `Running` and `Paused` may alternate; the last three are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Paused,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    Pending,
    Success,
    Failed,
    Skipped,
}

impl OutcomeStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result for one dequeued member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberOutcome {
    pub user_id: i64,
    pub display_name: String,
    pub status: OutcomeStatus,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl MemberOutcome {
    #[must_use]
    pub fn new(
        user_id: i64,
        display_name: impl Into<String>,
        status: OutcomeStatus,
        message: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            display_name: display_name.into(),
            status,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Progress and results of one reconciliation run.
///
/// `total` is fixed when the job is created. Counters only grow and
/// `results` is only appended to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconciliationJob {
    pub target_group_id: i64,
    pub total: usize,
    pub processed: usize,
    pub success: usize,
    pub failed: usize,
    pub skipped: usize,
    pub status: JobStatus,
    pub current_user_id: Option<i64>,
    pub results: Vec<MemberOutcome>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

impl ReconciliationJob {
    #[must_use]
    pub fn new(target_group_id: i64, total: usize) -> Self {
        Self {
            target_group_id,
            total,
            processed: 0,
            success: 0,
            failed: 0,
            skipped: 0,
            status: JobStatus::Pending,
            current_user_id: None,
            results: Vec::new(),
            started_at: Utc::now(),
            completed_at: None,
            error_message: None,
        }
    }

    /// `processed / total * 100`, or 0 for an empty job.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn progress_percent(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.processed as f64 / self.total as f64 * 100.0
    }

    /// Append an outcome and bump `processed` plus the matching counter.
    pub fn record(&mut self, outcome: MemberOutcome) {
        self.processed += 1;
        match outcome.status {
            OutcomeStatus::Success => self.success += 1,
            OutcomeStatus::Failed => self.failed += 1,
            OutcomeStatus::Skipped | OutcomeStatus::Pending => self.skipped += 1,
        }
        self.results.push(outcome);
    }

    #[must_use]
    pub const fn counters_consistent(&self) -> bool {
        self.processed == self.success + self.failed + self.skipped && self.processed <= self.total
    }

    #[must_use]
    pub fn duration(&self) -> Option<chrono::Duration> {
        self.completed_at.map(|done| done - self.started_at)
    }
}

/// Published by the worker, one `MemberProcessed` per dequeued member, in order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum JobEvent {
    Started {
        total: usize,
    },
    MemberProcessed {
        outcome: MemberOutcome,
        processed: usize,
        total: usize,
        percent: f64,
    },
    Paused,
    Resumed,
    Finished(Box<ReconciliationJob>),
}
