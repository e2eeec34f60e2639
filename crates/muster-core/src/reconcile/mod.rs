//! Replaying a snapshot against a live group.
//!
//! [`classify`] decides what each snapshotted member needs. [`Reconciler`]
//! uses it twice: [`Reconciler::preview`] reports the decisions without
//! touching the group, and [`Reconciler::start`] runs a throttled worker
//! that applies them one member at a time, controlled through a
//! [`JobHandle`].

pub mod classify;
pub mod control;
pub mod engine;
pub mod job;

use std::time::Duration;

use crate::error::{ErrorCode, ValidationError};
use crate::remote::RemoteError;
use crate::store::StoreError;

pub use classify::{Bucket, Decision, FieldChange, FieldKind, LiveContext, classify};
pub use control::{JobControl, JobHandle};
pub use engine::{
    PreviewCounts, PreviewItem, ReconcileRequest, Reconciler, ReconciliationPreview,
    SelectedMembers,
};
pub use job::{JobEvent, JobStatus, MemberOutcome, OutcomeStatus, ReconciliationJob};

/// Tunables for one reconciliation engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOptions {
    /// Members processed per minute. Must be above zero.
    pub invites_per_minute: u32,
    pub restore_cards: bool,
    pub restore_titles: bool,
    pub restore_admins: bool,
    /// Post a group message when a job starts and when it finishes.
    pub announce: bool,
    /// Keep going after a member whose invite check failed.
    pub continue_on_error: bool,
    /// How often a paused job checks for resume or cancel.
    pub pause_poll_interval: Duration,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            invites_per_minute: 10,
            restore_cards: true,
            restore_titles: false,
            restore_admins: true,
            announce: true,
            continue_on_error: true,
            pause_poll_interval: Duration::from_secs(1),
        }
    }
}

impl ReconcileOptions {
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidRate`] when `invites_per_minute` is zero.
    pub const fn validate(&self) -> Result<(), ValidationError> {
        if self.invites_per_minute == 0 {
            return Err(ValidationError::InvalidRate(self.invites_per_minute));
        }
        Ok(())
    }

    /// Pause between two consecutive members: `60s / invites_per_minute`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidRate`] when `invites_per_minute` is zero.
    pub fn interval(&self) -> Result<Duration, ValidationError> {
        self.validate()?;
        Ok(Duration::from_secs(60) / self.invites_per_minute)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("a reconciliation job is already running on this engine")]
    JobAlreadyActive,

    #[error("could not start reconciliation worker: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("reconciliation worker panicked")]
    WorkerPanicked,
}

impl ReconcileError {
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::Validation(err) => err.error_code(),
            Self::Remote(err) => err.error_code(),
            Self::Store(err) => err.error_code(),
            Self::JobAlreadyActive => ErrorCode::JobAlreadyActive,
            Self::Spawn(_) | Self::WorkerPanicked => ErrorCode::InternalUnexpected,
        }
    }
}
