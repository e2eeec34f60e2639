use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Receiver;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;

use super::ReconcileError;
use super::job::{JobEvent, ReconciliationJob};

/// Cancel and pause flags for one job, checked by the worker between members.
///
/// Clones share the same flags. An in-flight remote call always finishes
/// before a flag change is observed.
#[derive(Debug, Clone, Default)]
pub struct JobControl {
    cancelled: Arc<AtomicBool>,
    paused: Arc<AtomicBool>,
}

impl JobControl {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }
}

/// Handle to a job running on its own worker thread.
#[derive(Debug)]
pub struct JobHandle {
    control: JobControl,
    events: Receiver<JobEvent>,
    progress: Arc<Mutex<ReconciliationJob>>,
    worker: JoinHandle<ReconciliationJob>,
}

impl JobHandle {
    pub(crate) const fn new(
        control: JobControl,
        events: Receiver<JobEvent>,
        progress: Arc<Mutex<ReconciliationJob>>,
        worker: JoinHandle<ReconciliationJob>,
    ) -> Self {
        Self {
            control,
            events,
            progress,
            worker,
        }
    }

    #[must_use]
    pub const fn control(&self) -> &JobControl {
        &self.control
    }

    pub fn cancel(&self) {
        self.control.cancel();
    }

    pub fn pause(&self) {
        self.control.pause();
    }

    pub fn resume(&self) {
        self.control.resume();
    }

    /// Ordered event stream. Ends once the worker finishes and the
    /// buffered events are drained.
    #[must_use]
    pub const fn events(&self) -> &Receiver<JobEvent> {
        &self.events
    }

    /// Copy of the job record as of the last member boundary.
    #[must_use]
    pub fn progress(&self) -> ReconciliationJob {
        self.progress
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.worker.is_finished()
    }

    /// Block until the worker finishes and return the final record.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::WorkerPanicked`] if the worker thread panicked.
    pub fn wait(self) -> Result<ReconciliationJob, ReconcileError> {
        self.worker.join().map_err(|_| ReconcileError::WorkerPanicked)
    }
}
