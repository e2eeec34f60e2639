pub mod backup;
pub mod completions;
pub mod diff;
pub mod events;
pub mod export;
pub mod history;
pub mod info;
pub mod preview;
pub mod prune;
pub mod rebuild;
pub mod status;

use std::fmt;

use muster_core::config::MusterConfig;
use muster_core::error::{ErrorCode, ValidationError};
use muster_core::reconcile::ReconcileError;
use muster_core::remote::RemoteError;
use muster_core::snapshot::{SnapshotError, SnapshotManager};
use muster_core::store::{SqliteStore, StoreError};

use crate::onebot::OneBotClient;
use crate::output::{CliError, OutputMode, render_error};

/// Library errors that carry a stable [`ErrorCode`].
pub trait CodedError: fmt::Display {
    fn code(&self) -> ErrorCode;
}

impl CodedError for SnapshotError {
    fn code(&self) -> ErrorCode {
        self.error_code()
    }
}

impl CodedError for ReconcileError {
    fn code(&self) -> ErrorCode {
        self.error_code()
    }
}

impl CodedError for RemoteError {
    fn code(&self) -> ErrorCode {
        self.error_code()
    }
}

impl CodedError for StoreError {
    fn code(&self) -> ErrorCode {
        self.error_code()
    }
}

impl CodedError for ValidationError {
    fn code(&self) -> ErrorCode {
        self.error_code()
    }
}

/// Render a coded error in the active output mode and turn it into `anyhow`.
pub fn report(output: OutputMode, code: ErrorCode, err: &dyn fmt::Display) -> anyhow::Error {
    let message = err.to_string();
    if let Err(render_err) = render_error(output, &CliError::from_code(code, message.clone())) {
        return render_err;
    }
    anyhow::anyhow!("{code}: {message}")
}

pub trait OrReport<T> {
    fn or_report(self, output: OutputMode) -> anyhow::Result<T>;
}

impl<T, E: CodedError> OrReport<T> for Result<T, E> {
    fn or_report(self, output: OutputMode) -> anyhow::Result<T> {
        self.map_err(|err| report(output, err.code(), &err))
    }
}

pub fn open_store(config: &MusterConfig, output: OutputMode) -> anyhow::Result<SqliteStore> {
    SqliteStore::open(&config.storage.database).or_report(output)
}

pub fn manager(
    config: &MusterConfig,
    output: OutputMode,
) -> anyhow::Result<SnapshotManager<OneBotClient, SqliteStore>> {
    Ok(SnapshotManager::new(
        OneBotClient::new(&config.onebot),
        open_store(config, output)?,
        config.storage.archive_settings(),
    ))
}

/// `2024-05-01 12:00:00` in UTC.
pub fn timestamp(at: chrono::DateTime<chrono::Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S").to_string()
}

#[cfg(test)]
pub(crate) mod testing {
    use muster_core::config::MusterConfig;
    use tempfile::TempDir;

    /// Config whose database and archive live under a fresh temp dir.
    pub fn scratch_config() -> (TempDir, MusterConfig) {
        let dir = TempDir::new().expect("tempdir");
        let mut config = MusterConfig::default();
        config.storage.database = dir.path().join("muster.sqlite3");
        config.storage.archive_dir = dir.path().join("snapshots");
        config.onebot.base_url = "http://127.0.0.1:1".to_string();
        config.onebot.timeout_secs = 1;
        (dir, config)
    }
}
