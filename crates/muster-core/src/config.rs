use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::archive::ArchiveSettings;
use crate::reconcile::ReconcileOptions;

/// File name looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "muster.toml";

/// Env var that overrides `onebot.access_token`.
pub const ACCESS_TOKEN_ENV: &str = "MUSTER_ACCESS_TOKEN";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MusterConfig {
    #[serde(default)]
    pub onebot: OneBotConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub reconcile: ReconcileConfig,
}

/// Connection to the OneBot v11 HTTP API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OneBotConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for OneBotConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            access_token: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl OneBotConfig {
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_database")]
    pub database: PathBuf,
    #[serde(default = "default_archive_dir")]
    pub archive_dir: PathBuf,
    #[serde(default = "default_true")]
    pub compress: bool,
    #[serde(default = "default_keep_snapshots")]
    pub keep_snapshots: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database: default_database(),
            archive_dir: default_archive_dir(),
            compress: default_true(),
            keep_snapshots: default_keep_snapshots(),
        }
    }
}

impl StorageConfig {
    #[must_use]
    pub fn archive_settings(&self) -> ArchiveSettings {
        ArchiveSettings {
            dir: self.archive_dir.clone(),
            compress: self.compress,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileConfig {
    #[serde(default = "default_invites_per_minute")]
    pub invites_per_minute: u32,
    #[serde(default = "default_true")]
    pub restore_cards: bool,
    #[serde(default)]
    pub restore_titles: bool,
    #[serde(default = "default_true")]
    pub restore_admins: bool,
    #[serde(default = "default_true")]
    pub announce: bool,
    #[serde(default = "default_true")]
    pub continue_on_error: bool,
    #[serde(default = "default_pause_poll_ms")]
    pub pause_poll_ms: u64,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            invites_per_minute: default_invites_per_minute(),
            restore_cards: default_true(),
            restore_titles: false,
            restore_admins: default_true(),
            announce: default_true(),
            continue_on_error: default_true(),
            pause_poll_ms: default_pause_poll_ms(),
        }
    }
}

impl ReconcileConfig {
    /// Engine options for this section. The rate is validated later, at
    /// engine construction.
    #[must_use]
    pub const fn options(&self) -> ReconcileOptions {
        ReconcileOptions {
            invites_per_minute: self.invites_per_minute,
            restore_cards: self.restore_cards,
            restore_titles: self.restore_titles,
            restore_admins: self.restore_admins,
            announce: self.announce,
            continue_on_error: self.continue_on_error,
            pause_poll_interval: Duration::from_millis(self.pause_poll_ms),
        }
    }
}

/// Parse a config file. Missing sections and keys take their defaults.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not valid TOML.
pub fn load_config_file(path: &Path) -> Result<MusterConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<MusterConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Candidate config locations, highest precedence first.
#[must_use]
pub fn config_search_paths(explicit: Option<&Path>, cwd: &Path) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(path) = explicit {
        paths.push(path.to_path_buf());
        return paths;
    }
    paths.push(cwd.join(LOCAL_CONFIG_FILE));
    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("muster/config.toml"));
    }
    paths
}

/// Resolve the effective configuration.
///
/// An explicit path must exist. Otherwise the first existing file among
/// `./muster.toml` and the user config dir is used, falling back to
/// defaults. [`ACCESS_TOKEN_ENV`] overrides the access token.
///
/// # Errors
///
/// Returns an error if an explicit path is missing or a found file fails
/// to parse.
pub fn resolve_config(explicit: Option<&Path>, cwd: &Path) -> Result<MusterConfig> {
    let token_env = std::env::var(ACCESS_TOKEN_ENV).ok();
    resolve_config_inner(explicit, cwd, token_env)
}

fn resolve_config_inner(
    explicit: Option<&Path>,
    cwd: &Path,
    token_env: Option<String>,
) -> Result<MusterConfig> {
    let mut config = if let Some(path) = explicit {
        load_config_file(path)?
    } else {
        match config_search_paths(None, cwd)
            .into_iter()
            .find(|path| path.exists())
        {
            Some(path) => load_config_file(&path)?,
            None => MusterConfig::default(),
        }
    };

    if let Some(token) = token_env.filter(|token| !token.trim().is_empty()) {
        config.onebot.access_token = Some(token);
    }

    tracing::debug!(base_url = %config.onebot.base_url, "resolved configuration");
    Ok(config)
}

const fn default_true() -> bool {
    true
}

fn default_base_url() -> String {
    "http://127.0.0.1:3000".to_string()
}

const fn default_timeout_secs() -> u64 {
    30
}

fn default_database() -> PathBuf {
    PathBuf::from("data/muster.sqlite3")
}

fn default_archive_dir() -> PathBuf {
    PathBuf::from("data/snapshots")
}

const fn default_keep_snapshots() -> usize {
    30
}

const fn default_invites_per_minute() -> u32 {
    10
}

const fn default_pause_poll_ms() -> u64 {
    1000
}
