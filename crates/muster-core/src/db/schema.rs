//! SQLite schema for the snapshot store.
//!
//! - `snapshots` holds one row per snapshot run, including failed ones
//! - `snapshot_members` keeps the immutable capture of each snapshot in order
//! - `group_members` is the current roster per group, replaced on each run
//! - `membership_events` is the append-only join/leave history
//! - `groups` caches group metadata and the last successful backup time
//! - `store_meta` tracks the schema version

/// Migration v1: core tables plus store metadata.
pub const MIGRATION_V1_SQL: &str = r"
CREATE TABLE IF NOT EXISTS snapshots (
    snapshot_id INTEGER PRIMARY KEY AUTOINCREMENT,
    group_id INTEGER NOT NULL,
    kind TEXT NOT NULL CHECK (kind IN ('full', 'incremental', 'manual')),
    status TEXT NOT NULL CHECK (status IN ('pending', 'running', 'success', 'failed')),
    notes TEXT NOT NULL DEFAULT '',
    member_count INTEGER NOT NULL DEFAULT 0,
    new_member_count INTEGER NOT NULL DEFAULT 0,
    left_member_count INTEGER NOT NULL DEFAULT 0,
    file_path TEXT,
    file_size INTEGER NOT NULL DEFAULT 0,
    compressed INTEGER NOT NULL DEFAULT 0 CHECK (compressed IN (0, 1)),
    summary_json TEXT,
    error_message TEXT,
    started_at_us INTEGER NOT NULL,
    completed_at_us INTEGER
);

CREATE TABLE IF NOT EXISTS snapshot_members (
    snapshot_id INTEGER NOT NULL REFERENCES snapshots(snapshot_id) ON DELETE CASCADE,
    position INTEGER NOT NULL,
    user_id INTEGER NOT NULL,
    record_json TEXT NOT NULL,
    PRIMARY KEY (snapshot_id, position)
);

CREATE TABLE IF NOT EXISTS group_members (
    group_id INTEGER NOT NULL,
    user_id INTEGER NOT NULL,
    display_name TEXT NOT NULL DEFAULT '',
    group_card TEXT NOT NULL DEFAULT '',
    gender TEXT NOT NULL DEFAULT 'unknown' CHECK (gender IN ('male', 'female', 'unknown')),
    role TEXT NOT NULL DEFAULT 'member' CHECK (role IN ('owner', 'admin', 'member')),
    level TEXT NOT NULL DEFAULT '',
    title TEXT NOT NULL DEFAULT '',
    joined_at_us INTEGER,
    last_active_at_us INTEGER,
    updated_at_us INTEGER NOT NULL,
    PRIMARY KEY (group_id, user_id)
);

CREATE TABLE IF NOT EXISTS membership_events (
    event_id INTEGER PRIMARY KEY AUTOINCREMENT,
    group_id INTEGER NOT NULL,
    user_id INTEGER NOT NULL,
    display_name TEXT NOT NULL DEFAULT '',
    action TEXT NOT NULL CHECK (action IN ('join', 'leave')),
    snapshot_id INTEGER REFERENCES snapshots(snapshot_id) ON DELETE SET NULL,
    created_at_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS store_meta (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    schema_version INTEGER NOT NULL
);

INSERT OR IGNORE INTO store_meta (id, schema_version) VALUES (1, 0);
";

/// Migration v2: lookup indexes for history queries.
pub const MIGRATION_V2_SQL: &str = r"
CREATE INDEX IF NOT EXISTS idx_snapshots_group_started
    ON snapshots(group_id, started_at_us DESC, snapshot_id DESC);

CREATE INDEX IF NOT EXISTS idx_snapshot_members_user
    ON snapshot_members(snapshot_id, user_id);

CREATE INDEX IF NOT EXISTS idx_membership_events_group_created
    ON membership_events(group_id, created_at_us DESC, event_id DESC);

CREATE INDEX IF NOT EXISTS idx_membership_events_user
    ON membership_events(group_id, user_id);
";

/// Migration v3: per-group metadata.
pub const MIGRATION_V3_SQL: &str = r"
CREATE TABLE IF NOT EXISTS groups (
    group_id INTEGER PRIMARY KEY,
    group_name TEXT NOT NULL DEFAULT '',
    member_count INTEGER NOT NULL DEFAULT 0,
    max_member_count INTEGER NOT NULL DEFAULT 0,
    group_level INTEGER NOT NULL DEFAULT 0,
    last_backup_at_us INTEGER,
    updated_at_us INTEGER NOT NULL
);
";

pub const REQUIRED_INDEXES: &[&str] = &[
    "idx_snapshots_group_started",
    "idx_snapshot_members_user",
    "idx_membership_events_group_created",
    "idx_membership_events_user",
];
