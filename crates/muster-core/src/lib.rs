//! muster-core library.
//!
//! Group membership snapshots, diffs between them, and replaying a snapshot
//! onto a live group through a [`remote::GroupApi`].
//!
//! # Conventions
//!
//! - **Errors**: typed `thiserror` enums per module, each mapping to a stable
//!   [`error::ErrorCode`]. `anyhow` only at the config and database-open edges.
//! - **Logging**: `tracing` macros. The binary installs the subscriber.

pub mod archive;
pub mod config;
pub mod db;
pub mod diff;
pub mod error;
pub mod model;
pub mod reconcile;
pub mod remote;
pub mod snapshot;
pub mod store;
