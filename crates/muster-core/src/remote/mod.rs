//! Boundary to the bot implementation that owns the group session.
//!
//! [`GroupApi`] is everything the snapshot and reconciliation paths need from
//! the remote side. The HTTP binding lives in the CLI crate; [`fake`] is an
//! in-memory implementation for tests and demos.

pub mod fake;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::ErrorCode;
use crate::model::{GroupProfile, MemberRecord};

/// Errors surfaced by a [`GroupApi`] implementation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    /// Network failure or timeout. Never retried by the core.
    #[error("transport error: {0}")]
    Transport(String),

    /// The remote side rejected the call.
    #[error("remote rejected the call (code {code}): {message}")]
    Protocol { code: i64, message: String },

    /// The response could not be decoded.
    #[error("unreadable response: {0}")]
    Decode(String),
}

impl RemoteError {
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::Transport(_) => ErrorCode::RemoteTransport,
            Self::Protocol { .. } => ErrorCode::RemoteRejected,
            Self::Decode(_) => ErrorCode::RemoteDecode,
        }
    }
}

pub type RemoteResult<T> = Result<T, RemoteError>;

/// Whether the remote may answer from its own cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Freshness {
    Cached,
    BypassCache,
}

impl Freshness {
    #[must_use]
    pub const fn bypass_cache(self) -> bool {
        matches!(self, Self::BypassCache)
    }
}

/// The account the bot is logged in as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginIdentity {
    pub user_id: i64,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Friend {
    pub user_id: i64,
    #[serde(default)]
    pub display_name: String,
}

/// Remote group operations used by snapshots and reconciliation.
///
/// Mutating calls report only success or failure.
pub trait GroupApi: Send + Sync {
    /// # Errors
    ///
    /// Returns a [`RemoteError`] if the roster cannot be fetched.
    fn list_group_members(
        &self,
        group_id: i64,
        freshness: Freshness,
    ) -> RemoteResult<Vec<MemberRecord>>;

    /// Group name and head counts as the remote reports them.
    ///
    /// # Errors
    ///
    /// Returns a [`RemoteError`] if the group cannot be looked up.
    fn group_info(&self, group_id: i64, freshness: Freshness) -> RemoteResult<GroupProfile>;

    /// # Errors
    ///
    /// Returns a [`RemoteError`] if the identity cannot be fetched.
    fn login_identity(&self) -> RemoteResult<LoginIdentity>;

    /// # Errors
    ///
    /// Returns a [`RemoteError`] if the friend list cannot be fetched.
    fn list_friends(&self) -> RemoteResult<Vec<Friend>>;

    /// # Errors
    ///
    /// Returns a [`RemoteError`] if the card change is rejected.
    fn set_group_card(&self, group_id: i64, user_id: i64, card: &str) -> RemoteResult<()>;

    /// # Errors
    ///
    /// Returns a [`RemoteError`] if the title change is rejected.
    fn set_group_title(&self, group_id: i64, user_id: i64, title: &str) -> RemoteResult<()>;

    /// # Errors
    ///
    /// Returns a [`RemoteError`] if the role change is rejected.
    fn set_group_admin(&self, group_id: i64, user_id: i64, enable: bool) -> RemoteResult<()>;

    /// # Errors
    ///
    /// Returns a [`RemoteError`] if the message cannot be sent.
    fn send_group_message(&self, group_id: i64, text: &str) -> RemoteResult<()>;
}

impl<T: GroupApi + ?Sized> GroupApi for Arc<T> {
    fn list_group_members(
        &self,
        group_id: i64,
        freshness: Freshness,
    ) -> RemoteResult<Vec<MemberRecord>> {
        (**self).list_group_members(group_id, freshness)
    }

    fn group_info(&self, group_id: i64, freshness: Freshness) -> RemoteResult<GroupProfile> {
        (**self).group_info(group_id, freshness)
    }

    fn login_identity(&self) -> RemoteResult<LoginIdentity> {
        (**self).login_identity()
    }

    fn list_friends(&self) -> RemoteResult<Vec<Friend>> {
        (**self).list_friends()
    }

    fn set_group_card(&self, group_id: i64, user_id: i64, card: &str) -> RemoteResult<()> {
        (**self).set_group_card(group_id, user_id, card)
    }

    fn set_group_title(&self, group_id: i64, user_id: i64, title: &str) -> RemoteResult<()> {
        (**self).set_group_title(group_id, user_id, title)
    }

    fn set_group_admin(&self, group_id: i64, user_id: i64, enable: bool) -> RemoteResult<()> {
        (**self).set_group_admin(group_id, user_id, enable)
    }

    fn send_group_message(&self, group_id: i64, text: &str) -> RemoteResult<()> {
        (**self).send_group_message(group_id, text)
    }
}
