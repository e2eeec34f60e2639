//! Membership deltas between two member collections.
//!
//! Pure set arithmetic over `user_id`. Results use ordered sets so output
//! is sorted by id and identical input always yields identical output.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::model::MemberRecord;

/// Members keyed by `user_id`.
pub type MemberIndex = BTreeMap<i64, MemberRecord>;

/// A card that differs between the old and new capture of one member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardChange {
    pub user_id: i64,
    pub old_card: String,
    pub new_card: String,
}

/// Result of comparing an older member collection with a newer one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MemberDiff {
    pub joined: BTreeSet<i64>,
    pub left: BTreeSet<i64>,
    pub remained: BTreeSet<i64>,
    pub changed_cards: Vec<CardChange>,
}

impl MemberDiff {
    /// No joins, no leaves, no card changes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.joined.is_empty() && self.left.is_empty() && self.changed_cards.is_empty()
    }
}

/// Build an index from a member sequence. A repeated id keeps the last record.
#[must_use]
pub fn index_members(members: &[MemberRecord]) -> MemberIndex {
    members
        .iter()
        .map(|member| (member.user_id, member.clone()))
        .collect()
}

/// Compare two optional text values with `None` and `""` treated as equal.
#[must_use]
pub fn same_text(a: Option<&str>, b: Option<&str>) -> bool {
    a.unwrap_or_default() == b.unwrap_or_default()
}

/// Compute joined/left/remained ids and card changes from `old` to `new`.
#[must_use]
pub fn diff_members(old: &MemberIndex, new: &MemberIndex) -> MemberDiff {
    let old_ids: BTreeSet<i64> = old.keys().copied().collect();
    let new_ids: BTreeSet<i64> = new.keys().copied().collect();

    let joined: BTreeSet<i64> = new_ids.difference(&old_ids).copied().collect();
    let left: BTreeSet<i64> = old_ids.difference(&new_ids).copied().collect();
    let remained: BTreeSet<i64> = old_ids.intersection(&new_ids).copied().collect();

    let changed_cards = remained
        .iter()
        .filter_map(|id| {
            let before = old.get(id)?;
            let after = new.get(id)?;
            if same_text(Some(&before.group_card), Some(&after.group_card)) {
                None
            } else {
                Some(CardChange {
                    user_id: *id,
                    old_card: before.group_card.clone(),
                    new_card: after.group_card.clone(),
                })
            }
        })
        .collect();

    MemberDiff {
        joined,
        left,
        remained,
        changed_cards,
    }
}
