//! Per-member decisions, shared by preview and execution.
//!
//! Priority: the bot's own account is skipped; a member already in the
//! target group gets its differing metadata restored (or nothing); an absent
//! member is either not invitable (not a friend of the bot) or flagged for a
//! manual invite.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

use super::ReconcileOptions;
use crate::diff::{MemberIndex, index_members, same_text};
use crate::model::{MemberRecord, Role};

/// A metadata field the engine can restore.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Card,
    Title,
    Admin,
}

impl FieldKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Card => "card",
            Self::Title => "title",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One field to bring from its live value back to the snapshot value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldChange {
    pub field: FieldKind,
    pub current: String,
    pub target: String,
}

/// Preview bucket of a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    SkipBotSelf,
    NoChange,
    Restore,
    CannotInvite,
    NeedsManualInvite,
}

impl Bucket {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SkipBotSelf => "skip_bot_self",
            Self::NoChange => "no_change",
            Self::Restore => "restore",
            Self::CannotInvite => "cannot_invite",
            Self::NeedsManualInvite => "needs_manual_invite",
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    SkipBotSelf,
    Restore(Vec<FieldChange>),
    NoChangeNeeded,
    /// Absent and not a friend: the protocol has no way to add them.
    CannotInvite,
    /// Absent but a friend: an operator has to invite them by hand.
    NeedsManualInvite,
}

impl Decision {
    #[must_use]
    pub const fn bucket(&self) -> Bucket {
        match self {
            Self::SkipBotSelf => Bucket::SkipBotSelf,
            Self::Restore(_) => Bucket::Restore,
            Self::NoChangeNeeded => Bucket::NoChange,
            Self::CannotInvite => Bucket::CannotInvite,
            Self::NeedsManualInvite => Bucket::NeedsManualInvite,
        }
    }

    #[must_use]
    pub fn reason(&self) -> String {
        match self {
            Self::SkipBotSelf => "bot account".to_string(),
            Self::Restore(changes) => {
                let fields: Vec<&str> = changes.iter().map(|c| c.field.as_str()).collect();
                format!("restore {}", fields.join(", "))
            }
            Self::NoChangeNeeded => "already up to date".to_string(),
            Self::CannotInvite => "not a friend of the bot".to_string(),
            Self::NeedsManualInvite => "friend of the bot, invite manually".to_string(),
        }
    }
}

/// Live state the decisions are made against.
#[derive(Debug, Clone, Default)]
pub struct LiveContext {
    members: MemberIndex,
    bot_id: Option<i64>,
    friends: BTreeSet<i64>,
}

impl LiveContext {
    #[must_use]
    pub fn new(
        roster: &[MemberRecord],
        bot_id: Option<i64>,
        friends: impl IntoIterator<Item = i64>,
    ) -> Self {
        Self {
            members: index_members(roster),
            bot_id,
            friends: friends.into_iter().collect(),
        }
    }

    #[must_use]
    pub fn live(&self, user_id: i64) -> Option<&MemberRecord> {
        self.members.get(&user_id)
    }

    #[must_use]
    pub fn is_bot(&self, user_id: i64) -> bool {
        self.bot_id == Some(user_id)
    }

    #[must_use]
    pub fn is_friend(&self, user_id: i64) -> bool {
        self.friends.contains(&user_id)
    }

    #[must_use]
    pub fn member_count(&self) -> usize {
        self.members.len()
    }
}

/// Fields of a present member that differ from the snapshot and are enabled.
///
/// The admin role is only restored onto a live plain member; a live owner
/// or admin is left alone.
#[must_use]
pub fn metadata_changes(
    snapshot: &MemberRecord,
    live: &MemberRecord,
    options: &ReconcileOptions,
) -> Vec<FieldChange> {
    let mut changes = Vec::new();

    if options.restore_cards && !same_text(Some(&snapshot.group_card), Some(&live.group_card)) {
        changes.push(FieldChange {
            field: FieldKind::Card,
            current: live.group_card.clone(),
            target: snapshot.group_card.clone(),
        });
    }

    if options.restore_titles && !same_text(Some(&snapshot.title), Some(&live.title)) {
        changes.push(FieldChange {
            field: FieldKind::Title,
            current: live.title.clone(),
            target: snapshot.title.clone(),
        });
    }

    if options.restore_admins && snapshot.role == Role::Admin && !live.role.is_privileged() {
        changes.push(FieldChange {
            field: FieldKind::Admin,
            current: live.role.as_str().to_string(),
            target: Role::Admin.as_str().to_string(),
        });
    }

    changes
}

/// Metadata to set on a member that is not in the group yet: every
/// enabled, non-empty snapshot value.
#[must_use]
pub fn invite_metadata(snapshot: &MemberRecord, options: &ReconcileOptions) -> Vec<FieldChange> {
    let mut changes = Vec::new();
    if options.restore_cards && !snapshot.group_card.is_empty() {
        changes.push(FieldChange {
            field: FieldKind::Card,
            current: String::new(),
            target: snapshot.group_card.clone(),
        });
    }
    if options.restore_titles && !snapshot.title.is_empty() {
        changes.push(FieldChange {
            field: FieldKind::Title,
            current: String::new(),
            target: snapshot.title.clone(),
        });
    }
    if options.restore_admins && snapshot.role == Role::Admin {
        changes.push(FieldChange {
            field: FieldKind::Admin,
            current: Role::Member.as_str().to_string(),
            target: Role::Admin.as_str().to_string(),
        });
    }
    changes
}

/// Decide for a member whose presence is known; `None` when the member is
/// absent and the friend list is needed.
#[must_use]
pub fn classify_known(
    member: &MemberRecord,
    ctx: &LiveContext,
    options: &ReconcileOptions,
) -> Option<Decision> {
    if ctx.is_bot(member.user_id) {
        return Some(Decision::SkipBotSelf);
    }
    let live = ctx.live(member.user_id)?;
    let changes = metadata_changes(member, live, options);
    Some(if changes.is_empty() {
        Decision::NoChangeNeeded
    } else {
        Decision::Restore(changes)
    })
}

#[must_use]
pub const fn classify_absent(is_friend: bool) -> Decision {
    if is_friend {
        Decision::NeedsManualInvite
    } else {
        Decision::CannotInvite
    }
}

/// Full decision for one snapshotted member.
#[must_use]
pub fn classify(member: &MemberRecord, ctx: &LiveContext, options: &ReconcileOptions) -> Decision {
    classify_known(member, ctx, options)
        .unwrap_or_else(|| classify_absent(ctx.is_friend(member.user_id)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> ReconcileOptions {
        ReconcileOptions::default()
    }

    #[test]
    fn priority_order_is_bot_then_presence_then_friendship() {
        let live = vec![
            MemberRecord::new(1, "a").with_card("A'"),
            MemberRecord::new(2, "b").with_card("B"),
            MemberRecord::new(99, "bot"),
        ];
        let ctx = LiveContext::new(&live, Some(99), [3]);

        let decide = |m: MemberRecord| classify(&m, &ctx, &options()).bucket();
        assert_eq!(decide(MemberRecord::new(99, "bot").with_card("x")), Bucket::SkipBotSelf);
        assert_eq!(decide(MemberRecord::new(1, "a").with_card("A")), Bucket::Restore);
        assert_eq!(decide(MemberRecord::new(2, "b").with_card("B")), Bucket::NoChange);
        assert_eq!(decide(MemberRecord::new(3, "c")), Bucket::NeedsManualInvite);
        assert_eq!(decide(MemberRecord::new(4, "d")), Bucket::CannotInvite);
    }

    #[test]
    fn bot_is_skipped_even_when_absent() {
        let ctx = LiveContext::new(&[], Some(7), [7]);
        assert_eq!(
            classify(&MemberRecord::new(7, "bot"), &ctx, &options()),
            Decision::SkipBotSelf
        );
    }

    #[test]
    fn disabled_flags_suppress_changes() {
        let snapshot = MemberRecord::new(1, "a")
            .with_card("Card")
            .with_title("Elder")
            .with_role(Role::Admin);
        let live = MemberRecord::new(1, "a");

        let none = ReconcileOptions {
            restore_cards: false,
            restore_titles: false,
            restore_admins: false,
            ..options()
        };
        assert!(metadata_changes(&snapshot, &live, &none).is_empty());

        let all = ReconcileOptions {
            restore_titles: true,
            ..options()
        };
        let fields: Vec<FieldKind> = metadata_changes(&snapshot, &live, &all)
            .iter()
            .map(|c| c.field)
            .collect();
        assert_eq!(fields, vec![FieldKind::Card, FieldKind::Title, FieldKind::Admin]);
    }

    #[test]
    fn admin_restore_never_touches_live_owner_or_admin() {
        let snapshot = MemberRecord::new(1, "a").with_role(Role::Admin);
        for role in [Role::Owner, Role::Admin] {
            let live = MemberRecord::new(1, "a").with_role(role);
            assert!(metadata_changes(&snapshot, &live, &options()).is_empty());
        }
        let demoted = MemberRecord::new(1, "a");
        assert_eq!(metadata_changes(&snapshot, &demoted, &options()).len(), 1);
    }

    #[test]
    fn restore_reason_lists_fields() {
        let decision = Decision::Restore(vec![
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
        ]);
        assert_eq!(decision.reason(), "restore card, admin");
    }

    #[test]
    fn invite_metadata_skips_empty_values() {
        let member = MemberRecord::new(5, "e").with_card("Eve");
        let changes = invite_metadata(&member, &options());
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].target, "Eve");
    }
}
