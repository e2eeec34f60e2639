//! In-memory [`GroupApi`] with a call log and failure injection.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{Freshness, Friend, GroupApi, LoginIdentity, RemoteError, RemoteResult};
use crate::model::{GroupProfile, MemberRecord, Role};

/// One recorded call against the fake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiCall {
    ListMembers { group_id: i64, freshness: Freshness },
    GroupInfo { group_id: i64, freshness: Freshness },
    LoginIdentity,
    ListFriends,
    SetCard { group_id: i64, user_id: i64, card: String },
    SetTitle { group_id: i64, user_id: i64, title: String },
    SetAdmin { group_id: i64, user_id: i64, enable: bool },
    SendMessage { group_id: i64, text: String },
}

impl ApiCall {
    /// True for calls that change remote state (messages excluded).
    #[must_use]
    pub const fn is_mutation(&self) -> bool {
        matches!(
            self,
            Self::SetCard { .. } | Self::SetTitle { .. } | Self::SetAdmin { .. }
        )
    }
}

#[derive(Debug, Default)]
struct Failures {
    rosters: BTreeSet<i64>,
    groups: BTreeSet<i64>,
    identity: bool,
    friends: bool,
    messages: bool,
    cards: BTreeSet<i64>,
    titles: BTreeSet<i64>,
    admins: BTreeSet<i64>,
}

#[derive(Debug, Default)]
struct FakeState {
    rosters: BTreeMap<i64, Vec<MemberRecord>>,
    groups: BTreeMap<i64, GroupProfile>,
    identity: Option<LoginIdentity>,
    friends: Vec<Friend>,
    failures: Failures,
    calls: Vec<ApiCall>,
}

/// Scriptable stand-in for a bot session.
///
/// Mutating calls are applied to the stored roster so a later fetch sees
/// the restored card, title, or role.
#[derive(Debug, Default)]
pub struct FakeGroupApi {
    state: Mutex<FakeState>,
}

fn rejected(what: &str, user_id: i64) -> RemoteError {
    RemoteError::Protocol {
        code: 102,
        message: format!("{what} rejected for {user_id}"),
    }
}

impl FakeGroupApi {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_roster(&self, group_id: i64, members: Vec<MemberRecord>) {
        self.state().rosters.insert(group_id, members);
    }

    #[must_use]
    pub fn roster(&self, group_id: i64) -> Vec<MemberRecord> {
        self.state().rosters.get(&group_id).cloned().unwrap_or_default()
    }

    /// Override what [`GroupApi::group_info`] reports for a group.
    ///
    /// Without an override the fake derives a profile from the roster.
    pub fn set_group_info(&self, profile: GroupProfile) {
        self.state().groups.insert(profile.group_id, profile);
    }

    pub fn set_identity(&self, user_id: i64, display_name: &str) {
        self.state().identity = Some(LoginIdentity {
            user_id,
            display_name: display_name.to_string(),
        });
    }

    pub fn set_friends(&self, ids: &[i64]) {
        self.state().friends = ids
            .iter()
            .map(|id| Friend {
                user_id: *id,
                display_name: String::new(),
            })
            .collect();
    }

    pub fn fail_roster(&self, group_id: i64) {
        self.state().failures.rosters.insert(group_id);
    }

    pub fn fail_group_info(&self, group_id: i64) {
        self.state().failures.groups.insert(group_id);
    }

    pub fn fail_identity(&self) {
        self.state().failures.identity = true;
    }

    pub fn fail_friends(&self) {
        self.state().failures.friends = true;
    }

    pub fn fail_messages(&self) {
        self.state().failures.messages = true;
    }

    pub fn fail_card_for(&self, user_id: i64) {
        self.state().failures.cards.insert(user_id);
    }

    pub fn fail_title_for(&self, user_id: i64) {
        self.state().failures.titles.insert(user_id);
    }

    pub fn fail_admin_for(&self, user_id: i64) {
        self.state().failures.admins.insert(user_id);
    }

    /// Every call made so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<ApiCall> {
        self.state().calls.clone()
    }

    #[must_use]
    pub fn mutation_count(&self) -> usize {
        self.state().calls.iter().filter(|call| call.is_mutation()).count()
    }

    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.state()
            .calls
            .iter()
            .filter_map(|call| match call {
                ApiCall::SendMessage { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    fn update_member(
        state: &mut FakeState,
        group_id: i64,
        user_id: i64,
        apply: impl FnOnce(&mut MemberRecord),
    ) -> RemoteResult<()> {
        let member = state
            .rosters
            .get_mut(&group_id)
            .and_then(|roster| roster.iter_mut().find(|m| m.user_id == user_id))
            .ok_or_else(|| RemoteError::Protocol {
                code: 100,
                message: format!("{user_id} is not a member of {group_id}"),
            })?;
        apply(member);
        Ok(())
    }
}

impl GroupApi for FakeGroupApi {
    fn list_group_members(
        &self,
        group_id: i64,
        freshness: Freshness,
    ) -> RemoteResult<Vec<MemberRecord>> {
        let mut state = self.state();
        state.calls.push(ApiCall::ListMembers {
            group_id,
            freshness,
        });
        if state.failures.rosters.contains(&group_id) {
            return Err(RemoteError::Transport(format!(
                "connection reset fetching group {group_id}"
            )));
        }
        state
            .rosters
            .get(&group_id)
            .cloned()
            .ok_or_else(|| RemoteError::Protocol {
                code: 100,
                message: format!("group {group_id} not found"),
            })
    }

    fn group_info(&self, group_id: i64, freshness: Freshness) -> RemoteResult<GroupProfile> {
        let mut state = self.state();
        state.calls.push(ApiCall::GroupInfo {
            group_id,
            freshness,
        });
        if state.failures.groups.contains(&group_id) {
            return Err(RemoteError::Transport(format!(
                "group info for {group_id} timed out"
            )));
        }
        if let Some(profile) = state.groups.get(&group_id) {
            return Ok(profile.clone());
        }
        state
            .rosters
            .get(&group_id)
            .map(|roster| {
                GroupProfile::new(group_id, format!("group {group_id}"))
                    .with_counts(roster.len(), 500)
            })
            .ok_or_else(|| RemoteError::Protocol {
                code: 100,
                message: format!("group {group_id} not found"),
            })
    }

    fn login_identity(&self) -> RemoteResult<LoginIdentity> {
        let mut state = self.state();
        state.calls.push(ApiCall::LoginIdentity);
        if state.failures.identity {
            return Err(RemoteError::Transport("identity lookup timed out".to_string()));
        }
        state
            .identity
            .clone()
            .ok_or_else(|| RemoteError::Decode("no login identity".to_string()))
    }

    fn list_friends(&self) -> RemoteResult<Vec<Friend>> {
        let mut state = self.state();
        state.calls.push(ApiCall::ListFriends);
        if state.failures.friends {
            return Err(RemoteError::Transport("friend list timed out".to_string()));
        }
        Ok(state.friends.clone())
    }

    fn set_group_card(&self, group_id: i64, user_id: i64, card: &str) -> RemoteResult<()> {
        let mut state = self.state();
        state.calls.push(ApiCall::SetCard {
            group_id,
            user_id,
            card: card.to_string(),
        });
        if state.failures.cards.contains(&user_id) {
            return Err(rejected("card change", user_id));
        }
        Self::update_member(&mut state, group_id, user_id, |m| {
            m.group_card = card.to_string();
        })
    }

    fn set_group_title(&self, group_id: i64, user_id: i64, title: &str) -> RemoteResult<()> {
        let mut state = self.state();
        state.calls.push(ApiCall::SetTitle {
            group_id,
            user_id,
            title: title.to_string(),
        });
        if state.failures.titles.contains(&user_id) {
            return Err(rejected("title change", user_id));
        }
        Self::update_member(&mut state, group_id, user_id, |m| {
            m.title = title.to_string();
        })
    }

    fn set_group_admin(&self, group_id: i64, user_id: i64, enable: bool) -> RemoteResult<()> {
        let mut state = self.state();
        state.calls.push(ApiCall::SetAdmin {
            group_id,
            user_id,
            enable,
        });
        if state.failures.admins.contains(&user_id) {
            return Err(rejected("admin change", user_id));
        }
        Self::update_member(&mut state, group_id, user_id, |m| {
            if m.role != Role::Owner {
                m.role = if enable { Role::Admin } else { Role::Member };
            }
        })
    }

    fn send_group_message(&self, group_id: i64, text: &str) -> RemoteResult<()> {
        let mut state = self.state();
        state.calls.push(ApiCall::SendMessage {
            group_id,
            text: text.to_string(),
        });
        if state.failures.messages {
            return Err(RemoteError::Transport("message send timed out".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mutations_apply_to_roster() {
        let api = FakeGroupApi::new();
        api.set_roster(9, vec![MemberRecord::new(1, "a")]);

        api.set_group_card(9, 1, "Alpha").expect("card set");
        api.set_group_admin(9, 1, true).expect("admin set");

        let roster = api.roster(9);
        assert_eq!(roster[0].group_card, "Alpha");
        assert_eq!(roster[0].role, Role::Admin);
        assert_eq!(api.mutation_count(), 2);
    }

    #[test]
    fn injected_failures_surface_as_errors() {
        let api = FakeGroupApi::new();
        api.set_roster(9, vec![MemberRecord::new(1, "a")]);
        api.fail_card_for(1);
        api.fail_roster(10);

        assert!(matches!(
            api.set_group_card(9, 1, "x"),
            Err(RemoteError::Protocol { .. })
        ));
        assert!(matches!(
            api.list_group_members(10, Freshness::BypassCache),
            Err(RemoteError::Transport(_))
        ));
        assert_eq!(api.roster(9)[0].group_card, "");
    }

    #[test]
    fn group_info_falls_back_to_roster_size() {
        let api = FakeGroupApi::new();
        api.set_roster(4, vec![MemberRecord::new(1, "a"), MemberRecord::new(2, "b")]);
        let derived = api.group_info(4, Freshness::Cached).expect("derived");
        assert_eq!(derived.member_count, 2);

        api.set_group_info(GroupProfile::new(4, "Lounge").with_counts(40, 200));
        let stored = api.group_info(4, Freshness::BypassCache).expect("override");
        assert_eq!(stored.group_name, "Lounge");

        api.fail_group_info(4);
        assert!(api.group_info(4, Freshness::Cached).is_err());
    }

    #[test]
    fn records_freshness_of_roster_fetches() {
        let api = FakeGroupApi::new();
        api.set_roster(3, Vec::new());
        api.list_group_members(3, Freshness::Cached).expect("fetch");
        assert_eq!(
            api.calls(),
            vec![ApiCall::ListMembers {
                group_id: 3,
                freshness: Freshness::Cached,
            }]
        );
    }
}
