//! OneBot v11 HTTP binding for [`GroupApi`].
//!
//! Every action is `POST {base_url}/{action}` with a JSON body. Responses are
//! wrapped in `{status, retcode, data, msg, wording}`.

use chrono::{DateTime, Utc};
use muster_core::config::OneBotConfig;
use muster_core::model::{GroupProfile, MemberRecord, Role};
use muster_core::remote::{
    Freshness, Friend, GroupApi, LoginIdentity, RemoteError, RemoteResult,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    status: String,
    #[serde(default)]
    retcode: i64,
    #[serde(default)]
    data: Value,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    wording: Option<String>,
}

impl Envelope {
    fn into_data(self) -> RemoteResult<Value> {
        if self.status == "failed" || self.retcode != 0 {
            let message = self
                .msg
                .filter(|m| !m.is_empty())
                .or(self.wording)
                .unwrap_or_else(|| "unknown error".to_string());
            return Err(RemoteError::Protocol {
                code: self.retcode,
                message,
            });
        }
        Ok(self.data)
    }
}

#[derive(Debug, Deserialize)]
struct MemberDto {
    user_id: i64,
    #[serde(default)]
    nickname: Option<String>,
    #[serde(default)]
    card: Option<String>,
    #[serde(default)]
    sex: Option<String>,
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    level: Option<Value>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    join_time: Option<i64>,
    #[serde(default)]
    last_sent_time: Option<i64>,
}

fn from_unix(secs: Option<i64>) -> Option<DateTime<Utc>> {
    secs.filter(|s| *s > 0)
        .and_then(|s| DateTime::from_timestamp(s, 0))
}

impl From<MemberDto> for MemberRecord {
    fn from(dto: MemberDto) -> Self {
        let level = match dto.level {
            Some(Value::String(s)) => s,
            Some(Value::Number(n)) => n.to_string(),
            _ => String::new(),
        };
        Self {
            user_id: dto.user_id,
            display_name: dto.nickname.unwrap_or_default(),
            group_card: dto.card.unwrap_or_default(),
            gender: dto.sex.as_deref().unwrap_or("").parse().unwrap_or_default(),
            role: dto
                .role
                .as_deref()
                .and_then(|r| r.parse().ok())
                .unwrap_or(Role::Member),
            level,
            title: dto.title.unwrap_or_default(),
            joined_at: from_unix(dto.join_time),
            last_active_at: from_unix(dto.last_sent_time),
        }
    }
}

#[derive(Debug, Deserialize)]
struct LoginDto {
    user_id: i64,
    #[serde(default)]
    nickname: String,
}

#[derive(Debug, Deserialize)]
struct FriendDto {
    user_id: i64,
    #[serde(default)]
    nickname: String,
    #[serde(default)]
    remark: String,
}

/// Bot implementation details from `get_version_info`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct VersionInfo {
    #[serde(default)]
    pub app_name: String,
    #[serde(default)]
    pub app_version: String,
    #[serde(default)]
    pub protocol_version: String,
}

#[derive(Debug, Deserialize)]
struct GroupDto {
    group_id: i64,
    #[serde(default)]
    group_name: String,
    #[serde(default)]
    member_count: usize,
    #[serde(default)]
    max_member_count: usize,
    #[serde(default)]
    group_level: i64,
}

impl From<GroupDto> for GroupProfile {
    fn from(dto: GroupDto) -> Self {
        let mut profile = Self::new(dto.group_id, dto.group_name)
            .with_counts(dto.member_count, dto.max_member_count);
        profile.group_level = dto.group_level;
        profile
    }
}

pub struct OneBotClient {
    agent: ureq::Agent,
    base_url: String,
    access_token: Option<String>,
}

impl OneBotClient {
    pub fn new(config: &OneBotConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(config.timeout())
            .user_agent("muster-cli")
            .build();
        Self {
            agent,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            access_token: config.access_token.clone().filter(|t| !t.is_empty()),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn post(&self, action: &str, params: &Value) -> RemoteResult<Value> {
        let url = format!("{}/{action}", self.base_url);
        debug!(action, "onebot call");

        let mut request = self.agent.post(&url);
        if let Some(token) = &self.access_token {
            request = request.set("Authorization", &format!("Bearer {token}"));
        }

        let response = match request.send_json(params) {
            Ok(response) => response,
            Err(ureq::Error::Status(code, response)) => {
                let body = response.into_string().unwrap_or_default();
                return Err(RemoteError::Protocol {
                    code: i64::from(code),
                    message: if body.is_empty() {
                        format!("HTTP {code} from {action}")
                    } else {
                        body
                    },
                });
            }
            Err(ureq::Error::Transport(err)) => {
                return Err(RemoteError::Transport(format!("{action}: {err}")));
            }
        };

        let envelope: Envelope = response
            .into_json()
            .map_err(|err| RemoteError::Decode(format!("{action}: {err}")))?;
        envelope.into_data()
    }

    fn call<T: DeserializeOwned>(&self, action: &str, params: &Value) -> RemoteResult<T> {
        let data = self.post(action, params)?;
        serde_json::from_value(data).map_err(|err| RemoteError::Decode(format!("{action}: {err}")))
    }

    pub fn version_info(&self) -> RemoteResult<VersionInfo> {
        self.call("get_version_info", &json!({}))
    }

    pub fn group_list(&self) -> RemoteResult<Vec<GroupProfile>> {
        let groups: Vec<GroupDto> = self.call("get_group_list", &json!({ "no_cache": false }))?;
        Ok(groups.into_iter().map(GroupProfile::from).collect())
    }
}

impl GroupApi for OneBotClient {
    fn list_group_members(
        &self,
        group_id: i64,
        freshness: Freshness,
    ) -> RemoteResult<Vec<MemberRecord>> {
        let members: Vec<MemberDto> = self.call(
            "get_group_member_list",
            &json!({ "group_id": group_id, "no_cache": freshness.bypass_cache() }),
        )?;
        Ok(members.into_iter().map(MemberRecord::from).collect())
    }

    fn group_info(&self, group_id: i64, freshness: Freshness) -> RemoteResult<GroupProfile> {
        let group: GroupDto = self.call(
            "get_group_info",
            &json!({ "group_id": group_id, "no_cache": freshness.bypass_cache() }),
        )?;
        Ok(group.into())
    }

    fn login_identity(&self) -> RemoteResult<LoginIdentity> {
        let login: LoginDto = self.call("get_login_info", &json!({}))?;
        Ok(LoginIdentity {
            user_id: login.user_id,
            display_name: login.nickname,
        })
    }

    fn list_friends(&self) -> RemoteResult<Vec<Friend>> {
        let friends: Vec<FriendDto> = self.call("get_friend_list", &json!({}))?;
        Ok(friends
            .into_iter()
            .map(|f| Friend {
                user_id: f.user_id,
                display_name: if f.remark.is_empty() { f.nickname } else { f.remark },
            })
            .collect())
    }

    fn set_group_card(&self, group_id: i64, user_id: i64, card: &str) -> RemoteResult<()> {
        self.post(
            "set_group_card",
            &json!({ "group_id": group_id, "user_id": user_id, "card": card }),
        )
        .map(drop)
    }

    fn set_group_title(&self, group_id: i64, user_id: i64, title: &str) -> RemoteResult<()> {
        self.post(
            "set_group_special_title",
            &json!({
                "group_id": group_id,
                "user_id": user_id,
                "special_title": title,
                "duration": -1,
            }),
        )
        .map(drop)
    }

    fn set_group_admin(&self, group_id: i64, user_id: i64, enable: bool) -> RemoteResult<()> {
        self.post(
            "set_group_admin",
            &json!({ "group_id": group_id, "user_id": user_id, "enable": enable }),
        )
        .map(drop)
    }

    fn send_group_message(&self, group_id: i64, text: &str) -> RemoteResult<()> {
        self.post(
            "send_group_msg",
            &json!({ "group_id": group_id, "message": text, "auto_escape": true }),
        )
        .map(drop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use muster_core::model::Gender;

    fn envelope(raw: Value) -> Envelope {
        serde_json::from_value(raw).expect("envelope")
    }

    #[test]
    fn ok_envelope_yields_data() {
        let data = envelope(json!({"status": "ok", "retcode": 0, "data": {"user_id": 1}}))
            .into_data()
            .expect("ok");
        assert_eq!(data["user_id"], 1);
    }

    #[test]
    fn failed_envelope_prefers_msg_then_wording() {
        let err = envelope(json!({"status": "failed", "retcode": 102, "msg": "", "wording": "no permission"}))
            .into_data()
            .expect_err("failed");
        assert_eq!(
            err,
            RemoteError::Protocol {
                code: 102,
                message: "no permission".to_string()
            }
        );

        let err = envelope(json!({"status": "ok", "retcode": 1400, "msg": "bad request"}))
            .into_data()
            .expect_err("non-zero retcode");
        assert!(matches!(err, RemoteError::Protocol { code: 1400, .. }));
    }

    #[test]
    fn member_dto_maps_onebot_fields() {
        let dto: MemberDto = serde_json::from_value(json!({
            "group_id": 5,
            "user_id": 42,
            "nickname": "neko",
            "card": null,
            "sex": "female",
            "role": "admin",
            "level": 7,
            "title": "Elder",
            "join_time": 1_700_000_000,
            "last_sent_time": 0
        }))
        .expect("dto");
        let member = MemberRecord::from(dto);

        assert_eq!(member.user_id, 42);
        assert_eq!(member.display_name, "neko");
        assert_eq!(member.group_card, "");
        assert_eq!(member.gender, Gender::Female);
        assert_eq!(member.role, Role::Admin);
        assert_eq!(member.level, "7");
        assert_eq!(member.title, "Elder");
        assert!(member.joined_at.is_some());
        assert!(member.last_active_at.is_none());
    }

    #[test]
    fn group_dto_maps_counts_and_level() {
        let dto: GroupDto = serde_json::from_value(json!({
            "group_id": 77,
            "group_name": "club",
            "member_count": 12,
            "max_member_count": 200,
            "group_level": 3
        }))
        .expect("dto");
        let profile = GroupProfile::from(dto);
        assert_eq!(profile.group_name, "club");
        assert_eq!((profile.member_count, profile.max_member_count), (12, 200));
        assert_eq!(profile.group_level, 3);
        assert!(profile.last_backup_at.is_none());
    }

    #[test]
    fn unknown_role_and_sex_fall_back() {
        let dto: MemberDto =
            serde_json::from_value(json!({"user_id": 1, "role": "superuser", "sex": "?"}))
                .expect("dto");
        let member = MemberRecord::from(dto);
        assert_eq!(member.role, Role::Member);
        assert_eq!(member.gender, Gender::Unknown);
    }

    #[test]
    fn unreachable_server_is_a_transport_error() {
        let client = OneBotClient::new(&OneBotConfig {
            base_url: "http://127.0.0.1:1/".to_string(),
            access_token: None,
            timeout_secs: 1,
        });
        assert_eq!(client.base_url(), "http://127.0.0.1:1");
        let err = client.login_identity().expect_err("nothing listens on port 1");
        assert!(matches!(err, RemoteError::Transport(_)));
    }
}
