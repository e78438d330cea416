//! Wire models for the Slack web API responses we consume.
//!
//! Only the fields the unread tracker needs are modelled; everything else in
//! the payloads is ignored by serde.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Parse a Slack timestamp (`"1771625714.453859"`) into an instant.
///
/// Only the integer seconds component is used.
pub fn parse_slack_ts(ts: &str) -> Option<DateTime<Utc>> {
    let seconds = ts.split('.').next()?.trim().parse::<i64>().ok()?;
    DateTime::from_timestamp(seconds, 0)
}

/// Envelope shared by every response; used to detect `ok: false`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ResponseEnvelope {
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
}

// ---------------------------------------------------------------------------
// client.counts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientCountsResponse {
    #[serde(default)]
    pub channels: Vec<ConversationCount>,
    #[serde(default)]
    pub ims: Vec<ConversationCount>,
    #[serde(default)]
    pub mpims: Vec<ConversationCount>,
    #[serde(default)]
    pub threads: Option<ThreadCount>,
    #[serde(default)]
    pub channel_badges: Option<ChannelBadges>,
}

/// Unread state for one conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationCount {
    pub id: String,
    #[serde(default)]
    pub last_read: Option<String>,
    #[serde(default)]
    pub latest: Option<String>,
    #[serde(default)]
    pub updated: Option<String>,
    #[serde(default)]
    pub mention_count: u32,
    #[serde(default)]
    pub has_unreads: bool,
    #[serde(default)]
    pub is_muted: Option<bool>,
}

impl ConversationCount {
    /// Instant of the latest message, if Slack reported one.
    pub fn latest_at(&self) -> Option<DateTime<Utc>> {
        self.latest.as_deref().and_then(parse_slack_ts)
    }

    #[inline]
    pub fn has_activity(&self) -> bool {
        self.has_unreads || self.mention_count > 0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadCount {
    #[serde(default)]
    pub has_unreads: bool,
    #[serde(default)]
    pub mention_count: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelBadges {
    #[serde(default)]
    pub channels: u32,
    #[serde(default)]
    pub dms: u32,
    #[serde(default)]
    pub app_dms: u32,
    #[serde(default)]
    pub thread_mentions: u32,
    #[serde(default)]
    pub thread_unreads: u32,
}

// ---------------------------------------------------------------------------
// conversations.info
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ConversationInfoResponse {
    pub channel: ConversationInfo,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationInfo {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub is_channel: Option<bool>,
    #[serde(default)]
    pub is_group: Option<bool>,
    #[serde(default)]
    pub is_im: Option<bool>,
    #[serde(default)]
    pub is_mpim: Option<bool>,
    #[serde(default)]
    pub is_private: Option<bool>,
    #[serde(default)]
    pub is_ext_shared: Option<bool>,
    /// Counterpart user for direct messages.
    #[serde(default)]
    pub user: Option<String>,
}

impl ConversationInfo {
    #[inline]
    pub fn is_direct_message(&self) -> bool {
        self.is_im == Some(true)
    }

    /// Private channels are reported either via `is_private` or, on older
    /// workspaces, as `is_group`.
    pub fn is_private_channel(&self) -> bool {
        self.is_private.or(self.is_group).unwrap_or(false)
    }

    /// DM counterpart, ignoring the empty string Slack sends for channels.
    pub fn counterpart_user(&self) -> Option<&str> {
        self.user.as_deref().filter(|u| !u.is_empty())
    }
}

// ---------------------------------------------------------------------------
// users.info
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct UserInfoResponse {
    pub user: UserInfo,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub real_name: Option<String>,
    #[serde(default)]
    pub profile: UserProfile,
    #[serde(default)]
    pub is_bot: Option<bool>,
}

impl UserInfo {
    /// Label shown for a DM: display name, then real name, then handle.
    pub fn display_label(&self) -> &str {
        if !self.profile.display_name.is_empty() {
            return &self.profile.display_name;
        }
        match self.real_name.as_deref() {
            Some(real) if !real.is_empty() => real,
            _ => &self.name,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub image_32: Option<String>,
}

// ---------------------------------------------------------------------------
// auth.test
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthTestResponse {
    #[serde(default)]
    pub team_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub enterprise_id: Option<String>,
    #[serde(default)]
    pub team: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

// ---------------------------------------------------------------------------
// users.prefs.get
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct UserPrefsResponse {
    #[serde(default)]
    pub prefs: Option<UserPrefs>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPrefs {
    /// Legacy comma-separated muted channel ids.
    #[serde(default)]
    pub muted_channels: Option<String>,
    /// JSON document (as a string) with per-channel notification prefs.
    #[serde(default)]
    pub all_notifications_prefs: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct AllNotificationsPrefs {
    #[serde(default)]
    channels: HashMap<String, ChannelNotificationPref>,
}

#[derive(Debug, Default, Deserialize)]
struct ChannelNotificationPref {
    #[serde(default)]
    muted: Option<bool>,
}

impl UserPrefs {
    /// Muted channel ids from whichever pref format the workspace uses.
    ///
    /// `all_notifications_prefs` wins when it yields at least one muted
    /// channel; otherwise the legacy `muted_channels` list is used.
    pub fn muted_channel_ids(&self) -> HashSet<String> {
        if let Some(raw) = self.all_notifications_prefs.as_deref().filter(|r| !r.is_empty()) {
            match serde_json::from_str::<AllNotificationsPrefs>(raw) {
                Ok(parsed) => {
                    let muted: HashSet<String> = parsed
                        .channels
                        .into_iter()
                        .filter(|(_, pref)| pref.muted == Some(true))
                        .map(|(id, _)| id)
                        .collect();
                    if !muted.is_empty() {
                        return muted;
                    }
                }
                Err(e) => {
                    tracing::debug!(error = %e, "Ignoring unparseable all_notifications_prefs");
                }
            }
        }

        self.muted_channels
            .as_deref()
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|id| !id.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// client.userBoot / users.channelSections.list
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ChannelSectionsResponse {
    #[serde(default)]
    pub channel_sections: Vec<ChannelSection>,
}

/// A sidebar section. Sections with no `channel_ids` are "virtual": their
/// membership is inferred from their `section_type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawChannelSection")]
pub struct ChannelSection {
    pub id: String,
    pub name: String,
    pub section_type: String,
    pub channel_ids: Vec<String>,
}

impl ChannelSection {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        section_type: impl Into<String>,
        channel_ids: Vec<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            section_type: section_type.into(),
            channel_ids,
        }
    }

    #[inline]
    pub fn is_virtual(&self) -> bool {
        self.channel_ids.is_empty()
    }
}

#[derive(Deserialize)]
struct RawChannelSection {
    #[serde(alias = "id")]
    channel_section_id: String,
    #[serde(default)]
    name: String,
    #[serde(rename = "type", alias = "section_type", default)]
    section_type: String,
    #[serde(default)]
    channel_ids_page: Option<ChannelIdsPage>,
    #[serde(default)]
    channel_ids: Option<Vec<String>>,
}

#[derive(Deserialize)]
struct ChannelIdsPage {
    #[serde(default)]
    channel_ids: Vec<String>,
}

impl From<RawChannelSection> for ChannelSection {
    fn from(raw: RawChannelSection) -> Self {
        let channel_ids = raw
            .channel_ids_page
            .map(|page| page.channel_ids)
            .or(raw.channel_ids)
            .unwrap_or_default();
        Self {
            id: raw.channel_section_id,
            name: raw.name,
            section_type: raw.section_type,
            channel_ids,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_slack_ts_uses_seconds_only() {
        let parsed = parse_slack_ts("1771625714.453859").unwrap();
        assert_eq!(parsed.timestamp(), 1771625714);
        assert_eq!(parsed.timestamp_subsec_nanos(), 0);
        assert!(parse_slack_ts("garbage").is_none());
        assert!(parse_slack_ts("").is_none());
    }

    #[test]
    fn test_client_counts_decoding() {
        let json = r#"{
            "ok": true,
            "channels": [{"id": "C1", "mention_count": 1, "has_unreads": true, "latest": "1771625714.453859"}],
            "ims": [{"id": "D1", "mention_count": 0, "has_unreads": true, "latest": "1771466036.904419"}],
            "mpims": [],
            "threads": {"has_unreads": false, "mention_count": 0},
            "channel_badges": {"channels": 1, "dms": 1, "app_dms": 0, "thread_mentions": 0, "thread_unreads": 0}
        }"#;

        let counts: ClientCountsResponse = serde_json::from_str(json).unwrap();
        assert_eq!(counts.channels.len(), 1);
        assert_eq!(counts.channels[0].mention_count, 1);
        assert_eq!(counts.ims[0].latest_at().unwrap().timestamp(), 1771466036);
        assert_eq!(counts.channel_badges.unwrap().dms, 1);
    }

    #[test]
    fn test_conversation_info_decoding() {
        let json = r#"{
            "id": "C00TEST01",
            "name": "general",
            "is_channel": true,
            "is_im": false,
            "is_mpim": false,
            "user": ""
        }"#;
        let info: ConversationInfo = serde_json::from_str(json).unwrap();
        assert_eq!(info.name.as_deref(), Some("general"));
        assert!(!info.is_direct_message());
        assert!(info.counterpart_user().is_none());
        assert!(!info.is_private_channel());
    }

    #[test]
    fn test_private_channel_via_is_group() {
        let info = ConversationInfo {
            id: "G1".into(),
            is_group: Some(true),
            ..Default::default()
        };
        assert!(info.is_private_channel());
    }

    #[test]
    fn test_user_display_label_fallbacks() {
        let mut user = UserInfo {
            id: "U1".into(),
            name: "handle".into(),
            real_name: Some("Real Name".into()),
            profile: UserProfile {
                display_name: "Display".into(),
                image_32: None,
            },
            is_bot: Some(false),
        };
        assert_eq!(user.display_label(), "Display");
        user.profile.display_name.clear();
        assert_eq!(user.display_label(), "Real Name");
        user.real_name = Some(String::new());
        assert_eq!(user.display_label(), "handle");
    }

    #[test]
    fn test_muted_legacy_format() {
        let prefs = UserPrefs {
            muted_channels: Some("C00TEST01,C00TEST02,C00TEST03".into()),
            all_notifications_prefs: None,
        };
        let muted = prefs.muted_channel_ids();
        assert_eq!(muted.len(), 3);
        assert!(muted.contains("C00TEST02"));
    }

    #[test]
    fn test_muted_enterprise_format() {
        let raw = r#"{"channels":{"C00TEST01":{"muted":true,"desktop":"default"},"C00TEST02":{"muted":true},"C00TEST03":{"muted":false},"C00TEST04":{"muted":true}},"global":{}}"#;
        let prefs = UserPrefs {
            muted_channels: Some("C99".into()),
            all_notifications_prefs: Some(raw.into()),
        };
        let muted = prefs.muted_channel_ids();
        assert_eq!(muted.len(), 3);
        assert!(muted.contains("C00TEST01"));
        assert!(muted.contains("C00TEST04"));
        assert!(!muted.contains("C00TEST03"));
        assert!(!muted.contains("C99"));
    }

    #[test]
    fn test_muted_enterprise_without_mutes_falls_back_to_legacy() {
        let prefs = UserPrefs {
            muted_channels: Some("C7".into()),
            all_notifications_prefs: Some(r#"{"channels":{"C1":{"muted":false}}}"#.into()),
        };
        assert_eq!(prefs.muted_channel_ids(), HashSet::from(["C7".to_string()]));
    }

    #[test]
    fn test_muted_empty() {
        assert!(UserPrefs::default().muted_channel_ids().is_empty());
        let prefs = UserPrefs {
            muted_channels: Some(String::new()),
            all_notifications_prefs: None,
        };
        assert!(prefs.muted_channel_ids().is_empty());
    }

    #[test]
    fn test_channel_sections_decoding() {
        let json = r#"{
            "ok": true,
            "channel_sections": [
                {
                    "channel_section_id": "S1",
                    "name": "Starred",
                    "type": "stars",
                    "channel_ids_page": { "channel_ids": ["C123", "C456"] },
                    "style": "starred"
                },
                {
                    "channel_section_id": "S2",
                    "name": "Channels",
                    "type": "channels",
                    "channel_ids_page": { "channel_ids": [] }
                },
                {
                    "channel_section_id": "S3",
                    "name": "Direct messages",
                    "type": "direct_messages"
                }
            ]
        }"#;

        let response: ChannelSectionsResponse = serde_json::from_str(json).unwrap();
        let sections = response.channel_sections;
        assert_eq!(sections.len(), 3);
        assert_eq!(sections[0].id, "S1");
        assert_eq!(sections[0].section_type, "stars");
        assert_eq!(sections[0].channel_ids, vec!["C123", "C456"]);
        assert!(!sections[0].is_virtual());
        assert!(sections[1].is_virtual());
        assert!(sections[2].is_virtual());
    }
}
