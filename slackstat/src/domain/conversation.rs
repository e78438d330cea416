//! Conversations surfaced by a poll cycle and their aggregate counts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use slack_api::ConversationCount;

/// How an unread conversation is surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationKind {
    /// Direct message.
    Dm,
    /// Channel with at least one @mention.
    Mention,
    /// Channel with unreads and no mentions.
    Channel,
    /// Multi-person direct message.
    Mpim,
}

impl ConversationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dm => "dm",
            Self::Mention => "mention",
            Self::Channel => "channel",
            Self::Mpim => "mpim",
        }
    }

    /// DMs and group DMs count as one category.
    #[inline]
    pub fn is_direct(&self) -> bool {
        matches!(self, Self::Dm | Self::Mpim)
    }
}

/// One unread conversation. Rebuilt from scratch every cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationItem {
    pub id: String,
    pub name: String,
    pub kind: ConversationKind,
    pub team_id: String,
    pub has_unreads: bool,
    pub mention_count: u32,
    pub latest_at: Option<DateTime<Utc>>,
    /// Counterpart user for DMs.
    pub user_id: Option<String>,
    pub is_private: bool,
    pub is_ext_shared: bool,
}

impl ConversationItem {
    /// Item named by its raw id; resolution fills in the rest.
    pub fn from_count(count: &ConversationCount, kind: ConversationKind, team_id: &str) -> Self {
        Self {
            id: count.id.clone(),
            name: count.id.clone(),
            kind,
            team_id: team_id.to_string(),
            has_unreads: count.has_unreads,
            mention_count: count.mention_count,
            latest_at: count.latest_at(),
            user_id: None,
            is_private: false,
            is_ext_shared: false,
        }
    }
}

/// Sort newest first; items without a timestamp go last.
pub fn sort_by_latest(items: &mut [ConversationItem]) {
    items.sort_by(|a, b| b.latest_at.cmp(&a.latest_at));
}

/// Totals and most-recent activity per summary category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatedCounts {
    pub total_dms: usize,
    pub total_mentions: usize,
    pub total_channels: usize,
    pub most_recent_dm: Option<DateTime<Utc>>,
    pub most_recent_mention: Option<DateTime<Utc>>,
    pub most_recent_channel: Option<DateTime<Utc>>,
}

impl AggregatedCounts {
    pub fn from_items(items: &[ConversationItem]) -> Self {
        let mut agg = Self::default();
        for item in items {
            let (total, recent) = match item.kind {
                ConversationKind::Dm | ConversationKind::Mpim => {
                    (&mut agg.total_dms, &mut agg.most_recent_dm)
                }
                ConversationKind::Mention => {
                    (&mut agg.total_mentions, &mut agg.most_recent_mention)
                }
                ConversationKind::Channel => {
                    (&mut agg.total_channels, &mut agg.most_recent_channel)
                }
            };
            *total += 1;
            *recent = (*recent).max(item.latest_at);
        }
        agg
    }

    pub fn has_activity(&self) -> bool {
        self.total_dms > 0 || self.total_mentions > 0 || self.total_channels > 0
    }
}
