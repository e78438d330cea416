//! # slack-api
//!
//! Minimal typed client for the Slack web API endpoints needed to track
//! unread conversations: `auth.test`, `client.counts`, `conversations.info`,
//! `users.info`, `users.prefs.get`, `client.userBoot` and
//! `users.channelSections.list`.
//!
//! Requests authenticate with a desktop session pair (an `xoxc-` token plus
//! the `d` cookie) and are sent as form-encoded `POST`s.

pub mod client;
pub mod error;
pub mod models;

pub use client::{DEFAULT_RETRY_AFTER, SlackApi, SlackClient, parse_response};
pub use error::ApiError;
pub use models::{
    AuthTestResponse, ChannelBadges, ChannelSection, ClientCountsResponse, ConversationCount,
    ConversationInfo, ThreadCount, UserInfo, UserPrefs, UserProfile, parse_slack_ts,
};
