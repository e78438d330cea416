//! Unread monitor module.
//!
//! The monitor is responsible for:
//! - Establishing a session from extracted desktop credentials
//! - Polling unread counts and mute preferences
//! - Classifying conversations and resolving their names
//! - Grouping conversations by sidebar section
//! - Tracking connection health and emitting events

mod classify;
mod events;
#[cfg(test)]
pub(crate) mod fakes;
mod grouping;
mod names;
mod scheduler;
mod service;

pub use classify::classify;
pub use events::{MonitorEvent, MonitorEventBroadcaster};
pub use grouping::{
    CHANNELS_GROUP, DIRECT_MESSAGES_GROUP, GroupedSection, MENTIONS_GROUP, UNCATEGORIZED_GROUP,
    group_by_sections,
};
pub use names::{NameCache, NameEntry, NameResolver};
pub use scheduler::{IntervalTicker, ManualTicker, ManualTrigger, PollCycle, PollScheduler, Ticker};
pub use service::{ApiFactory, MonitorSnapshot, SlackApiFactory, UnreadMonitor};
