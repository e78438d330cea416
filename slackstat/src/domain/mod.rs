//! Domain layer for slackstat.
//!
//! Conversations surfaced by polling, their aggregate counts, connection
//! health and the one-line summary.

pub mod conversation;
pub mod status;
pub mod summary;

pub use conversation::{AggregatedCounts, ConversationItem, ConversationKind, sort_by_latest};
pub use status::ConnectionStatus;
pub use summary::{format_relative, format_summary};
