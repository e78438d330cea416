//! Monitor events for the presentation layer.
//!
//! Events are emitted by the [`UnreadMonitor`](super::UnreadMonitor) after
//! every state change; consumers read the full state from the snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::domain::{AggregatedCounts, ConnectionStatus};

/// Events emitted by the unread monitor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MonitorEvent {
    /// A poll cycle succeeded and the item list was replaced.
    Updated {
        item_count: usize,
        aggregated: AggregatedCounts,
        timestamp: DateTime<Utc>,
    },
    /// Connection status changed.
    StatusChanged {
        old_status: ConnectionStatus,
        new_status: ConnectionStatus,
        timestamp: DateTime<Utc>,
    },
    /// Sidebar sections were refreshed.
    SectionsUpdated {
        section_count: usize,
        timestamp: DateTime<Utc>,
    },
}

impl MonitorEvent {
    /// Get a human-readable description of the event.
    pub fn description(&self) -> String {
        match self {
            MonitorEvent::Updated { item_count, .. } => {
                format!("{} unread conversation(s)", item_count)
            }
            MonitorEvent::StatusChanged {
                old_status,
                new_status,
                ..
            } => format!("status: {} -> {}", old_status, new_status),
            MonitorEvent::SectionsUpdated { section_count, .. } => {
                format!("{} sidebar section(s)", section_count)
            }
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            MonitorEvent::Updated { timestamp, .. }
            | MonitorEvent::StatusChanged { timestamp, .. }
            | MonitorEvent::SectionsUpdated { timestamp, .. } => *timestamp,
        }
    }
}

/// Broadcaster for monitor events.
#[derive(Clone)]
pub struct MonitorEventBroadcaster {
    sender: broadcast::Sender<MonitorEvent>,
}

impl MonitorEventBroadcaster {
    /// Create a new broadcaster with default capacity (64).
    pub fn new() -> Self {
        Self::with_capacity(64)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.sender.subscribe()
    }

    /// Publish an event. Having no subscribers is not an error.
    pub fn publish(&self, event: MonitorEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for MonitorEventBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_description() {
        let event = MonitorEvent::StatusChanged {
            old_status: ConnectionStatus::Reconnecting,
            new_status: ConnectionStatus::Connected,
            timestamp: Utc::now(),
        };
        assert_eq!(event.description(), "status: reconnecting -> connected");
    }

    #[tokio::test]
    async fn test_publish_and_subscribe() {
        let broadcaster = MonitorEventBroadcaster::new();
        assert_eq!(
            broadcaster.publish(MonitorEvent::SectionsUpdated {
                section_count: 1,
                timestamp: Utc::now(),
            }),
            0
        );

        let mut rx = broadcaster.subscribe();
        assert_eq!(broadcaster.subscriber_count(), 1);

        broadcaster.publish(MonitorEvent::Updated {
            item_count: 3,
            aggregated: AggregatedCounts::default(),
            timestamp: Utc::now(),
        });

        match rx.recv().await.unwrap() {
            MonitorEvent::Updated { item_count, .. } => assert_eq!(item_count, 3),
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
