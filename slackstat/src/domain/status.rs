//! Connection health.

use serde::{Deserialize, Serialize};

/// Health of the link to the Slack API as seen by the poller.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", content = "message", rename_all = "snake_case")]
pub enum ConnectionStatus {
    /// Last cycle succeeded.
    Connected,
    /// Nothing fetched yet, or credentials were rejected and will be re-read.
    #[default]
    Reconnecting,
    /// A non-transient failure; the description is user-facing.
    Error(String),
    /// The network is unreachable.
    Offline,
}

impl ConnectionStatus {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connected => f.write_str("connected"),
            Self::Reconnecting => f.write_str("reconnecting"),
            Self::Error(msg) => write!(f, "error: {msg}"),
            Self::Offline => f.write_str("offline"),
        }
    }
}
