//! slackstat library crate.
//!
//! Tracks unread Slack conversations by reusing the desktop client's
//! session: credentials are recovered from local storage, unread counts are
//! polled from the web API and summarized per category.

pub mod config;
pub mod credentials;
pub mod deeplink;
pub mod domain;
pub mod error;
pub mod logging;
pub mod monitor;
pub mod output;
pub mod panic_hook;
pub mod utils;

pub use error::{Error, Result};
