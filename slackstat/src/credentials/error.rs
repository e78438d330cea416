//! Credential extraction error types.

use thiserror::Error;

/// Errors that can occur while extracting session credentials from the
/// desktop client's local storage.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The Slack data directory (or its Local Storage) does not exist.
    #[error("Slack desktop app not found")]
    NotInstalled,

    /// No `xoxc-` token was found in the session log.
    #[error("No xoxc token found in Slack storage")]
    NoTokenFound,

    /// The `d` cookie could not be read, decrypted or decoded.
    #[error("Cookie decryption failed: {0}")]
    CookieDecryptionFailed(String),

    /// The Safe Storage passphrase could not be read from the OS secret store.
    #[error("Cannot access Slack Safe Storage in Keychain: {0}")]
    SecretStoreAccessFailed(String),

    /// `root-state.json` exists but is not valid.
    #[error("Failed to parse Slack root-state.json: {0}")]
    WorkspaceParseFailed(String),
}

impl ExtractionError {
    pub fn cookie(msg: impl Into<String>) -> Self {
        Self::CookieDecryptionFailed(msg.into())
    }

    pub fn secret_store(msg: impl Into<String>) -> Self {
        Self::SecretStoreAccessFailed(msg.into())
    }

    /// Whether the failure means the desktop client is absent rather than
    /// misbehaving.
    pub fn is_not_installed(&self) -> bool {
        matches!(self, Self::NotInstalled)
    }
}
