//! Access to the "Slack Safe Storage" passphrase in the OS secret store.
//!
//! On macOS the passphrase lives in the login Keychain. It is read through the
//! `security` CLI rather than the Keychain API so unsigned binaries do not
//! trigger an authorization dialog.

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use tokio::sync::OnceCell;
use tracing::{debug, instrument};

use super::error::ExtractionError;

/// Keychain service name used by the desktop client.
pub const SAFE_STORAGE_SERVICE: &str = "Slack Safe Storage";

const SECURITY_BIN: &str = "/usr/bin/security";

/// `password: "value"` or `password: 0x<hex>  "value"`.
static PASSWORD_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"password: (?:0x([0-9A-Fa-f]+)\s+)?"(.*)""#).expect("valid password regex")
});

/// Source of the passphrase that protects the cookie store.
#[async_trait]
pub trait SecretProvider: Send + Sync {
    async fn passphrase(&self) -> Result<String, ExtractionError>;
}

#[async_trait]
impl<T: SecretProvider + ?Sized> SecretProvider for Arc<T> {
    async fn passphrase(&self) -> Result<String, ExtractionError> {
        (**self).passphrase().await
    }
}

/// Reads the passphrase with `security find-generic-password -g`.
#[derive(Debug, Clone)]
pub struct SecurityCliSecretProvider {
    service: String,
}

impl SecurityCliSecretProvider {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }
}

impl Default for SecurityCliSecretProvider {
    fn default() -> Self {
        Self::new(SAFE_STORAGE_SERVICE)
    }
}

#[async_trait]
impl SecretProvider for SecurityCliSecretProvider {
    #[instrument(skip(self), fields(service = %self.service))]
    async fn passphrase(&self) -> Result<String, ExtractionError> {
        let output = tokio::process::Command::new(SECURITY_BIN)
            .args(["find-generic-password", "-s", &self.service, "-g"])
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| ExtractionError::secret_store(format!("failed to run {SECURITY_BIN}: {e}")))?;

        // `-g` prints the password on stderr.
        let stderr = String::from_utf8_lossy(&output.stderr);
        debug!(status = ?output.status.code(), "security CLI finished");

        parse_security_output(&stderr).ok_or_else(|| {
            ExtractionError::secret_store(format!(
                "no password for service {:?} (exit status {:?})",
                self.service,
                output.status.code()
            ))
        })
    }
}

/// Extract the password from `security -g` stderr output.
///
/// The hex form is used when present because it carries the exact bytes.
pub fn parse_security_output(output: &str) -> Option<String> {
    let caps = PASSWORD_LINE.captures(output)?;

    if let Some(hex_value) = caps.get(1) {
        if let Some(decoded) = hex::decode(hex_value.as_str())
            .ok()
            .and_then(|bytes| String::from_utf8(bytes).ok())
        {
            return Some(decoded);
        }
    }

    caps.get(2)
        .map(|m| m.as_str().to_string())
        .filter(|p| !p.is_empty())
}

/// Fixed passphrase, for tests and explicit overrides.
#[derive(Clone)]
pub struct StaticSecretProvider {
    passphrase: Option<String>,
}

impl StaticSecretProvider {
    pub fn new(passphrase: impl Into<String>) -> Self {
        Self {
            passphrase: Some(passphrase.into()),
        }
    }

    /// A provider whose secret store has no entry.
    pub fn missing() -> Self {
        Self { passphrase: None }
    }
}

#[async_trait]
impl SecretProvider for StaticSecretProvider {
    async fn passphrase(&self) -> Result<String, ExtractionError> {
        self.passphrase
            .clone()
            .ok_or_else(|| ExtractionError::secret_store("no passphrase configured"))
    }
}

/// Memoizes the first successful lookup for the lifetime of the process.
///
/// Failures are not cached, so a denied prompt can be retried next cycle.
pub struct CachedSecretProvider<P> {
    inner: P,
    cached: OnceCell<String>,
}

impl<P: SecretProvider> CachedSecretProvider<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            cached: OnceCell::new(),
        }
    }

    pub fn is_cached(&self) -> bool {
        self.cached.initialized()
    }
}

#[async_trait]
impl<P: SecretProvider> SecretProvider for CachedSecretProvider<P> {
    async fn passphrase(&self) -> Result<String, ExtractionError> {
        self.cached
            .get_or_try_init(|| self.inner.passphrase())
            .await
            .cloned()
    }
}
