//! Session credential extraction from the Slack desktop client.
//!
//! The flow is:
//! 1. Locate the client's data directory
//! 2. Discover workspaces from `storage/root-state.json`
//! 3. Scan `Local Storage/leveldb` for `xoxc-` tokens
//! 4. Read the Safe Storage passphrase and derive the cookie key
//! 5. Decrypt the `d` cookie from the `Cookies` database

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};

use super::cookie_store::CookieStore;
use super::crypto::{decrypt_cookie_value, derive_key};
use super::error::ExtractionError;
use super::secret::{CachedSecretProvider, SecretProvider, SecurityCliSecretProvider};
use super::session_log::scan_directory;
use super::types::Credentials;
use super::workspace::load_workspaces;

/// Install locations relative to the home directory: direct download, then
/// the App Store sandbox container.
const DATA_DIR_CANDIDATES: [&str; 2] = [
    "Library/Application Support/Slack",
    "Library/Containers/com.tinyspeck.slackmacgap/Data/Library/Application Support/Slack",
];

/// Produces fresh session credentials.
#[async_trait]
pub trait CredentialExtractor: Send + Sync {
    async fn extract(&self) -> Result<Credentials, ExtractionError>;
}

/// Well-known paths inside the client's data directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlackPaths {
    data_dir: PathBuf,
}

impl SlackPaths {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Use `override_dir` if given, otherwise the first existing install
    /// location under the home directory.
    pub fn resolve(override_dir: Option<&Path>) -> Result<Self, ExtractionError> {
        if let Some(dir) = override_dir {
            return if dir.is_dir() {
                Ok(Self::new(dir))
            } else {
                Err(ExtractionError::NotInstalled)
            };
        }

        let home = dirs::home_dir().ok_or(ExtractionError::NotInstalled)?;
        DATA_DIR_CANDIDATES
            .iter()
            .map(|rel| home.join(rel))
            .find(|dir| dir.is_dir())
            .map(Self::new)
            .ok_or(ExtractionError::NotInstalled)
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn leveldb_dir(&self) -> PathBuf {
        self.data_dir.join("Local Storage").join("leveldb")
    }

    pub fn cookies_db(&self) -> PathBuf {
        self.data_dir.join("Cookies")
    }

    pub fn root_state(&self) -> PathBuf {
        self.data_dir.join("storage").join("root-state.json")
    }
}

/// Extracts credentials from the local desktop client install.
pub struct SlackCredentialExtractor {
    data_dir_override: Option<PathBuf>,
    secrets: Arc<dyn SecretProvider>,
}

impl SlackCredentialExtractor {
    pub fn new(data_dir_override: Option<PathBuf>, secrets: Arc<dyn SecretProvider>) -> Self {
        Self {
            data_dir_override,
            secrets,
        }
    }

    /// Production setup: Keychain via the `security` CLI, memoized for the
    /// process lifetime.
    pub fn with_keychain(data_dir_override: Option<PathBuf>) -> Self {
        Self::new(
            data_dir_override,
            Arc::new(CachedSecretProvider::new(SecurityCliSecretProvider::default())),
        )
    }
}

#[async_trait]
impl CredentialExtractor for SlackCredentialExtractor {
    #[instrument(skip(self))]
    async fn extract(&self) -> Result<Credentials, ExtractionError> {
        let paths = SlackPaths::resolve(self.data_dir_override.as_deref())?;
        let leveldb = paths.leveldb_dir();
        if !leveldb.is_dir() {
            return Err(ExtractionError::NotInstalled);
        }
        debug!(data_dir = %paths.data_dir().display(), "Using Slack data directory");

        let root_state = paths.root_state();
        let workspaces = tokio::task::spawn_blocking(move || load_workspaces(&root_state))
            .await
            .map_err(|e| ExtractionError::WorkspaceParseFailed(format!("task failed: {e}")))??;

        let tokens = tokio::task::spawn_blocking(move || scan_directory(&leveldb))
            .await
            .map_err(|e| {
                warn!(error = %e, "Session log scan task failed");
                ExtractionError::NoTokenFound
            })??;
        let token = tokens.into_iter().next().ok_or(ExtractionError::NoTokenFound)?;

        let passphrase = self.secrets.passphrase().await?;
        let blob = CookieStore::new(paths.cookies_db())
            .read_session_cookie()
            .await?;

        let cookie = tokio::task::spawn_blocking(move || {
            let key = derive_key(&passphrase);
            decrypt_cookie_value(&blob, &key)
        })
        .await
        .map_err(|e| ExtractionError::cookie(format!("decryption task failed: {e}")))??;

        let credentials = Credentials::new(token, cookie, workspaces)?;
        info!(
            workspaces = credentials.workspaces.len(),
            team_id = ?credentials.team_id(),
            "Extracted Slack session credentials"
        );
        Ok(credentials)
    }
}
