//! Core credential types.

use serde::{Deserialize, Serialize};

use super::error::ExtractionError;

/// Workspace icon URLs from `root-state.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceIcon {
    #[serde(default)]
    pub image_34: Option<String>,
    #[serde(default)]
    pub image_44: Option<String>,
    #[serde(default)]
    pub image_68: Option<String>,
}

impl WorkspaceIcon {
    /// Preferred icon: 44px, then 34px, then 68px.
    pub fn best_url(&self) -> Option<&str> {
        self.image_44
            .as_deref()
            .or(self.image_34.as_deref())
            .or(self.image_68.as_deref())
    }
}

/// A workspace the desktop client is signed into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceMetadata {
    pub id: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub icon: Option<WorkspaceIcon>,
    #[serde(default)]
    pub order: Option<i64>,
}

impl WorkspaceMetadata {
    /// Sort key; a missing `order` counts as 0.
    #[inline]
    pub fn sort_order(&self) -> i64 {
        self.order.unwrap_or(0)
    }
}

/// Session credentials for the Slack web API.
///
/// The token and cookie are process-lifetime secrets: never persisted and
/// redacted from `Debug` output.
#[derive(Clone)]
pub struct Credentials {
    token: String,
    cookie: String,
    /// Active workspace (lowest `order`), if any were discovered.
    pub workspace: Option<WorkspaceMetadata>,
    /// Every discovered workspace, sorted by `order`.
    pub workspaces: Vec<WorkspaceMetadata>,
}

impl Credentials {
    /// Build credentials; both secrets must be non-empty.
    pub fn new(
        token: impl Into<String>,
        cookie: impl Into<String>,
        workspaces: Vec<WorkspaceMetadata>,
    ) -> Result<Self, ExtractionError> {
        let token = token.into();
        let cookie = cookie.into();
        if token.is_empty() {
            return Err(ExtractionError::NoTokenFound);
        }
        if cookie.is_empty() {
            return Err(ExtractionError::cookie("Empty cookie value"));
        }

        Ok(Self {
            token,
            cookie,
            workspace: workspaces.first().cloned(),
            workspaces,
        })
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn cookie(&self) -> &str {
        &self.cookie
    }

    /// Domain of the active workspace, used to build the API base URL.
    pub fn domain(&self) -> Option<&str> {
        self.workspace
            .as_ref()
            .map(|w| w.domain.as_str())
            .filter(|d| !d.is_empty())
    }

    /// Team id of the active workspace.
    pub fn team_id(&self) -> Option<&str> {
        self.workspace.as_ref().map(|w| w.id.as_str())
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &mask_secret(&self.token))
            .field("cookie", &mask_secret(&self.cookie))
            .field("workspace", &self.workspace.as_ref().map(|w| &w.id))
            .field("workspaces", &self.workspaces.len())
            .finish()
    }
}

/// Keep the 5-char type prefix (`xoxc-`/`xoxd-`) and the last 4 chars.
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 12 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..5].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}
