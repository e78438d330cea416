//! In-memory `SlackApi` and `CredentialExtractor` for monitor tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use slack_api::{
    ApiError, AuthTestResponse, ChannelSection, ClientCountsResponse, ConversationInfo, SlackApi,
    UserInfo, UserPrefs,
};
use tokio::sync::Notify;

use super::service::ApiFactory;
use crate::credentials::{CredentialExtractor, Credentials, ExtractionError, WorkspaceMetadata};

/// A real `reqwest::Error`, for the transport path.
pub fn transport_error() -> ApiError {
    crate::utils::http_client::install_rustls_provider();
    match reqwest::Client::new().get("not a url").build() {
        Err(e) => ApiError::Transport(e),
        Ok(_) => panic!("relative url unexpectedly accepted"),
    }
}

#[derive(Default)]
pub struct FakeSlackApi {
    /// Scripted `client.counts` results; an empty queue returns `default_counts`.
    pub counts: Mutex<VecDeque<Result<ClientCountsResponse, ApiError>>>,
    pub default_counts: Mutex<ClientCountsResponse>,
    pub prefs: Mutex<Option<UserPrefs>>,
    pub sections: Mutex<Option<Vec<ChannelSection>>>,
    /// When set, `sidebar_sections` waits for a permit before answering.
    pub sections_gate: Option<Arc<Notify>>,
    pub conversations: HashMap<String, ConversationInfo>,
    pub users: HashMap<String, UserInfo>,
    pub counts_calls: AtomicUsize,
    pub info_calls: AtomicUsize,
    pub user_calls: AtomicUsize,
    pub sections_calls: AtomicUsize,
}

impl FakeSlackApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_conversation(mut self, info: ConversationInfo) -> Self {
        self.conversations.insert(info.id.clone(), info);
        self
    }

    pub fn with_user(mut self, user: UserInfo) -> Self {
        self.users.insert(user.id.clone(), user);
        self
    }

    pub fn with_counts(self, counts: ClientCountsResponse) -> Self {
        *self.default_counts.lock() = counts;
        self
    }

    pub fn with_prefs(self, prefs: UserPrefs) -> Self {
        *self.prefs.lock() = Some(prefs);
        self
    }

    pub fn with_sections(self, sections: Vec<ChannelSection>) -> Self {
        *self.sections.lock() = Some(sections);
        self
    }

    pub fn with_sections_gate(mut self, gate: Arc<Notify>) -> Self {
        self.sections_gate = Some(gate);
        self
    }

    pub fn push_counts(&self, result: Result<ClientCountsResponse, ApiError>) {
        self.counts.lock().push_back(result);
    }
}

#[async_trait]
impl SlackApi for FakeSlackApi {
    async fn auth_test(&self) -> Result<AuthTestResponse, ApiError> {
        Ok(AuthTestResponse::default())
    }

    async fn counts(&self) -> Result<ClientCountsResponse, ApiError> {
        self.counts_calls.fetch_add(1, Ordering::SeqCst);
        let scripted = self.counts.lock().pop_front();
        scripted.unwrap_or_else(|| Ok(self.default_counts.lock().clone()))
    }

    async fn conversation_info(&self, channel_id: &str) -> Result<ConversationInfo, ApiError> {
        self.info_calls.fetch_add(1, Ordering::SeqCst);
        self.conversations
            .get(channel_id)
            .cloned()
            .ok_or_else(|| ApiError::Api("channel_not_found".into()))
    }

    async fn user_info(&self, user_id: &str) -> Result<UserInfo, ApiError> {
        self.user_calls.fetch_add(1, Ordering::SeqCst);
        self.users
            .get(user_id)
            .cloned()
            .ok_or_else(|| ApiError::Api("user_not_found".into()))
    }

    async fn user_prefs(&self) -> Result<UserPrefs, ApiError> {
        self.prefs
            .lock()
            .clone()
            .ok_or_else(|| ApiError::Api("internal_error".into()))
    }

    async fn sidebar_sections(&self) -> Result<Vec<ChannelSection>, ApiError> {
        self.sections_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.sections_gate {
            gate.notified().await;
        }
        self.sections
            .lock()
            .clone()
            .ok_or_else(|| ApiError::Api("not_allowed".into()))
    }
}

/// Hands out the same fake API regardless of credentials.
pub struct FakeApiFactory {
    pub api: Arc<FakeSlackApi>,
    pub created: AtomicUsize,
}

impl FakeApiFactory {
    pub fn new(api: Arc<FakeSlackApi>) -> Self {
        Self {
            api,
            created: AtomicUsize::new(0),
        }
    }
}

impl ApiFactory for FakeApiFactory {
    fn create(&self, _credentials: &Credentials) -> Result<Arc<dyn SlackApi>, ApiError> {
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(self.api.clone())
    }
}

/// Returns fixed credentials, or an error while `fail` is set.
#[derive(Default)]
pub struct FakeExtractor {
    pub fail: Mutex<Option<ExtractionError>>,
    pub calls: AtomicUsize,
}

impl FakeExtractor {
    pub fn failing(error: ExtractionError) -> Self {
        Self {
            fail: Mutex::new(Some(error)),
            calls: AtomicUsize::new(0),
        }
    }
}

pub fn test_credentials() -> Credentials {
    Credentials::new(
        format!("xoxc-{}", "1".repeat(60)),
        "xoxd-abc%2FDEF%3D%3D",
        vec![WorkspaceMetadata {
            id: "T1".into(),
            domain: "acme".into(),
            name: "Acme".into(),
            url: "https://acme.slack.com/".into(),
            icon: None,
            order: Some(0),
        }],
    )
    .expect("valid test credentials")
}

#[async_trait]
impl CredentialExtractor for FakeExtractor {
    async fn extract(&self) -> Result<Credentials, ExtractionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.fail.lock().take() {
            Some(e) => Err(e),
            None => Ok(test_credentials()),
        }
    }
}
