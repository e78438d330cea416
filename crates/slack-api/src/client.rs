//! HTTP client for the Slack web API.
//!
//! Every call is a form-encoded `POST` to `<base>/<method>` authenticated with
//! both the bearer token and the `d` session cookie. The client itself is
//! cheap and stateless; the underlying `reqwest::Client` is meant to be shared.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, COOKIE, RETRY_AFTER};
use reqwest::{Client, Request};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::error::ApiError;
use crate::models::{
    AuthTestResponse, ChannelSection, ChannelSectionsResponse, ClientCountsResponse,
    ConversationInfo, ConversationInfoResponse, ResponseEnvelope, UserInfo, UserInfoResponse,
    UserPrefs, UserPrefsResponse,
};

/// Used when a 429 response carries no usable `Retry-After` header.
pub const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(30);

const GLOBAL_BASE_URL: &str = "https://slack.com/api/";

/// The subset of the Slack API the unread tracker consumes.
#[async_trait]
pub trait SlackApi: Send + Sync {
    async fn auth_test(&self) -> Result<AuthTestResponse, ApiError>;

    async fn counts(&self) -> Result<ClientCountsResponse, ApiError>;

    async fn conversation_info(&self, channel_id: &str) -> Result<ConversationInfo, ApiError>;

    async fn user_info(&self, user_id: &str) -> Result<UserInfo, ApiError>;

    async fn user_prefs(&self) -> Result<UserPrefs, ApiError>;

    /// Sidebar sections, from `client.userBoot` with a fallback to
    /// `users.channelSections.list`.
    async fn sidebar_sections(&self) -> Result<Vec<ChannelSection>, ApiError>;
}

#[derive(Clone)]
pub struct SlackClient {
    http: Client,
    token: String,
    cookie: String,
    base_url: Url,
    team_id: Option<String>,
}

impl std::fmt::Debug for SlackClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackClient")
            .field("base_url", &self.base_url.as_str())
            .field("team_id", &self.team_id)
            .finish_non_exhaustive()
    }
}

impl SlackClient {
    /// Create a client for `https://<domain>.slack.com/api/`, or the global
    /// `https://slack.com/api/` endpoint when no domain is known.
    pub fn new(
        http: Client,
        token: impl Into<String>,
        cookie: impl Into<String>,
        domain: Option<&str>,
    ) -> Result<Self, ApiError> {
        let base = match domain.map(str::trim).filter(|d| !d.is_empty()) {
            Some(domain) => format!("https://{domain}.slack.com/api/"),
            None => GLOBAL_BASE_URL.to_string(),
        };
        Self::with_base_url(http, token, cookie, &base)
    }

    /// Create a client against an arbitrary API root.
    pub fn with_base_url(
        http: Client,
        token: impl Into<String>,
        cookie: impl Into<String>,
        base_url: &str,
    ) -> Result<Self, ApiError> {
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };
        let base_url =
            Url::parse(&normalized).map_err(|e| ApiError::InvalidUrl(format!("{base_url}: {e}")))?;

        Ok(Self {
            http,
            token: token.into(),
            cookie: cookie.into(),
            base_url,
            team_id: None,
        })
    }

    /// Scope every request to a team (sent as `team_id`).
    pub fn with_team_id(mut self, team_id: impl Into<String>) -> Self {
        self.team_id = Some(team_id.into());
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn method_url(&self, method: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(method)
            .map_err(|e| ApiError::InvalidUrl(format!("{method}: {e}")))
    }

    /// Build the `POST` for `method`. The form always carries `token`, plus
    /// `team_id` when the client is team-scoped.
    pub fn build_request(&self, method: &str, params: &[(&str, &str)]) -> Result<Request, ApiError> {
        let url = self.method_url(method)?;

        let mut form: Vec<(&str, &str)> = Vec::with_capacity(params.len() + 2);
        form.extend_from_slice(params);
        if let Some(team_id) = self.team_id.as_deref() {
            form.push(("team_id", team_id));
        }
        form.push(("token", &self.token));

        let request = self
            .http
            .post(url)
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .header(COOKIE, format!("d={}", self.cookie))
            .form(&form)
            .build()
            .map_err(|e| ApiError::Request(format!("{method}: {e}")))?;
        Ok(request)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: &[(&str, &str)],
    ) -> Result<T, ApiError> {
        let request = self.build_request(method, params)?;
        let response = self.http.execute(request).await?;

        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_retry_after);
        let body = response.bytes().await?;

        debug!(method, status, bytes = body.len(), "Slack API response");
        parse_response(status, retry_after, &body)
    }

    async fn sections_from(&self, method: &str) -> Result<Vec<ChannelSection>, ApiError> {
        let response: ChannelSectionsResponse = self.call(method, &[]).await?;
        Ok(response.channel_sections)
    }
}

/// `Retry-After` in whole seconds; HTTP-date values are not supported.
fn parse_retry_after(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

/// Map a raw HTTP response to a typed result.
///
/// Status codes are checked before the body: 429 is a rate limit, 401 an auth
/// failure and any other non-200 a generic HTTP error. A 200 body with
/// `ok: false` is mapped through [`ApiError::from_error_code`].
pub fn parse_response<T: DeserializeOwned>(
    status: u16,
    retry_after: Option<Duration>,
    body: &[u8],
) -> Result<T, ApiError> {
    match status {
        429 => {
            return Err(ApiError::RateLimited {
                retry_after: retry_after.unwrap_or(DEFAULT_RETRY_AFTER),
            });
        }
        401 => return Err(ApiError::Auth),
        200 => {}
        other => return Err(ApiError::Http(other)),
    }

    let envelope: ResponseEnvelope = serde_json::from_slice(body)?;
    if !envelope.ok {
        let code = envelope.error.as_deref().unwrap_or("unknown");
        return Err(ApiError::from_error_code(code));
    }

    Ok(serde_json::from_slice(body)?)
}

#[async_trait]
impl SlackApi for SlackClient {
    #[instrument(skip(self))]
    async fn auth_test(&self) -> Result<AuthTestResponse, ApiError> {
        self.call("auth.test", &[]).await
    }

    #[instrument(skip(self))]
    async fn counts(&self) -> Result<ClientCountsResponse, ApiError> {
        self.call("client.counts", &[]).await
    }

    #[instrument(skip(self))]
    async fn conversation_info(&self, channel_id: &str) -> Result<ConversationInfo, ApiError> {
        let response: ConversationInfoResponse = self
            .call("conversations.info", &[("channel", channel_id)])
            .await?;
        Ok(response.channel)
    }

    #[instrument(skip(self))]
    async fn user_info(&self, user_id: &str) -> Result<UserInfo, ApiError> {
        let response: UserInfoResponse = self.call("users.info", &[("user", user_id)]).await?;
        Ok(response.user)
    }

    #[instrument(skip(self))]
    async fn user_prefs(&self) -> Result<UserPrefs, ApiError> {
        let response: UserPrefsResponse = self.call("users.prefs.get", &[]).await?;
        Ok(response.prefs.unwrap_or_default())
    }

    #[instrument(skip(self))]
    async fn sidebar_sections(&self) -> Result<Vec<ChannelSection>, ApiError> {
        match self.sections_from("client.userBoot").await {
            Ok(sections) if !sections.is_empty() => Ok(sections),
            Ok(_) => {
                debug!("client.userBoot returned no sections, trying users.channelSections.list");
                self.sections_from("users.channelSections.list").await
            }
            Err(e) if e.is_auth() || e.is_rate_limited() => Err(e),
            Err(e) => {
                warn!(error = %e, "client.userBoot failed, trying users.channelSections.list");
                self.sections_from("users.channelSections.list").await
            }
        }
    }
}
