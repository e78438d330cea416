use std::time::Duration;

use thiserror::Error;

/// Error codes Slack returns when the token/cookie pair is no longer accepted.
const AUTH_ERROR_CODES: &[&str] = &["not_authed", "invalid_auth", "token_revoked"];

const ENTERPRISE_RESTRICTED: &str = "enterprise_is_restricted";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("authentication failed")]
    Auth,
    #[error("rate limited, retry after {}s", retry_after.as_secs())]
    RateLimited { retry_after: Duration },
    #[error("API restricted on enterprise workspace")]
    EnterpriseRestricted,
    #[error("Slack API error: {0}")]
    Api(String),
    #[error("HTTP error {0}")]
    Http(u16),
    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    /// The request could not be assembled locally, e.g. a credential that is
    /// not a valid header value.
    #[error("invalid request: {0}")]
    Request(String),
}

impl ApiError {
    /// Map an `error` code from an `ok: false` response body.
    pub fn from_error_code(code: &str) -> Self {
        if AUTH_ERROR_CODES.contains(&code) {
            Self::Auth
        } else if code == ENTERPRISE_RESTRICTED {
            Self::EnterpriseRestricted
        } else {
            Self::Api(code.to_string())
        }
    }

    /// The token or cookie was rejected; fresh credentials are required.
    #[inline]
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth)
    }

    #[inline]
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    /// The request never produced an HTTP response (DNS, connect, TLS, reset).
    #[inline]
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}
