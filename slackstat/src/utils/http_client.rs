use std::sync::OnceLock;

use tracing::{debug, warn};

/// User agent sent with every API request.
pub const USER_AGENT: &str = concat!("slackstat/", env!("CARGO_PKG_VERSION"));

pub fn install_rustls_provider() {
    static PROVIDER_INSTALLED: OnceLock<()> = OnceLock::new();
    PROVIDER_INSTALLED.get_or_init(|| {
        if let Err(e) = rustls::crypto::aws_lc_rs::default_provider().install_default() {
            // Can happen if another crate installed it first.
            debug!(existing_provider = ?e, "rustls CryptoProvider already installed");
        }
    });
}

/// Build the shared `reqwest::Client` used by every `SlackClient`.
///
/// Falls back to reqwest defaults if the configured builder fails.
pub fn build_http_client() -> reqwest::Client {
    install_rustls_provider();

    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .unwrap_or_else(|error| {
            warn!(error = %error, "Failed to create configured HTTP client; using defaults");
            reqwest::Client::new()
        })
}
