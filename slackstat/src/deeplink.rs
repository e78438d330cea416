//! `slack://` deep links into the desktop client.

use tracing::{debug, warn};
use url::Url;

use crate::{Error, Result};

/// Link that focuses `channel_id` in workspace `team_id`.
pub fn channel_url(team_id: &str, channel_id: &str) -> Result<Url> {
    let mut url = parse("slack://channel")?;
    url.query_pairs_mut()
        .append_pair("team", team_id)
        .append_pair("id", channel_id);
    Ok(url)
}

/// Link that brings the client to the front on workspace `team_id`.
pub fn workspace_url(team_id: &str) -> Result<Url> {
    let mut url = parse("slack://open")?;
    url.query_pairs_mut().append_pair("team", team_id);
    Ok(url)
}

fn parse(base: &str) -> Result<Url> {
    Url::parse(base).map_err(|e| Error::Other(format!("invalid deep link {base}: {e}")))
}

#[cfg(target_os = "macos")]
const OPENER: &str = "open";
#[cfg(not(target_os = "macos"))]
const OPENER: &str = "xdg-open";

/// Hand `url` to the OS opener without waiting for it to finish.
pub fn open_url(url: &Url) -> Result<()> {
    match std::process::Command::new(OPENER)
        .arg(url.as_str())
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .spawn()
    {
        Ok(child) => {
            debug!(url = %url, pid = child.id(), "Launched deep link");
            Ok(())
        }
        Err(e) => {
            warn!(url = %url, opener = OPENER, error = %e, "Failed to launch deep link");
            Err(Error::Io(e))
        }
    }
}
