//! User configuration.
//!
//! Stored as camelCase JSON at `~/.config/slackstat/config.json`. Values are
//! layered: file, then environment (`SLACKSTAT_*`), then CLI flags.

use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{Error, Result};

pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;
pub const MIN_POLL_INTERVAL_SECS: u64 = 10;
pub const MAX_POLL_INTERVAL_SECS: u64 = 120;

/// Section refresh cadence; not configurable.
pub const SECTION_REFRESH_INTERVAL: Duration = Duration::from_secs(300);

pub const ENV_POLL_INTERVAL: &str = "SLACKSTAT_POLL_INTERVAL";
pub const ENV_SLACK_DIR: &str = "SLACKSTAT_SLACK_DIR";

const CONFIG_FILE_NAME: &str = "config.json";

/// A config value that was ignored while loading.
///
/// Config is resolved before logging exists, so these are collected and
/// logged by the caller once a subscriber is installed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    /// File path or environment variable the bad value came from.
    pub source: String,
    pub message: String,
}

impl ConfigWarning {
    fn new(source: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            message: message.into(),
        }
    }

    pub fn log(&self) {
        warn!(source = %self.source, "{}", self.message);
    }
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.source, self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    /// Seconds between unread polls, clamped to 10..=120.
    pub poll_interval_seconds: u64,
    /// Override for the desktop client's data directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slack_data_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_filter: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            poll_interval_seconds: DEFAULT_POLL_INTERVAL_SECS,
            slack_data_dir: None,
            log_dir: None,
            log_filter: None,
        }
    }
}

impl AppConfig {
    /// Clamp out-of-range values in place.
    pub fn normalize(mut self) -> Self {
        self.poll_interval_seconds = clamp_poll_interval(self.poll_interval_seconds);
        self
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(clamp_poll_interval(self.poll_interval_seconds))
    }

    /// Apply `SLACKSTAT_*` overrides looked up through `lookup`.
    pub fn apply_env_with<F>(mut self, lookup: F, warnings: &mut Vec<ConfigWarning>) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_POLL_INTERVAL) {
            match raw.trim().parse::<u64>() {
                Ok(secs) => self.poll_interval_seconds = secs,
                Err(e) => warnings.push(ConfigWarning::new(
                    ENV_POLL_INTERVAL,
                    format!("ignoring invalid value {raw:?}: {e}"),
                )),
            }
        }
        if let Some(dir) = lookup(ENV_SLACK_DIR).filter(|d| !d.trim().is_empty()) {
            self.slack_data_dir = Some(PathBuf::from(dir));
        }
        self.normalize()
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(self, warnings: &mut Vec<ConfigWarning>) -> Self {
        self.apply_env_with(|key| std::env::var(key).ok(), warnings)
    }
}

pub fn clamp_poll_interval(secs: u64) -> u64 {
    secs.clamp(MIN_POLL_INTERVAL_SECS, MAX_POLL_INTERVAL_SECS)
}

/// Loads and saves [`AppConfig`].
#[derive(Debug, Clone)]
pub struct ConfigManager {
    path: PathBuf,
}

impl ConfigManager {
    /// Manager for `config.json` inside `dir`, or the default directory.
    pub fn new(dir: Option<&Path>) -> Self {
        let dir = dir.map(Path::to_path_buf).unwrap_or_else(default_config_dir);
        Self {
            path: dir.join(CONFIG_FILE_NAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the config; missing or unreadable files yield defaults.
    pub fn load(&self, warnings: &mut Vec<ConfigWarning>) -> AppConfig {
        let source = self.path.display().to_string();
        let data = match std::fs::read(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return AppConfig::default(),
            Err(e) => {
                warnings.push(ConfigWarning::new(
                    source,
                    format!("failed to read config, using defaults: {e}"),
                ));
                return AppConfig::default();
            }
        };

        match serde_json::from_slice::<AppConfig>(&data) {
            Ok(config) => config.normalize(),
            Err(e) => {
                warnings.push(ConfigWarning::new(
                    source,
                    format!("failed to parse config, using defaults: {e}"),
                ));
                AppConfig::default()
            }
        }
    }

    /// Write the config atomically (temp file in the same directory, then rename).
    pub fn save(&self, config: &AppConfig) -> Result<()> {
        let dir = self
            .path
            .parent()
            .ok_or_else(|| Error::config("config path has no parent directory"))?;
        crate::utils::fs::ensure_dir_all_sync_with_op("creating config directory", dir)?;

        let json = serde_json::to_vec_pretty(config)?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)
            .map_err(|e| Error::io_path("creating temp config in", dir, e))?;
        tmp.write_all(&json)
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| Error::io_path("writing", tmp.path(), e))?;
        tmp.persist(&self.path)
            .map_err(|e| Error::io_path("replacing", &self.path, e.error))?;

        debug!(path = %self.path.display(), "Saved config");
        Ok(())
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new(None)
    }
}

/// `~/.config/slackstat`, or `./.slackstat` without a home directory.
pub fn default_config_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".config").join("slackstat"))
        .unwrap_or_else(|| PathBuf::from(".slackstat"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.poll_interval_seconds, 30);
        assert_eq!(config.poll_interval(), Duration::from_secs(30));
    }

    #[test]
    fn test_poll_interval_clamped() {
        assert_eq!(clamp_poll_interval(1), 10);
        assert_eq!(clamp_poll_interval(45), 45);
        assert_eq!(clamp_poll_interval(3600), 120);
    }

    #[test]
    fn test_camel_case_round_trip() {
        let json = r#"{"pollIntervalSeconds": 60}"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.poll_interval_seconds, 60);
        assert!(config.slack_data_dir.is_none());

        let out = serde_json::to_string(&config).unwrap();
        assert_eq!(out, r#"{"pollIntervalSeconds":60}"#);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> =
            HashMap::from([(ENV_POLL_INTERVAL, "5"), (ENV_SLACK_DIR, "/opt/Slack")]);
        let mut warnings = Vec::new();
        let config = AppConfig::default()
            .apply_env_with(|k| env.get(k).map(|v| v.to_string()), &mut warnings);

        assert_eq!(config.poll_interval_seconds, 10);
        assert_eq!(config.slack_data_dir, Some(PathBuf::from("/opt/Slack")));
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_invalid_env_interval_ignored() {
        let mut warnings = Vec::new();
        let config = AppConfig::default().apply_env_with(
            |k| (k == ENV_POLL_INTERVAL).then(|| "soon".to_string()),
            &mut warnings,
        );
        assert_eq!(config.poll_interval_seconds, 30);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].source, ENV_POLL_INTERVAL);
        assert!(warnings[0].message.contains("\"soon\""));
    }

    #[test]
    fn test_load_missing_returns_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ConfigManager::new(Some(dir.path()));
        let mut warnings = Vec::new();
        assert_eq!(manager.load(&mut warnings), AppConfig::default());
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_load_corrupt_returns_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.json"), "{ nope").unwrap();
        let manager = ConfigManager::new(Some(dir.path()));
        let mut warnings = Vec::new();
        assert_eq!(manager.load(&mut warnings), AppConfig::default());
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].source.ends_with("config.json"));
        assert!(warnings[0].to_string().contains("failed to parse config"));
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ConfigManager::new(Some(&dir.path().join("nested")));
        let config = AppConfig {
            poll_interval_seconds: 90,
            log_filter: Some("slackstat=debug".into()),
            ..Default::default()
        };

        manager.save(&config).unwrap();
        assert_eq!(manager.load(&mut Vec::new()), config);
    }

    #[test]
    fn test_load_clamps_file_value() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.json"),
            r#"{"pollIntervalSeconds": 1000}"#,
        )
        .unwrap();
        let config = ConfigManager::new(Some(dir.path())).load(&mut Vec::new());
        assert_eq!(config.poll_interval_seconds, 120);
    }
}
