//! Logging setup with daily rolling log files.
//!
//! Console output goes to stderr since stdout carries command output. Log
//! files older than seven days are removed by a background task, and
//! timestamps use the local timezone.

use chrono::{Local, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::Writer, time::FormatTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::utils::fs;

/// Default log filter directive.
pub const DEFAULT_LOG_FILTER: &str = "slackstat=info,slack_api=info,sqlx=warn";

/// Prefix of the daily log files (`slackstat.log.YYYY-MM-DD`).
pub const LOG_FILE_PREFIX: &str = "slackstat.log";

/// Log retention period in days.
const LOG_RETENTION_DAYS: i64 = 7;

/// Timer that formats timestamps in the local timezone via chrono.
#[derive(Debug, Clone, Copy)]
struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        let now = Local::now();
        write!(w, "{}", now.format("%Y-%m-%dT%H:%M:%S%.3f%:z"))
    }
}

/// Handle to the installed subscriber.
pub struct LoggingConfig {
    log_dir: PathBuf,
}

impl LoggingConfig {
    /// Start the log retention cleanup task.
    ///
    /// Runs once at startup and then daily.
    pub fn start_retention_cleanup(self: &Arc<Self>, cancel_token: CancellationToken) {
        let log_dir = self.log_dir.clone();

        tokio::spawn(async move {
            let cleanup_interval = Duration::from_secs(24 * 60 * 60);
            let mut interval = tokio::time::interval(cleanup_interval);

            loop {
                tokio::select! {
                    _ = cancel_token.cancelled() => {
                        debug!("Log retention cleanup task shutting down");
                        break;
                    }
                    _ = interval.tick() => {
                        if let Err(e) = cleanup_old_logs(&log_dir, LOG_RETENTION_DAYS).await {
                            warn!(error = %e, "Failed to cleanup old logs");
                        }
                    }
                }
            }
        });
    }
}

/// Delete log files older than the specified number of days.
async fn cleanup_old_logs(log_dir: &Path, retention_days: i64) -> std::io::Result<usize> {
    let cutoff_ts = (Utc::now() - chrono::Duration::days(retention_days)).timestamp();
    let prefix = format!("{LOG_FILE_PREFIX}.");

    let mut entries = tokio::fs::read_dir(log_dir).await?;
    let mut deleted_count = 0;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let Some(date_str) = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|name| name.strip_prefix(&prefix))
        else {
            continue;
        };

        let Ok(file_date) = chrono::NaiveDate::parse_from_str(date_str, "%Y-%m-%d") else {
            continue;
        };
        let file_ts = file_date
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc().timestamp())
            .unwrap_or(0);

        if file_ts < cutoff_ts {
            if let Err(e) = tokio::fs::remove_file(&path).await {
                warn!(path = %path.display(), error = %e, "Failed to delete old log file");
            } else {
                deleted_count += 1;
                debug!(path = %path.display(), "Deleted old log file");
            }
        }
    }

    if deleted_count > 0 {
        info!(count = deleted_count, "Cleaned up old log files");
    }

    Ok(deleted_count)
}

/// Default log directory: `<data dir>/slackstat/logs`, or `./logs`.
pub fn default_log_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("slackstat").join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"))
}

/// First directive that parses: `env`, then `filter_override`, then
/// [`DEFAULT_LOG_FILTER`].
fn filter_directive<'a>(env: Option<&'a str>, filter_override: Option<&'a str>) -> &'a str {
    [env, filter_override]
        .into_iter()
        .flatten()
        .find(|directive| EnvFilter::try_new(directive).is_ok())
        .unwrap_or(DEFAULT_LOG_FILTER)
}

/// Initialize logging.
///
/// The filter comes from `RUST_LOG`, then `filter_override`, then
/// [`DEFAULT_LOG_FILTER`]. Keep the returned guard alive for the app lifetime.
pub fn init_logging(
    log_dir: &Path,
    filter_override: Option<&str>,
) -> crate::Result<(Arc<LoggingConfig>, WorkerGuard)> {
    let log_path = log_dir.to_path_buf();
    fs::ensure_dir_all_sync_with_op("creating log directory", &log_path)?;

    let file_appender = tracing_appender::rolling::daily(&log_path, LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_directive = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = EnvFilter::new(filter_directive(env_directive.as_deref(), filter_override));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true)
                .with_timer(LocalTimer),
        )
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_timer(LocalTimer),
        )
        .try_init()
        .map_err(|e| {
            crate::Error::Other(format!("Failed to set global default subscriber: {}", e))
        })?;

    let config = Arc::new(LoggingConfig { log_dir: log_path });

    Ok((config, guard))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter() {
        assert!(DEFAULT_LOG_FILTER.contains("slackstat=info"));
        assert!(DEFAULT_LOG_FILTER.contains("slack_api=info"));
        assert!(DEFAULT_LOG_FILTER.contains("sqlx=warn"));
    }

    #[test]
    fn test_filter_directive_precedence() {
        assert_eq!(
            filter_directive(Some("slackstat=trace"), Some("slackstat=debug")),
            "slackstat=trace"
        );
        assert_eq!(filter_directive(None, Some("slackstat=debug")), "slackstat=debug");
        assert_eq!(
            filter_directive(Some("slackstat=loud"), Some("slackstat=debug")),
            "slackstat=debug"
        );
        assert_eq!(filter_directive(None, Some("slack_api=nope")), DEFAULT_LOG_FILTER);
        assert_eq!(filter_directive(None, None), DEFAULT_LOG_FILTER);
    }

    #[tokio::test]
    async fn test_cleanup_old_logs_keeps_recent_and_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        let today = Local::now().format("%Y-%m-%d").to_string();

        let old = dir.path().join(format!("{LOG_FILE_PREFIX}.2001-01-01"));
        let recent = dir.path().join(format!("{LOG_FILE_PREFIX}.{today}"));
        let foreign = dir.path().join("notes.txt");
        for path in [&old, &recent, &foreign] {
            std::fs::write(path, "x").unwrap();
        }

        let deleted = cleanup_old_logs(dir.path(), LOG_RETENTION_DAYS).await.unwrap();

        assert_eq!(deleted, 1);
        assert!(!old.exists());
        assert!(recent.exists());
        assert!(foreign.exists());
    }
}
