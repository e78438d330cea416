//! Point lookups in the desktop client's Chromium `Cookies` database.
//!
//! The live database is locked by the running client and may have
//! uncheckpointed WAL pages, so the file and its side files are copied into a
//! private temp directory and the copy is opened read-write. The temp
//! directory is removed when the lookup returns, on every path.

use std::path::{Path, PathBuf};

use sqlx::{ConnectOptions, Connection};
use sqlx::sqlite::SqliteConnectOptions;
use tracing::{debug, instrument};

use super::error::ExtractionError;

/// Name of the session cookie.
pub const SESSION_COOKIE_NAME: &str = "d";

/// Host the session cookie is scoped to.
pub const SESSION_COOKIE_HOST: &str = ".slack.com";

/// SQLite side files that must travel with the main database file.
const SIDE_FILE_SUFFIXES: [&str; 3] = ["-journal", "-wal", "-shm"];

const SELECT_ENCRYPTED_VALUE: &str =
    "SELECT encrypted_value FROM cookies WHERE name = ? AND host_key = ? LIMIT 1";

#[derive(Debug, Clone)]
pub struct CookieStore {
    path: PathBuf,
    /// Parent of the per-lookup temp directory; the system temp dir if unset.
    temp_root: Option<PathBuf>,
}

impl CookieStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            temp_root: None,
        }
    }

    pub fn with_temp_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_root = Some(dir.into());
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the encrypted session cookie blob.
    pub async fn read_session_cookie(&self) -> Result<Vec<u8>, ExtractionError> {
        self.read_encrypted_value(SESSION_COOKIE_NAME, SESSION_COOKIE_HOST)
            .await
    }

    /// Read `encrypted_value` for the cookie `name` on `host_key`.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub async fn read_encrypted_value(
        &self,
        name: &str,
        host_key: &str,
    ) -> Result<Vec<u8>, ExtractionError> {
        if !tokio::fs::try_exists(&self.path).await.unwrap_or(false) {
            return Err(ExtractionError::cookie(format!(
                "Cookies database not found at {}",
                self.path.display()
            )));
        }

        let mut builder = tempfile::Builder::new();
        builder.prefix("slackstat-cookies-");
        let temp_dir = match &self.temp_root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        }
        .map_err(|e| ExtractionError::cookie(format!("Failed to create temp dir: {e}")))?;
        let copy = self.copy_into(temp_dir.path()).await?;

        let result = query_blob(&copy, name, host_key).await;
        drop(temp_dir);
        result
    }

    /// Copy the database and whichever side files exist into `dir`.
    async fn copy_into(&self, dir: &Path) -> Result<PathBuf, ExtractionError> {
        let file_name = self
            .path
            .file_name()
            .ok_or_else(|| ExtractionError::cookie("Cookies path has no file name"))?;
        let target = dir.join(file_name);

        tokio::fs::copy(&self.path, &target)
            .await
            .map_err(|e| ExtractionError::cookie(format!("Failed to copy cookie database: {e}")))?;

        for suffix in SIDE_FILE_SUFFIXES {
            let mut side = self.path.clone().into_os_string();
            side.push(suffix);
            let side = PathBuf::from(side);
            if !tokio::fs::try_exists(&side).await.unwrap_or(false) {
                continue;
            }

            let mut side_target = target.clone().into_os_string();
            side_target.push(suffix);
            tokio::fs::copy(&side, PathBuf::from(side_target))
                .await
                .map_err(|e| {
                    ExtractionError::cookie(format!("Failed to copy {}: {e}", side.display()))
                })?;
            debug!(suffix, "Copied cookie database side file");
        }

        Ok(target)
    }
}

async fn query_blob(path: &Path, name: &str, host_key: &str) -> Result<Vec<u8>, ExtractionError> {
    let mut conn = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(false)
        .read_only(false)
        .connect()
        .await
        .map_err(|e| ExtractionError::cookie(format!("Cannot open Cookies database: {e}")))?;

    let row: Option<Vec<u8>> = sqlx::query_scalar(SELECT_ENCRYPTED_VALUE)
        .bind(name)
        .bind(host_key)
        .fetch_optional(&mut conn)
        .await
        .map_err(|e| ExtractionError::cookie(format!("Cookie query failed: {e}")))?;

    if let Err(e) = conn.close().await {
        debug!(error = %e, "Failed to close cookie database connection");
    }

    row.ok_or_else(|| ExtractionError::cookie(format!("No '{name}' cookie for {host_key}")))
}
