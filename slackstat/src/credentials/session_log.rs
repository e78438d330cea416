//! `xoxc-` token discovery in the client's Local Storage LevelDB files.
//!
//! LevelDB tables and logs are scanned as raw bytes; no LevelDB parsing is
//! needed because tokens are stored as plain ASCII runs.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::error::ExtractionError;
use crate::utils::fs::modified_or_epoch;

pub const TOKEN_MARKER: &[u8] = b"xoxc-";

/// Real tokens are 80-120+ chars; shorter runs are fragments.
pub const MIN_TOKEN_LEN: usize = 51;

const SCANNED_EXTENSIONS: [&str; 2] = ["ldb", "log"];

#[inline]
fn is_token_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'_'
}

/// Every distinct token in `data`, in first-seen order.
///
/// After each marker the longest run of token bytes is consumed; runs of 50
/// chars or fewer are dropped. Scanning resumes after the consumed run.
pub fn scan_tokens(data: &[u8]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while let Some(offset) = find(&data[pos..], TOKEN_MARKER) {
        let start = pos + offset;
        let end = data[start + TOKEN_MARKER.len()..]
            .iter()
            .position(|&b| !is_token_byte(b))
            .map_or(data.len(), |n| start + TOKEN_MARKER.len() + n);

        if end - start >= MIN_TOKEN_LEN {
            // Token bytes are ASCII, so this cannot fail.
            if let Ok(token) = std::str::from_utf8(&data[start..end]) {
                if seen.insert(token) {
                    tokens.push(token.to_string());
                }
            }
        }
        pos = end;
    }

    tokens
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// `*.ldb` and `*.log` files in `dir`, newest first.
pub fn list_session_files(dir: &Path) -> Result<Vec<PathBuf>, ExtractionError> {
    let entries = std::fs::read_dir(dir).map_err(|_| ExtractionError::NotInstalled)?;

    let mut files: Vec<(std::time::SystemTime, PathBuf)> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| SCANNED_EXTENSIONS.contains(&ext))
        })
        .map(|path| (modified_or_epoch(&path), path))
        .collect();

    files.sort_by(|a, b| b.0.cmp(&a.0));
    Ok(files.into_iter().map(|(_, path)| path).collect())
}

/// Scan every session file in `dir`, newest first, deduplicating across files.
pub fn scan_directory(dir: &Path) -> Result<Vec<String>, ExtractionError> {
    let files = list_session_files(dir)?;
    let mut seen = HashSet::new();
    let mut tokens = Vec::new();

    for file in &files {
        let data = match std::fs::read(file) {
            Ok(data) => data,
            Err(e) => {
                warn!(path = %file.display(), error = %e, "Skipping unreadable session file");
                continue;
            }
        };
        for token in scan_tokens(&data) {
            if seen.insert(token.clone()) {
                tokens.push(token);
            }
        }
    }

    debug!(files = files.len(), tokens = tokens.len(), "Scanned session log");
    Ok(tokens)
}
