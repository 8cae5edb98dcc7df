//! Log file retention
//!
//! Removes Pomodesk log files whose last write is older than the retention
//! period. Files that do not look like our logs are never touched.

use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime};

use anyhow::{Context, Result};

use super::file_writer::{LOG_FILE_EXTENSION, LOG_FILE_PREFIX};

/// Clean up log files older than `retention_days`
///
/// Returns the number of files deleted.
pub fn cleanup_old_logs_with_retention(logs_dir: &Path, retention_days: u64) -> Result<usize> {
    if !logs_dir.exists() {
        return Ok(0);
    }

    let cutoff = SystemTime::now()
        .checked_sub(Duration::from_secs(retention_days.saturating_mul(24 * 60 * 60)))
        .unwrap_or(SystemTime::UNIX_EPOCH);

    let entries = fs::read_dir(logs_dir).context("Failed to read logs directory")?;

    let expired = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| is_log_file(&entry.path()))
        .filter(|entry| {
            entry
                .metadata()
                .and_then(|m| m.modified())
                .map(|modified| modified < cutoff)
                .unwrap_or(false)
        });

    let mut deleted = 0;
    for entry in expired {
        match fs::remove_file(entry.path()) {
            Ok(()) => deleted += 1,
            Err(e) => tracing::debug!("Could not remove {}: {}", entry.path().display(), e),
        }
    }

    Ok(deleted)
}

fn is_log_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|name| name.starts_with(LOG_FILE_PREFIX) && name.ends_with(LOG_FILE_EXTENSION))
        .unwrap_or(false)
}
