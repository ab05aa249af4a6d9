use std::fs;
use std::io;
use std::path::Path;
use std::time::{Duration, SystemTime};

/// Reads a retention window in hours from `var`, falling back to `default_hours`.
pub fn retention_from_env(var: &str, default_hours: u64) -> Duration {
    let hours = std::env::var(var)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(default_hours);
    retention_hours(hours)
}

/// Saturates instead of overflowing for absurd hour counts.
fn retention_hours(hours: u64) -> Duration {
    Duration::from_secs(hours.saturating_mul(3600))
}

/// Removes entries of `dir` last modified more than `max_age` ago.
///
/// A zero `max_age` disables cleanup. Entries that cannot be inspected or
/// removed are logged and skipped. Returns how many entries were removed.
pub fn cleanup_directory(dir: &Path, max_age: Duration) -> io::Result<usize> {
    if max_age.is_zero() {
        log::info!(
            "Skipping cleanup for {} because retention is disabled",
            dir.display()
        );
        return Ok(0);
    }

    let now = SystemTime::now();
    let mut removed = 0;
    for entry in fs::read_dir(dir)? {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                log::warn!("Failed to read entry in {}: {e}", dir.display());
                continue;
            }
        };
        let path = entry.path();
        match remove_if_expired(&path, now, max_age) {
            Ok(true) => removed += 1,
            Ok(false) => {}
            Err(e) => log::warn!("Failed to evaluate {} for cleanup: {e}", path.display()),
        }
    }

    if removed > 0 {
        log::info!("Cleaned {removed} old asset(s) from {}", dir.display());
    }
    Ok(removed)
}

fn remove_if_expired(path: &Path, now: SystemTime, max_age: Duration) -> io::Result<bool> {
    let meta = fs::metadata(path)?;
    let age = now
        .duration_since(meta.modified()?)
        .unwrap_or(Duration::ZERO);
    if age <= max_age {
        return Ok(false);
    }
    if meta.is_dir() {
        fs::remove_dir_all(path)?;
    } else {
        fs::remove_file(path)?;
    }
    Ok(true)
}
