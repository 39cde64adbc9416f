//! Backup naming, hashing and retention

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};

/// Hex SHA-256 of some content
pub fn content_hash(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

/// `{stem}_{YYYYmmdd_HHMMSS}_{8-hex-hash}{ext}`
pub fn backup_file_name(original: &Path, hash: &str, at: DateTime<Utc>) -> String {
    let stem = original
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "file".to_string());
    let ext = original
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    format!(
        "{}_{}_{}{}",
        stem,
        at.format("%Y%m%d_%H%M%S"),
        &hash[..8.min(hash.len())],
        ext
    )
}

/// Remove session directories under `root` last modified before the retention
/// window, except `keep`. Returns the removed directories.
pub fn prune_sessions(root: &Path, retention: Duration, keep: &Path) -> Vec<PathBuf> {
    let cutoff = SystemTime::now()
        .checked_sub(retention)
        .unwrap_or(SystemTime::UNIX_EPOCH);

    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) => {
            debug!("Nothing to prune under {}: {}", root.display(), e);
            return Vec::new();
        }
    };

    let mut pruned = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if path == keep || !path.is_dir() {
            continue;
        }
        let modified = match entry.metadata().and_then(|m| m.modified()) {
            Ok(t) => t,
            Err(_) => continue,
        };
        if modified > cutoff {
            continue;
        }
        match fs::remove_dir_all(&path) {
            Ok(()) => {
                info!("Pruned expired backup session {}", path.display());
                pruned.push(path);
            }
            Err(e) => warn!("Failed to prune {}: {}", path.display(), e),
        }
    }
    pruned.sort();
    pruned
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    #[test]
    fn test_content_hash() {
        assert_eq!(
            content_hash(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_backup_file_name() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        let name = backup_file_name(Path::new("src/app.py"), "deadbeefcafe", at);
        assert_eq!(name, "app_20240309_140507_deadbeef.py");
        let bare = backup_file_name(Path::new("Makefile"), "0123456789", at);
        assert_eq!(bare, "Makefile_20240309_140507_01234567");
    }

    #[test]
    fn test_prune_keeps_current_and_recent() {
        let dir = TempDir::new().unwrap();
        let current = dir.path().join("current");
        let other = dir.path().join("other");
        fs::create_dir_all(&current).unwrap();
        fs::create_dir_all(&other).unwrap();

        let kept = prune_sessions(dir.path(), Duration::from_secs(3600), &current);
        assert!(kept.is_empty());

        let pruned = prune_sessions(dir.path(), Duration::ZERO, &current);
        assert_eq!(pruned, vec![other.clone()]);
        assert!(current.exists());
        assert!(!other.exists());
    }
}
