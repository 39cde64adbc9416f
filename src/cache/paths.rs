//! Data path utilities - uses ~/.cache/repolift/<repo-hash>/ instead of writing into the repo

use crate::config::RepoliftConfig;
use std::path::{Path, PathBuf};

/// Get the data directory for a repository.
/// Uses ~/.cache/repolift/<repo-hash>/ on Unix, %LOCALAPPDATA%/repolift/<repo-hash>/ on Windows.
pub fn get_cache_dir(repo_path: &Path) -> PathBuf {
    let repo_hash = hash_path(repo_path);

    let base = if cfg!(windows) {
        std::env::var("LOCALAPPDATA")
            .map(PathBuf::from)
            .unwrap_or_else(|_| dirs::cache_dir().unwrap_or_else(|| PathBuf::from(".")))
    } else {
        dirs::cache_dir().unwrap_or_else(|| {
            // Fallback to ~/.cache
            dirs::home_dir()
                .map(|h| h.join(".cache"))
                .unwrap_or_else(|| PathBuf::from("."))
        })
    };

    base.join("repolift").join(&repo_hash)
}

/// Root of the per-session backup directories.
pub fn get_backup_dir(repo_path: &Path, config: &RepoliftConfig) -> PathBuf {
    config
        .safety
        .backup_dir
        .clone()
        .unwrap_or_else(|| get_cache_dir(repo_path).join("backups"))
}

/// The learning statistics database.
pub fn get_learning_db_path(repo_path: &Path, config: &RepoliftConfig) -> PathBuf {
    config
        .tracker
        .database
        .clone()
        .unwrap_or_else(|| get_cache_dir(repo_path).join("learning.redb"))
}

/// Hash a path to create a unique but deterministic directory name.
/// Uses the canonical path to ensure consistency.
fn hash_path(path: &Path) -> String {
    use sha2::{Digest, Sha256};

    let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    let digest = Sha256::digest(canonical.to_string_lossy().as_bytes());
    let hash: String = digest[..6].iter().map(|b| format!("{:02x}", b)).collect();

    // file_name of the canonical path, so "." still gets a readable name
    let repo_name = canonical
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("repo")
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '-' || *c == '_')
        .take(20)
        .collect::<String>();

    format!("{}-{}", repo_name, hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_path_deterministic() {
        let path = Path::new("/tmp/test-repo");
        let hash1 = hash_path(path);
        let hash2 = hash_path(path);
        assert_eq!(hash1, hash2);
        assert!(hash1.starts_with("test-repo-"));
        assert_eq!(hash1.len(), "test-repo-".len() + 12);
    }

    #[test]
    fn test_default_locations() {
        let path = Path::new("/home/user/my-project");
        let config = RepoliftConfig::default();
        let backups = get_backup_dir(path, &config);
        assert!(backups.to_string_lossy().contains("repolift"));
        assert!(backups.to_string_lossy().contains("my-project"));
        assert!(backups.ends_with("backups"));
        assert!(get_learning_db_path(path, &config).ends_with("learning.redb"));
    }

    #[test]
    fn test_config_overrides() {
        let mut config = RepoliftConfig::default();
        config.safety.backup_dir = Some(PathBuf::from("/custom/backups"));
        config.tracker.database = Some(PathBuf::from("/custom/learning.redb"));
        let path = Path::new("/repo");
        assert_eq!(get_backup_dir(path, &config), PathBuf::from("/custom/backups"));
        assert_eq!(
            get_learning_db_path(path, &config),
            PathBuf::from("/custom/learning.redb")
        );
    }
}
