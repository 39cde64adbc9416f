//! Safe modification sessions
//!
//! A [`SafetyManager`] runs at most one session at a time:
//!
//! ```text
//! no-session ──start──▶ active ──finalize──▶ finalized
//!                          │
//!                          └──rollback───▶ rolled-back
//! ```
//!
//! Inside a session every path is backed up before its first write, writes
//! go through a temp file and an atomic rename, and every write is logged so
//! the session can be undone in reverse order. Any I/O failure during an
//! apply rolls the whole session back before the error is returned.

mod atomic;
mod backup;
mod preview;
mod session;
mod validate;

pub use atomic::{atomic_write, commit, write_temp, TEMP_SUFFIX};
pub use backup::{backup_file_name, content_hash, prune_sessions};
pub use preview::{preview_changes, ChangePreview};
pub use session::{
    new_session_id, BackupRecord, ChangeRecord, ModificationSession, SessionGuard, SessionState,
    SessionSummary,
};
pub use validate::{validate_change, IssueKind, ValidationIssue};

use crate::config::SafetyConfig;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

pub const SUMMARY_FILE: &str = "session_summary.json";

/// Errors from session operations
#[derive(Error, Debug)]
pub enum SafetyError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("backup failure for {path}: {message}")]
    Backup { path: PathBuf, message: String },

    #[error("no active modification session")]
    NoActiveSession,

    #[error("a modification session is already active")]
    SessionAlreadyActive,

    #[error("no backup recorded for {path}")]
    NoBackup { path: PathBuf },
}

pub type SafetyResult<T> = Result<T, SafetyError>;

fn io_error(path: &Path, source: std::io::Error) -> SafetyError {
    SafetyError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Outcome of [`SafetyManager::apply_change_safely`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyResult {
    pub success: bool,
    pub issues: Vec<ValidationIssue>,
    /// Backup of the pre-session content (`None` for a newly created file)
    pub backup_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RollbackFailure {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RollbackReport {
    pub session_id: String,
    /// Restored paths, most recently changed first
    pub files_rolled_back: Vec<PathBuf>,
    pub failures: Vec<RollbackFailure>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalizeReport {
    pub session_id: String,
    pub summary_path: PathBuf,
    pub files_changed: usize,
    pub pruned_sessions: Vec<PathBuf>,
}

/// Owns the backup root and the current session
pub struct SafetyManager {
    backup_root: PathBuf,
    max_file_size: usize,
    retention: Duration,
    session: Option<ModificationSession>,
    state: SessionState,
}

impl SafetyManager {
    /// Manager with default limits (1 MiB writes, 7 day retention)
    pub fn new(backup_root: impl Into<PathBuf>) -> Self {
        Self::with_config(backup_root, &SafetyConfig::default())
    }

    pub fn with_config(backup_root: impl Into<PathBuf>, config: &SafetyConfig) -> Self {
        Self {
            backup_root: backup_root.into(),
            max_file_size: config.max_file_size,
            retention: Duration::from_secs(config.retention_days.saturating_mul(24 * 60 * 60)),
            session: None,
            state: SessionState::NoSession,
        }
    }

    pub fn backup_root(&self) -> &Path {
        &self.backup_root
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The active session, if any
    pub fn session(&self) -> Option<&ModificationSession> {
        self.session.as_ref()
    }

    /// Preview an edit; independent of any session
    pub fn preview_changes(&self, path: &Path, original: &str, modified: &str) -> ChangePreview {
        preview_changes(path, original, modified)
    }

    /// Open a session and return a guard that rolls back unless finalized
    pub fn start_session(&mut self) -> SafetyResult<SessionGuard<'_>> {
        self.begin_session()?;
        Ok(SessionGuard::new(self))
    }

    /// Open a session without a guard; the caller must finalize or roll back
    pub fn begin_session(&mut self) -> SafetyResult<String> {
        if self.state == SessionState::Active {
            return Err(SafetyError::SessionAlreadyActive);
        }
        let session = ModificationSession::new(&self.backup_root);
        fs::create_dir_all(&session.directory).map_err(|e| io_error(&session.directory, e))?;
        info!("Started modification session {}", session.session_id);

        let id = session.session_id.clone();
        self.session = Some(session);
        self.state = SessionState::Active;
        Ok(id)
    }

    fn active(&self) -> SafetyResult<&ModificationSession> {
        match (&self.session, self.state) {
            (Some(session), SessionState::Active) => Ok(session),
            _ => Err(SafetyError::NoActiveSession),
        }
    }

    fn active_mut(&mut self) -> SafetyResult<&mut ModificationSession> {
        match (&mut self.session, self.state) {
            (Some(session), SessionState::Active) => Ok(session),
            _ => Err(SafetyError::NoActiveSession),
        }
    }

    /// Back up `path` into the session directory. Idempotent per session.
    ///
    /// Returns the backup location, or `None` when the path does not exist
    /// yet (recorded as a creation).
    pub fn backup_file(&mut self, path: &Path) -> SafetyResult<Option<PathBuf>> {
        let session = self.active_mut()?;
        if let Some(existing) = session.backups.get(path) {
            return Ok(existing.backup_path.clone());
        }

        let now = Utc::now();
        let record = if path.exists() {
            let bytes = fs::read(path).map_err(|e| io_error(path, e))?;
            let hash = content_hash(&bytes);
            let backup_path = session
                .directory
                .join(backup_file_name(path, &hash, now));
            atomic_write(&backup_path, &bytes).map_err(|e| SafetyError::Backup {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
            debug!("Backed up {} to {}", path.display(), backup_path.display());
            BackupRecord {
                original_path: path.to_path_buf(),
                backup_path: Some(backup_path),
                content_hash: Some(hash),
                timestamp: now,
            }
        } else {
            debug!("Recording {} as a new file", path.display());
            BackupRecord {
                original_path: path.to_path_buf(),
                backup_path: None,
                content_hash: None,
                timestamp: now,
            }
        };

        let backup_path = record.backup_path.clone();
        session.backups.insert(path.to_path_buf(), record);
        Ok(backup_path)
    }

    /// Validate and atomically write `content` to `path`
    ///
    /// A validation failure leaves the file untouched and returns
    /// `success: false` with the issues. An I/O failure rolls the session
    /// back and is returned as an error.
    pub fn apply_change_safely(
        &mut self,
        path: &Path,
        content: &str,
        validate: bool,
    ) -> SafetyResult<ApplyResult> {
        self.active()?;

        let backup_path = match self.backup_file(path) {
            Ok(backup_path) => backup_path,
            Err(e) => return Err(self.abort(e)),
        };

        let previous = if path.exists() {
            match fs::read(path) {
                Ok(bytes) => Some(bytes),
                Err(e) => return Err(self.abort(io_error(path, e))),
            }
        } else {
            None
        };

        if validate {
            let old_text = previous
                .as_deref()
                .map(String::from_utf8_lossy)
                .unwrap_or_default();
            let issues = validate_change(path, &old_text, content, self.max_file_size);
            if !issues.is_empty() {
                warn!(
                    "Refusing change to {}: {} validation issue(s)",
                    path.display(),
                    issues.len()
                );
                return Ok(ApplyResult {
                    success: false,
                    issues,
                    backup_path,
                });
            }
        }

        if let Err(e) = atomic_write(path, content.as_bytes()) {
            return Err(self.abort(io_error(path, e)));
        }

        let session = self.active_mut()?;
        let record = ChangeRecord {
            sequence: session.next_sequence(),
            path: path.to_path_buf(),
            previous_hash: previous.as_deref().map(content_hash),
            new_hash: content_hash(content.as_bytes()),
            timestamp: Utc::now(),
        };
        info!("Applied change #{} to {}", record.sequence, path.display());
        session.changes.push(record);

        Ok(ApplyResult {
            success: true,
            issues: Vec::new(),
            backup_path,
        })
    }

    /// Roll back everything after a failure inside the session
    fn abort(&mut self, cause: SafetyError) -> SafetyError {
        error!("Aborting session after failure: {}", cause);
        if let Err(e) = self.rollback_session() {
            error!("Rollback after failure also failed: {}", e);
        }
        cause
    }

    /// Restore one path to its pre-session content
    pub fn rollback_file(&mut self, path: &Path) -> SafetyResult<()> {
        let session = self.active()?;
        let record = session
            .backups
            .get(path)
            .cloned()
            .ok_or_else(|| SafetyError::NoBackup {
                path: path.to_path_buf(),
            })?;
        restore(&record)
    }

    /// Undo the session's changes, most recent first, each path once
    pub fn rollback_session(&mut self) -> SafetyResult<RollbackReport> {
        let session = self.active()?.clone();
        info!(
            "Rolling back session {} ({} changes)",
            session.session_id,
            session.changes.len()
        );

        let mut seen = HashSet::new();
        let mut files_rolled_back = Vec::new();
        let mut failures = Vec::new();

        for change in session.changes.iter().rev() {
            if !seen.insert(change.path.clone()) {
                continue;
            }
            let result = match session.backups.get(&change.path) {
                Some(record) => restore(record),
                None => Err(SafetyError::NoBackup {
                    path: change.path.clone(),
                }),
            };
            match result {
                Ok(()) => files_rolled_back.push(change.path.clone()),
                Err(e) => {
                    warn!("Failed to roll back {}: {}", change.path.display(), e);
                    failures.push(RollbackFailure {
                        path: change.path.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        self.state = SessionState::RolledBack;
        self.session = None;

        Ok(RollbackReport {
            session_id: session.session_id,
            files_rolled_back,
            failures,
        })
    }

    /// Keep the changes, write the session summary and prune expired sessions
    pub fn finalize_session(&mut self) -> SafetyResult<FinalizeReport> {
        let session = self.active()?.clone();

        let summary = SessionSummary {
            session_id: session.session_id.clone(),
            started_at: session.started_at,
            finished_at: Utc::now(),
            backups: session.backups.values().cloned().collect(),
            changes: session.changes.clone(),
        };
        let summary_path = session.directory.join(SUMMARY_FILE);
        let json = serde_json::to_vec_pretty(&summary).map_err(|e| SafetyError::Backup {
            path: summary_path.clone(),
            message: e.to_string(),
        })?;
        atomic_write(&summary_path, &json).map_err(|e| io_error(&summary_path, e))?;

        let pruned_sessions = prune_sessions(&self.backup_root, self.retention, &session.directory);

        self.state = SessionState::Finalized;
        self.session = None;
        info!(
            "Finalized session {} ({} changes, {} expired sessions pruned)",
            session.session_id,
            session.changes.len(),
            pruned_sessions.len()
        );

        Ok(FinalizeReport {
            session_id: session.session_id,
            summary_path,
            files_changed: session
                .changes
                .iter()
                .map(|c| &c.path)
                .collect::<HashSet<_>>()
                .len(),
            pruned_sessions,
        })
    }
}

/// Put a backup back in place and verify the result
fn restore(record: &BackupRecord) -> SafetyResult<()> {
    let path = &record.original_path;
    match (&record.backup_path, &record.content_hash) {
        (Some(backup_path), Some(expected)) => {
            let bytes = fs::read(backup_path).map_err(|e| SafetyError::Backup {
                path: path.clone(),
                message: format!("cannot read {}: {}", backup_path.display(), e),
            })?;
            if &content_hash(&bytes) != expected {
                return Err(SafetyError::Backup {
                    path: path.clone(),
                    message: format!("{} does not match its recorded hash", backup_path.display()),
                });
            }
            atomic_write(path, &bytes).map_err(|e| io_error(path, e))?;

            let restored = fs::read(path).map_err(|e| io_error(path, e))?;
            if &content_hash(&restored) != expected {
                return Err(SafetyError::Backup {
                    path: path.clone(),
                    message: "restored content does not match the recorded hash".to_string(),
                });
            }
            debug!("Restored {}", path.display());
            Ok(())
        }
        _ => {
            // Created during the session
            match fs::remove_file(path) {
                Ok(()) => {
                    debug!("Removed {} created during the session", path.display());
                    Ok(())
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(io_error(path, e)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (TempDir, SafetyManager) {
        let dir = TempDir::new().unwrap();
        let manager = SafetyManager::new(dir.path().join("backups"));
        (dir, manager)
    }

    #[test]
    fn test_single_active_session() {
        let (_dir, mut manager) = setup();
        manager.begin_session().unwrap();
        assert!(matches!(
            manager.begin_session(),
            Err(SafetyError::SessionAlreadyActive)
        ));
    }

    #[test]
    fn test_operations_need_a_session() {
        let (dir, mut manager) = setup();
        let path = dir.path().join("a.py");
        assert!(matches!(
            manager.backup_file(&path),
            Err(SafetyError::NoActiveSession)
        ));
        assert!(matches!(
            manager.apply_change_safely(&path, "x = 1\n", true),
            Err(SafetyError::NoActiveSession)
        ));
        assert!(matches!(
            manager.rollback_session(),
            Err(SafetyError::NoActiveSession)
        ));
    }

    #[test]
    fn test_backup_is_idempotent() {
        let (dir, mut manager) = setup();
        let path = dir.path().join("a.py");
        fs::write(&path, "x = 1\n").unwrap();
        manager.begin_session().unwrap();

        let first = manager.backup_file(&path).unwrap();
        fs::write(&path, "x = 2\n").unwrap();
        let second = manager.backup_file(&path).unwrap();
        assert_eq!(first, second);
        let backup = first.unwrap();
        assert_eq!(fs::read_to_string(&backup).unwrap(), "x = 1\n");
        assert_eq!(manager.session().unwrap().backups.len(), 1);
    }

    #[test]
    fn test_apply_and_rollback_file() {
        let (dir, mut manager) = setup();
        let path = dir.path().join("a.py");
        fs::write(&path, "x = 1\n").unwrap();
        manager.begin_session().unwrap();

        let result = manager.apply_change_safely(&path, "x = 2\n", true).unwrap();
        assert!(result.success);
        assert!(result.backup_path.is_some());
        assert_eq!(fs::read_to_string(&path).unwrap(), "x = 2\n");

        manager.rollback_file(&path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "x = 1\n");
        assert_eq!(manager.state(), SessionState::Active);
    }

    #[test]
    fn test_invalid_change_leaves_file_untouched() {
        let (dir, mut manager) = setup();
        let path = dir.path().join("a.py");
        fs::write(&path, "x = 1\n").unwrap();
        manager.begin_session().unwrap();

        let result = manager
            .apply_change_safely(&path, "def broken(:\n", true)
            .unwrap();
        assert!(!result.success);
        assert_eq!(result.issues[0].kind, IssueKind::Syntax);
        assert_eq!(fs::read_to_string(&path).unwrap(), "x = 1\n");
        assert!(manager.session().unwrap().changes.is_empty());
    }

    #[test]
    fn test_created_file_is_removed_on_rollback() {
        let (dir, mut manager) = setup();
        let path = dir.path().join("new.py");
        manager.begin_session().unwrap();
        let result = manager.apply_change_safely(&path, "x = 1\n", true).unwrap();
        assert!(result.success);
        assert!(result.backup_path.is_none());
        assert!(path.exists());

        let report = manager.rollback_session().unwrap();
        assert_eq!(report.files_rolled_back, vec![path.clone()]);
        assert!(!path.exists());
        assert_eq!(manager.state(), SessionState::RolledBack);
    }

    #[test]
    fn test_tampered_backup_is_detected() {
        let (dir, mut manager) = setup();
        let path = dir.path().join("a.py");
        fs::write(&path, "x = 1\n").unwrap();
        manager.begin_session().unwrap();
        let backup = manager.backup_file(&path).unwrap().unwrap();
        fs::write(&backup, "tampered\n").unwrap();
        assert!(matches!(
            manager.rollback_file(&path),
            Err(SafetyError::Backup { .. })
        ));
    }

    #[test]
    fn test_finalize_writes_summary() {
        let (dir, mut manager) = setup();
        let path = dir.path().join("a.py");
        fs::write(&path, "x = 1\n").unwrap();
        manager.begin_session().unwrap();
        manager.apply_change_safely(&path, "x = 2\n", true).unwrap();
        manager.apply_change_safely(&path, "x = 3\n", true).unwrap();

        let report = manager.finalize_session().unwrap();
        assert_eq!(report.files_changed, 1);
        let summary: SessionSummary =
            serde_json::from_slice(&fs::read(&report.summary_path).unwrap()).unwrap();
        assert_eq!(summary.session_id, report.session_id);
        assert_eq!(summary.changes.len(), 2);
        assert_eq!(summary.changes[1].sequence, 2);
        assert_eq!(manager.state(), SessionState::Finalized);
        assert_eq!(fs::read_to_string(&path).unwrap(), "x = 3\n");
    }
}
