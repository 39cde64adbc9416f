//! Modification session records and the RAII session guard

use super::SafetyManager;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::{Deref, DerefMut};
use std::path::PathBuf;
use tracing::{error, warn};
use uuid::Uuid;

/// Lifecycle of the manager's current session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    NoSession,
    Active,
    Finalized,
    RolledBack,
}

/// Where a path's pre-session content lives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupRecord {
    pub original_path: PathBuf,
    /// `None` when the path did not exist before the session (rollback deletes it)
    pub backup_path: Option<PathBuf>,
    /// SHA-256 of the pre-session content
    pub content_hash: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// One successful write inside a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub sequence: u64,
    pub path: PathBuf,
    pub previous_hash: Option<String>,
    pub new_hash: String,
    pub timestamp: DateTime<Utc>,
}

/// Backups and change log of one session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModificationSession {
    pub session_id: String,
    pub started_at: DateTime<Utc>,
    pub directory: PathBuf,
    pub backups: BTreeMap<PathBuf, BackupRecord>,
    pub changes: Vec<ChangeRecord>,
}

impl ModificationSession {
    pub(super) fn new(backup_root: &std::path::Path) -> Self {
        let started_at = Utc::now();
        let session_id = new_session_id(started_at);
        Self {
            directory: backup_root.join(&session_id),
            session_id,
            started_at,
            backups: BTreeMap::new(),
            changes: Vec::new(),
        }
    }

    pub(super) fn next_sequence(&self) -> u64 {
        self.changes.len() as u64 + 1
    }
}

/// `YYYYmmdd_HHMMSS_<8 hex>`
pub fn new_session_id(at: DateTime<Utc>) -> String {
    let unique = Uuid::new_v4().simple().to_string();
    format!("{}_{}", at.format("%Y%m%d_%H%M%S"), &unique[..8])
}

/// Written as `session_summary.json` when a session is finalized
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub backups: Vec<BackupRecord>,
    pub changes: Vec<ChangeRecord>,
}

/// Scope of an active session
///
/// Dropping the guard while its session is still active (early return, `?`
/// or a panic) rolls the whole session back. Call
/// [`SafetyManager::finalize_session`] through the guard to keep the changes.
pub struct SessionGuard<'a> {
    manager: &'a mut SafetyManager,
}

impl<'a> SessionGuard<'a> {
    pub(super) fn new(manager: &'a mut SafetyManager) -> Self {
        Self { manager }
    }

    /// Run `f` inside the session; on error the session is rolled back
    /// before the error is returned
    pub fn run<T, E, F>(&mut self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut SafetyManager) -> Result<T, E>,
        E: std::fmt::Display,
    {
        match f(&mut *self.manager) {
            Ok(value) => Ok(value),
            Err(e) => {
                warn!("Session step failed, rolling back: {}", e);
                self.rollback_quietly();
                Err(e)
            }
        }
    }

    fn rollback_quietly(&mut self) {
        if self.manager.state() != SessionState::Active {
            return;
        }
        match self.manager.rollback_session() {
            Ok(report) if !report.failures.is_empty() => {
                error!(
                    "Rollback left {} file(s) unrestored",
                    report.failures.len()
                );
            }
            Ok(_) => {}
            Err(e) => error!("Rollback failed: {}", e),
        }
    }
}

impl Deref for SessionGuard<'_> {
    type Target = SafetyManager;

    fn deref(&self) -> &SafetyManager {
        self.manager
    }
}

impl DerefMut for SessionGuard<'_> {
    fn deref_mut(&mut self) -> &mut SafetyManager {
        self.manager
    }
}

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        if self.manager.state() == SessionState::Active {
            warn!("Session guard dropped while active, rolling back");
            self.rollback_quietly();
        }
    }
}
