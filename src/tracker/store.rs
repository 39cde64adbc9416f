//! redb-backed learning store
//!
//! Three tables, all with JSON values:
//! - `improvement_outcomes`: append-only, keyed by a monotonically increasing id
//! - `success_patterns`: keyed by `category:priority:risk_level`
//! - `learning_metrics`: append-only metric snapshots

use super::{OutcomeRow, SuccessPattern, TrackerError, TrackerResult};
use crate::models::{Category, Priority, RiskLevel};
use chrono::{DateTime, Utc};
use redb::{Database, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

const OUTCOMES_TABLE: TableDefinition<u64, &[u8]> = TableDefinition::new("improvement_outcomes");
const PATTERNS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("success_patterns");
const METRICS_TABLE: TableDefinition<u64, &[u8]> = TableDefinition::new("learning_metrics");

/// One row of `learning_metrics`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSnapshot {
    pub metric_name: String,
    pub metric_value: f64,
    pub confidence: f64,
    pub timestamp: DateTime<Utc>,
}

pub(super) struct Store {
    db: Database,
}

impl Store {
    pub(super) fn open(path: &Path) -> TrackerResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| TrackerError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let db = Database::create(path)?;

        // Create the tables up front so readers never see a missing table
        let write_txn = db.begin_write()?;
        {
            write_txn.open_table(OUTCOMES_TABLE)?;
            write_txn.open_table(PATTERNS_TABLE)?;
            write_txn.open_table(METRICS_TABLE)?;
        }
        write_txn.commit()?;

        debug!("Opened learning store at {}", path.display());
        Ok(Self { db })
    }

    /// Insert an outcome, update its pattern and append metric snapshots in a
    /// single write transaction. Nothing is written unless all of it succeeds.
    pub(super) fn record_outcome<F>(
        &self,
        outcome: &OutcomeRow,
        pattern_key: &str,
        update_pattern: F,
        snapshots: &[MetricSnapshot],
    ) -> TrackerResult<u64>
    where
        F: FnOnce(Option<SuccessPattern>) -> Option<SuccessPattern>,
    {
        let write_txn = self.db.begin_write()?;
        let outcome_id;
        {
            let mut outcomes = write_txn.open_table(OUTCOMES_TABLE)?;
            outcome_id = match outcomes.last()? {
                Some((key, _)) => key.value() + 1,
                None => 1,
            };
            let value = serde_json::to_vec(outcome)?;
            outcomes.insert(outcome_id, value.as_slice())?;

            let mut patterns = write_txn.open_table(PATTERNS_TABLE)?;
            let existing = match patterns.get(pattern_key)? {
                Some(value) => Some(serde_json::from_slice::<SuccessPattern>(value.value())?),
                None => None,
            };
            if let Some(pattern) = update_pattern(existing) {
                let value = serde_json::to_vec(&pattern)?;
                patterns.insert(pattern_key, value.as_slice())?;
            }

            let mut metrics = write_txn.open_table(METRICS_TABLE)?;
            let mut next = match metrics.last()? {
                Some((key, _)) => key.value() + 1,
                None => 1,
            };
            for snapshot in snapshots {
                let value = serde_json::to_vec(snapshot)?;
                metrics.insert(next, value.as_slice())?;
                next += 1;
            }
        }
        write_txn.commit()?;
        Ok(outcome_id)
    }

    pub(super) fn append_metric(&self, snapshot: &MetricSnapshot) -> TrackerResult<u64> {
        let write_txn = self.db.begin_write()?;
        let id;
        {
            let mut metrics = write_txn.open_table(METRICS_TABLE)?;
            id = match metrics.last()? {
                Some((key, _)) => key.value() + 1,
                None => 1,
            };
            let value = serde_json::to_vec(snapshot)?;
            metrics.insert(id, value.as_slice())?;
        }
        write_txn.commit()?;
        Ok(id)
    }

    /// All outcomes, oldest first
    pub(super) fn outcomes(&self) -> TrackerResult<Vec<OutcomeRow>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(OUTCOMES_TABLE)?;
        let mut rows = Vec::new();
        for item in table.iter()? {
            let (_, value) = item?;
            rows.push(serde_json::from_slice(value.value())?);
        }
        Ok(rows)
    }

    /// Up to `limit` outcomes sharing the pattern triple, most recent first
    pub(super) fn recent_matching(
        &self,
        category: Category,
        priority: Priority,
        risk_level: RiskLevel,
        limit: usize,
    ) -> TrackerResult<Vec<OutcomeRow>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(OUTCOMES_TABLE)?;
        let mut rows = Vec::new();
        for item in table.iter()?.rev() {
            if rows.len() >= limit {
                break;
            }
            let (_, value) = item?;
            let row: OutcomeRow = serde_json::from_slice(value.value())?;
            if row.category == category && row.priority == priority && row.risk_level == risk_level
            {
                rows.push(row);
            }
        }
        Ok(rows)
    }

    pub(super) fn pattern(&self, key: &str) -> TrackerResult<Option<SuccessPattern>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PATTERNS_TABLE)?;
        let pattern = match table.get(key)? {
            Some(value) => Some(serde_json::from_slice(value.value())?),
            None => None,
        };
        Ok(pattern)
    }

    pub(super) fn patterns(&self) -> TrackerResult<Vec<SuccessPattern>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PATTERNS_TABLE)?;
        let mut patterns = Vec::new();
        for item in table.iter()? {
            let (_, value) = item?;
            patterns.push(serde_json::from_slice(value.value())?);
        }
        Ok(patterns)
    }

    /// Overwrite a pattern row with arbitrary bytes
    #[cfg(test)]
    pub(super) fn put_raw_pattern(&self, key: &str, bytes: &[u8]) -> TrackerResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut patterns = write_txn.open_table(PATTERNS_TABLE)?;
            patterns.insert(key, bytes)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Snapshots of one metric, oldest first
    pub(super) fn metrics(&self, name: &str) -> TrackerResult<Vec<MetricSnapshot>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(METRICS_TABLE)?;
        let mut snapshots = Vec::new();
        for item in table.iter()? {
            let (_, value) = item?;
            let snapshot: MetricSnapshot = serde_json::from_slice(value.value())?;
            if snapshot.metric_name == name {
                snapshots.push(snapshot);
            }
        }
        Ok(snapshots)
    }
}
