//! repolift - code quality scoring, change risk assessment, safe modification
//! sessions and an improvement tracker that learns from outcomes.
//!
//! The four parts are independent library components:
//! - [`scoring::QualityScorer`] scores files and trees on seven dimensions
//! - [`risk::RiskAssessor`] estimates the breaking-change probability of an edit
//! - [`safety::SafetyManager`] applies edits with backups and rollback
//! - [`tracker::ImprovementTracker`] records outcomes and predicts success

pub mod cache;
pub mod cli;
pub mod config;
pub mod diff;
pub mod models;
pub mod parsers;
pub mod reporters;
pub mod risk;
pub mod safety;
pub mod scoring;
pub mod tracker;

use std::any::Any;

/// Message carried by a caught panic
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}
