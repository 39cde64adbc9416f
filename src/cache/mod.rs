//! Per-repository data locations outside the working tree

pub mod paths;

pub use paths::{get_backup_dir, get_cache_dir, get_learning_db_path};
