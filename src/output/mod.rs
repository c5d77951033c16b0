//! Output module for run reports and store statistics
//!
//! This module handles:
//! - The per-table existing/new/persisted summary printed after a run
//! - Row counts read from the store for `--stats`

mod report;
pub mod stats;

pub use report::{print_run_report, RunReport, TableReport};
pub use stats::{load_statistics, print_statistics, StoreStatistics};
