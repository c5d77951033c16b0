//! Store statistics
//!
//! Row counts per table, read straight from the storage layer for `--stats`.

use crate::storage::{Storage, Table};
use crate::ScrapeError;

/// Row counts for every persisted table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreStatistics {
    pub rows: Vec<(Table, u64)>,
}

impl StoreStatistics {
    pub fn count(&self, table: Table) -> u64 {
        self.rows
            .iter()
            .find(|(t, _)| *t == table)
            .map(|(_, n)| *n)
            .unwrap_or(0)
    }
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
pub fn load_statistics(storage: &dyn Storage) -> Result<StoreStatistics, ScrapeError> {
    let mut rows = Vec::new();
    for table in [Table::Animals, Table::Images, Table::Groups] {
        rows.push((table, storage.count_rows(table)?));
    }
    Ok(StoreStatistics { rows })
}

/// Prints statistics to stdout
pub fn print_statistics(stats: &StoreStatistics) {
    println!("=== Store Statistics ===\n");
    for (table, count) in &stats.rows {
        println!("  {:<8} {}", table.name(), count);
    }

    let animals = stats.count(Table::Animals);
    if animals > 0 {
        println!();
        println!(
            "Images per animal: {:.1}",
            stats.count(Table::Images) as f64 / animals as f64
        );
    }
}
