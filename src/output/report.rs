//! End-of-run report: existing vs. new records per table

use crate::storage::Table;
use std::fmt;

/// Counts for one table over a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableReport {
    pub table: Table,
    /// Keys stored before the run started
    pub existing: usize,
    /// Identifiers produced by the index crawl (or derived, for images)
    pub discovered: usize,
    /// Discovered identifiers not yet stored
    pub new: usize,
    /// Rows written during the run
    pub persisted: usize,
}

impl TableReport {
    pub fn new(table: Table) -> Self {
        Self {
            table,
            existing: 0,
            discovered: 0,
            new: 0,
            persisted: 0,
        }
    }
}

impl fmt::Display for TableReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<8} existing: {:>6}  discovered: {:>6}  new: {:>6}  persisted: {:>6}",
            self.table.name(),
            self.existing,
            self.discovered,
            self.new,
            self.persisted
        )
    }
}

/// Per-table results of a harvest run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub tables: Vec<TableReport>,
}

impl RunReport {
    pub fn table(&self, table: Table) -> Option<&TableReport> {
        self.tables.iter().find(|t| t.table == table)
    }

    pub fn push(&mut self, report: TableReport) {
        self.tables.push(report);
    }

    pub fn total_persisted(&self) -> usize {
        self.tables.iter().map(|t| t.persisted).sum()
    }
}

/// Prints the run report to stdout
pub fn print_run_report(report: &RunReport) {
    println!("=== Harvest Summary ===\n");
    for table in &report.tables {
        println!("  {}", table);
    }
    println!();
    println!("Rows written: {}", report.total_persisted());
}
