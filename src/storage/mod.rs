//! Storage module for persisting harvested records
//!
//! This module handles all database operations for the scraper, including:
//! - SQLite database initialization and idempotent schema migrations
//! - Loading the keys already stored per table
//! - Diffing freshly discovered identifiers against those keys
//! - Writing batches of records with insert-or-replace semantics

mod records;
mod schema;
mod sqlite;
mod traits;

pub use records::Record;
pub use schema::{get_schema_version, initialize_schema, Migration, MIGRATIONS};
pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::entities::Identifier;
use crate::ScrapeError;
use rusqlite::types::Value;
use std::collections::HashSet;
use std::fmt;
use std::path::Path;

/// Initializes or opens a storage database
///
/// Migrations run before the store is returned, so a failing migration aborts
/// the run before anything is persisted.
pub fn open_storage(path: &Path) -> Result<SqliteStorage, ScrapeError> {
    SqliteStorage::new(path)
}

/// The persisted tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Animals,
    Images,
    Groups,
}

impl Table {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Animals => "animals",
            Self::Images => "images",
            Self::Groups => "groups",
        }
    }

    /// Column holding the unique key (the canonical URL)
    pub fn key_column(&self) -> &'static str {
        "url"
    }

    /// Column referencing another table's key, if any
    pub fn foreign_key(&self) -> Option<(&'static str, Table)> {
        match self {
            Self::Images => Some(("animal_url", Table::Animals)),
            Self::Animals | Self::Groups => None,
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Keys already stored in one table, loaded once per run
///
/// The driver owns this set for the whole run and extends it after every
/// persisted batch, so the database is read only once per table.
#[derive(Debug, Clone)]
pub struct ExistingKeys {
    table: Table,
    keys: HashSet<String>,
}

impl ExistingKeys {
    pub fn new(table: Table, keys: HashSet<String>) -> Self {
        Self { table, keys }
    }

    pub fn empty(table: Table) -> Self {
        Self::new(table, HashSet::new())
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    /// Records keys that were just persisted
    pub fn extend<'a>(&mut self, keys: impl IntoIterator<Item = &'a str>) {
        self.keys.extend(keys.into_iter().map(str::to_string));
    }

    /// Candidates whose key is not stored yet, in input order and without repeats
    pub fn diff_new(&self, candidates: &[Identifier]) -> Vec<Identifier> {
        let mut seen = HashSet::new();
        let mut new = Vec::new();
        for id in candidates {
            if !self.contains(id.as_str()) && seen.insert(id.as_str()) {
                new.push(id.clone());
            }
        }
        tracing::debug!(
            "{}: {} of {} candidates not stored yet",
            self.table,
            new.len(),
            candidates.len()
        );
        new
    }
}

/// A row ready for upsert: its key plus `(column, value)` pairs
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub key: String,
    pub values: Vec<(&'static str, Value)>,
}

impl Row {
    /// Value of `column`, if the row sets it
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.values
            .iter()
            .find(|(name, _)| *name == column)
            .map(|(_, value)| value)
    }
}

/// Rows for one or more tables, written together in one transaction
///
/// Tables are written in the order they were added, so parents must be added
/// before the rows that reference them.
#[derive(Debug, Default, Clone)]
pub struct Batch {
    writes: Vec<(Table, Vec<Row>)>,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the rows of `records`
    pub fn with<R: Record>(mut self, records: &[R]) -> Result<Self, StorageError> {
        let rows = records
            .iter()
            .map(R::to_row)
            .collect::<Result<Vec<_>, _>>()?;
        self.writes.push((R::TABLE, rows));
        Ok(self)
    }

    pub fn writes(&self) -> &[(Table, Vec<Row>)] {
        &self.writes
    }

    /// Total number of rows across all tables
    pub fn len(&self) -> usize {
        self.writes.iter().map(|(_, rows)| rows.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keys written to `table`
    pub fn keys(&self, table: Table) -> impl Iterator<Item = &str> {
        self.writes
            .iter()
            .filter(move |(t, _)| *t == table)
            .flat_map(|(_, rows)| rows.iter().map(|row| row.key.as_str()))
    }
}
