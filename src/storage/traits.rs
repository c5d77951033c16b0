//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::storage::{Batch, ExistingKeys, Table};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// The store is addressed by table and unique key only: it can list the keys it
/// already holds and write rows with insert-or-replace semantics.
pub trait Storage {
    /// Loads the set of keys already present in `table`
    ///
    /// A table that does not exist yet yields an empty set.
    fn existing_keys(&self, table: Table) -> StorageResult<ExistingKeys>;

    /// Writes every row of `batch` in a single transaction
    ///
    /// Rows whose key already exists are refreshed in place. If any row violates
    /// a foreign key, nothing from the batch is written.
    ///
    /// # Returns
    ///
    /// The number of rows written
    fn persist(&mut self, batch: &Batch) -> StorageResult<usize>;

    /// Counts the rows in `table` (0 if it does not exist)
    fn count_rows(&self, table: Table) -> StorageResult<u64>;
}
