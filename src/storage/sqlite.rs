//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::storage::schema::{initialize_schema, table_exists};
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{Batch, ExistingKeys, Row, Table};
use crate::ScrapeError;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Transaction};
use std::collections::HashSet;
use std::path::Path;

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens (or creates) the database and brings its schema up to date
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Database ready for use
    /// * `Err(ScrapeError)` - Failed to open, or a migration failed
    pub fn new(path: &Path) -> Result<Self, ScrapeError> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> Result<Self, ScrapeError> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Direct access to the connection, for inspection
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl Storage for SqliteStorage {
    fn existing_keys(&self, table: Table) -> StorageResult<ExistingKeys> {
        if !table_exists(&self.conn, table.name())? {
            return Ok(ExistingKeys::empty(table));
        }

        let mut stmt = self.conn.prepare(&format!(
            "SELECT {key} FROM {table} WHERE {key} IS NOT NULL",
            key = table.key_column(),
            table = table.name()
        ))?;

        let keys = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<HashSet<_>, _>>()?;

        Ok(ExistingKeys::new(table, keys))
    }

    fn persist(&mut self, batch: &Batch) -> StorageResult<usize> {
        let tx = self.conn.transaction()?;
        let mut written = 0;

        for (table, rows) in batch.writes() {
            for row in rows {
                if let Some((column, parent)) = table.foreign_key() {
                    check_parent(&tx, *table, row, column, parent)?;
                }
                upsert(&tx, *table, row)?;
                written += 1;
            }
        }

        tx.commit()?;
        Ok(written)
    }

    fn count_rows(&self, table: Table) -> StorageResult<u64> {
        if !table_exists(&self.conn, table.name())? {
            return Ok(0);
        }
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", table.name()),
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}

/// Inserts `row`, or refreshes the existing row with the same key
fn upsert(tx: &Transaction<'_>, table: Table, row: &Row) -> StorageResult<()> {
    let key = table.key_column();
    let columns: Vec<&str> = row.values.iter().map(|(name, _)| *name).collect();
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{}", i)).collect();
    let updates: Vec<String> = columns
        .iter()
        .filter(|name| **name != key)
        .map(|name| format!("{name} = excluded.{name}"))
        .collect();

    let on_conflict = if updates.is_empty() {
        "DO NOTHING".to_string()
    } else {
        format!("DO UPDATE SET {}", updates.join(", "))
    };

    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT({}) {}",
        table.name(),
        columns.join(", "),
        placeholders.join(", "),
        key,
        on_conflict
    );

    tx.prepare_cached(&sql)?
        .execute(params_from_iter(row.values.iter().map(|(_, value)| value)))?;
    Ok(())
}

/// Fails unless the row's foreign key names a row already in `parent`
fn check_parent(
    tx: &Transaction<'_>,
    table: Table,
    row: &Row,
    column: &str,
    parent: Table,
) -> StorageResult<()> {
    let reference = match row.get(column) {
        Some(Value::Text(reference)) => reference,
        _ => {
            return Err(StorageError::ConstraintViolation(format!(
                "{} row {} has no {}",
                table, row.key, column
            )))
        }
    };

    let exists: bool = tx.query_row(
        &format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE {} = ?1)",
            parent.name(),
            parent.key_column()
        ),
        params![reference],
        |r| r.get(0),
    )?;

    if !exists {
        return Err(StorageError::ConstraintViolation(format!(
            "{} row {} references missing {} row {}",
            table, row.key, parent, reference
        )));
    }

    Ok(())
}
