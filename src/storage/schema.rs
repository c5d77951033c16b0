//! Database schema definitions and migrations
//!
//! The schema is reached through an ordered list of migration steps. Every step
//! checks its own precondition before touching the database, so the whole list is
//! safe to apply on every start, against a fresh file, a current database, or a
//! table left behind by the older single-table scrapers (`data` keyed by `link`).

use crate::storage::Table;
use crate::ScrapeError;
use rusqlite::{params, Connection, OptionalExtension};

/// Column name and SQL type, in table order
pub type ColumnDef = (&'static str, &'static str);

pub const ANIMAL_COLUMNS: &[ColumnDef] = &[
    ("url", "TEXT"),
    ("site_id", "INTEGER"),
    ("name", "TEXT"),
    ("description", "TEXT"),
    ("gender", "TEXT"),
    ("breed", "TEXT"),
    ("species", "TEXT"),
    ("status", "TEXT"),
    ("group_url", "TEXT"),
    ("state", "TEXT"),
    ("interstate", "TEXT"),
    ("last_updated", "TEXT"),
    ("scraped_at", "TEXT"),
    ("age", "TEXT"),
    ("adoption_fee", "TEXT"),
    ("desexed", "TEXT"),
    ("vaccinated", "TEXT"),
    ("wormed", "TEXT"),
    ("heartworm_treated", "TEXT"),
];

pub const IMAGE_COLUMNS: &[ColumnDef] = &[("url", "TEXT"), ("animal_url", "TEXT")];

pub const GROUP_COLUMNS: &[ColumnDef] = &[
    ("url", "TEXT"),
    ("name", "TEXT"),
    ("about", "TEXT"),
    ("adoption_process", "TEXT"),
    ("states", "TEXT"),
    ("social", "TEXT"),
    ("contact_name", "TEXT"),
    ("phone_1", "TEXT"),
    ("phone_2", "TEXT"),
    ("phone_3", "TEXT"),
    ("flagged_labels", "TEXT"),
    ("scraped_at", "TEXT"),
];

/// Columns of a table, key column first
pub fn columns(table: Table) -> &'static [ColumnDef] {
    match table {
        Table::Animals => ANIMAL_COLUMNS,
        Table::Images => IMAGE_COLUMNS,
        Table::Groups => GROUP_COLUMNS,
    }
}

/// One schema change with its own precondition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Migration {
    /// Rename `from` to `to` if `from` exists and `to` does not
    RenameTable {
        from: &'static str,
        to: &'static str,
    },
    /// Rename a column if the old name is present and the new one is not
    RenameColumn {
        table: &'static str,
        from: &'static str,
        to: &'static str,
    },
    /// Create a table with its full column set if it does not exist
    CreateTable(Table),
    /// Add every schema column the table lacks
    AddMissingColumns(Table),
    /// Keep only the newest row per key, if any key repeats
    DropDuplicateKeys(Table),
    /// Create the unique index on the table's key column
    UniqueKey(Table),
    /// Plain lookup index
    Index {
        name: &'static str,
        table: Table,
        column: &'static str,
    },
}

/// The migration list, applied in order
pub const MIGRATIONS: &[Migration] = &[
    Migration::RenameTable {
        from: "data",
        to: "animals",
    },
    Migration::RenameColumn {
        table: "animals",
        from: "link",
        to: "url",
    },
    Migration::CreateTable(Table::Animals),
    Migration::CreateTable(Table::Images),
    Migration::CreateTable(Table::Groups),
    Migration::AddMissingColumns(Table::Animals),
    Migration::AddMissingColumns(Table::Images),
    Migration::AddMissingColumns(Table::Groups),
    Migration::DropDuplicateKeys(Table::Animals),
    Migration::DropDuplicateKeys(Table::Images),
    Migration::DropDuplicateKeys(Table::Groups),
    Migration::UniqueKey(Table::Animals),
    Migration::UniqueKey(Table::Images),
    Migration::UniqueKey(Table::Groups),
    Migration::Index {
        name: "idx_images_animal_url",
        table: Table::Images,
        column: "animal_url",
    },
];

impl Migration {
    /// Human-readable step name used in logs and errors
    pub fn name(&self) -> String {
        match self {
            Self::RenameTable { from, to } => format!("rename table {} -> {}", from, to),
            Self::RenameColumn { table, from, to } => {
                format!("rename column {}.{} -> {}", table, from, to)
            }
            Self::CreateTable(table) => format!("create table {}", table.name()),
            Self::AddMissingColumns(table) => format!("add missing columns to {}", table.name()),
            Self::DropDuplicateKeys(table) => {
                format!("drop duplicate {}.{} rows", table.name(), table.key_column())
            }
            Self::UniqueKey(table) => format!("unique key on {}.{}", table.name(), table.key_column()),
            Self::Index { name, .. } => format!("create index {}", name),
        }
    }

    /// Applies the step if its precondition holds
    ///
    /// # Returns
    ///
    /// `true` if the database was modified
    pub fn apply(&self, conn: &Connection) -> Result<bool, rusqlite::Error> {
        match *self {
            Self::RenameTable { from, to } => {
                if table_exists(conn, from)? && !table_exists(conn, to)? {
                    conn.execute_batch(&format!("ALTER TABLE {} RENAME TO {}", from, to))?;
                    return Ok(true);
                }
                Ok(false)
            }
            Self::RenameColumn { table, from, to } => {
                if !table_exists(conn, table)? {
                    return Ok(false);
                }
                let existing = table_columns(conn, table)?;
                if has_column(&existing, from) && !has_column(&existing, to) {
                    conn.execute_batch(&format!(
                        "ALTER TABLE {} RENAME COLUMN {} TO {}",
                        table, from, to
                    ))?;
                    return Ok(true);
                }
                Ok(false)
            }
            Self::CreateTable(table) => {
                if table_exists(conn, table.name())? {
                    return Ok(false);
                }
                let definition = columns(table)
                    .iter()
                    .map(|(name, ty)| {
                        if *name == table.key_column() {
                            format!("{} {} NOT NULL", name, ty)
                        } else {
                            format!("{} {}", name, ty)
                        }
                    })
                    .collect::<Vec<_>>()
                    .join(", ");
                conn.execute_batch(&format!("CREATE TABLE {} ({})", table.name(), definition))?;
                Ok(true)
            }
            Self::AddMissingColumns(table) => {
                let existing = table_columns(conn, table.name())?;
                let mut changed = false;
                for (name, ty) in columns(table) {
                    if !has_column(&existing, name) {
                        conn.execute_batch(&format!(
                            "ALTER TABLE {} ADD COLUMN {} {}",
                            table.name(),
                            name,
                            ty
                        ))?;
                        changed = true;
                    }
                }
                Ok(changed)
            }
            Self::DropDuplicateKeys(table) => {
                let (name, key) = (table.name(), table.key_column());
                let duplicated: bool = conn.query_row(
                    &format!(
                        "SELECT EXISTS(SELECT 1 FROM {name} WHERE {key} IS NOT NULL \
                         GROUP BY {key} HAVING COUNT(*) > 1)"
                    ),
                    [],
                    |row| row.get(0),
                )?;
                if !duplicated {
                    return Ok(false);
                }
                let removed = conn.execute(
                    &format!(
                        "DELETE FROM {name} WHERE {key} IS NOT NULL AND rowid NOT IN \
                         (SELECT MAX(rowid) FROM {name} WHERE {key} IS NOT NULL GROUP BY {key})"
                    ),
                    [],
                )?;
                tracing::warn!("Removed {} duplicate rows from {}", removed, name);
                Ok(true)
            }
            Self::UniqueKey(table) => {
                let index = format!("idx_{}_{}", table.name(), table.key_column());
                create_index(conn, &index, table.name(), table.key_column(), true)
            }
            Self::Index {
                name,
                table,
                column,
            } => create_index(conn, name, table.name(), column, false),
        }
    }
}

/// Applies every migration in order and records the schema version
///
/// # Returns
///
/// The names of the steps that changed the database
pub fn initialize_schema(conn: &Connection) -> Result<Vec<String>, ScrapeError> {
    let mut applied = Vec::new();

    for migration in MIGRATIONS {
        let changed = migration
            .apply(conn)
            .map_err(|source| ScrapeError::SchemaMigration {
                step: migration.name(),
                source,
            })?;
        if changed {
            tracing::info!("Applied migration: {}", migration.name());
            applied.push(migration.name());
        }
    }

    conn.pragma_update(None, "user_version", get_schema_version())
        .map_err(|source| ScrapeError::SchemaMigration {
            step: "record schema version".to_string(),
            source,
        })?;

    Ok(applied)
}

/// Current schema version (the number of migration steps)
pub fn get_schema_version() -> u32 {
    MIGRATIONS.len() as u32
}

/// Checks whether a table exists
pub fn table_exists(conn: &Connection, table: &str) -> Result<bool, rusqlite::Error> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
            params![table],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

/// Column names of a table (empty if the table does not exist)
pub fn table_columns(conn: &Connection, table: &str) -> Result<Vec<String>, rusqlite::Error> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table))?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(names)
}

// SQLite column names are case-insensitive.
fn has_column(existing: &[String], name: &str) -> bool {
    existing.iter().any(|c| c.eq_ignore_ascii_case(name))
}

fn index_exists(conn: &Connection, index: &str) -> Result<bool, rusqlite::Error> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'index' AND name = ?1",
            params![index],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

fn create_index(
    conn: &Connection,
    index: &str,
    table: &str,
    column: &str,
    unique: bool,
) -> Result<bool, rusqlite::Error> {
    if index_exists(conn, index)? {
        return Ok(false);
    }
    let unique = if unique { "UNIQUE " } else { "" };
    conn.execute_batch(&format!(
        "CREATE {}INDEX {} ON {}({})",
        unique, index, table, column
    ))?;
    Ok(true)
}
