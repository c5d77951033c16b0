//! PetRescue scraper: an incremental harvester for adoptable animals and rescue groups
//!
//! This crate walks the site's paginated search surfaces, diffs the discovered
//! listing URLs against what is already stored, scrapes only the new detail pages,
//! and persists them to SQLite in small batches so a run can be resumed.

pub mod cache;
pub mod config;
pub mod crawler;
pub mod entities;
pub mod output;
pub mod storage;

use thiserror::Error;

/// Main error type for scraper operations
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP error for {url}: {source}")]
    Fetch { url: String, source: reqwest::Error },

    #[error("HTTP status {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Failed to parse {format} from {url}: {message}")]
    Parse {
        url: String,
        format: crawler::ContentFormat,
        message: String,
    },

    #[error("Missing required field '{field}' on {url}")]
    MissingField { url: String, field: &'static str },

    #[error("Schema migration '{step}' failed: {source}")]
    SchemaMigration {
        step: String,
        source: rusqlite::Error,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Cache error at {path}: {source}")]
    Cache {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid value for {name}: {value}")]
    InvalidEnv { name: &'static str, value: String },
}

/// Result type alias for scraper operations
pub type Result<T> = std::result::Result<T, ScrapeError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use cache::Cache;
pub use config::Config;
pub use crawler::{CachePolicy, ContentFormat, Fetcher};
pub use entities::{Animal, AnimalStatus, Group, Identifier, Image};
