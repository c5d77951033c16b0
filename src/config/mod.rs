//! Configuration module for the scraper
//!
//! This module handles loading, parsing, and validating TOML configuration files,
//! and layering the `PETRESCUE_*` environment flags on top.
//!
//! # Example
//!
//! ```no_run
//! use petrescue_scraper::config::load_effective_config;
//!
//! let config = load_effective_config(None).unwrap();
//! println!("Categories: {:?}", config.site.categories);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{CacheConfig, Config, HarvestConfig, OutputConfig, SiteConfig, UserAgentConfig};

// Re-export parser functions
pub use parser::{
    apply_env_overrides, compute_config_hash, load_config, load_effective_config,
    ENV_BASE_URL, ENV_CACHE_DIR, ENV_CATEGORIES, ENV_DATABASE, ENV_DETAIL_CACHE,
    ENV_INDEX_CACHE,
};
