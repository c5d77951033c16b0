use crate::config::types::Config;
use crate::config::validation::validate;
use crate::crawler::CachePolicy;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Comma-separated list of categories to crawl
pub const ENV_CATEGORIES: &str = "PETRESCUE_CATEGORIES";
/// Cache policy for index pages (`bypass`, `use-cache`, `refresh`)
pub const ENV_INDEX_CACHE: &str = "PETRESCUE_INDEX_CACHE";
/// Cache policy for detail pages
pub const ENV_DETAIL_CACHE: &str = "PETRESCUE_DETAIL_CACHE";
pub const ENV_DATABASE: &str = "PETRESCUE_DATABASE";
pub const ENV_CACHE_DIR: &str = "PETRESCUE_CACHE_DIR";
pub const ENV_BASE_URL: &str = "PETRESCUE_BASE_URL";

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    validate(&config)?;
    Ok(config)
}

/// Builds the effective configuration for a run
///
/// Starts from the file at `path` (or the defaults when no file is given),
/// applies the `PETRESCUE_*` environment flags on top, then validates.
pub fn load_effective_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = std::fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => Config::default(),
    };

    apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;
    validate(&config)?;
    Ok(config)
}

/// Applies environment-variable flags to a configuration
///
/// `lookup` resolves a variable name to its value; empty values are ignored.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(value) = get(ENV_CATEGORIES) {
        config.site.categories = value
            .split(',')
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();
    }

    if let Some(value) = get(ENV_INDEX_CACHE) {
        config.cache.index_policy = parse_policy(ENV_INDEX_CACHE, &value)?;
    }

    if let Some(value) = get(ENV_DETAIL_CACHE) {
        config.cache.detail_policy = parse_policy(ENV_DETAIL_CACHE, &value)?;
    }

    if let Some(value) = get(ENV_DATABASE) {
        config.output.database_path = value;
    }

    if let Some(value) = get(ENV_CACHE_DIR) {
        config.cache.directory = value;
    }

    if let Some(value) = get(ENV_BASE_URL) {
        config.site.base_url = value;
    }

    Ok(())
}

fn parse_policy(name: &'static str, value: &str) -> Result<CachePolicy, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidEnv {
        name,
        value: value.to_string(),
    })
}

/// Computes a SHA-256 fingerprint of the effective configuration
///
/// Logged at startup so runs with different settings can be told apart.
pub fn compute_config_hash(config: &Config) -> String {
    let rendered = toml::to_string(config).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(rendered.as_bytes());
    hex::encode(hasher.finalize())
}
