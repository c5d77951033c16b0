use crate::crawler::CachePolicy;
use serde::{Deserialize, Serialize};

/// Main configuration structure for the scraper
///
/// Every section and field has a default, so an empty or absent file is a valid
/// configuration pointing at the public site.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub site: SiteConfig,
    pub cache: CacheConfig,
    pub harvest: HarvestConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
}

/// Which site to harvest and which categories to walk
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Scheme and host of the site, e.g. `https://www.petrescue.com.au`
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Page size requested from the search endpoint
    #[serde(rename = "per-page")]
    pub per_page: u32,

    /// Species categories to crawl (plural form, as used in listing paths)
    pub categories: Vec<String>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.petrescue.com.au".to_string(),
            per_page: 60,
            categories: vec!["dogs".to_string(), "cats".to_string(), "other".to_string()],
        }
    }
}

/// Response cache location and per-phase policy
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Root directory of the on-disk cache
    pub directory: String,

    /// Policy for search/listing pages
    #[serde(rename = "index-policy")]
    pub index_policy: CachePolicy,

    /// Policy for animal and group detail pages
    #[serde(rename = "detail-policy")]
    pub detail_policy: CachePolicy,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            directory: "cache".to_string(),
            index_policy: CachePolicy::Bypass,
            detail_policy: CachePolicy::UseCache,
        }
    }
}

/// Batch and worker settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HarvestConfig {
    /// Number of identifiers scraped and persisted as one unit
    #[serde(rename = "batch-size")]
    pub batch_size: usize,

    /// Maximum detail pages fetched at once inside a batch
    #[serde(rename = "detail-concurrency")]
    pub detail_concurrency: usize,

    /// Timeout applied to every live request (seconds)
    #[serde(rename = "request-timeout-secs")]
    pub request_timeout_secs: u64,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            detail_concurrency: 1,
            request_timeout_secs: 30,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UserAgentConfig {
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the scraper, appended as `(+url)`
    #[serde(rename = "contact-url")]
    pub contact_url: Option<String>,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "petrescue-scraper".to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: None,
        }
    }
}

impl UserAgentConfig {
    /// Formats the header value: `Name/Version (+ContactURL)`
    pub fn header_value(&self) -> String {
        match &self.contact_url {
            Some(url) => format!("{}/{} (+{})", self.crawler_name, self.crawler_version, url),
            None => format!("{}/{}", self.crawler_name, self.crawler_version),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            database_path: "data.sqlite".to_string(),
        }
    }
}
