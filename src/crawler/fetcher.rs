//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the scraper, including:
//! - Building HTTP clients with a proper user agent string and timeouts
//! - Consulting the response cache according to a per-call policy
//! - Decoding the body as HTML markup or JSON
//!
//! Transport failures and non-success statuses are returned to the caller as
//! errors; nothing is retried here.

use crate::cache::Cache;
use crate::config::UserAgentConfig;
use crate::ScrapeError;
use reqwest::Client;
use scraper::Html;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// How a single fetch interacts with the response cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CachePolicy {
    /// Always fetch live; never read or write the cache
    Bypass,
    /// Serve from the cache when present, otherwise fetch live and store
    UseCache,
    /// Always fetch live and overwrite the cache entry
    Refresh,
}

impl CachePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bypass => "bypass",
            Self::UseCache => "use-cache",
            Self::Refresh => "refresh",
        }
    }
}

impl FromStr for CachePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "bypass" => Ok(Self::Bypass),
            "use-cache" | "cache" => Ok(Self::UseCache),
            "refresh" => Ok(Self::Refresh),
            other => Err(format!("unknown cache policy '{}'", other)),
        }
    }
}

impl fmt::Display for CachePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the response body should be decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentFormat {
    Markup,
    Json,
}

impl fmt::Display for ContentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Markup => f.write_str("markup"),
            Self::Json => f.write_str("JSON"),
        }
    }
}

/// A decoded response body
#[derive(Debug)]
pub enum ParsedValue {
    Markup(Html),
    Json(serde_json::Value),
}

impl ParsedValue {
    pub fn into_markup(self) -> Option<Html> {
        match self {
            Self::Markup(html) => Some(html),
            Self::Json(_) => None,
        }
    }

    pub fn into_json(self) -> Option<serde_json::Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::Markup(_) => None,
        }
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
/// * `timeout` - Timeout applied to each whole request
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Shared fetch capability handed to the index walkers and entity extractors
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    cache: Cache,
}

impl Fetcher {
    pub fn new(client: Client, cache: Cache) -> Self {
        Self { client, cache }
    }

    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    /// Fetches `url` and decodes it as `format`
    ///
    /// # Cache behaviour
    ///
    /// | Policy | Reads cache | Live request | Writes cache |
    /// |--------|-------------|--------------|--------------|
    /// | `Bypass` | no | always | no |
    /// | `UseCache` | yes | on miss | on miss (first writer wins) |
    /// | `Refresh` | no | always | overwrite |
    ///
    /// A live body is written only once it has decoded, and at most once.
    pub async fn fetch(
        &self,
        url: &str,
        policy: CachePolicy,
        format: ContentFormat,
    ) -> Result<ParsedValue, ScrapeError> {
        self.fetch_with(url, policy, |url, body| decode(url, body, format))
            .await
    }

    /// Fetches `url` and parses it as an HTML document
    pub async fn fetch_markup(&self, url: &str, policy: CachePolicy) -> Result<Html, ScrapeError> {
        self.fetch_with(url, policy, parse_markup).await
    }

    /// Fetches `url` and parses it as JSON
    pub async fn fetch_json(
        &self,
        url: &str,
        policy: CachePolicy,
    ) -> Result<serde_json::Value, ScrapeError> {
        self.fetch_with(url, policy, parse_json).await
    }

    /// Returns the raw body for `url`, honouring `policy`
    pub async fn fetch_bytes(&self, url: &str, policy: CachePolicy) -> Result<Vec<u8>, ScrapeError> {
        self.fetch_with(url, policy, |_, body| Ok(body.to_vec()))
            .await
    }

    async fn fetch_with<T>(
        &self,
        url: &str,
        policy: CachePolicy,
        parse: impl Fn(&str, &[u8]) -> Result<T, ScrapeError>,
    ) -> Result<T, ScrapeError> {
        match policy {
            CachePolicy::Bypass => {
                let body = self.get_live(url).await?;
                parse(url, &body)
            }
            CachePolicy::UseCache => {
                if let Some(body) = self.cache.get(url)? {
                    tracing::debug!("Cache hit: {}", url);
                    return parse(url, &body);
                }
                let body = self.get_live(url).await?;
                let value = parse(url, &body)?;
                self.cache.put(url, &body)?;
                Ok(value)
            }
            CachePolicy::Refresh => {
                let body = self.get_live(url).await?;
                let value = parse(url, &body)?;
                self.cache.replace(url, &body)?;
                Ok(value)
            }
        }
    }

    async fn get_live(&self, url: &str) -> Result<Vec<u8>, ScrapeError> {
        tracing::debug!("Fetching: {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| ScrapeError::Fetch {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|source| ScrapeError::Fetch {
            url: url.to_string(),
            source,
        })?;

        Ok(body.to_vec())
    }
}

/// Decodes a body according to `format`
pub fn decode(url: &str, body: &[u8], format: ContentFormat) -> Result<ParsedValue, ScrapeError> {
    match format {
        ContentFormat::Markup => parse_markup(url, body).map(ParsedValue::Markup),
        ContentFormat::Json => parse_json(url, body).map(ParsedValue::Json),
    }
}

fn parse_markup(url: &str, body: &[u8]) -> Result<Html, ScrapeError> {
    let text = std::str::from_utf8(body).map_err(|e| ScrapeError::Parse {
        url: url.to_string(),
        format: ContentFormat::Markup,
        message: e.to_string(),
    })?;
    Ok(Html::parse_document(text))
}

fn parse_json(url: &str, body: &[u8]) -> Result<serde_json::Value, ScrapeError> {
    serde_json::from_slice(body).map_err(|e| ScrapeError::Parse {
        url: url.to_string(),
        format: ContentFormat::Json,
        message: e.to_string(),
    })
}
