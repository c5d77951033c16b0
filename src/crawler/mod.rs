//! Crawler module for fetching, index walking and run coordination
//!
//! This module contains the core harvesting logic, including:
//! - HTTP fetching through the response cache
//! - Walking the paginated index surfaces for identifiers
//! - Batch-wise detail scraping and persistence

mod coordinator;
mod fetcher;
pub mod index;

pub use coordinator::{Coordinator, HarvestScope};
pub use fetcher::{build_http_client, decode, CachePolicy, ContentFormat, Fetcher, ParsedValue};
pub use index::{category_forms, page_offsets, CategoryForms, DiscoveredAnimal, Index};

use crate::config::Config;
use crate::output::RunReport;
use crate::ScrapeError;

/// Runs a complete harvest
///
/// This is the main entry point for a run. It will:
/// 1. Open the store and apply pending migrations
/// 2. Build the HTTP client and cache-backed fetcher
/// 3. Discover, diff, scrape and persist each entity kind in `scope`
///
/// # Arguments
///
/// * `config` - The effective configuration
/// * `scope` - Which entity kinds to harvest
///
/// # Returns
///
/// * `Ok(RunReport)` - Per-table counts for the run
/// * `Err(ScrapeError)` - A batch or the setup failed
pub async fn harvest(config: Config, scope: HarvestScope) -> Result<RunReport, ScrapeError> {
    let mut coordinator = Coordinator::new(config)?;
    coordinator.run(scope).await
}
