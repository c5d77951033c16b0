//! Harvest coordinator - main run orchestration logic
//!
//! For each entity kind in turn, the coordinator:
//! - Walks the index to discover identifiers
//! - Diffs them against the keys already stored
//! - Scrapes the new ones in fixed-size batches
//! - Derives images from scraped animals
//! - Persists each batch before starting the next one
//!
//! A failed fetch or parse aborts the current batch without writing any of it.
//! Earlier batches stay persisted, so the next run picks up where this one
//! stopped.

use crate::cache::Cache;
use crate::config::Config;
use crate::crawler::index::Index;
use crate::crawler::{build_http_client, Fetcher};
use crate::entities::{Animal, Group, Identifier, Image};
use crate::output::{RunReport, TableReport};
use crate::storage::{open_storage, Batch, SqliteStorage, Storage, Table};
use crate::ScrapeError;
use futures::stream::{self, StreamExt, TryStreamExt};
use futures::TryFutureExt;
use std::collections::HashMap;
use std::future::Future;
use std::path::Path;
use std::time::{Duration, Instant};
use url::Url;

/// Which entity kinds a run harvests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HarvestScope {
    #[default]
    All,
    AnimalsOnly,
    GroupsOnly,
}

impl HarvestScope {
    pub fn includes_animals(&self) -> bool {
        matches!(self, Self::All | Self::AnimalsOnly)
    }

    pub fn includes_groups(&self) -> bool {
        matches!(self, Self::All | Self::GroupsOnly)
    }
}

/// Main harvest coordinator structure
pub struct Coordinator {
    config: Config,
    base: Url,
    fetcher: Fetcher,
    storage: SqliteStorage,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// Opens the store (running any pending migrations), builds the HTTP
    /// client and points the cache at the configured directory.
    ///
    /// # Arguments
    ///
    /// * `config` - The harvest configuration
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Successfully created coordinator
    /// * `Err(ScrapeError)` - Failed to initialize
    pub fn new(config: Config) -> Result<Self, ScrapeError> {
        let storage = open_storage(Path::new(&config.output.database_path))?;

        let client = build_http_client(
            &config.user_agent,
            Duration::from_secs(config.harvest.request_timeout_secs),
        )?;
        let fetcher = Fetcher::new(client, Cache::new(&config.cache.directory));

        Self::from_parts(config, fetcher, storage)
    }

    /// Assembles a coordinator from an existing fetcher and store
    pub fn from_parts(
        config: Config,
        fetcher: Fetcher,
        storage: SqliteStorage,
    ) -> Result<Self, ScrapeError> {
        let base = Url::parse(&config.site.base_url)?;
        Ok(Self {
            config,
            base,
            fetcher,
            storage,
        })
    }

    pub fn storage(&self) -> &SqliteStorage {
        &self.storage
    }

    /// Runs the harvest for every entity kind in `scope`, animals first
    pub async fn run(&mut self, scope: HarvestScope) -> Result<RunReport, ScrapeError> {
        let start_time = Instant::now();
        let mut report = RunReport::default();

        if scope.includes_animals() {
            let (animals, images) = self.harvest_animals().await?;
            report.push(animals);
            report.push(images);
        }

        if scope.includes_groups() {
            report.push(self.harvest_groups().await?);
        }

        tracing::info!(
            "Harvest complete: {} rows written in {:.1}s",
            report.total_persisted(),
            start_time.elapsed().as_secs_f64()
        );

        Ok(report)
    }

    async fn harvest_animals(&mut self) -> Result<(TableReport, TableReport), ScrapeError> {
        let Self {
            ref config,
            ref base,
            ref fetcher,
            ref mut storage,
        } = *self;
        let policy = config.cache.detail_policy;

        tracing::info!("Discovering animals in {}", config.site.categories.join(", "));
        let index = Index::new(fetcher, base.clone(), config.site.per_page, config.cache.index_policy);
        let discovered = index.discover_animals(&config.site.categories).await?;
        let candidates: Vec<Identifier> =
            discovered.iter().map(|found| found.identifier.clone()).collect();
        let species: HashMap<&str, &str> = discovered
            .iter()
            .map(|found| (found.identifier.as_str(), found.species.as_str()))
            .collect();
        let species = &species;

        let mut existing = storage.existing_keys(Table::Animals)?;
        let mut existing_images = storage.existing_keys(Table::Images)?;
        let new = existing.diff_new(&candidates);

        let mut animals_report = TableReport {
            existing: existing.len(),
            discovered: candidates.len(),
            new: new.len(),
            ..TableReport::new(Table::Animals)
        };
        let mut images_report = TableReport {
            existing: existing_images.len(),
            ..TableReport::new(Table::Images)
        };
        log_diff(&animals_report);

        let batches = batch_count(new.len(), config.harvest.batch_size);
        for (n, chunk) in new.chunks(config.harvest.batch_size).enumerate() {
            tracing::info!("Scraping animal batch {} of {} ({} listings)", n + 1, batches, chunk.len());

            let scraped = scrape_batch(chunk, config.harvest.detail_concurrency, |id| {
                Animal::scrape_details(fetcher, base, id, policy)
                    .map_ok(move |animal| animal.or_species(species.get(id.as_str()).copied()))
            })
            .await
            .map_err(|e| batch_failed(Table::Animals, n + 1, batches, e))?;

            let images: Vec<Image> = scraped.iter().flat_map(Image::generate).collect();
            images_report.discovered += images.len();
            images_report.new += images
                .iter()
                .filter(|image| !existing_images.contains(&image.url))
                .count();

            let batch = Batch::new().with(&scraped)?.with(&images)?;
            storage
                .persist(&batch)
                .map_err(|e| batch_failed(Table::Animals, n + 1, batches, e.into()))?;

            animals_report.persisted += scraped.len();
            images_report.persisted += images.len();
            existing.extend(batch.keys(Table::Animals));
            existing_images.extend(batch.keys(Table::Images));
        }

        Ok((animals_report, images_report))
    }

    async fn harvest_groups(&mut self) -> Result<TableReport, ScrapeError> {
        let Self {
            ref config,
            ref base,
            ref fetcher,
            ref mut storage,
        } = *self;
        let policy = config.cache.detail_policy;

        tracing::info!("Discovering rescue groups");
        let index = Index::new(fetcher, base.clone(), config.site.per_page, config.cache.index_policy);
        let candidates = index.discover_groups().await?;

        let mut existing = storage.existing_keys(Table::Groups)?;
        let new = existing.diff_new(&candidates);

        let mut report = TableReport {
            existing: existing.len(),
            discovered: candidates.len(),
            new: new.len(),
            ..TableReport::new(Table::Groups)
        };
        log_diff(&report);

        let batches = batch_count(new.len(), config.harvest.batch_size);
        for (n, chunk) in new.chunks(config.harvest.batch_size).enumerate() {
            tracing::info!("Scraping group batch {} of {} ({} groups)", n + 1, batches, chunk.len());

            let scraped = scrape_batch(chunk, config.harvest.detail_concurrency, |id| {
                Group::scrape_details(fetcher, id, policy)
            })
            .await
            .map_err(|e| batch_failed(Table::Groups, n + 1, batches, e))?;

            let batch = Batch::new().with(&scraped)?;
            storage
                .persist(&batch)
                .map_err(|e| batch_failed(Table::Groups, n + 1, batches, e.into()))?;

            report.persisted += scraped.len();
            existing.extend(batch.keys(Table::Groups));
        }

        Ok(report)
    }
}

/// Runs `scrape` over `ids` with at most `width` in flight
///
/// Results keep the order of `ids`. The first error stops the batch and drops
/// whatever else was still in flight.
async fn scrape_batch<'a, T, F, Fut>(
    ids: &'a [Identifier],
    width: usize,
    scrape: F,
) -> Result<Vec<T>, ScrapeError>
where
    F: FnMut(&'a Identifier) -> Fut,
    Fut: Future<Output = Result<T, ScrapeError>>,
{
    stream::iter(ids)
        .map(scrape)
        .buffered(width.max(1))
        .try_collect()
        .await
}

fn batch_count(items: usize, batch_size: usize) -> usize {
    items.div_ceil(batch_size.max(1))
}

fn batch_failed(table: Table, batch: usize, batches: usize, error: ScrapeError) -> ScrapeError {
    tracing::error!(
        "{} batch {} of {} failed, nothing from it was persisted: {}",
        table,
        batch,
        batches,
        error
    );
    error
}

fn log_diff(report: &TableReport) {
    tracing::info!(
        "{}: {} existing, {} discovered, {} new",
        report.table,
        report.existing,
        report.discovered,
        report.new
    );
}
