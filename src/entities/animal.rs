//! Animal listing extraction
//!
//! The status banner decides how much of the listing is read: every listing
//! yields its identity, owning group, location, gallery and timestamps, but only
//! `available` listings carry the age/fee/medical block.

use crate::crawler::{CachePolicy, Fetcher};
use crate::entities::image::canonical_image_size;
use crate::entities::{
    all, canonicalize, definition, definition_text, first, first_text, is_yes, root, text_of,
    to_markdown, Identifier,
};
use crate::ScrapeError;
use chrono::{DateTime, Utc};
use scraper::{ElementRef, Html};
use std::fmt;
use url::Url;

const STATUS_BANNER: &str = ".pet-listing__status";
const NAME: &str = "h1.pet-listing__content__name";
const BREED: &str = "h3.pet-listing__content__breed";
const FACTS: &str = "dl.pet-listing__content__features";
const DESCRIPTION: &str = ".pet-listing__content__personality";
const INTERSTATE: &str = ".pet-listing__content__interstate";
const GALLERY_IMAGES: &str = ".pet-listing__gallery__thumbnails img";
const LAST_UPDATED: &str = ".pet-listing__last-updated";

/// Adoption status from the listing banner, case-normalized
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AnimalStatus {
    Available,
    Adopted,
    Withdrawn,
    /// Any other banner text, lowercased
    Other(String),
}

impl AnimalStatus {
    /// Maps banner text to a status; a blank banner counts as available
    pub fn from_banner(text: &str) -> Self {
        let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
        match normalized.trim_end_matches(['!', '.']) {
            "" | "available" => Self::Available,
            "adopted" => Self::Adopted,
            "withdrawn" => Self::Withdrawn,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Available => "available",
            Self::Adopted => "adopted",
            Self::Withdrawn => "withdrawn",
            Self::Other(text) => text,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available)
    }
}

impl fmt::Display for AnimalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Attributes only present on listings that are still available
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailableDetails {
    pub age: Option<String>,
    pub adoption_fee: Option<String>,
    pub desexed: Option<bool>,
    pub vaccinated: Option<bool>,
    pub wormed: Option<bool>,
    pub heartworm_treated: Option<bool>,
    /// Personality text converted to markdown
    pub description: Option<String>,
    /// Whether the animal may be adopted from another state
    pub interstate: bool,
}

/// A scraped animal listing
#[derive(Debug, Clone, PartialEq)]
pub struct Animal {
    pub url: Identifier,
    pub site_id: Option<u64>,
    pub name: Option<String>,
    pub gender: Option<String>,
    pub breed: Option<String>,
    pub species: Option<String>,
    pub status: AnimalStatus,
    /// Absolute URL of the rescue group's page
    pub group: Option<String>,
    pub state: Option<String>,
    /// Site-declared last update
    pub last_updated: Option<String>,
    pub scraped_at: DateTime<Utc>,
    /// Gallery URLs, resized; moved into `Image` records before persisting
    pub images: Vec<String>,
    /// Present if and only if `status` is `Available`
    pub available: Option<AvailableDetails>,
}

impl Animal {
    /// Fetches and extracts the listing behind `identifier`
    pub async fn scrape_details(
        fetcher: &Fetcher,
        base: &Url,
        identifier: &Identifier,
        policy: CachePolicy,
    ) -> Result<Self, ScrapeError> {
        let document = fetcher.fetch_markup(identifier.as_str(), policy).await?;
        Ok(Self::from_document(identifier, &document, base, Utc::now()))
    }

    /// Extracts an animal from an already parsed listing page
    ///
    /// Missing elements become `None`; a missing status banner means `available`.
    pub fn from_document(
        identifier: &Identifier,
        document: &Html,
        base: &Url,
        scraped_at: DateTime<Utc>,
    ) -> Self {
        let page = root(document);

        let status = first(page, STATUS_BANNER)
            .map(|banner| AnimalStatus::from_banner(&text_of(banner)))
            .unwrap_or(AnimalStatus::Available);

        let group = definition(page, FACTS, "rescue group")
            .and_then(|dd| first(dd, "a[href]"))
            .and_then(|a| a.value().attr("href"))
            .and_then(|href| canonicalize(base, href));

        let available = if status.is_available() {
            Some(extract_available(page))
        } else {
            None
        };

        Self {
            url: identifier.clone(),
            site_id: identifier.site_id(),
            name: first_text(page, NAME),
            gender: definition_text(page, FACTS, "gender").map(|g| g.to_lowercase()),
            breed: first_text(page, BREED),
            species: definition_text(page, FACTS, "species"),
            status,
            group,
            state: definition_text(page, FACTS, "location"),
            last_updated: extract_last_updated(page),
            scraped_at,
            images: extract_images(page, base),
            available,
        }
    }

    /// Fills in `species` from the discovering category when the page has none
    pub fn or_species(mut self, species: Option<&str>) -> Self {
        if self.species.is_none() {
            self.species = species.map(str::to_string);
        }
        self
    }
}

fn extract_available(page: ElementRef<'_>) -> AvailableDetails {
    let flag = |label: &str| definition_text(page, FACTS, label).map(|text| is_yes(&text));

    let interstate = first_text(page, INTERSTATE)
        .map(|text| !text.starts_with("Not available"))
        .unwrap_or(true);

    AvailableDetails {
        age: definition_text(page, FACTS, "age"),
        adoption_fee: definition_text(page, FACTS, "adoption fee"),
        desexed: flag("desexed"),
        vaccinated: flag("vaccinated"),
        wormed: flag("wormed"),
        heartworm_treated: flag("heartworm"),
        description: first(page, DESCRIPTION).and_then(to_markdown),
        interstate,
    }
}

/// Prefers the machine-readable `<time datetime>` over the visible text
fn extract_last_updated(page: ElementRef<'_>) -> Option<String> {
    let element = first(page, LAST_UPDATED)?;

    if let Some(datetime) = first(element, "time[datetime]").and_then(|t| t.value().attr("datetime")) {
        return Some(datetime.trim().to_string());
    }

    let text = text_of(element);
    let text = text
        .strip_prefix("Last updated")
        .map(|rest| rest.trim_start_matches(':').trim())
        .unwrap_or(&text);
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

/// Gallery thumbnails, resized to the canonical size, in page order without repeats
fn extract_images(page: ElementRef<'_>, base: &Url) -> Vec<String> {
    let mut images: Vec<String> = Vec::new();
    for img in all(page, GALLERY_IMAGES) {
        let src = img
            .value()
            .attr("data-src")
            .or_else(|| img.value().attr("src"));
        if let Some(url) = src.and_then(|src| canonicalize(base, src)) {
            let url = canonical_image_size(&url);
            if !images.contains(&url) {
                images.push(url);
            }
        }
    }
    images
}
