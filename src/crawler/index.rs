//! Index crawl: discovers entity identifiers from the paginated search surfaces
//!
//! Two pagination styles are walked:
//! - the JSON search endpoint, paged by `skip`/`per_page`, whose first response
//!   reports the total result count (animal listings, one walk per category)
//! - the HTML directory, whose "last page" link carries the final `page`
//!   number (rescue groups)
//!
//! Both produce bare `Identifier`s in discovery order without repeats.

use crate::crawler::{CachePolicy, Fetcher};
use crate::entities::{all, canonicalize, first, root, Identifier};
use crate::ScrapeError;
use scraper::Html;
use serde_json::Value;
use std::collections::HashSet;
use url::Url;

/// Path of the JSON search endpoint
pub const SEARCH_PATH: &str = "/api/listings/search";

/// Path of the paginated group directory
pub const GROUP_DIRECTORY_PATH: &str = "/groups";

const GROUP_STUB: &str = "article.cards-groups-preview a.cards-groups-preview__content[href]";
const LAST_PAGE_LINK: &str = ".pagination a.last[href], .pagination a[rel=\"last\"][href]";

/// Display forms of a category, used for progress messages
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryForms {
    pub singular: String,
    pub plural: String,
}

/// Derives the singular and plural forms of a category name
pub fn category_forms(category: &str) -> CategoryForms {
    let category = category.trim().to_lowercase();
    match category.strip_suffix('s') {
        Some(singular) if !singular.is_empty() => CategoryForms {
            singular: singular.to_string(),
            plural: category.clone(),
        },
        _ => CategoryForms {
            plural: format!("{}s", category),
            singular: category,
        },
    }
}

/// Offsets of every page needed to cover `total` results
///
/// Always includes the first page; the final page is never empty, so a total of
/// exactly `k * per_page` yields `k` offsets.
pub fn page_offsets(total: u64, per_page: u32) -> Vec<u64> {
    let step = u64::from(per_page.max(1));
    let mut offsets = vec![0];
    let mut offset = step;
    while offset < total {
        offsets.push(offset);
        offset += step;
    }
    offsets
}

/// One decoded page of search results
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchPage {
    pub total: u64,
    pub ids: Vec<String>,
}

/// Reads `Count` and the `Id` of every entry in `SearchResults`
pub fn parse_search_page(url: &str, value: &Value) -> Result<SearchPage, ScrapeError> {
    let missing = |field: &'static str| ScrapeError::MissingField {
        url: url.to_string(),
        field,
    };

    let total = value.get("Count").and_then(Value::as_u64).ok_or_else(|| missing("Count"))?;

    let results = value
        .get("SearchResults")
        .and_then(Value::as_array)
        .ok_or_else(|| missing("SearchResults"))?;

    let ids = results
        .iter()
        .map(|stub| match stub.get("Id") {
            Some(Value::Number(id)) => Ok(id.to_string()),
            Some(Value::String(id)) if !id.trim().is_empty() => Ok(id.trim().to_string()),
            _ => Err(missing("Id")),
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(SearchPage { total, ids })
}

/// Reads the `page` parameter of the "last page" link; 1 when there is none
pub fn last_page_number(document: &Html, page_url: &Url) -> u32 {
    first(root(document), LAST_PAGE_LINK)
        .and_then(|link| link.value().attr("href"))
        .and_then(|href| page_url.join(href).ok())
        .and_then(|url| {
            url.query_pairs()
                .find(|(name, _)| name == "page")
                .and_then(|(_, value)| value.parse::<u32>().ok())
        })
        .unwrap_or(1)
        .max(1)
}

/// Ordered identifier list that drops repeats
#[derive(Debug, Default)]
struct Discovered {
    seen: HashSet<String>,
    identifiers: Vec<Identifier>,
}

impl Discovered {
    /// Returns `false` if the identifier was already seen
    fn push(&mut self, url: String) -> bool {
        if !self.seen.insert(url.clone()) {
            return false;
        }
        self.identifiers.push(Identifier::from(url));
        true
    }

    fn into_vec(self) -> Vec<Identifier> {
        self.identifiers
    }
}

/// A listing found by the search walk, tagged with the category that found it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredAnimal {
    pub identifier: Identifier,
    /// Singular form of the category, e.g. `dog`
    pub species: String,
}

/// Walks the site's index pages
pub struct Index<'a> {
    fetcher: &'a Fetcher,
    base: Url,
    per_page: u32,
    policy: CachePolicy,
}

impl<'a> Index<'a> {
    pub fn new(fetcher: &'a Fetcher, base: Url, per_page: u32, policy: CachePolicy) -> Self {
        Self {
            fetcher,
            base,
            per_page,
            policy,
        }
    }

    /// Search endpoint URL for one page of `category`
    pub fn search_url(&self, category: &str, skip: u64) -> Result<Url, ScrapeError> {
        let mut url = self.base.join(SEARCH_PATH)?;
        url.query_pairs_mut()
            .append_pair("q", &category_forms(category).singular)
            .append_pair("skip", &skip.to_string())
            .append_pair("per_page", &self.per_page.to_string());
        Ok(url)
    }

    /// Canonical listing URL for a search result id
    pub fn animal_url(&self, id: &str) -> Result<Identifier, ScrapeError> {
        let url = self.base.join(&format!("/listings/{}", id))?;
        Ok(Identifier::from(url.to_string()))
    }

    /// Discovers listing identifiers for every category, in category order
    ///
    /// A listing found under several categories keeps the first one.
    pub async fn discover_animals(
        &self,
        categories: &[String],
    ) -> Result<Vec<DiscoveredAnimal>, ScrapeError> {
        let mut discovered = Discovered::default();
        let mut animals = Vec::new();

        for category in categories {
            let forms = category_forms(category);

            let first_url = self.search_url(category, 0)?;
            let first_page = self.fetch_search_page(&first_url).await?;
            let offsets = page_offsets(first_page.total, self.per_page);

            tracing::info!(
                "Found {} {} across {} page(s)",
                first_page.total,
                forms.plural,
                offsets.len()
            );

            let mut ids = first_page.ids;
            for (n, offset) in offsets.iter().enumerate() {
                if n > 0 {
                    tracing::info!("Fetching {} page {} of {}", forms.singular, n + 1, offsets.len());
                    let url = self.search_url(category, *offset)?;
                    ids = self.fetch_search_page(&url).await?.ids;
                }
                for id in &ids {
                    let identifier = self.animal_url(id)?;
                    if discovered.push(identifier.to_string()) {
                        animals.push(DiscoveredAnimal {
                            identifier,
                            species: forms.singular.clone(),
                        });
                    }
                }
            }
        }

        Ok(animals)
    }

    /// Discovers rescue group identifiers from the group directory
    pub async fn discover_groups(&self) -> Result<Vec<Identifier>, ScrapeError> {
        self.discover_paginated(GROUP_DIRECTORY_PATH, GROUP_STUB).await
    }

    /// Walks pages `1..=last` of an HTML directory and collects the stub links
    pub async fn discover_paginated(
        &self,
        path: &str,
        stub_css: &str,
    ) -> Result<Vec<Identifier>, ScrapeError> {
        let mut discovered = Discovered::default();

        let first_url = self.directory_url(path, 1)?;
        let (last_page, stubs) = {
            let document = self.fetcher.fetch_markup(first_url.as_str(), self.policy).await?;
            (last_page_number(&document, &first_url), self.stub_links(&document, stub_css))
        };
        tracing::info!("Walking {} ({} page(s))", path, last_page);
        for url in stubs {
            discovered.push(url);
        }

        for page in 2..=last_page {
            tracing::info!("Fetching {} page {} of {}", path, page, last_page);
            let url = self.directory_url(path, page)?;
            let stubs = {
                let document = self.fetcher.fetch_markup(url.as_str(), self.policy).await?;
                self.stub_links(&document, stub_css)
            };
            for url in stubs {
            discovered.push(url);
        }
        }

        Ok(discovered.into_vec())
    }

    fn directory_url(&self, path: &str, page: u32) -> Result<Url, ScrapeError> {
        let mut url = self.base.join(path)?;
        url.query_pairs_mut().append_pair("page", &page.to_string());
        Ok(url)
    }

    fn stub_links(&self, document: &Html, stub_css: &str) -> Vec<String> {
        all(root(document), stub_css)
            .into_iter()
            .filter_map(|a| a.value().attr("href"))
            .filter_map(|href| canonicalize(&self.base, href))
            .collect()
    }

    async fn fetch_search_page(&self, url: &Url) -> Result<SearchPage, ScrapeError> {
        let value = self.fetcher.fetch_json(url.as_str(), self.policy).await?;
        parse_search_page(url.as_str(), &value)
    }
}
