//! Harvested entities and their detail-page extractors
//!
//! This module contains:
//! - `Identifier`, the canonical detail URL that keys every record
//! - `Animal` and `Group`, built from their detail pages
//! - `Image`, derived from an `Animal` without any network access
//! - Small selector helpers shared by the extractors

mod animal;
mod group;
mod image;

pub use animal::{Animal, AnimalStatus, AvailableDetails};
pub use group::{Group, GroupContact};
pub use image::{canonical_image_size, Image, CANONICAL_IMAGE_SIZE};

use scraper::{ElementRef, Html, Selector};
use std::fmt;
use url::Url;

/// Canonical detail-page URL of an entity
///
/// Produced by the index crawl; carries nothing but the URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identifier(String);

impl Identifier {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric id from the last path segment, e.g. `.../listings/812345` → 812345
    pub fn site_id(&self) -> Option<u64> {
        let url = Url::parse(&self.0).ok()?;
        let segment = url.path_segments()?.filter(|s| !s.is_empty()).last()?;
        let digits: String = segment.chars().take_while(|c| c.is_ascii_digit()).collect();
        digits.parse().ok()
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Identifier {
    fn from(url: &str) -> Self {
        Self::new(url)
    }
}

impl From<String> for Identifier {
    fn from(url: String) -> Self {
        Self(url)
    }
}

/// Resolves a link href against the site base to an absolute URL
///
/// Returns None for empty, fragment-only and non-HTTP(S) links. Query strings are
/// kept; fragments are dropped.
pub fn canonicalize(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:") || href.starts_with("mailto:") || href.starts_with("tel:")
    {
        return None;
    }

    let mut absolute = base.join(href).ok()?;
    if absolute.scheme() != "http" && absolute.scheme() != "https" {
        return None;
    }
    absolute.set_fragment(None);
    Some(absolute.to_string())
}

/// First element under `scope` matching `css`
pub(crate) fn first<'a>(scope: ElementRef<'a>, css: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(css).ok()?;
    scope.select(&selector).next()
}

/// All elements under `scope` matching `css`, in document order
pub(crate) fn all<'a>(scope: ElementRef<'a>, css: &str) -> Vec<ElementRef<'a>> {
    match Selector::parse(css) {
        Ok(selector) => scope.select(&selector).collect(),
        Err(_) => Vec::new(),
    }
}

/// Text content with whitespace runs collapsed to single spaces
pub(crate) fn text_of(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Non-empty collapsed text of the first match
pub(crate) fn first_text(scope: ElementRef<'_>, css: &str) -> Option<String> {
    first(scope, css).map(text_of).filter(|s| !s.is_empty())
}

/// Normalized form of a definition-list label: lowercase, no trailing colon
pub(crate) fn normalize_label(label: &str) -> String {
    label.trim().trim_end_matches(':').trim().to_lowercase()
}

/// Every `<dt>` label in the lists matching `list_css`, paired with its `<dd>`
pub(crate) fn definitions<'a>(
    scope: ElementRef<'a>,
    list_css: &str,
) -> Vec<(String, ElementRef<'a>)> {
    let mut pairs = Vec::new();
    for list in all(scope, list_css) {
        for term in all(list, "dt") {
            let value = term
                .next_siblings()
                .filter_map(ElementRef::wrap)
                .next()
                .filter(|sibling| sibling.value().name() == "dd");
            if let Some(value) = value {
                pairs.push((normalize_label(&text_of(term)), value));
            }
        }
    }
    pairs
}

/// The `<dd>` following the first `<dt>` whose label contains `label`
///
/// Whitespace is ignored on both sides, so `heartworm` matches "Heart worm".
pub(crate) fn definition<'a>(
    scope: ElementRef<'a>,
    list_css: &str,
    label: &str,
) -> Option<ElementRef<'a>> {
    let needle = squash(label);
    definitions(scope, list_css)
        .into_iter()
        .find(|(term, _)| squash(term).contains(&needle))
        .map(|(_, value)| value)
}

fn squash(label: &str) -> String {
    label
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Non-empty text of the definition for `label`
pub(crate) fn definition_text(scope: ElementRef<'_>, list_css: &str, label: &str) -> Option<String> {
    definition(scope, list_css, label)
        .map(text_of)
        .filter(|s| !s.is_empty())
}

/// `true` when the text is the literal token "yes", ignoring case
pub(crate) fn is_yes(text: &str) -> bool {
    text.trim().eq_ignore_ascii_case("yes")
}

/// Converts an element's inner HTML to markdown
pub(crate) fn to_markdown(element: ElementRef<'_>) -> Option<String> {
    let markdown = html2md::parse_html(&element.inner_html());
    let markdown = markdown.trim();
    if markdown.is_empty() {
        None
    } else {
        Some(markdown.to_string())
    }
}

/// Root element of a parsed document
pub(crate) fn root(document: &Html) -> ElementRef<'_> {
    document.root_element()
}
