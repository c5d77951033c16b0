//! Rescue group profile extraction

use crate::crawler::{CachePolicy, Fetcher};
use crate::entities::{all, definitions, first, first_text, root, text_of, to_markdown, Identifier};
use crate::ScrapeError;
use chrono::{DateTime, Utc};
use scraper::{ElementRef, Html};
use std::collections::BTreeMap;

const NAME: &str = "h1.group-header__name";
const STATES: &str = ".group-header__states";
const SECTION_HEADINGS: &str = "h2.group-profile__heading";
const SOCIAL_LINKS: &str = ".group-social a[href]";
const SOCIAL_BASE_CLASS: &str = "social-icon";
const CONTACT_DETAILS: &str = "dl.group-contact";

/// Phone numbers kept per group
pub const MAX_PHONES: usize = 3;

/// Contact details from the group's contact list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupContact {
    pub name: Option<String>,
    pub phones: Vec<String>,
}

/// A scraped rescue group
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub url: Identifier,
    pub name: Option<String>,
    /// First profile section, markdown
    pub about: Option<String>,
    /// Second profile section, markdown
    pub adoption_process: Option<String>,
    /// States/regions the group is active in
    pub states: Vec<String>,
    /// Contact channel (icon class) → URL
    pub social: BTreeMap<String, String>,
    pub contact: Option<GroupContact>,
    /// Contact labels that were not understood; kept for manual review
    pub flagged_labels: Vec<String>,
    pub scraped_at: DateTime<Utc>,
}

impl Group {
    /// Fetches and extracts the group profile behind `identifier`
    pub async fn scrape_details(
        fetcher: &Fetcher,
        identifier: &Identifier,
        policy: CachePolicy,
    ) -> Result<Self, ScrapeError> {
        let document = fetcher.fetch_markup(identifier.as_str(), policy).await?;
        Ok(Self::from_document(identifier, &document, Utc::now()))
    }

    /// Extracts a group from an already parsed profile page
    pub fn from_document(identifier: &Identifier, document: &Html, scraped_at: DateTime<Utc>) -> Self {
        let page = root(document);

        // Sections are identified by position: about, then adoption process.
        let headings = all(page, SECTION_HEADINGS);
        let section = |index: usize| headings.get(index).and_then(|h| section_markdown(*h));

        let (contact, flagged_labels) = match first(page, CONTACT_DETAILS) {
            Some(_) => {
                let (contact, flagged) = extract_contact(page);
                for label in &flagged {
                    tracing::warn!(
                        "Unrecognized contact label '{}' on {}; needs manual review",
                        label,
                        identifier
                    );
                }
                (Some(contact), flagged)
            }
            None => (None, Vec::new()),
        };

        Self {
            url: identifier.clone(),
            name: first_text(page, NAME),
            about: section(0),
            adoption_process: section(1),
            states: first_text(page, STATES).map(|line| split_states(&line)).unwrap_or_default(),
            social: extract_social(page),
            contact,
            flagged_labels,
            scraped_at,
        }
    }
}

/// Markdown of the elements between a heading and the next heading
fn section_markdown(heading: ElementRef<'_>) -> Option<String> {
    let parts: Vec<String> = heading
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .take_while(|el| el.value().name() != heading.value().name())
        .filter_map(to_markdown)
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("\n\n"))
    }
}

/// Splits a header line such as `Active in: NSW, ACT` after its colon
fn split_states(line: &str) -> Vec<String> {
    let list = line.rsplit_once(':').map(|(_, rest)| rest).unwrap_or(line);
    list.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Reads every social icon's channel class and href; first link per channel wins
fn extract_social(page: ElementRef<'_>) -> BTreeMap<String, String> {
    let mut social = BTreeMap::new();
    for link in all(page, SOCIAL_LINKS) {
        let Some(href) = link.value().attr("href").map(str::trim).filter(|h| !h.is_empty()) else {
            continue;
        };
        let channel = link
            .value()
            .classes()
            .filter(|class| *class != SOCIAL_BASE_CLASS)
            .collect::<Vec<_>>()
            .join(" ");
        if channel.is_empty() {
            continue;
        }
        social.entry(channel).or_insert_with(|| href.to_string());
    }
    social
}

/// Contact name and up to three phones; returns any label it could not place
fn extract_contact(page: ElementRef<'_>) -> (GroupContact, Vec<String>) {
    let mut contact = GroupContact::default();
    let mut flagged = Vec::new();

    for (label, value) in definitions(page, CONTACT_DETAILS) {
        let text = text_of(value);
        if text.is_empty() {
            continue;
        }

        if label.contains("phone") || label.contains("mobile") {
            if contact.phones.len() < MAX_PHONES {
                contact.phones.push(text);
            } else {
                flagged.push(label);
            }
        } else if label.contains("name") || label == "contact" {
            contact.name.get_or_insert(text);
        } else {
            flagged.push(label);
        }
    }

    (contact, flagged)
}
