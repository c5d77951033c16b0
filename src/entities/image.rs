//! Listing images, derived from a scraped animal

use crate::entities::{Animal, Identifier};
use regex::Regex;
use std::sync::LazyLock;

/// Width and height every gallery URL is rewritten to
pub const CANONICAL_IMAGE_SIZE: u32 = 638;

static SIZE_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?P<sep>[/,])(?P<dim>[wh])_\d+").unwrap());

/// Rewrites embedded `w_N` / `h_N` size tokens to the canonical size
pub fn canonical_image_size(url: &str) -> String {
    let replacement = format!("${{sep}}${{dim}}_{}", CANONICAL_IMAGE_SIZE);
    SIZE_TOKEN.replace_all(url, replacement.as_str()).into_owned()
}

/// An image belonging to an animal listing; keyed by its URL
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Image {
    pub url: String,
    pub animal: Identifier,
}

impl Image {
    /// One image per gallery URL of `animal`, in gallery order
    pub fn generate(animal: &Animal) -> Vec<Image> {
        animal
            .images
            .iter()
            .map(|url| Image {
                url: url.clone(),
                animal: animal.url.clone(),
            })
            .collect()
    }
}
