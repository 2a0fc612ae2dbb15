//! Text parsing utilities for track metadata

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Pattern for parenthesized or bracketed annotations like "(Live)" or "[remix]"
    static ref ANNOTATION_PATTERN: Regex = Regex::new(r"\s*[\(\[].*?[\)\]]").unwrap();
}

/// Normalize a track title for catalog search.
///
/// Strips any parenthesized/bracketed annotation and anything after the
/// first literal " - " separator ("Artist - Remastered 2011" suffixes).
/// The result is used only to build the search query and is never stored.
pub fn clean_search_title(title: &str) -> String {
    let stripped = ANNOTATION_PATTERN.replace_all(title, "");
    stripped
        .split(" - ")
        .next()
        .unwrap_or_default()
        .trim()
        .to_string()
}
