//! Upstream wire types

use serde::Deserialize;

/// One page of the films listing
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct FilmPage {
    #[serde(default)]
    pub results: Vec<FilmRecord>,
    /// Absolute or relative URL of the next page
    #[serde(default)]
    pub next: Option<String>,
}

/// A film as published upstream
///
/// The live API names the natural key `episode_id` and the description
/// `opening_crawl`; both spellings are accepted.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct FilmRecord {
    #[serde(alias = "episode_id")]
    pub episode_number: i64,
    pub title: String,
    #[serde(default)]
    pub director: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default, alias = "opening_crawl")]
    pub description: Option<String>,
}
