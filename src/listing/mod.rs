// src/listing/mod.rs
//! Marketplace listing retrieval.
//!
//! Providers return a [`Listing`] or a typed [`ListingError`]; the HTTP tool
//! surface turns errors into `{"error": ...}` data instead of failing the call.

pub mod ebay;

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub use ebay::{EbayConfig, EbayProvider};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub currency: String,
}

/// The listing fields authentication actually needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub item_id: String,
    pub title: String,
    /// Plain text (HTML decoded, tags stripped, whitespace collapsed).
    pub description: String,
    pub condition: String,
    pub price: Price,
    pub seller_username: String,
    pub feedback_score: u64,
    /// As reported by the marketplace, e.g. "99.6".
    pub feedback_percentage: String,
    /// Main image first, then additional images.
    pub images: Vec<String>,
    pub item_url: String,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum ListingError {
    #[error("could not find an item id in '{0}'")]
    InvalidUrl(String),
    #[error("item {0} not found")]
    NotFound(String),
    #[error("marketplace authentication failed: {0}")]
    Auth(String),
    #[error("marketplace returned HTTP {status}: {body}")]
    Upstream { status: u16, body: String },
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("malformed listing payload: {0}")]
    Malformed(String),
}

#[async_trait]
pub trait ListingProvider: Send + Sync {
    /// Fetch a listing by full item URL or bare item id.
    async fn fetch(&self, url_or_id: &str) -> Result<Listing, ListingError>;
    fn name(&self) -> &'static str;
}

/// Extract the item id: query string and fragment are dropped, the last
/// non-empty path segment must be numeric.
pub fn item_id_from_url(url: &str) -> Result<String, ListingError> {
    let trimmed = url.trim();
    let path = trimmed
        .split(['?', '#'])
        .next()
        .unwrap_or_default();
    let id = path
        .split('/')
        .filter(|s| !s.is_empty())
        .next_back()
        .unwrap_or_default();
    if !id.is_empty() && id.chars().all(|c| c.is_ascii_digit()) {
        Ok(id.to_string())
    } else {
        Err(ListingError::InvalidUrl(trimmed.to_string()))
    }
}

static RE_TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<[^>]*>").expect("tag regex"));
static RE_SCRIPTS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<(script|style)[^>]*>.*?</(script|style)>").expect("script regex")
});
static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex"));

/// Listing descriptions arrive as seller HTML. Reduce to scannable plain text.
pub fn clean_description(html: &str) -> String {
    let out = RE_SCRIPTS.replace_all(html, " ");
    let out = RE_TAGS.replace_all(&out, " ");
    let out = html_escape::decode_html_entities(&out).to_string();
    let out = out.replace('\u{a0}', " ");
    RE_WS.replace_all(&out, " ").trim().to_string()
}

/// In-memory listings keyed by item id. For tests and offline demos.
#[derive(Debug, Default, Clone)]
pub struct FixtureListings {
    items: HashMap<String, Listing>,
}

impl FixtureListings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, listing: Listing) -> Self {
        self.items.insert(listing.item_id.clone(), listing);
        self
    }
}

#[async_trait]
impl ListingProvider for FixtureListings {
    async fn fetch(&self, url_or_id: &str) -> Result<Listing, ListingError> {
        let id = item_id_from_url(url_or_id)?;
        self.items
            .get(&id)
            .cloned()
            .ok_or(ListingError::NotFound(id))
    }

    fn name(&self) -> &'static str {
        "fixture"
    }
}
