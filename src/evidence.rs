//! Evidence bundle: the raw signals submitted for one listing check.
//!
//! Text fields are modelled as [`Signal`] so that "not supplied" can never be
//! confused with a real value. The literal `"none"` (any case) and the empty
//! string both resolve to [`Signal::Absent`]; the check runs on the raw value,
//! before anything is case-folded.
//!
//! Seller numbers are plain `Option`s: omitted means "no evidence", while an
//! explicit `0` / `"0"` is scored like any other value.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::listing::Listing;

/// Literal marker the orchestrator uses for "field not supplied".
pub const SENTINEL_NONE: &str = "none";

/// A free-text evidence field that is either present or explicitly absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "Option<String>")]
pub enum Signal {
    Present(String),
    #[default]
    Absent,
}

impl Signal {
    /// Resolve a raw tool argument. Empty and `"none"` (case-insensitive) are absent.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        if raw.is_empty() || raw.eq_ignore_ascii_case(SENTINEL_NONE) {
            Signal::Absent
        } else {
            Signal::Present(raw)
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            Signal::Present(t) => Some(t.as_str()),
            Signal::Absent => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Signal::Absent)
    }
}

impl From<Option<String>> for Signal {
    fn from(v: Option<String>) -> Self {
        v.map(Signal::from_raw).unwrap_or_default()
    }
}

impl From<&str> for Signal {
    fn from(v: &str) -> Self {
        Signal::from_raw(v)
    }
}

impl From<String> for Signal {
    fn from(v: String) -> Self {
        Signal::from_raw(v)
    }
}

impl Serialize for Signal {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(self.text().unwrap_or(SENTINEL_NONE))
    }
}

/// All signals for one confidence evaluation. Built fresh per call, never mutated
/// by the scorer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvidenceBundle {
    /// Title + description text scanned for suspicious keywords.
    #[serde(default)]
    pub title_flags: Signal,
    /// Seller's total feedback count.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seller_feedback_score: Option<u64>,
    /// Seller's positive-feedback percentage as the marketplace reports it (e.g. "99.4").
    #[serde(
        default,
        deserialize_with = "de_percentage",
        skip_serializing_if = "Option::is_none"
    )]
    pub seller_feedback_percentage: Option<String>,
    #[serde(default)]
    pub review_flags: Signal,
    #[serde(default)]
    pub image_analysis_summary: Signal,
    #[serde(default)]
    pub knowledge_base_matches: Signal,
}

impl EvidenceBundle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Listing-derived evidence: title + description and the seller's reputation.
    pub fn from_listing(listing: &Listing) -> Self {
        let text = format!("{} {}", listing.title, listing.description);
        Self {
            title_flags: Signal::from_raw(text.trim().to_string()),
            seller_feedback_score: Some(listing.feedback_score),
            seller_feedback_percentage: Some(listing.feedback_percentage.clone()),
            ..Self::default()
        }
    }

    pub fn with_title(mut self, text: impl Into<String>) -> Self {
        self.title_flags = Signal::from_raw(text);
        self
    }

    pub fn with_seller(mut self, feedback_score: u64, percentage: impl Into<String>) -> Self {
        self.seller_feedback_score = Some(feedback_score);
        self.seller_feedback_percentage = Some(percentage.into());
        self
    }

    pub fn with_reviews(mut self, text: impl Into<String>) -> Self {
        self.review_flags = Signal::from_raw(text);
        self
    }

    pub fn with_image_analysis(mut self, text: impl Into<String>) -> Self {
        self.image_analysis_summary = Signal::from_raw(text);
        self
    }

    pub fn with_knowledge_base(mut self, text: impl Into<String>) -> Self {
        self.knowledge_base_matches = Signal::from_raw(text);
        self
    }

    /// Parsed feedback percentage. Anything unparseable is treated as no data.
    pub fn feedback_percentage(&self) -> Option<f64> {
        self.seller_feedback_percentage
            .as_deref()
            .and_then(|s| s.trim().parse::<f64>().ok())
    }
}

/// Percentages arrive either as strings ("98.7") or bare JSON numbers.
fn de_percentage<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(f64),
    }
    Ok(Option::<Raw>::deserialize(d)?.map(|r| match r {
        Raw::Text(s) => s,
        Raw::Number(n) => n.to_string(),
    }))
}
