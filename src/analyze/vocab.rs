//! Fixed vocabularies and the predicates the scoring rules are built from.
//!
//! All matching is plain substring search over a case-folded copy of the
//! field ([`Folded`]). Each vocabulary exposes the combination rule it is
//! used with explicitly:
//! - `first_match`   : first entry (in list order) found in the text, scan stops there
//! - `distinct_hits` : number of entries found, each counted once
//! - `any_hit`       : true if any entry is found

/// Case-folded view of one evidence field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Folded(String);

impl Folded {
    pub fn new(raw: &str) -> Self {
        Self(raw.to_lowercase())
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.0.contains(needle)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Named, ordered token list. Order matters for `first_match`.
#[derive(Debug, Clone, Copy)]
pub struct Vocabulary {
    pub name: &'static str,
    pub tokens: &'static [&'static str],
}

impl Vocabulary {
    pub fn first_match(&self, text: &Folded) -> Option<&'static str> {
        self.tokens.iter().copied().find(|t| text.contains(t))
    }

    /// Every token found, in list order. Used where a scan must skip past exempt hits.
    pub fn matches<'a>(&'a self, text: &'a Folded) -> impl Iterator<Item = &'static str> + 'a {
        self.tokens.iter().copied().filter(move |t| text.contains(t))
    }

    pub fn distinct_hits(&self, text: &Folded) -> usize {
        self.matches(text).count()
    }

    pub fn any_hit(&self, text: &Folded) -> bool {
        self.tokens.iter().any(|t| text.contains(t))
    }
}

/// Title/description and buyer-review keywords that mark a listing as a fake.
pub const SUSPICIOUS_KEYWORDS: Vocabulary = Vocabulary {
    name: "suspicious_keywords",
    tokens: &[
        "fake",
        "not real",
        "dupe",
        "dup",
        "copycat",
        "not authentic",
        "non-authentic",
        "counterfeit",
        "imitation",
        "rep",
        "knockoff",
        "not auth",
    ],
};

pub const VISION_STRONG_FAKE: Vocabulary = Vocabulary {
    name: "vision_strong_fake",
    tokens: &[
        "fake",
        "counterfeit",
        "not authentic",
        "replica fake",
        "definitely fake",
    ],
};

pub const VISION_MODERATE_CONCERN: Vocabulary = Vocabulary {
    name: "vision_moderate_concern",
    tokens: &[
        "suspicious",
        "concerning",
        "inconsistent",
        "poor quality",
        "red flag",
        "puffy",
        "overstuffed",
        "bloated",
    ],
};

pub const VISION_POSITIVE: Vocabulary = Vocabulary {
    name: "vision_positive",
    tokens: &[
        "authentic",
        "genuine",
        "looks real",
        "matches authentic",
        "correct",
        "proper",
    ],
};

/// Words that, next to "heel tab", describe the overstuffed GAT heel of a fake.
pub const HEEL_TAB_BULK: Vocabulary = Vocabulary {
    name: "heel_tab_bulk",
    tokens: &["puffy", "thick", "overstuffed", "bloated", "bulky"],
};

pub const KNOWLEDGE_BASE_PATTERNS: Vocabulary = Vocabulary {
    name: "knowledge_base_patterns",
    tokens: &["dwmz", "puffy heel", "overstuffed", "patch on patch"],
};

/// Marking printed on counterfeit Margiela knitwear.
pub const DWMZ_MARKING: &str = "dwmz";

/// Keyword that collides with the Margiela "Replica" line name.
pub const REPLICA_KEYWORD: &str = "rep";

/// Margiela sells a genuine line called "Replica". A `rep` hit is exempt when the
/// same field also names both the line and the brand. No other keyword is exempt.
pub fn replica_line_exception(text: &Folded, keyword: &str) -> bool {
    keyword == REPLICA_KEYWORD && text.contains("replica") && text.contains("margiela")
}

/// "heel tab" together with any bulk word anywhere in the same text.
pub fn heel_tab_bulk(text: &Folded) -> bool {
    text.contains("heel tab") && HEEL_TAB_BULK.any_hit(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_match_follows_list_order() {
        // "dupe" precedes "dup" in the list even though both match.
        let t = Folded::new("Cheap DUPE of the GATs");
        assert_eq!(SUSPICIOUS_KEYWORDS.first_match(&t), Some("dupe"));
        assert_eq!(SUSPICIOUS_KEYWORDS.first_match(&Folded::new("brand new")), None);
    }

    #[test]
    fn distinct_hits_counts_each_token_once() {
        let t = Folded::new("suspicious stitching, suspicious label, puffy heel");
        assert_eq!(VISION_MODERATE_CONCERN.distinct_hits(&t), 2);
    }

    #[test]
    fn substring_semantics_are_kept() {
        // "representative" contains "rep"; matching is substring, not word based.
        let t = Folded::new("Customer representative");
        assert_eq!(SUSPICIOUS_KEYWORDS.first_match(&t), Some("rep"));
    }

    #[test]
    fn replica_exception_only_for_rep() {
        let t = Folded::new("Maison Margiela Replica GAT");
        assert!(replica_line_exception(&t, "rep"));
        assert!(!replica_line_exception(&t, "fake"));
        assert!(!replica_line_exception(&Folded::new("Nike replica"), "rep"));
    }

    #[test]
    fn heel_tab_needs_a_bulk_word() {
        assert!(heel_tab_bulk(&Folded::new("The heel tab looks BULKY")));
        assert!(!heel_tab_bulk(&Folded::new("heel tab flat and flush")));
        assert!(!heel_tab_bulk(&Folded::new("thick suede, tab missing")));
    }
}
