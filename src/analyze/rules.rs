//! Ordered scoring rules.
//!
//! The score starts at [`START_SCORE`] and is folded through [`RULES`] in a fixed
//! order. Later rules see the running score left by earlier ones, so the order
//! is part of the contract:
//! 1. vision: strong fake wording (first match only)
//! 2. vision: moderate concerns (distinct count, capped)
//! 3. vision: positive wording (only when rule 2 found nothing)
//! 4. vision: DWMZ marking
//! 5. vision: puffy heel tab
//! 6. knowledge base: known counterfeit patterns
//! 7. title/description keywords (Margiela Replica exception, floor-style penalty)
//! 8. seller feedback count
//! 9. seller feedback percentage
//! 10. buyer review keywords
//!
//! The running score may dip below zero between rules; [`apply_rules`] clamps
//! once at the end.

use crate::analyze::vocab::{
    heel_tab_bulk, replica_line_exception, Folded, DWMZ_MARKING, KNOWLEDGE_BASE_PATTERNS,
    SUSPICIOUS_KEYWORDS, VISION_MODERATE_CONCERN, VISION_POSITIVE, VISION_STRONG_FAKE,
};
use crate::evidence::{EvidenceBundle, Signal};

pub const START_SCORE: i32 = 100;
pub const MAX_SCORE: i32 = 100;

pub const STRONG_FAKE_PENALTY: i32 = 50;
pub const CONCERN_PENALTY_EACH: i32 = 10;
pub const CONCERN_PENALTY_CAP: i32 = 40;
pub const POSITIVE_MIN_HITS: usize = 2;
pub const POSITIVE_BONUS: i32 = 10;
pub const DWMZ_PENALTY: i32 = 40;
pub const HEEL_TAB_PENALTY: i32 = 40;
pub const KNOWLEDGE_BASE_PENALTY: i32 = 15;
pub const TITLE_KEYWORD_PENALTY: i32 = 95;
pub const NEW_ACCOUNT_PENALTY: i32 = 15;
pub const LOW_FEEDBACK_COUNT: u64 = 10;
pub const LOW_FEEDBACK_PENALTY: i32 = 10;
pub const PCT_CONCERNING_BELOW: f64 = 90.0;
pub const PCT_CONCERNING_PENALTY: i32 = 15;
pub const PCT_BELOW_AVERAGE_BELOW: f64 = 95.0;
pub const PCT_BELOW_AVERAGE_PENALTY: i32 = 5;
pub const REVIEW_KEYWORD_PENALTY: i32 = 25;

/// Reason recorded when no rule had anything to say.
pub const NO_RED_FLAGS: &str = "no red flags detected";

/// Running score and reason trail threaded through the rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tally {
    pub score: i32,
    pub reasons: Vec<String>,
    /// Distinct moderate-concern hits from the vision text (rule 2), read by rule 3.
    pub concern_count: usize,
}

impl Default for Tally {
    fn default() -> Self {
        Self {
            score: START_SCORE,
            reasons: Vec::new(),
            concern_count: 0,
        }
    }
}

impl Tally {
    pub fn new() -> Self {
        Self::default()
    }

    fn penalize(&mut self, points: i32, reason: impl Into<String>) {
        self.score -= points;
        self.reasons.push(reason.into());
    }

    fn note(&mut self, reason: impl Into<String>) {
        self.reasons.push(reason.into());
    }
}

/// One named step of the scoring pipeline.
#[derive(Clone, Copy)]
pub struct Rule {
    pub name: &'static str,
    pub apply: fn(&EvidenceBundle, &mut Tally),
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule").field("name", &self.name).finish()
    }
}

pub const RULES: &[Rule] = &[
    Rule {
        name: "vision_strong_fake",
        apply: vision_strong_fake,
    },
    Rule {
        name: "vision_moderate_concerns",
        apply: vision_moderate_concerns,
    },
    Rule {
        name: "vision_positive_signals",
        apply: vision_positive_signals,
    },
    Rule {
        name: "vision_dwmz_marking",
        apply: vision_dwmz_marking,
    },
    Rule {
        name: "vision_heel_tab",
        apply: vision_heel_tab,
    },
    Rule {
        name: "knowledge_base_patterns",
        apply: knowledge_base_patterns,
    },
    Rule {
        name: "title_keywords",
        apply: title_keywords,
    },
    Rule {
        name: "seller_feedback_count",
        apply: seller_feedback_count,
    },
    Rule {
        name: "seller_feedback_percentage",
        apply: seller_feedback_percentage,
    },
    Rule {
        name: "review_keywords",
        apply: review_keywords,
    },
];

/// Run every rule in order and apply the final lower clamp.
pub fn apply_rules(evidence: &EvidenceBundle) -> Tally {
    let mut tally = Tally::new();
    for rule in RULES {
        (rule.apply)(evidence, &mut tally);
    }
    tally.score = tally.score.max(0);
    if tally.reasons.is_empty() {
        tally.reasons.push(NO_RED_FLAGS.to_string());
    }
    tally
}

fn folded(signal: &Signal) -> Option<Folded> {
    signal.text().map(Folded::new)
}

// --- primary signals: vision + knowledge base ---

pub fn vision_strong_fake(e: &EvidenceBundle, t: &mut Tally) {
    let Some(img) = folded(&e.image_analysis_summary) else {
        return;
    };
    if let Some(word) = VISION_STRONG_FAKE.first_match(&img) {
        t.penalize(
            STRONG_FAKE_PENALTY,
            format!("Image analysis indicates item is likely fake: '{word}' detected"),
        );
    }
}

pub fn vision_moderate_concerns(e: &EvidenceBundle, t: &mut Tally) {
    let Some(img) = folded(&e.image_analysis_summary) else {
        return;
    };
    let count = VISION_MODERATE_CONCERN.distinct_hits(&img);
    t.concern_count = count;
    if count > 0 {
        let penalty = (count as i32 * CONCERN_PENALTY_EACH).min(CONCERN_PENALTY_CAP);
        t.penalize(
            penalty,
            format!("Image analysis found {count} visual concern(s)"),
        );
    }
}

pub fn vision_positive_signals(e: &EvidenceBundle, t: &mut Tally) {
    let Some(img) = folded(&e.image_analysis_summary) else {
        return;
    };
    // Any concern at all cancels the add-back.
    if t.concern_count > 0 {
        return;
    }
    if VISION_POSITIVE.distinct_hits(&img) >= POSITIVE_MIN_HITS {
        t.score = (t.score + POSITIVE_BONUS).min(MAX_SCORE);
        t.note("Image analysis found multiple indicators of authenticity");
    }
}

pub fn vision_dwmz_marking(e: &EvidenceBundle, t: &mut Tally) {
    let Some(img) = folded(&e.image_analysis_summary) else {
        return;
    };
    if img.contains(DWMZ_MARKING) {
        t.penalize(
            DWMZ_PENALTY,
            "DWMZ marking detected - known fake indicator for Margiela knitwear",
        );
    }
}

pub fn vision_heel_tab(e: &EvidenceBundle, t: &mut Tally) {
    let Some(img) = folded(&e.image_analysis_summary) else {
        return;
    };
    if heel_tab_bulk(&img) {
        t.penalize(
            HEEL_TAB_PENALTY,
            "Heel tab appears puffy/overstuffed - primary fake indicator for Margiela GATs",
        );
    }
}

pub fn knowledge_base_patterns(e: &EvidenceBundle, t: &mut Tally) {
    let Some(kb) = folded(&e.knowledge_base_matches) else {
        return;
    };
    if KNOWLEDGE_BASE_PATTERNS.any_hit(&kb) {
        t.penalize(
            KNOWLEDGE_BASE_PENALTY,
            "Knowledge base flags match known counterfeit patterns",
        );
    }
}

// --- secondary signals: listing text, seller, reviews ---

/// First non-exempt keyword pulls the score down by 95, floored at zero.
/// An exempt `rep` records the exception and the scan moves on.
pub fn title_keywords(e: &EvidenceBundle, t: &mut Tally) {
    let Some(title) = folded(&e.title_flags) else {
        return;
    };
    for keyword in SUSPICIOUS_KEYWORDS.matches(&title) {
        if replica_line_exception(&title, keyword) {
            t.note(
                "'Replica' found but this is normal for the Margiela Replica line - replica line exception, no penalty",
            );
            continue;
        }
        t.score = (t.score - TITLE_KEYWORD_PENALTY).max(0);
        t.note(format!(
            "Suspicious keyword '{keyword}' found in title/description - almost certainly not authentic"
        ));
        break;
    }
}

/// Seller reputation is secondary evidence: only brand-new and very young
/// accounts are penalized.
pub fn seller_feedback_count(e: &EvidenceBundle, t: &mut Tally) {
    match e.seller_feedback_score {
        Some(0) => t.penalize(
            NEW_ACCOUNT_PENALTY,
            "Seller has 0 feedback - new account, caution (this alone does not mean fake)",
        ),
        Some(n) if n < LOW_FEEDBACK_COUNT => t.penalize(
            LOW_FEEDBACK_PENALTY,
            format!("Seller has low feedback count ({n}) - relatively new account"),
        ),
        _ => {}
    }
}

pub fn seller_feedback_percentage(e: &EvidenceBundle, t: &mut Tally) {
    let Some(pct) = e.feedback_percentage() else {
        return;
    };
    if pct < PCT_CONCERNING_BELOW {
        t.penalize(
            PCT_CONCERNING_PENALTY,
            format!("Seller feedback percentage is concerning ({pct}%)"),
        );
    } else if pct < PCT_BELOW_AVERAGE_BELOW {
        t.penalize(
            PCT_BELOW_AVERAGE_PENALTY,
            format!("Seller feedback percentage is below average ({pct}%)"),
        );
    }
}

pub fn review_keywords(e: &EvidenceBundle, t: &mut Tally) {
    let Some(reviews) = folded(&e.review_flags) else {
        return;
    };
    if let Some(keyword) = SUSPICIOUS_KEYWORDS.first_match(&reviews) {
        t.penalize(
            REVIEW_KEYWORD_PENALTY,
            format!("Buyer reviews mention '{keyword}' - concerning"),
        );
    }
}
