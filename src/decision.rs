//! Confidence tiers, buyer guidance, and the scoring result shape.
//!
//! Tiers have inclusive lower bounds (85 / 60 / 30). The two tiers below 60
//! keep distinct labels but share one "do not purchase" action list.

use serde::{Serialize, Serializer};

pub const HIGH_MIN: i32 = 85;
pub const MEDIUM_MIN: i32 = 60;
pub const LOW_MIN: i32 = 30;

/// Qualitative confidence band derived from the numeric score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    High,
    Medium,
    Low,
    VeryLow,
}

const LOW_RISK_STEPS: &[&str] = &[
    "Item appears legitimate based on available signals",
    "Still recommended to inspect in person if possible",
    "Check return policy before purchasing",
];

const GATHER_EVIDENCE_STEPS: &[&str] = &[
    "Request additional photos (labels, tags, hardware closeups)",
    "Ask seller about provenance and where they got it",
    "Consider using a professional authentication service",
    "Check seller's other listings for patterns",
];

const DO_NOT_PURCHASE_STEPS: &[&str] = &[
    "DO NOT purchase without professional authentication",
    "Multiple red flags detected - high risk of counterfeit",
    "Report listing if you believe it violates platform rules",
    "Look for the same item from a more reputable seller",
];

impl Tier {
    pub fn from_score(score: i32) -> Self {
        if score >= HIGH_MIN {
            Tier::High
        } else if score >= MEDIUM_MIN {
            Tier::Medium
        } else if score >= LOW_MIN {
            Tier::Low
        } else {
            Tier::VeryLow
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Tier::High => "HIGH - likely authentic",
            Tier::Medium => "MEDIUM - some concerns, proceed with caution",
            Tier::Low => "LOW - significant red flags detected",
            Tier::VeryLow => "VERY LOW - almost certainly not authentic",
        }
    }

    /// Short lowercase key, used as a metrics label.
    pub fn key(self) -> &'static str {
        match self {
            Tier::High => "high",
            Tier::Medium => "medium",
            Tier::Low => "low",
            Tier::VeryLow => "very_low",
        }
    }

    pub fn next_steps(self) -> &'static [&'static str] {
        match self {
            Tier::High => LOW_RISK_STEPS,
            Tier::Medium => GATHER_EVIDENCE_STEPS,
            Tier::Low | Tier::VeryLow => DO_NOT_PURCHASE_STEPS,
        }
    }
}

impl Serialize for Tier {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(self.label())
    }
}

/// Outcome of one confidence evaluation. Owned by the caller once returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoringResult {
    /// 0..=100
    pub score: u8,
    /// Serialized as the tier label, e.g. "HIGH - likely authentic".
    #[serde(rename = "level")]
    pub tier: Tier,
    pub reasons: Vec<String>,
    pub next_steps: Vec<String>,
}

impl ScoringResult {
    /// Build from a final score; the score is clamped to [0, 100].
    pub fn new(score: i32, reasons: Vec<String>) -> Self {
        let score = score.clamp(0, 100);
        let tier = Tier::from_score(score);
        Self {
            score: score as u8,
            tier,
            reasons,
            next_steps: tier.next_steps().iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn level(&self) -> &'static str {
        self.tier.label()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tier_boundaries_are_inclusive() {
        let cases = [
            (100, Tier::High),
            (85, Tier::High),
            (84, Tier::Medium),
            (60, Tier::Medium),
            (59, Tier::Low),
            (30, Tier::Low),
            (29, Tier::VeryLow),
            (0, Tier::VeryLow),
        ];
        for (score, tier) in cases {
            assert_eq!(Tier::from_score(score), tier, "score {score}");
        }
    }

    #[test]
    fn low_tiers_share_one_template() {
        assert_eq!(Tier::Low.next_steps(), Tier::VeryLow.next_steps());
        assert_ne!(Tier::Low.label(), Tier::VeryLow.label());
        assert_eq!(Tier::High.next_steps().len(), 3);
        assert_eq!(Tier::Medium.next_steps().len(), 4);
    }

    #[test]
    fn serialized_shape() {
        let r = ScoringResult::new(72, vec!["x".into()]);
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["score"], json!(72));
        assert_eq!(
            v["level"],
            json!("MEDIUM - some concerns, proceed with caution")
        );
        assert_eq!(v["reasons"], json!(["x"]));
        assert_eq!(v["next_steps"].as_array().map(|a| a.len()), Some(4));
    }

    #[test]
    fn out_of_range_scores_are_clamped() {
        assert_eq!(ScoringResult::new(-20, vec![]).score, 0);
        assert_eq!(ScoringResult::new(140, vec![]).score, 100);
    }
}
