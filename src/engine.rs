//! # Confidence Engine
//! Pure entry point that maps an [`EvidenceBundle`] to a [`ScoringResult`].
//! No I/O, no shared state: safe to call from any number of tasks at once.
//!
//! Telemetry (a debug event and two metrics) is emitted on the side and never
//! feeds back into the result.

use metrics::{counter, histogram};
use tracing::debug;

use crate::analyze::rules::apply_rules;
use crate::decision::ScoringResult;
use crate::evidence::EvidenceBundle;

/// Score one listing's evidence.
pub fn calculate_confidence_score(evidence: &EvidenceBundle) -> ScoringResult {
    let tally = apply_rules(evidence);
    let result = ScoringResult::new(tally.score, tally.reasons);

    debug!(
        target: "authlayer::engine",
        id = %evidence_id(evidence),
        score = result.score,
        tier = result.tier.key(),
        reasons = result.reasons.len(),
        "confidence scored"
    );
    counter!("confidence_scores_total", "tier" => result.tier.key()).increment(1);
    histogram!("confidence_score").record(f64::from(result.score));

    result
}

/// Short anonymized id for logs; raw listing text is never logged.
pub fn evidence_id(evidence: &EvidenceBundle) -> String {
    let raw = serde_json::to_string(evidence).unwrap_or_default();
    crate::logging::anon_hash(&raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::Tier;

    #[test]
    fn empty_bundle_is_clean() {
        let r = calculate_confidence_score(&EvidenceBundle::new());
        assert_eq!(r.score, 100);
        assert_eq!(r.tier, Tier::High);
        assert_eq!(r.reasons, vec!["no red flags detected"]);
    }

    #[test]
    fn stacked_vision_penalties_clamp_to_zero() {
        let e = EvidenceBundle::new()
            .with_image_analysis("fake: DWMZ label, heel tab puffy, suspicious, inconsistent")
            .with_knowledge_base("DWMZ is a known fake marker");
        // 100 - 50 - 30 - 40 - 40 - 15 = -75 -> 0
        let r = calculate_confidence_score(&e);
        assert_eq!(r.score, 0);
        assert_eq!(r.tier, Tier::VeryLow);
        assert_eq!(r.reasons.len(), 5);
    }

    #[test]
    fn evidence_id_is_stable_and_short() {
        let e = EvidenceBundle::new().with_title("GAT");
        assert_eq!(evidence_id(&e), evidence_id(&e.clone()));
        assert_eq!(evidence_id(&e).len(), 12);
    }
}
