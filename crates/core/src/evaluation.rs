//! Response quality scoring and the refinement-loop decision.

/// Score at or above this threshold is acceptable as-is.
pub const QUALITY_THRESHOLD: f32 = 0.7;

/// Hard ceiling on optimizer passes per turn.
pub const MAX_REFINEMENTS: u32 = 2;

const HELPFULNESS_MARKERS: &[&str] = &["course", "learn", "enroll", "study"];

/// Next step after an evaluator pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QualityVerdict {
    Acceptable,
    NeedsRefinement,
    /// Below threshold but the refinement budget is spent; accept anyway.
    BudgetExhausted,
}

/// Deterministic heuristic quality score in [0, 1].
///
/// Base 0.5, plus length bonuses (>100 and >200 chars), a word-overlap bonus
/// against the user's message, a helpfulness-marker bonus, and a small bonus
/// for engagement punctuation. A response under 10 characters is force-scored
/// at 0.3 regardless of the other factors.
pub fn score_response(user_message: &str, response: &str) -> f32 {
    if response.len() < 10 {
        return 0.3;
    }

    let mut score: f32 = 0.5;

    if response.len() > 100 {
        score += 0.1;
    }
    if response.len() > 200 {
        score += 0.1;
    }
    if word_overlap(user_message, response) > 2 {
        score += 0.1;
    }

    let lowered = response.to_ascii_lowercase();
    if HELPFULNESS_MARKERS.iter().any(|marker| lowered.contains(marker)) {
        score += 0.1;
    }
    if response.contains('?') || response.contains('!') {
        score += 0.05;
    }

    score.min(1.0)
}

/// Conditional edge after the evaluator: accept at threshold, refine while
/// budget remains, otherwise force-accept.
pub fn quality_decision(
    quality_score: f32,
    refinement_count: u32,
    max_refinements: u32,
) -> QualityVerdict {
    if quality_score >= QUALITY_THRESHOLD {
        QualityVerdict::Acceptable
    } else if refinement_count < max_refinements {
        QualityVerdict::NeedsRefinement
    } else {
        QualityVerdict::BudgetExhausted
    }
}

fn word_overlap(left: &str, right: &str) -> usize {
    let left_lower = left.to_ascii_lowercase();
    let right_lower = right.to_ascii_lowercase();
    let right_words: std::collections::BTreeSet<&str> = right_lower.split_whitespace().collect();

    let mut seen = std::collections::BTreeSet::new();
    left_lower
        .split_whitespace()
        .filter(|word| seen.insert(*word) && right_words.contains(word))
        .count()
}

#[cfg(test)]
mod tests {
    use super::{quality_decision, score_response, QualityVerdict, MAX_REFINEMENTS};

    #[test]
    fn tiny_responses_are_force_scored_low() {
        assert!((score_response("anything", "ok") - 0.3).abs() < f32::EPSILON);
    }

    #[test]
    fn rich_response_clears_the_threshold() {
        let message = "what courses do you offer for docker";
        let response = "We offer several courses you can learn from! The Docker Mastery \
                        course is a beginner-friendly option where you study containers \
                        end to end, and you can enroll whenever you're ready. Would you \
                        like more detail on what the course covers?";
        let score = score_response(message, response);
        assert!(score >= 0.7, "score was {score}");
    }

    #[test]
    fn short_plain_response_needs_refinement() {
        let score = score_response("tell me about certificates", "They are issued monthly.");
        assert!(score < 0.7, "score was {score}");
    }

    #[test]
    fn score_never_exceeds_one() {
        let message = "course learn enroll study docker kubernetes devops";
        let response = format!("{} {}", "course learn enroll study!".repeat(20), message);
        assert!(score_response(message, &response) <= 1.0);
    }

    #[test]
    fn decision_accepts_at_threshold() {
        assert_eq!(quality_decision(0.7, 0, MAX_REFINEMENTS), QualityVerdict::Acceptable);
        assert_eq!(quality_decision(0.95, 2, MAX_REFINEMENTS), QualityVerdict::Acceptable);
    }

    #[test]
    fn decision_refines_below_threshold_while_budget_remains() {
        assert_eq!(quality_decision(0.5, 0, MAX_REFINEMENTS), QualityVerdict::NeedsRefinement);
        assert_eq!(quality_decision(0.5, 1, MAX_REFINEMENTS), QualityVerdict::NeedsRefinement);
    }

    #[test]
    fn exhausted_budget_forces_acceptance() {
        assert_eq!(
            quality_decision(0.1, MAX_REFINEMENTS, MAX_REFINEMENTS),
            QualityVerdict::BudgetExhausted
        );
        assert_eq!(
            quality_decision(0.1, MAX_REFINEMENTS + 1, MAX_REFINEMENTS),
            QualityVerdict::BudgetExhausted
        );
    }
}
