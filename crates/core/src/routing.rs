use serde::{Deserialize, Serialize};

use crate::state::Route;

/// Router output. Confidence values are fixed constants per branch, not
/// computed probabilities; this is a deliberate simplification carried over
/// from the source system.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RouteDecision {
    pub route: Route,
    pub reasoning: String,
    pub confidence: f32,
    pub requires_approval: bool,
}

const ENROLLMENT_KEYWORDS: &[&str] =
    &["enroll", "sign up", "register", "join", "take this", "take the"];
const RECOMMENDATION_KEYWORDS: &[&str] =
    &["recommend", "suggest", "what should i", "which course", "best for"];
const COMPLEX_KEYWORDS: &[&str] = &["compare", "analyze", "analyse", "detailed"];
const DISCOVERY_KEYWORDS: &[&str] = &["show", "list", "browse", "search", "find"];

pub const ENROLLMENT_CONFIDENCE: f32 = 0.9;
pub const RECOMMENDATION_CONFIDENCE: f32 = 0.85;
pub const COMPLEX_CONFIDENCE: f32 = 0.8;
pub const DISCOVERY_CONFIDENCE: f32 = 0.8;
pub const DEFAULT_CONFIDENCE: f32 = 0.7;

/// Deterministic keyword router. Keyword sets are evaluated in fixed
/// precedence order: enrollment > recommendation > complex > discovery,
/// with general Q&A as the default.
pub fn classify_by_keywords(message: &str) -> RouteDecision {
    let lowered = message.to_ascii_lowercase();

    if contains_any(&lowered, ENROLLMENT_KEYWORDS) {
        return RouteDecision {
            route: Route::Enrollment,
            reasoning: "keyword match: enrollment intent".to_string(),
            confidence: ENROLLMENT_CONFIDENCE,
            requires_approval: has_bulk_indicator(&lowered),
        };
    }
    if contains_any(&lowered, RECOMMENDATION_KEYWORDS) {
        return RouteDecision {
            route: Route::Recommendation,
            reasoning: "keyword match: recommendation request".to_string(),
            confidence: RECOMMENDATION_CONFIDENCE,
            requires_approval: false,
        };
    }
    if contains_any(&lowered, COMPLEX_KEYWORDS) {
        return RouteDecision {
            route: Route::ComplexQuery,
            reasoning: "keyword match: complex query requiring decomposition".to_string(),
            confidence: COMPLEX_CONFIDENCE,
            requires_approval: false,
        };
    }
    if contains_any(&lowered, DISCOVERY_KEYWORDS) {
        return RouteDecision {
            route: Route::CourseDiscovery,
            reasoning: "keyword match: discovery intent".to_string(),
            confidence: DISCOVERY_CONFIDENCE,
            requires_approval: false,
        };
    }

    RouteDecision {
        route: Route::GeneralQa,
        reasoning: "default: general question".to_string(),
        confidence: DEFAULT_CONFIDENCE,
        requires_approval: false,
    }
}

/// True when the message carries a bulk-enrollment indicator: `all` as a
/// standalone word, or `bulk` anywhere.
pub fn has_bulk_indicator(message: &str) -> bool {
    let lowered = message.to_ascii_lowercase();
    if lowered.contains("bulk") {
        return true;
    }
    lowered.split_whitespace().any(|word| word.trim_matches(|c: char| !c.is_alphanumeric()) == "all")
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}

#[cfg(test)]
mod tests {
    use super::{classify_by_keywords, has_bulk_indicator};
    use crate::state::Route;

    #[test]
    fn enrollment_keywords_take_precedence() {
        // "enroll" and "recommend" both present; enrollment wins.
        let decision = classify_by_keywords("Enroll me in whatever you recommend");
        assert_eq!(decision.route, Route::Enrollment);
        assert!((decision.confidence - 0.9).abs() < f32::EPSILON);
    }

    #[test]
    fn recommendation_beats_discovery() {
        let decision = classify_by_keywords("Show me what you would recommend");
        assert_eq!(decision.route, Route::Recommendation);
    }

    #[test]
    fn comparison_queries_route_to_complex() {
        let decision = classify_by_keywords("Compare the Docker and Kubernetes tracks");
        assert_eq!(decision.route, Route::ComplexQuery);
    }

    #[test]
    fn browsing_routes_to_discovery() {
        let decision = classify_by_keywords("Show me AI courses");
        assert_eq!(decision.route, Route::CourseDiscovery);
        assert!(!decision.requires_approval);
    }

    #[test]
    fn unmatched_message_defaults_to_general_qa() {
        let decision = classify_by_keywords("How long does a certificate stay valid?");
        assert_eq!(decision.route, Route::GeneralQa);
        assert!((decision.confidence - 0.7).abs() < f32::EPSILON);
    }

    #[test]
    fn bulk_enrollment_requires_approval() {
        let decision = classify_by_keywords("enroll me in all courses");
        assert_eq!(decision.route, Route::Enrollment);
        assert!(decision.requires_approval);
    }

    #[test]
    fn bulk_indicator_requires_standalone_all() {
        assert!(has_bulk_indicator("sign me up for all of them"));
        assert!(has_bulk_indicator("bulk enrollment please"));
        // "all" embedded in another word must not trigger.
        assert!(!has_bulk_indicator("enroll me in the overall basics course"));
    }
}
