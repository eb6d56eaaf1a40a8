//! Intent routing. Model-assisted first, with the deterministic keyword
//! router as the fallback when the model call fails or its answer contains
//! no recognizable intent.

use tracing::debug;

use syllabus_core::routing::{self, RouteDecision};
use syllabus_core::state::Route;

use crate::gateway::ModelGateway;
use crate::prompts;

pub async fn classify_route(
    gateway: &ModelGateway,
    model_id: &str,
    message: &str,
) -> RouteDecision {
    let prompt = prompts::routing_prompt(message);
    match gateway.generate(model_id, &prompt, &[]).await {
        Ok(text) => match parse_intent(&text) {
            Some(route) => {
                debug!(route = route.as_str(), "model-assisted route");
                decision_for(route, message)
            }
            None => {
                debug!("model answer had no recognizable intent, using keyword router");
                routing::classify_by_keywords(message)
            }
        },
        Err(error) => {
            debug!(%error, "model routing failed, using keyword router");
            routing::classify_by_keywords(message)
        }
    }
}

fn parse_intent(text: &str) -> Option<Route> {
    let lowered = text.to_ascii_lowercase();

    // Precedence mirrors the keyword router, so a rambling answer that
    // names several intents resolves the same way a keyword match would.
    if lowered.contains("enrollment") {
        Some(Route::Enrollment)
    } else if lowered.contains("recommendation") {
        Some(Route::Recommendation)
    } else if lowered.contains("complex_query") {
        Some(Route::ComplexQuery)
    } else if lowered.contains("course_discovery") || lowered.contains("discovery") {
        Some(Route::CourseDiscovery)
    } else if lowered.contains("general_qa") {
        Some(Route::GeneralQa)
    } else {
        None
    }
}

fn decision_for(route: Route, message: &str) -> RouteDecision {
    let requires_approval =
        route == Route::Enrollment && routing::has_bulk_indicator(message);

    let (confidence, reasoning) = match route {
        Route::Enrollment => (routing::ENROLLMENT_CONFIDENCE, "model: enrollment intent"),
        Route::Recommendation => {
            (routing::RECOMMENDATION_CONFIDENCE, "model: recommendation request")
        }
        Route::ComplexQuery => (routing::COMPLEX_CONFIDENCE, "model: complex query"),
        Route::CourseDiscovery => (routing::DISCOVERY_CONFIDENCE, "model: discovery intent"),
        Route::GeneralQa => (routing::DEFAULT_CONFIDENCE, "model: general question"),
    };

    RouteDecision {
        route,
        reasoning: reasoning.to_string(),
        confidence,
        requires_approval,
    }
}
