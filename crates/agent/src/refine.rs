//! Evaluator-optimizer loop bodies. The evaluator is a pure scoring pass;
//! the optimizer asks the gateway for a strictly improved draft and absorbs
//! every failure so the loop always terminates.

use tracing::{debug, warn};

use syllabus_core::evaluation;
use syllabus_core::state::{StateUpdate, TurnState};

use crate::gateway::ModelGateway;
use crate::guardrails;
use crate::prompts;

pub fn evaluate(state: &TurnState) -> StateUpdate {
    let score = evaluation::score_response(&state.user_message, &state.response);
    debug!(score, refinements = state.refinement_count, "draft evaluated");
    StateUpdate {
        quality_score: Some(score),
        draft_response: Some(state.response.clone()),
        ..StateUpdate::default()
    }
}

/// One optimizer pass. On gateway failure the prior draft is kept unchanged
/// and the counter still advances, so the loop terminates even under
/// persistent upstream failure.
pub async fn refine(state: &TurnState, gateway: &ModelGateway) -> StateUpdate {
    let prompt = guardrails::guarded_prompt(&prompts::refinement_prompt(
        &state.user_message,
        &state.response,
    ));

    let response = match gateway.generate(&state.model_used, &prompt, &[]).await {
        Ok(improved) => guardrails::screen_response(improved, &state.courses),
        Err(error) => {
            warn!(%error, "refinement call failed, keeping prior draft");
            state.response.clone()
        }
    };

    StateUpdate {
        response: Some(response),
        refinement_count: Some(state.refinement_count + 1),
        ..StateUpdate::default()
    }
}
