//! The turn graph: an explicit state machine over tagged nodes. Each node
//! applies a partial update to the shared [`TurnState`] and names its
//! successor; conditional edges are ordinary `match` arms on the state.

use std::sync::Arc;

use tracing::{debug, info};

use syllabus_core::approval::{evaluate_gate, ApprovalState, GateOutcome, InterruptPayload};
use syllabus_core::catalog::CourseStore;
use syllabus_core::config::AgentSettings;
use syllabus_core::errors::TurnError;
use syllabus_core::evaluation::{quality_decision, QualityVerdict};
use syllabus_core::history;
use syllabus_core::state::{Route, StateUpdate, TurnState};
use syllabus_core::suggestions;

use crate::gateway::ModelGateway;
use crate::handlers;
use crate::orchestrator;
use crate::refine;
use crate::router;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Node {
    LoadCatalog,
    Route,
    ApprovalGate,
    CourseDiscovery,
    Enrollment,
    Recommendation,
    GeneralQa,
    Orchestrate,
    Workers,
    Evaluate,
    Refine,
    Suggest,
}

impl Node {
    pub fn name(self) -> &'static str {
        match self {
            Self::LoadCatalog => "load_catalog",
            Self::Route => "route",
            Self::ApprovalGate => "approval_gate",
            Self::CourseDiscovery => "course_discovery",
            Self::Enrollment => "enrollment",
            Self::Recommendation => "recommendation",
            Self::GeneralQa => "general_qa",
            Self::Orchestrate => "orchestrate",
            Self::Workers => "workers",
            Self::Evaluate => "evaluate",
            Self::Refine => "refine",
            Self::Suggest => "suggest",
        }
    }
}

pub enum StepOutcome {
    Continue(Node),
    Suspend(InterruptPayload),
    Finish,
}

/// Shared collaborators for one turn. Cheap to clone per conversation; runs
/// never share mutable state except through the external store.
#[derive(Clone)]
pub struct TurnContext {
    pub gateway: Arc<ModelGateway>,
    pub store: Arc<dyn CourseStore>,
    pub settings: AgentSettings,
}

/// Walks the graph from `start` until it finishes or suspends, applying each
/// node's partial update before evaluating the outgoing edge. `observer` is
/// invoked after every committed node, which backs the streaming mode.
pub async fn execute_from(
    start: Node,
    state: &mut TurnState,
    ctx: &TurnContext,
    observer: &mut (dyn FnMut(Node, &TurnState) + Send),
) -> Result<Option<InterruptPayload>, TurnError> {
    let mut node = start;
    loop {
        let outcome = run_node(node, state, ctx).await?;
        debug!(node = node.name(), "node committed");
        observer(node, state);
        match outcome {
            StepOutcome::Continue(next) => node = next,
            StepOutcome::Suspend(payload) => {
                info!(node = node.name(), "turn suspended for approval");
                return Ok(Some(payload));
            }
            StepOutcome::Finish => return Ok(None),
        }
    }
}

async fn run_node(
    node: Node,
    state: &mut TurnState,
    ctx: &TurnContext,
) -> Result<StepOutcome, TurnError> {
    match node {
        Node::LoadCatalog => {
            let courses = ctx.store.fetch_courses(None).await?;
            let trimmed = history::trim_history(
                state.history.clone(),
                ctx.settings.max_messages,
                ctx.settings.max_context_chars,
            );
            StateUpdate {
                courses: Some(courses),
                history: Some(trimmed),
                ..StateUpdate::default()
            }
            .apply(state);
            Ok(StepOutcome::Continue(Node::Route))
        }

        Node::Route => {
            let decision =
                router::classify_route(&ctx.gateway, &state.model_used, &state.user_message).await;
            info!(
                route = decision.route.as_str(),
                confidence = decision.confidence,
                "turn routed"
            );
            let route = decision.route;
            StateUpdate {
                route: Some(decision.route),
                route_confidence: Some(decision.confidence),
                route_reasoning: Some(decision.reasoning),
                requires_approval: Some(decision.requires_approval),
                ..StateUpdate::default()
            }
            .apply(state);

            Ok(StepOutcome::Continue(match route {
                Route::Enrollment => Node::ApprovalGate,
                Route::CourseDiscovery => Node::CourseDiscovery,
                Route::Recommendation => Node::Recommendation,
                Route::ComplexQuery => Node::Orchestrate,
                Route::GeneralQa => Node::GeneralQa,
            }))
        }

        Node::ApprovalGate => {
            // The gate counts catalog titles textually present in the
            // message, not resolved enrollment targets. An explicit "all"
            // with no titles named means the whole catalog.
            let lowered = state.user_message.to_ascii_lowercase();
            let mut mentioned: Vec<_> = state
                .courses
                .iter()
                .filter(|course| lowered.contains(&course.title.to_ascii_lowercase()))
                .cloned()
                .collect();
            if mentioned.is_empty() && syllabus_core::routing::has_bulk_indicator(&lowered) {
                mentioned = state.courses.clone();
            }

            match evaluate_gate(&state.user_message, &mentioned) {
                GateOutcome::Proceed => {
                    StateUpdate {
                        approval: Some(ApprovalState::AutoApproved),
                        ..StateUpdate::default()
                    }
                    .apply(state);
                    Ok(StepOutcome::Continue(Node::Enrollment))
                }
                GateOutcome::Suspend(payload) => {
                    StateUpdate {
                        approval: Some(ApprovalState::Pending),
                        approval_message: Some(payload.message.clone()),
                        interrupt: Some(payload.clone()),
                        ..StateUpdate::default()
                    }
                    .apply(state);
                    Ok(StepOutcome::Suspend(payload))
                }
            }
        }

        Node::CourseDiscovery => {
            handlers::course_discovery(state, &ctx.gateway).await?.apply(state);
            Ok(StepOutcome::Continue(Node::Evaluate))
        }

        Node::Enrollment => {
            handlers::enrollment(state, ctx.store.as_ref()).await?.apply(state);
            Ok(StepOutcome::Continue(Node::Evaluate))
        }

        Node::Recommendation => {
            handlers::recommendation(state, &ctx.gateway).await?.apply(state);
            Ok(StepOutcome::Continue(Node::Evaluate))
        }

        Node::GeneralQa => {
            handlers::general_qa(state, &ctx.gateway).await?.apply(state);
            Ok(StepOutcome::Continue(Node::Evaluate))
        }

        Node::Orchestrate => {
            StateUpdate {
                subtasks: Some(orchestrator::decompose(&state.user_message)),
                subtask_results: Some(Vec::new()),
                ..StateUpdate::default()
            }
            .apply(state);
            Ok(StepOutcome::Continue(Node::Workers))
        }

        Node::Workers => {
            orchestrator::run_workers(state, &ctx.gateway).await.apply(state);
            Ok(StepOutcome::Continue(Node::Evaluate))
        }

        Node::Evaluate => {
            refine::evaluate(state).apply(state);
            let score = state.quality_score.unwrap_or(0.0);
            let verdict =
                quality_decision(score, state.refinement_count, ctx.settings.max_refinements);
            Ok(StepOutcome::Continue(match verdict {
                QualityVerdict::NeedsRefinement => Node::Refine,
                QualityVerdict::Acceptable | QualityVerdict::BudgetExhausted => Node::Suggest,
            }))
        }

        Node::Refine => {
            refine::refine(state, &ctx.gateway).await.apply(state);
            Ok(StepOutcome::Continue(Node::Evaluate))
        }

        Node::Suggest => {
            StateUpdate {
                suggestions: Some(suggestions::generate_suggestions(
                    &state.user_message,
                    state.effective_route(),
                    &state.enrollment_results,
                )),
                ..StateUpdate::default()
            }
            .apply(state);
            Ok(StepOutcome::Finish)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{execute_from, Node, TurnContext};
    use crate::gateway::ModelGateway;
    use crate::providers::CannedBackend;
    use syllabus_core::catalog::{CourseStore, InMemoryCourseStore, StudentId};
    use syllabus_core::config::AgentSettings;
    use syllabus_core::state::{Route, TurnState};

    fn settings() -> AgentSettings {
        AgentSettings { max_refinements: 2, max_messages: 20, max_context_chars: 16_000 }
    }

    fn context() -> TurnContext {
        TurnContext {
            gateway: Arc::new(
                ModelGateway::new(5, 0).register("offline", Arc::new(CannedBackend::new())),
            ),
            store: Arc::new(InMemoryCourseStore::with_demo_catalog()),
            settings: settings(),
        }
    }

    #[tokio::test]
    async fn discovery_turn_walks_to_completion() {
        let ctx = context();
        let mut state = TurnState::new("show me AI courses", "offline", None, Vec::new());
        let mut visited = Vec::new();

        let interrupt = execute_from(
            Node::LoadCatalog,
            &mut state,
            &ctx,
            &mut |node, _state| visited.push(node),
        )
        .await
        .expect("turn should succeed");

        assert!(interrupt.is_none());
        assert_eq!(state.route, Some(Route::CourseDiscovery));
        assert!(state.filtered_courses.iter().all(|course| course.category == "AI"));
        assert!(!state.response.is_empty());
        assert_eq!(state.suggestions.len(), 3);
        assert_eq!(visited.first(), Some(&Node::LoadCatalog));
        assert_eq!(visited.last(), Some(&Node::Suggest));
    }

    #[tokio::test]
    async fn bulk_enrollment_suspends_before_any_write() {
        let store = Arc::new(InMemoryCourseStore::with_demo_catalog());
        let ctx = TurnContext {
            gateway: Arc::new(
                ModelGateway::new(5, 0).register("offline", Arc::new(CannedBackend::new())),
            ),
            store: Arc::clone(&store) as Arc<dyn CourseStore>,
            settings: settings(),
        };
        let mut state =
            TurnState::new("enroll me in all courses", "offline", Some(StudentId(7)), Vec::new());

        let interrupt =
            execute_from(Node::LoadCatalog, &mut state, &ctx, &mut |_node, _state| {})
                .await
                .expect("turn should suspend, not fail");

        let payload = interrupt.expect("bulk enrollment should suspend");
        assert_eq!(payload.action, "bulk_enrollment");
        assert!(payload.message.contains("Bulk enrollment"));
        assert_eq!(state.approval, syllabus_core::approval::ApprovalState::Pending);
        assert!(state.approval_message.is_some());
        assert_eq!(store.enrollment_count(), 0);
    }

    #[tokio::test]
    async fn refinement_loop_is_bounded() {
        let ctx = context();
        // Scripted drafts stay under the quality threshold, forcing the
        // optimizer to run until the budget is spent.
        let gateway = Arc::new(ModelGateway::new(5, 0).register(
            "offline",
            Arc::new(CannedBackend::with_script(vec![
                "short".to_string(),
                "short".to_string(),
                "short".to_string(),
                "short".to_string(),
            ])),
        ));
        let ctx = TurnContext { gateway, ..ctx };
        let mut state = TurnState::new("hmm", "offline", None, Vec::new());

        execute_from(Node::LoadCatalog, &mut state, &ctx, &mut |_node, _state| {})
            .await
            .expect("turn should finish");

        assert_eq!(state.refinement_count, 2);
        assert_eq!(state.suggestions.len(), 3);
    }
}
