//! Intent handlers. Each reads the catalog snapshot and user message from
//! the turn state, produces a draft `response`, and degrades to catalog
//! fallback text on recoverable gateway failure instead of propagating.

use tracing::warn;

use syllabus_core::approval::ApprovalState;
use syllabus_core::catalog::{CourseStore, EnrollmentOutcome};
use syllabus_core::errors::TurnError;
use syllabus_core::matching;
use syllabus_core::routing;
use syllabus_core::state::{StateUpdate, TurnState};

use crate::gateway::ModelGateway;
use crate::guardrails;
use crate::prompts;

pub async fn course_discovery(
    state: &TurnState,
    gateway: &ModelGateway,
) -> Result<StateUpdate, TurnError> {
    let filtered = matching::filter_courses(&state.user_message, &state.courses);
    let prompt = guardrails::guarded_prompt(&prompts::discovery_prompt(
        &state.user_message,
        &filtered,
    ));

    let response = draft_or_fallback(state, gateway, &prompt).await?;
    Ok(StateUpdate {
        filtered_courses: Some(filtered),
        response: Some(response),
        ..StateUpdate::default()
    })
}

pub async fn recommendation(
    state: &TurnState,
    gateway: &ModelGateway,
) -> Result<StateUpdate, TurnError> {
    let prompt = guardrails::guarded_prompt(&prompts::recommendation_prompt(
        &state.user_message,
        &state.courses,
    ));
    let response = draft_or_fallback(state, gateway, &prompt).await?;
    Ok(StateUpdate { response: Some(response), ..StateUpdate::default() })
}

pub async fn general_qa(
    state: &TurnState,
    gateway: &ModelGateway,
) -> Result<StateUpdate, TurnError> {
    // A rejected bulk enrollment lands here: acknowledge the decision and
    // pivot to individual courses instead of answering the stale message.
    let inner = if state.approval == ApprovalState::Rejected {
        prompts::rejection_prompt(&state.user_message, &state.courses)
    } else {
        prompts::general_qa_prompt(&state.user_message, &state.courses)
    };
    let prompt = guardrails::guarded_prompt(&inner);
    let response = draft_or_fallback(state, gateway, &prompt).await?;
    Ok(StateUpdate { response: Some(response), ..StateUpdate::default() })
}

/// Enrollment is fully deterministic: course resolution, the store write,
/// and the per-course confirmation text involve no model call.
pub async fn enrollment(
    state: &TurnState,
    store: &dyn CourseStore,
) -> Result<StateUpdate, TurnError> {
    let student_id = match state.student_id {
        Some(student_id) => student_id,
        None => {
            return Ok(StateUpdate {
                enrollment_results: Some(Vec::new()),
                response: Some(
                    "I'd be happy to help you enroll! Please sign in first so I can set \
                     up your enrollment."
                        .to_string(),
                ),
                ..StateUpdate::default()
            })
        }
    };

    let mut targets =
        matching::resolve_enrollment_targets(&state.user_message, &state.history, &state.courses);

    // An approved bulk request that names no specific titles means the whole
    // catalog snapshot.
    if targets.is_empty()
        && state.approval == ApprovalState::Approved
        && routing::has_bulk_indicator(&state.user_message)
    {
        targets = state.courses.clone();
    }

    if targets.is_empty() {
        return Ok(StateUpdate {
            enrollment_results: Some(Vec::new()),
            response: Some(
                "I'd be happy to help you enroll! Please specify which course you'd \
                 like to join."
                    .to_string(),
            ),
            ..StateUpdate::default()
        });
    }

    let mut results: Vec<EnrollmentOutcome> = Vec::with_capacity(targets.len());
    for course in &targets {
        let outcome = store.enroll(student_id, course.id).await?;
        results.push(outcome);
    }

    let mut lines: Vec<String> = results
        .iter()
        .map(|outcome| {
            if outcome.success {
                format!("✅ {}", outcome.message)
            } else {
                format!("❌ {}", outcome.message)
            }
        })
        .collect();

    if results.iter().any(|outcome| outcome.success) {
        lines.push(String::new());
        lines.push("Great! You're all set. Check 'My Enrollments' to start learning!".to_string());
    }

    Ok(StateUpdate {
        enrollment_results: Some(results),
        response: Some(lines.join("\n")),
        ..StateUpdate::default()
    })
}

/// Calls the gateway and screens the completion. Recoverable failures fall
/// back to the pre-authored catalog response; an unsupported model is fatal
/// for the turn and propagates.
async fn draft_or_fallback(
    state: &TurnState,
    gateway: &ModelGateway,
    prompt: &str,
) -> Result<String, TurnError> {
    match gateway.generate(&state.model_used, prompt, &state.history).await {
        Ok(text) => Ok(guardrails::screen_response(text, &state.courses)),
        Err(error) if error.is_recoverable() => {
            warn!(%error, "gateway call failed, using catalog fallback response");
            Ok(guardrails::fallback_catalog_response(&state.courses))
        }
        Err(error) => Err(error.into()),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{course_discovery, enrollment, general_qa};
    use crate::gateway::ModelGateway;
    use crate::providers::CannedBackend;
    use syllabus_core::catalog::{CourseStore, InMemoryCourseStore, StudentId};
    use syllabus_core::state::TurnState;

    async fn state_with_catalog(message: &str, student_id: Option<StudentId>) -> TurnState {
        let store = InMemoryCourseStore::with_demo_catalog();
        let mut state = TurnState::new(message, "offline", student_id, Vec::new());
        state.courses = store.fetch_courses(None).await.expect("demo catalog should load");
        state
    }

    fn offline_gateway(backend: CannedBackend) -> ModelGateway {
        ModelGateway::new(5, 0).register("offline", Arc::new(backend))
    }

    #[tokio::test]
    async fn discovery_filters_to_matching_category() {
        let state = state_with_catalog("show me AI courses", None).await;
        let gateway = offline_gateway(CannedBackend::new());

        let update = course_discovery(&state, &gateway).await.expect("handler should succeed");
        let filtered = update.filtered_courses.expect("filtered courses should be set");
        assert!(!filtered.is_empty());
        assert!(filtered.iter().all(|course| course.category == "AI"));
        assert!(update.response.is_some());
    }

    #[tokio::test]
    async fn discovery_screens_denylisted_output() {
        let state = state_with_catalog("show me AI courses", None).await;
        let gateway = offline_gateway(CannedBackend::with_script(vec![
            "You should check Coursera for this!".to_string(),
        ]));

        let update = course_discovery(&state, &gateway).await.expect("handler should succeed");
        let response = update.response.expect("response should be set");
        assert!(!response.to_ascii_lowercase().contains("coursera"));
        assert!(response.contains("Docker Mastery"));
    }

    #[tokio::test]
    async fn upstream_failure_degrades_to_catalog_fallback() {
        let state = state_with_catalog("hello there", None).await;
        let backend = CannedBackend::new();
        backend.fail_next(1);
        let gateway = offline_gateway(backend);

        let update = general_qa(&state, &gateway).await.expect("handler should degrade");
        assert!(update.response.expect("response should be set").contains("our catalog"));
    }

    #[tokio::test]
    async fn enrollment_by_full_title_succeeds() {
        let store = InMemoryCourseStore::with_demo_catalog();
        let mut state =
            TurnState::new("enroll me in Docker Mastery", "offline", Some(StudentId(7)), Vec::new());
        state.courses = store.fetch_courses(None).await.expect("demo catalog should load");

        let update = enrollment(&state, &store).await.expect("handler should succeed");
        let results = update.enrollment_results.expect("results should be set");
        assert_eq!(results.len(), 1);
        assert!(results[0].success);
        assert!(results[0].message.contains("Docker Mastery"));
        assert!(update.response.expect("response should be set").contains("✅"));
    }

    #[tokio::test]
    async fn enrollment_without_student_asks_to_sign_in() {
        let store = InMemoryCourseStore::with_demo_catalog();
        let state = state_with_catalog("enroll me in Docker Mastery", None).await;

        let update = enrollment(&state, &store).await.expect("handler should succeed");
        assert!(update.response.expect("response should be set").contains("sign in"));
        assert_eq!(store.enrollment_count(), 0);
    }

    #[tokio::test]
    async fn unresolvable_enrollment_asks_for_clarification() {
        let store = InMemoryCourseStore::with_demo_catalog();
        let state = state_with_catalog("enroll me please", Some(StudentId(7))).await;

        let update = enrollment(&state, &store).await.expect("handler should succeed");
        assert!(update.response.expect("response should be set").contains("specify"));
        assert_eq!(store.enrollment_count(), 0);
    }
}
