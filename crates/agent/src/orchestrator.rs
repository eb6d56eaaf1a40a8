//! Orchestrator-worker decomposition for complex queries. Decomposition is
//! deliberately a fixed three-subtask shape rather than model-driven task
//! planning; only the subtask execution and synthesis involve the gateway.

use std::sync::Arc;

use futures_util::future::join_all;
use tracing::warn;

use syllabus_core::state::{StateUpdate, Subtask, SubtaskResult, SubtaskStatus, TurnState};

use crate::gateway::ModelGateway;
use crate::guardrails;
use crate::prompts;

pub fn decompose(_message: &str) -> Vec<Subtask> {
    vec![
        Subtask {
            task_id: "fetch_data".to_string(),
            description: "Fetch relevant course information".to_string(),
            priority: 1,
        },
        Subtask {
            task_id: "analyze".to_string(),
            description: "Analyze and process the information".to_string(),
            priority: 2,
        },
        Subtask {
            task_id: "synthesize".to_string(),
            description: "Synthesize final response".to_string(),
            priority: 3,
        },
    ]
}

/// Fans the subtasks out concurrently, joins all of them (a failed subtask
/// records a failure result without cancelling its siblings), then runs one
/// synthesis call over the combined results.
pub async fn run_workers(state: &TurnState, gateway: &Arc<ModelGateway>) -> StateUpdate {
    let subtasks = if state.subtasks.is_empty() {
        decompose(&state.user_message)
    } else {
        state.subtasks.clone()
    };

    let handles: Vec<_> = subtasks
        .iter()
        .map(|subtask| {
            let gateway = Arc::clone(gateway);
            let model_id = state.model_used.clone();
            let task_id = subtask.task_id.clone();
            let prompt = guardrails::guarded_prompt(&prompts::subtask_prompt(
                &subtask.description,
                &state.user_message,
                state.courses.len(),
            ));

            tokio::spawn(async move {
                match gateway.generate(&model_id, &prompt, &[]).await {
                    Ok(result) => SubtaskResult {
                        task_id,
                        result,
                        status: SubtaskStatus::Completed,
                    },
                    Err(error) => SubtaskResult {
                        task_id,
                        result: format!("Error: {error}"),
                        status: SubtaskStatus::Failed,
                    },
                }
            })
        })
        .collect();

    let mut results: Vec<SubtaskResult> = Vec::with_capacity(subtasks.len());
    for (handle, subtask) in join_all(handles).await.into_iter().zip(&subtasks) {
        match handle {
            Ok(result) => results.push(result),
            Err(error) => results.push(SubtaskResult {
                task_id: subtask.task_id.clone(),
                result: format!("Error: worker task aborted: {error}"),
                status: SubtaskStatus::Failed,
            }),
        }
    }

    let response = synthesize(state, gateway, &results).await;

    StateUpdate {
        subtasks: Some(subtasks),
        subtask_results: Some(results),
        response: Some(response),
        ..StateUpdate::default()
    }
}

async fn synthesize(
    state: &TurnState,
    gateway: &Arc<ModelGateway>,
    results: &[SubtaskResult],
) -> String {
    let prompt =
        guardrails::guarded_prompt(&prompts::synthesis_prompt(&state.user_message, results));

    match gateway.generate(&state.model_used, &prompt, &[]).await {
        Ok(text) => guardrails::screen_response(text, &state.courses),
        Err(error) => {
            warn!(%error, "synthesis call failed, concatenating subtask results");
            results
                .iter()
                .filter(|result| result.status == SubtaskStatus::Completed)
                .map(|result| result.result.as_str())
                .collect::<Vec<_>>()
                .join("\n\n")
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{decompose, run_workers};
    use crate::gateway::ModelGateway;
    use crate::providers::CannedBackend;
    use syllabus_core::state::{SubtaskStatus, TurnState};

    #[test]
    fn decomposition_has_a_fixed_three_task_shape() {
        let subtasks = decompose("compare the docker and kubernetes tracks");
        assert_eq!(subtasks.len(), 3);
        assert_eq!(subtasks[0].task_id, "fetch_data");
        assert!(subtasks.iter().zip(subtasks.iter().skip(1)).all(|(a, b)| a.priority < b.priority));
    }

    #[tokio::test]
    async fn all_subtasks_complete_and_synthesis_produces_a_response() {
        let gateway =
            Arc::new(ModelGateway::new(5, 0).register("offline", Arc::new(CannedBackend::new())));
        let state = TurnState::new("compare docker and kubernetes", "offline", None, Vec::new());

        let update = run_workers(&state, &gateway).await;
        let results = update.subtask_results.expect("results should be set");
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|result| result.status == SubtaskStatus::Completed));
        assert!(!update.response.expect("response should be set").is_empty());
    }

    #[tokio::test]
    async fn one_failed_subtask_does_not_abort_the_others() {
        let backend = Arc::new(CannedBackend::new());
        backend.fail_next(1);
        let gateway = Arc::new(ModelGateway::new(5, 0).register("offline", backend));
        let state = TurnState::new("compare docker and kubernetes", "offline", None, Vec::new());

        let update = run_workers(&state, &gateway).await;
        let results = update.subtask_results.expect("results should be set");
        assert_eq!(results.len(), 3);
        assert_eq!(
            results.iter().filter(|result| result.status == SubtaskStatus::Failed).count(),
            1
        );
        assert!(update.response.is_some());
    }
}
