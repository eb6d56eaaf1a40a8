//! Per-process entry point. Owns the gateway and store handles, converts
//! every turn-level failure into an apologetic user-visible response, and
//! keeps suspended turns resumable by thread key.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{error, info};
use uuid::Uuid;

use syllabus_core::approval::{ApprovalDecision, ApprovalState};
use syllabus_core::catalog::{CourseStore, StudentId};
use syllabus_core::config::{AgentSettings, AppConfig, LlmProvider};
use syllabus_core::errors::TurnError;
use syllabus_core::history;
use syllabus_core::state::TurnState;

use crate::gateway::ModelGateway;
use crate::graph::{self, Node, TurnContext};
use crate::providers::{CannedBackend, OpenAiBackend};

#[derive(Clone, Debug)]
pub struct TurnRequest {
    pub message: String,
    pub model_id: String,
    pub student_id: Option<StudentId>,
    pub thread_key: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TurnOutcome {
    pub response: String,
    pub model_used: String,
    pub suggestions: Vec<String>,
    pub enrolled: bool,
    pub pending_approval: bool,
    pub approval_message: Option<String>,
}

/// Event emitted by the streaming run mode. The sequence is finite and ends
/// in exactly one `Complete` or `Error`.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnEvent {
    Status { message: String },
    NodeUpdate { node: &'static str },
    Complete { outcome: TurnOutcome },
    Error { message: String },
}

struct SuspendedTurn {
    state: TurnState,
}

#[derive(Clone)]
pub struct AgentRuntime {
    gateway: Arc<ModelGateway>,
    store: Arc<dyn CourseStore>,
    settings: AgentSettings,
    suspended: Arc<Mutex<HashMap<String, SuspendedTurn>>>,
}

impl AgentRuntime {
    pub fn new(
        gateway: Arc<ModelGateway>,
        store: Arc<dyn CourseStore>,
        settings: AgentSettings,
    ) -> Self {
        Self { gateway, store, settings, suspended: Arc::new(Mutex::new(HashMap::new())) }
    }

    /// Builds a runtime from configuration: one backend per configured
    /// provider, registered under its model-id namespace.
    pub fn from_config(config: &AppConfig, store: Arc<dyn CourseStore>) -> Self {
        let mut gateway = ModelGateway::new(config.llm.timeout_secs, config.llm.max_retries);

        gateway = match config.llm.provider {
            LlmProvider::OpenAi => {
                let backend = Arc::new(OpenAiBackend::new(
                    config.llm.api_key.clone().unwrap_or_else(|| String::new().into()),
                    config.llm.base_url.clone(),
                ));
                gateway.register("gpt", Arc::clone(&backend) as _).register("openai:", backend)
            }
            LlmProvider::Offline => gateway.register("offline", Arc::new(CannedBackend::new())),
        };

        Self::new(Arc::new(gateway), store, config.agent.clone())
    }

    /// Runs one full turn. Never returns an error: every failure becomes an
    /// apologetic response with `enrolled=false` and no suggestions.
    pub async fn run_turn(&self, request: TurnRequest) -> TurnOutcome {
        let model_id = request.model_id.clone();
        match self.run_turn_observed(request, |_node, _state| {}).await {
            Ok(outcome) => outcome,
            Err(turn_error) => apologetic_outcome(&turn_error, &model_id),
        }
    }

    /// Streaming variant: emits a status event, one event per committed
    /// node, then exactly one terminal `Complete` or `Error`.
    pub fn run_turn_streaming(&self, request: TurnRequest) -> UnboundedReceiverStream<TurnEvent> {
        let (sender, receiver) = tokio::sync::mpsc::unbounded_channel();
        let runtime = self.clone();

        tokio::spawn(async move {
            let _ = sender.send(TurnEvent::Status { message: "starting".to_string() });
            let node_sender = sender.clone();
            let result = runtime
                .run_turn_observed(request, move |node, _state| {
                    let _ = node_sender.send(TurnEvent::NodeUpdate { node: node.name() });
                })
                .await;
            let _ = match result {
                Ok(outcome) => sender.send(TurnEvent::Complete { outcome }),
                Err(turn_error) => {
                    sender.send(TurnEvent::Error { message: turn_error.user_message() })
                }
            };
        });

        UnboundedReceiverStream::new(receiver)
    }

    /// Resumes a turn suspended at the approval gate. Approval continues
    /// into the enrollment handler against the turn's original catalog
    /// snapshot; rejection rejoins at the general Q&A handler, which
    /// acknowledges the decision and pivots to individual courses.
    pub async fn resume(&self, thread_key: &str, decision: ApprovalDecision) -> TurnOutcome {
        let suspended = match self.take_suspended(thread_key) {
            Some(suspended) => suspended,
            None => {
                return TurnOutcome {
                    response: "I don't have a pending approval for this conversation."
                        .to_string(),
                    model_used: String::new(),
                    suggestions: Vec::new(),
                    enrolled: false,
                    pending_approval: false,
                    approval_message: None,
                }
            }
        };

        let mut state = suspended.state;
        let start = if decision.approved {
            state.approval = ApprovalState::Approved;
            info!(thread_key, "bulk enrollment approved, resuming");
            Node::Enrollment
        } else {
            state.approval = ApprovalState::Rejected;
            info!(thread_key, "bulk enrollment rejected, acknowledging");
            Node::GeneralQa
        };

        let ctx = self.context();
        match graph::execute_from(start, &mut state, &ctx, &mut |_node, _state| {}).await {
            Ok(_) => outcome_from_state(&state),
            Err(turn_error) => {
                error!(%turn_error, thread_key, "resumed turn failed");
                apologetic_outcome(&turn_error, &state.model_used)
            }
        }
    }

    async fn run_turn_observed(
        &self,
        request: TurnRequest,
        mut observer: impl FnMut(Node, &TurnState) + Send,
    ) -> Result<TurnOutcome, TurnError> {
        let turn_id = Uuid::new_v4();
        info!(%turn_id, thread_key = %request.thread_key, "turn started");

        let history = match self.load_history(request.student_id).await {
            Ok(history) => history,
            Err(turn_error) => {
                error!(%turn_error, %turn_id, "history load failed");
                return Err(turn_error);
            }
        };

        let mut state =
            TurnState::new(request.message, request.model_id, request.student_id, history);

        let ctx = self.context();
        match graph::execute_from(Node::LoadCatalog, &mut state, &ctx, &mut observer).await {
            Ok(Some(_interrupt)) => {
                let outcome = outcome_from_state(&state);
                self.park_suspended(request.thread_key, state);
                Ok(outcome)
            }
            Ok(None) => Ok(outcome_from_state(&state)),
            Err(turn_error) => {
                error!(%turn_error, %turn_id, "turn failed");
                Err(turn_error)
            }
        }
    }

    async fn load_history(
        &self,
        student_id: Option<StudentId>,
    ) -> Result<Vec<syllabus_core::state::ChatMessage>, TurnError> {
        let student_id = match student_id {
            Some(student_id) => student_id,
            None => return Ok(Vec::new()),
        };
        let exchanges = self.store.recent_history(student_id).await?;
        Ok(history::chronological_messages(&exchanges))
    }

    fn context(&self) -> TurnContext {
        TurnContext {
            gateway: Arc::clone(&self.gateway),
            store: Arc::clone(&self.store),
            settings: self.settings.clone(),
        }
    }

    fn park_suspended(&self, thread_key: String, state: TurnState) {
        if let Ok(mut suspended) = self.suspended.lock() {
            suspended.insert(thread_key, SuspendedTurn { state });
        }
    }

    fn take_suspended(&self, thread_key: &str) -> Option<SuspendedTurn> {
        self.suspended.lock().ok()?.remove(thread_key)
    }
}

fn outcome_from_state(state: &TurnState) -> TurnOutcome {
    TurnOutcome {
        response: state.response.clone(),
        model_used: state.model_used.clone(),
        suggestions: state.suggestions.clone(),
        enrolled: state.enrolled,
        pending_approval: state.approval == ApprovalState::Pending,
        approval_message: state.approval_message.clone(),
    }
}

fn apologetic_outcome(turn_error: &TurnError, model_used: &str) -> TurnOutcome {
    TurnOutcome {
        response: turn_error.user_message(),
        model_used: model_used.to_string(),
        suggestions: Vec::new(),
        enrolled: false,
        pending_approval: false,
        approval_message: None,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio_stream::StreamExt;

    use super::{AgentRuntime, TurnEvent, TurnRequest};
    use crate::gateway::ModelGateway;
    use crate::providers::CannedBackend;
    use syllabus_core::catalog::{CourseStore, InMemoryCourseStore, StudentId};
    use syllabus_core::config::AgentSettings;

    fn runtime_with_store(store: Arc<InMemoryCourseStore>) -> AgentRuntime {
        let gateway = Arc::new(
            ModelGateway::new(5, 0).register("offline", Arc::new(CannedBackend::new())),
        );
        AgentRuntime::new(
            gateway,
            store as Arc<dyn CourseStore>,
            AgentSettings { max_refinements: 2, max_messages: 20, max_context_chars: 16_000 },
        )
    }

    fn request(message: &str, student_id: Option<StudentId>) -> TurnRequest {
        TurnRequest {
            message: message.to_string(),
            model_id: "offline".to_string(),
            student_id,
            thread_key: "thread-1".to_string(),
        }
    }

    #[tokio::test]
    async fn unknown_model_yields_an_apology_not_an_error() {
        let store = Arc::new(InMemoryCourseStore::with_demo_catalog());
        let runtime = runtime_with_store(store);

        let mut bad_request = request("hello", None);
        bad_request.model_id = "llama3".to_string();

        let outcome = runtime.run_turn(bad_request).await;
        assert!(outcome.response.contains("llama3"));
        assert!(!outcome.enrolled);
        assert!(outcome.suggestions.is_empty());
    }

    #[tokio::test]
    async fn streaming_failure_ends_with_a_single_error_event() {
        let store = Arc::new(InMemoryCourseStore::with_demo_catalog());
        let runtime = runtime_with_store(store);

        let mut bad_request = request("hello", None);
        bad_request.model_id = "llama3".to_string();

        let events: Vec<TurnEvent> = runtime.run_turn_streaming(bad_request).collect().await;

        assert!(
            matches!(events.last(), Some(TurnEvent::Error { message }) if message.contains("llama3"))
        );
        assert!(!events.iter().any(|event| matches!(event, TurnEvent::Complete { .. })));
    }

    #[tokio::test]
    async fn resume_without_a_pending_turn_is_harmless() {
        let store = Arc::new(InMemoryCourseStore::with_demo_catalog());
        let runtime = runtime_with_store(store);

        let outcome = runtime
            .resume("missing-thread", syllabus_core::approval::ApprovalDecision { approved: true })
            .await;
        assert!(outcome.response.contains("pending approval"));
        assert!(!outcome.pending_approval);
    }
}
