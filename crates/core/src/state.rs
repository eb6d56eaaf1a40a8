use serde::{Deserialize, Serialize};

use crate::approval::{ApprovalState, InterruptPayload};
use crate::catalog::{Course, EnrollmentOutcome, StudentId};

/// Classified intent for the turn. Read by conditional edges after the
/// router has set it; `GeneralQa` is the fallback when nothing matched.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    CourseDiscovery,
    Enrollment,
    Recommendation,
    GeneralQa,
    ComplexQuery,
}

impl Route {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CourseDiscovery => "course_discovery",
            Self::Enrollment => "enrollment",
            Self::Recommendation => "recommendation",
            Self::GeneralQa => "general_qa",
            Self::ComplexQuery => "complex_query",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Assistant,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: MessageRole::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: MessageRole::Assistant, content: content.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subtask {
    pub task_id: String,
    pub description: String,
    pub priority: u8,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubtaskStatus {
    Completed,
    Failed,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtaskResult {
    pub task_id: String,
    pub result: String,
    pub status: SubtaskStatus,
}

/// The single mutable record threaded through the graph. Created fresh per
/// user turn; nodes return a [`StateUpdate`] that is merged in before the
/// next conditional edge is evaluated.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TurnState {
    pub user_message: String,
    pub student_id: Option<StudentId>,
    pub history: Vec<ChatMessage>,

    pub route: Option<Route>,
    pub route_confidence: Option<f32>,
    pub route_reasoning: Option<String>,
    pub requires_approval: bool,

    pub courses: Vec<Course>,
    pub filtered_courses: Vec<Course>,
    pub enrollment_results: Vec<EnrollmentOutcome>,

    pub response: String,
    pub draft_response: Option<String>,
    pub quality_score: Option<f32>,
    pub refinement_count: u32,

    pub subtasks: Vec<Subtask>,
    pub subtask_results: Vec<SubtaskResult>,

    pub approval: ApprovalState,
    pub approval_message: Option<String>,
    pub interrupt: Option<InterruptPayload>,

    pub suggestions: Vec<String>,
    pub model_used: String,
    pub enrolled: bool,
}

impl TurnState {
    pub fn new(
        user_message: impl Into<String>,
        model_used: impl Into<String>,
        student_id: Option<StudentId>,
        history: Vec<ChatMessage>,
    ) -> Self {
        Self {
            user_message: user_message.into(),
            student_id,
            history,
            route: None,
            route_confidence: None,
            route_reasoning: None,
            requires_approval: false,
            courses: Vec::new(),
            filtered_courses: Vec::new(),
            enrollment_results: Vec::new(),
            response: String::new(),
            draft_response: None,
            quality_score: None,
            refinement_count: 0,
            subtasks: Vec::new(),
            subtask_results: Vec::new(),
            approval: ApprovalState::AutoApproved,
            approval_message: None,
            interrupt: None,
            suggestions: Vec::new(),
            model_used: model_used.into(),
            enrolled: false,
        }
    }

    /// The route conditional edges dispatch on; defaults to general Q&A.
    pub fn effective_route(&self) -> Route {
        self.route.unwrap_or(Route::GeneralQa)
    }
}

/// Partial update returned by a graph node. Only fields set to `Some` are
/// merged; `enrollment_results` merging also rederives `enrolled`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StateUpdate {
    pub history: Option<Vec<ChatMessage>>,
    pub route: Option<Route>,
    pub route_confidence: Option<f32>,
    pub route_reasoning: Option<String>,
    pub requires_approval: Option<bool>,
    pub courses: Option<Vec<Course>>,
    pub filtered_courses: Option<Vec<Course>>,
    pub enrollment_results: Option<Vec<EnrollmentOutcome>>,
    pub response: Option<String>,
    pub draft_response: Option<String>,
    pub quality_score: Option<f32>,
    pub refinement_count: Option<u32>,
    pub subtasks: Option<Vec<Subtask>>,
    pub subtask_results: Option<Vec<SubtaskResult>>,
    pub approval: Option<ApprovalState>,
    pub approval_message: Option<String>,
    pub interrupt: Option<InterruptPayload>,
    pub suggestions: Option<Vec<String>>,
}

impl StateUpdate {
    pub fn apply(self, state: &mut TurnState) {
        if let Some(history) = self.history {
            state.history = history;
        }
        if let Some(route) = self.route {
            state.route = Some(route);
        }
        if let Some(confidence) = self.route_confidence {
            state.route_confidence = Some(confidence);
        }
        if let Some(reasoning) = self.route_reasoning {
            state.route_reasoning = Some(reasoning);
        }
        if let Some(requires_approval) = self.requires_approval {
            state.requires_approval = requires_approval;
        }
        if let Some(courses) = self.courses {
            state.courses = courses;
        }
        if let Some(filtered) = self.filtered_courses {
            state.filtered_courses = filtered;
        }
        if let Some(results) = self.enrollment_results {
            state.enrolled = results.iter().any(|outcome| outcome.success);
            state.enrollment_results = results;
        }
        if let Some(response) = self.response {
            state.response = response;
        }
        if let Some(draft) = self.draft_response {
            state.draft_response = Some(draft);
        }
        if let Some(score) = self.quality_score {
            state.quality_score = Some(score);
        }
        if let Some(count) = self.refinement_count {
            state.refinement_count = count;
        }
        if let Some(subtasks) = self.subtasks {
            state.subtasks = subtasks;
        }
        if let Some(results) = self.subtask_results {
            state.subtask_results = results;
        }
        if let Some(approval) = self.approval {
            state.approval = approval;
        }
        if let Some(message) = self.approval_message {
            state.approval_message = Some(message);
        }
        if let Some(interrupt) = self.interrupt {
            state.interrupt = Some(interrupt);
        }
        if let Some(suggestions) = self.suggestions {
            state.suggestions = suggestions;
        }
    }
}
