pub mod approval;
pub mod catalog;
pub mod config;
pub mod errors;
pub mod evaluation;
pub mod history;
pub mod matching;
pub mod routing;
pub mod state;
pub mod suggestions;

pub use approval::{ApprovalDecision, ApprovalState, GateOutcome, InterruptPayload};
pub use catalog::{
    ChatExchange, Course, CourseId, CourseStore, EnrollmentOutcome, InMemoryCourseStore, StudentId,
};
pub use errors::{CatalogError, GatewayError, TurnError};
pub use routing::RouteDecision;
pub use state::{
    ChatMessage, MessageRole, Route, StateUpdate, Subtask, SubtaskResult, SubtaskStatus, TurnState,
};
