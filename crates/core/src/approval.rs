use serde::{Deserialize, Serialize};

use crate::catalog::Course;
use crate::routing::has_bulk_indicator;

/// Where a turn stands relative to the human approval gate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalState {
    /// Gate not triggered; the turn proceeds without pausing.
    AutoApproved,
    /// Turn suspended awaiting an explicit human decision.
    Pending,
    Approved,
    Rejected,
}

/// Structured payload surfaced to the caller when a turn suspends. The
/// caller renders `message` and later resumes with an [`ApprovalDecision`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterruptPayload {
    pub action: String,
    pub course_count: usize,
    pub message: String,
}

/// Human answer used to resume a suspended turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalDecision {
    pub approved: bool,
}

/// Result of evaluating the gate before enrollment executes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GateOutcome {
    Proceed,
    Suspend(InterruptPayload),
}

pub const BULK_ENROLLMENT_ACTION: &str = "bulk_enrollment";

/// Bulk threshold: more than this many matched courses requires sign-off.
pub const BULK_COURSE_THRESHOLD: usize = 3;

/// Decides whether an enrollment turn may proceed directly or must suspend
/// for human approval. Suspension triggers on an explicit bulk indicator in
/// the message or on more than [`BULK_COURSE_THRESHOLD`] matched courses.
pub fn evaluate_gate(message: &str, targets: &[Course]) -> GateOutcome {
    let bulk_requested = has_bulk_indicator(message);
    if !bulk_requested && targets.len() <= BULK_COURSE_THRESHOLD {
        return GateOutcome::Proceed;
    }

    let course_count = targets.len();
    let titles: Vec<&str> = targets.iter().map(|course| course.title.as_str()).collect();
    let message = format!(
        "Bulk enrollment detected ({course_count} courses): {}. Do you want to proceed?",
        titles.join(", ")
    );

    GateOutcome::Suspend(InterruptPayload {
        action: BULK_ENROLLMENT_ACTION.to_string(),
        course_count,
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::{evaluate_gate, GateOutcome, BULK_ENROLLMENT_ACTION};
    use crate::catalog::{Course, CourseId};

    fn course(id: i64, title: &str) -> Course {
        Course {
            id: CourseId(id),
            title: title.to_string(),
            description: String::new(),
            category: "AI".to_string(),
            difficulty: "Beginner".to_string(),
            duration_hours: 10,
        }
    }

    #[test]
    fn single_enrollment_proceeds_without_approval() {
        let targets = vec![course(4, "Docker Mastery")];
        assert_eq!(evaluate_gate("enroll me in Docker Mastery", &targets), GateOutcome::Proceed);
    }

    #[test]
    fn three_courses_still_proceed() {
        let targets = vec![course(1, "A"), course(2, "B"), course(3, "C")];
        assert_eq!(evaluate_gate("enroll me in A, B and C", &targets), GateOutcome::Proceed);
    }

    #[test]
    fn more_than_three_courses_suspend() {
        let targets = vec![course(1, "A"), course(2, "B"), course(3, "C"), course(4, "D")];
        match evaluate_gate("enroll me in A, B, C and D", &targets) {
            GateOutcome::Suspend(payload) => {
                assert_eq!(payload.action, BULK_ENROLLMENT_ACTION);
                assert_eq!(payload.course_count, 4);
                assert!(payload.message.contains("Bulk enrollment detected (4 courses)"));
                assert!(payload.message.contains("A, B, C, D"));
            }
            GateOutcome::Proceed => panic!("expected suspension"),
        }
    }

    #[test]
    fn explicit_all_suspends_even_for_few_matches() {
        let targets = vec![course(4, "Docker Mastery")];
        match evaluate_gate("enroll me in all courses", &targets) {
            GateOutcome::Suspend(payload) => assert_eq!(payload.course_count, 1),
            GateOutcome::Proceed => panic!("expected suspension"),
        }
    }
}
