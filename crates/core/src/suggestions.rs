//! Follow-up suggestion templates. Always exactly three, chosen by the first
//! matching rule: successful enrollment, then route, then topic keywords,
//! then the generic fallback.

use crate::catalog::EnrollmentOutcome;
use crate::state::Route;

pub fn generate_suggestions(
    message: &str,
    route: Route,
    enrollment_results: &[EnrollmentOutcome],
) -> Vec<String> {
    let lowered = message.to_ascii_lowercase();

    let suggestions: [&str; 3] = if enrollment_results.iter().any(|outcome| outcome.success) {
        [
            "Show my enrollments",
            "What other courses do you recommend?",
            "Tell me about the course content",
        ]
    } else if route == Route::CourseDiscovery {
        ["Tell me more about this course", "What are the prerequisites?", "Enroll me in this course"]
    } else if route == Route::Recommendation {
        [
            "Show me beginner courses",
            "What about advanced courses?",
            "Enroll me in the recommended course",
        ]
    } else if lowered.contains("ai") || lowered.contains("machine learning") {
        [
            "Show me AI courses",
            "Recommend a beginner AI course",
            "What's the difference between AI courses?",
        ]
    } else if lowered.contains("docker") {
        ["Show Docker courses", "Is Docker hard to learn?", "Enroll me in Docker Mastery"]
    } else if lowered.contains("kubernetes") || lowered.contains("k8s") {
        ["Show Kubernetes courses", "Do I need Docker first?", "Recommend a Kubernetes course"]
    } else {
        ["What courses do you offer?", "Recommend courses for beginners", "Show me all courses"]
    };

    suggestions.iter().map(|s| s.to_string()).collect()
}
