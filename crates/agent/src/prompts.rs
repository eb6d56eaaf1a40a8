//! Prompt construction. Every prompt that touches catalog data is built here
//! and wrapped with the guardrail preamble by the gateway callers, so the
//! catalog-only constraint is stated in exactly one place per handler.

use syllabus_core::catalog::Course;
use syllabus_core::state::SubtaskResult;

pub const ROUTING_MARKER: &str = "determine their intent";
pub const SUBTASK_MARKER: &str = "Execute this subtask";
pub const SYNTHESIS_MARKER: &str = "Synthesize these subtask results";
pub const REJECTION_MARKER: &str = "declined the bulk enrollment";

const REFINEMENT_DRAFT_HEADER: &str = "Current response:\n";
const REFINEMENT_DRAFT_FOOTER: &str = "\n\nMake it more accurate";

pub fn routing_prompt(message: &str) -> String {
    format!(
        r#"Analyze the user's message and {ROUTING_MARKER}.

User message: "{message}"

Available intents:
- course_discovery: the user wants to browse, search, or learn about courses
- enrollment: the user wants to enroll in a course
- recommendation: the user wants personalized course recommendations
- general_qa: general questions about the platform or courses
- complex_query: a multi-step query requiring decomposition

Answer with the single intent identifier that fits best."#
    )
}

pub fn discovery_prompt(message: &str, courses: &[Course]) -> String {
    let courses_list = courses
        .iter()
        .map(|course| {
            format!(
                "- **{}** ({}, {}h)\n  {}",
                course.title, course.difficulty, course.duration_hours, course.description
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"You are helping a student discover courses from our internal catalog.

===== OUR COURSE CATALOG =====
{courses_list}
===== END OF CATALOG =====

Student's question: {message}

YOUR TASK:
1. Show courses from the catalog above
2. Use EXACT course titles (copy them exactly)
3. Be concise and friendly
4. If we don't have what they want, suggest similar courses from our catalog

Respond now using ONLY courses from our catalog above."#
    )
}

pub fn recommendation_prompt(message: &str, courses: &[Course]) -> String {
    let courses_list = courses
        .iter()
        .map(|course| {
            format!(
                "- {} ({}, {}h, {})",
                course.title, course.difficulty, course.duration_hours, course.category
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"You are a course advisor for our internal learning platform.

===== OUR COURSE CATALOG =====
{courses_list}
===== END OF CATALOG =====

Student's request: {message}

YOUR TASK:
1. Select 2-3 courses from the catalog above
2. Use EXACT course titles (copy them exactly)
3. Explain why each suits the student

Format each pick as "1. [Exact Course Title] - [Why it's good for them]" and
close by asking whether they'd like to enroll in any of them.

Respond now using ONLY courses from our catalog above."#
    )
}

pub fn general_qa_prompt(message: &str, courses: &[Course]) -> String {
    let courses_list = courses
        .iter()
        .map(|course| format!("- {} ({}, {})", course.title, course.category, course.difficulty))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"You are a friendly assistant for our internal learning platform.

===== OUR COURSE CATALOG =====
{courses_list}
===== END OF CATALOG =====

Student: {message}

YOUR TASK:
1. Answer their question
2. If mentioning courses, use ONLY courses from our catalog above
3. Use EXACT course titles
4. Be concise and friendly

Respond now using ONLY courses from our catalog."#
    )
}

pub fn rejection_prompt(message: &str, courses: &[Course]) -> String {
    let courses_list = courses
        .iter()
        .map(|course| format!("- {} ({}, {})", course.title, course.category, course.difficulty))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"The student {REJECTION_MARKER} they had requested.

===== OUR COURSE CATALOG =====
{courses_list}
===== END OF CATALOG =====

Their original request: {message}

YOUR TASK:
1. Confirm that no enrollments were made
2. Suggest enrolling in individual courses from the catalog above instead
3. Use EXACT course titles
4. Be brief and friendly

Respond now using ONLY courses from our catalog."#
    )
}

pub fn refinement_prompt(message: &str, draft: &str) -> String {
    format!(
        r#"Improve this response based on the feedback.

Original question: "{message}"

{REFINEMENT_DRAFT_HEADER}{draft}{REFINEMENT_DRAFT_FOOTER}, complete, clear, and actionable. Respond with the improved text only."#
    )
}

/// Inverse of [`refinement_prompt`]: recovers the draft section. Used by the
/// offline backend to produce a strictly-extended draft.
pub fn draft_from_refinement_prompt(prompt: &str) -> Option<&str> {
    let start = prompt.find(REFINEMENT_DRAFT_HEADER)? + REFINEMENT_DRAFT_HEADER.len();
    let end = prompt[start..].find(REFINEMENT_DRAFT_FOOTER)? + start;
    Some(&prompt[start..end])
}

pub fn subtask_prompt(description: &str, message: &str, course_count: usize) -> String {
    format!(
        r#"{SUBTASK_MARKER}:

Task: {description}
Context: the user asked "{message}"
Available courses: {course_count} courses

Provide a concise result for this subtask."#
    )
}

pub fn synthesis_prompt(message: &str, results: &[SubtaskResult]) -> String {
    let results_list = results
        .iter()
        .map(|result| format!("- {}: {}", result.task_id, result.result))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"{SYNTHESIS_MARKER} into a final response.

User question: "{message}"

Subtask results:
{results_list}

Provide a comprehensive, well-structured response."#
    )
}
