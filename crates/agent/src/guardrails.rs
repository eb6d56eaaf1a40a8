//! Catalog-only safety policy. Every outbound prompt gets a non-negotiable
//! preamble, and every completion is screened against a denylist of external
//! platforms. The post-filter is a hard contract: a tripped match discards
//! the completion entirely and substitutes catalog-derived fallback text.

use tracing::warn;

use syllabus_core::catalog::Course;

pub const SAFETY_PREAMBLE: &str = "CRITICAL INSTRUCTION: You are an assistant for an internal \
learning platform. You must NEVER mention external platforms such as Coursera, edX, Udemy, \
Udacity, or Fast.ai, nor any courses from those platforms. Only discuss courses from the \
provided catalog. A response that violates this will be rejected.\n\n";

const DENYLIST: &[&str] = &[
    "coursera",
    "edx",
    "udemy",
    "udacity",
    "pluralsight",
    "linkedin learning",
    "fast.ai",
    "fast ai",
    "datacamp",
    "khan academy",
    "skillshare",
    "treehouse",
];

pub fn guarded_prompt(prompt: &str) -> String {
    format!("{SAFETY_PREAMBLE}{prompt}")
}

pub fn violates_denylist(response: &str) -> bool {
    let lowered = response.to_ascii_lowercase();
    DENYLIST.iter().any(|platform| lowered.contains(platform))
}

/// Applies the post-filter. Returns the response unchanged when clean;
/// otherwise logs the violation and returns the catalog fallback.
pub fn screen_response(response: String, courses: &[Course]) -> String {
    if !violates_denylist(&response) {
        return response;
    }

    warn!(chars = response.len(), "model response mentioned an external platform, replaced");
    fallback_catalog_response(courses)
}

/// Pre-authored response enumerating catalog entries. Used both when the
/// denylist trips and when a handler degrades after upstream failure.
pub fn fallback_catalog_response(courses: &[Course]) -> String {
    let mut lines = vec!["I can only recommend courses from our catalog. Here's what we offer:\n"
        .to_string()];
    for (index, course) in courses.iter().enumerate() {
        lines.push(format!(
            "{}. **{}** ({}, {}h) - {}\n",
            index + 1,
            course.title,
            course.difficulty,
            course.duration_hours,
            course.description
        ));
    }
    lines.push("Would you like to enroll in any of these courses?".to_string());
    lines.join("\n")
}
