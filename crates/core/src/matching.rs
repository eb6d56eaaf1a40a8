//! Deterministic course matching. The model never decides which course a
//! message refers to; these rules do, and the model only phrases the result.

use crate::catalog::Course;
use crate::state::ChatMessage;

const TITLE_STOPWORDS: &[&str] =
    &["to", "the", "and", "with", "for", "from", "a", "an", "in", "of", "on"];

const AFFIRMATIVES: &[&str] = &["yes", "yeah", "yep", "sure", "ok", "okay"];

/// Words that mark a request as course-specific. An abbreviation like `ai`
/// only matches the generic course when none of these appear, or when the
/// mentioned specific word is itself part of the candidate title.
const SPECIFIC_WORDS: &[&str] = &["ethics", "basics", "introduction", "advanced", "deep", "neural"];

const ABBREVIATIONS: &[(&str, &[&str])] = &[
    ("ai", &["artificial", "intelligence"]),
    ("ml", &["machine", "learning"]),
    ("k8s", &["kubernetes"]),
    ("devops", &["devops"]),
];

/// Matched title words must sit within this many words of each other in the
/// message, so shared words across titles don't cross-match.
const MATCH_WINDOW: usize = 5;

/// True for a bare confirmation such as "yes" or "ok, sure".
pub fn is_affirmative(message: &str) -> bool {
    let lowered = message.to_ascii_lowercase();
    let trimmed = lowered.trim();
    AFFIRMATIVES
        .iter()
        .any(|word| trimmed == *word || lowered.split_whitespace().any(|token| token == *word))
}

/// Narrows the catalog for a discovery request. A course matches on category,
/// difficulty, or any title word longer than three characters. An empty match
/// set falls back to the full catalog so the answer is never "nothing".
pub fn filter_courses(message: &str, courses: &[Course]) -> Vec<Course> {
    let lowered = message.to_ascii_lowercase();
    let mut filtered = Vec::new();

    for course in courses {
        if lowered.contains(&course.category.to_ascii_lowercase())
            || lowered.contains(&course.difficulty.to_ascii_lowercase())
        {
            filtered.push(course.clone());
            continue;
        }

        let title = course.title.to_ascii_lowercase();
        if title.split_whitespace().any(|word| word.len() > 3 && lowered.contains(word)) {
            filtered.push(course.clone());
        }
    }

    if filtered.is_empty() {
        courses.to_vec()
    } else {
        filtered
    }
}

/// Resolves which catalog courses an enrollment message refers to, most
/// specific rule first:
///
/// 1. full title substring,
/// 2. standalone abbreviation (`ai`, `ml`, `k8s`, `devops`),
/// 3. enough unique title words appearing close together,
/// 4. first title word plus category,
/// 5. category plus difficulty (only when nothing matched yet),
/// 6. contextual reference ("this", "both", bare "yes") against recently
///    mentioned courses.
pub fn resolve_enrollment_targets(
    message: &str,
    recent_context: &[ChatMessage],
    courses: &[Course],
) -> Vec<Course> {
    let lowered = message.to_ascii_lowercase();
    let message_words: Vec<&str> = lowered.split_whitespace().collect();

    let context = recent_context
        .iter()
        .rev()
        .take(3)
        .rev()
        .map(|m| m.content.to_ascii_lowercase())
        .collect::<Vec<_>>()
        .join(" ");

    let mut targets: Vec<Course> = Vec::new();

    for course in courses {
        let title = course.title.to_ascii_lowercase();
        let category = course.category.to_ascii_lowercase();
        let difficulty = course.difficulty.to_ascii_lowercase();

        if lowered.contains(&title) {
            targets.push(course.clone());
            continue;
        }

        if matches_abbreviation(&lowered, &message_words, &title) {
            targets.push(course.clone());
            continue;
        }

        let title_words: Vec<&str> =
            title.split_whitespace().filter(|word| !TITLE_STOPWORDS.contains(word)).collect();

        if title_words.len() >= 2 {
            let matched: Vec<&str> =
                title_words.iter().copied().filter(|word| lowered.contains(word)).collect();
            let min_matches = if title_words.len() >= 4 { 3 } else { 2 };

            if matched.len() >= min_matches
                && words_within_window(&matched[..min_matches], &message_words)
            {
                targets.push(course.clone());
                continue;
            }
        }

        if let Some(first_word) = title_words.first() {
            if lowered.contains(first_word) && lowered.contains(&category) {
                targets.push(course.clone());
                continue;
            }
        }

        if targets.is_empty() && lowered.contains(&category) && lowered.contains(&difficulty) {
            targets.push(course.clone());
        }
    }

    if targets.is_empty() && !context.is_empty() {
        if ["both", "all", "these"].iter().any(|word| message_words.contains(word)) {
            for course in courses {
                if context.contains(&course.title.to_ascii_lowercase()) {
                    targets.push(course.clone());
                }
            }
        } else if ["this", "that"].iter().any(|word| message_words.contains(word))
            || is_affirmative(message)
        {
            // Bare confirmation: take the first course mentioned in context.
            for course in courses {
                if context.contains(&course.title.to_ascii_lowercase()) {
                    targets.push(course.clone());
                    break;
                }
            }
        }
    }

    targets
}

fn matches_abbreviation(lowered: &str, message_words: &[&str], title: &str) -> bool {
    for (abbr, full_words) in ABBREVIATIONS {
        if !message_words.contains(abbr) {
            continue;
        }
        if !full_words.iter().all(|word| title.contains(word)) {
            continue;
        }

        let mentioned_specific: Vec<&str> =
            SPECIFIC_WORDS.iter().copied().filter(|word| lowered.contains(word)).collect();
        if mentioned_specific.is_empty()
            || mentioned_specific.iter().any(|word| title.contains(word))
        {
            return true;
        }
    }
    false
}

fn words_within_window(matched: &[&str], message_words: &[&str]) -> bool {
    let mut positions = Vec::with_capacity(matched.len());
    for word in matched {
        if let Some(position) = message_words.iter().position(|token| token == word) {
            positions.push(position);
        }
    }
    if positions.len() < matched.len() {
        return false;
    }

    let min = positions.iter().min().copied().unwrap_or(0);
    let max = positions.iter().max().copied().unwrap_or(0);
    max - min <= MATCH_WINDOW
}

#[cfg(test)]
mod tests {
    use super::{filter_courses, is_affirmative, resolve_enrollment_targets};
    use crate::catalog::{Course, CourseId};
    use crate::state::ChatMessage;

    fn demo_courses() -> Vec<Course> {
        vec![
            course(1, "Introduction to Artificial Intelligence", "AI", "Beginner"),
            course(2, "Advanced Machine Learning with Python", "AI", "Advanced"),
            course(3, "Deep Learning and Neural Networks", "AI", "Advanced"),
            course(4, "Docker Mastery", "Docker", "Beginner"),
            course(5, "Kubernetes for Developers", "Kubernetes", "Intermediate"),
            course(6, "DevOps Fundamentals", "DevOps", "Beginner"),
        ]
    }

    fn course(id: i64, title: &str, category: &str, difficulty: &str) -> Course {
        Course {
            id: CourseId(id),
            title: title.to_string(),
            description: String::new(),
            category: category.to_string(),
            difficulty: difficulty.to_string(),
            duration_hours: 10,
        }
    }

    #[test]
    fn filter_matches_category() {
        let filtered = filter_courses("show me AI courses", &demo_courses());
        assert_eq!(filtered.len(), 3);
        assert!(filtered.iter().all(|course| course.category == "AI"));
    }

    #[test]
    fn filter_falls_back_to_full_catalog() {
        let filtered = filter_courses("show me cooking classes", &demo_courses());
        assert_eq!(filtered.len(), demo_courses().len());
    }

    #[test]
    fn full_title_is_the_strongest_match() {
        let targets =
            resolve_enrollment_targets("enroll me in Docker Mastery", &[], &demo_courses());
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].id, CourseId(4));
    }

    #[test]
    fn standalone_abbreviation_matches_the_generic_course() {
        let targets =
            resolve_enrollment_targets("sign me up for the ai course", &[], &demo_courses());
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].title, "Introduction to Artificial Intelligence");
    }

    #[test]
    fn abbreviation_inside_a_word_does_not_match() {
        let targets = resolve_enrollment_targets("enroll me in maintenance", &[], &demo_courses());
        assert!(targets.is_empty());
    }

    #[test]
    fn specific_word_redirects_the_abbreviation() {
        // "ai" plus "advanced" should not match the introduction course; it
        // matches the advanced one whose title carries the specific word.
        let targets =
            resolve_enrollment_targets("enroll me in the advanced ai one", &[], &demo_courses());
        assert!(targets
            .iter()
            .all(|course| course.title != "Introduction to Artificial Intelligence"));
    }

    #[test]
    fn partial_title_words_must_appear_close_together() {
        let targets =
            resolve_enrollment_targets("enroll me in deep learning networks", &[], &demo_courses());
        assert!(targets.iter().any(|course| course.id == CourseId(3)));
    }

    #[test]
    fn category_plus_difficulty_matches() {
        let targets = resolve_enrollment_targets(
            "register me for the intermediate kubernetes course",
            &[],
            &demo_courses(),
        );
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].id, CourseId(5));
    }

    #[test]
    fn contextual_this_picks_the_first_mentioned_course() {
        let context = vec![
            ChatMessage::user("tell me about containers"),
            ChatMessage::assistant("You might like Docker Mastery, a beginner course."),
        ];
        let targets = resolve_enrollment_targets("enroll me in this", &context, &demo_courses());
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].id, CourseId(4));
    }

    #[test]
    fn contextual_both_picks_every_mentioned_course() {
        let context = vec![ChatMessage::assistant(
            "I recommend Docker Mastery and Kubernetes for Developers.",
        )];
        let targets =
            resolve_enrollment_targets("enroll me in both please", &context, &demo_courses());
        assert_eq!(targets.len(), 2);
    }

    #[test]
    fn no_mention_and_no_context_resolves_nothing() {
        let targets = resolve_enrollment_targets("enroll me please", &[], &demo_courses());
        assert!(targets.is_empty());
    }

    #[test]
    fn bare_yes_is_affirmative() {
        assert!(is_affirmative("yes"));
        assert!(is_affirmative("ok, sure"));
        assert!(!is_affirmative("I am not certain"));
    }
}
