use std::collections::BTreeSet;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::CatalogError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CourseId(pub i64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StudentId(pub i64);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub id: CourseId,
    pub title: String,
    pub description: String,
    pub category: String,
    pub difficulty: String,
    pub duration_hours: u32,
}

/// Per-course result of one enrollment attempt. `message` carries either the
/// success confirmation or the failure reason.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollmentOutcome {
    pub course_id: CourseId,
    pub success: bool,
    pub message: String,
}

/// One past request/response pair from the external chat history store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatExchange {
    pub message: String,
    pub response: String,
    pub at: DateTime<Utc>,
}

/// External collaborator interface over the course catalog and enrollment
/// records. Implementations must support concurrent reads; `enroll` must be
/// idempotent per (student, course) pair.
#[async_trait]
pub trait CourseStore: Send + Sync {
    async fn fetch_courses(&self, category: Option<&str>) -> Result<Vec<Course>, CatalogError>;

    /// Substring match on title.
    async fn search_courses(&self, query: &str) -> Result<Vec<Course>, CatalogError>;

    async fn enroll(
        &self,
        student_id: StudentId,
        course_id: CourseId,
    ) -> Result<EnrollmentOutcome, CatalogError>;

    /// Most-recent-first; callers reverse to chronological order.
    async fn recent_history(
        &self,
        student_id: StudentId,
    ) -> Result<Vec<ChatExchange>, CatalogError>;
}

#[derive(Debug, Default)]
pub struct InMemoryCourseStore {
    courses: Vec<Course>,
    enrollments: RwLock<BTreeSet<(StudentId, CourseId)>>,
    history: RwLock<Vec<(StudentId, ChatExchange)>>,
}

impl InMemoryCourseStore {
    pub fn new(courses: Vec<Course>) -> Self {
        Self { courses, enrollments: RwLock::default(), history: RwLock::default() }
    }

    /// Demo catalog used by the CLI and the test suites.
    pub fn with_demo_catalog() -> Self {
        Self::new(demo_catalog())
    }

    pub fn record_exchange(&self, student_id: StudentId, message: &str, response: &str) {
        if let Ok(mut history) = self.history.write() {
            history.push((
                student_id,
                ChatExchange {
                    message: message.to_string(),
                    response: response.to_string(),
                    at: Utc::now(),
                },
            ));
        }
    }

    pub fn is_enrolled(&self, student_id: StudentId, course_id: CourseId) -> bool {
        self.enrollments
            .read()
            .map(|set| set.contains(&(student_id, course_id)))
            .unwrap_or(false)
    }

    pub fn enrollment_count(&self) -> usize {
        self.enrollments.read().map(|set| set.len()).unwrap_or(0)
    }
}

#[async_trait]
impl CourseStore for InMemoryCourseStore {
    async fn fetch_courses(&self, category: Option<&str>) -> Result<Vec<Course>, CatalogError> {
        let courses = match category {
            Some(category) => self
                .courses
                .iter()
                .filter(|course| course.category.eq_ignore_ascii_case(category))
                .cloned()
                .collect(),
            None => self.courses.clone(),
        };
        Ok(courses)
    }

    async fn search_courses(&self, query: &str) -> Result<Vec<Course>, CatalogError> {
        let needle = query.to_ascii_lowercase();
        Ok(self
            .courses
            .iter()
            .filter(|course| course.title.to_ascii_lowercase().contains(&needle))
            .cloned()
            .collect())
    }

    async fn enroll(
        &self,
        student_id: StudentId,
        course_id: CourseId,
    ) -> Result<EnrollmentOutcome, CatalogError> {
        let course = self
            .courses
            .iter()
            .find(|course| course.id == course_id)
            .ok_or(CatalogError::UnknownCourse(course_id.0))?;

        let mut enrollments = self
            .enrollments
            .write()
            .map_err(|_| CatalogError::Unavailable("enrollment store lock poisoned".to_string()))?;

        if !enrollments.insert((student_id, course_id)) {
            return Ok(EnrollmentOutcome {
                course_id,
                success: false,
                message: "Already enrolled".to_string(),
            });
        }

        Ok(EnrollmentOutcome {
            course_id,
            success: true,
            message: format!("Successfully enrolled in {}", course.title),
        })
    }

    async fn recent_history(
        &self,
        student_id: StudentId,
    ) -> Result<Vec<ChatExchange>, CatalogError> {
        let history = self
            .history
            .read()
            .map_err(|_| CatalogError::Unavailable("history store lock poisoned".to_string()))?;

        let mut exchanges: Vec<ChatExchange> = history
            .iter()
            .filter(|(owner, _)| *owner == student_id)
            .map(|(_, exchange)| exchange.clone())
            .collect();
        exchanges.reverse();
        Ok(exchanges)
    }
}

fn demo_catalog() -> Vec<Course> {
    vec![
        Course {
            id: CourseId(1),
            title: "Introduction to Artificial Intelligence".to_string(),
            description: "Fundamentals of AI, machine learning, and neural networks".to_string(),
            category: "AI".to_string(),
            difficulty: "Beginner".to_string(),
            duration_hours: 40,
        },
        Course {
            id: CourseId(2),
            title: "Advanced Machine Learning with Python".to_string(),
            description: "Deep dive into ML algorithms and real-world applications".to_string(),
            category: "AI".to_string(),
            difficulty: "Advanced".to_string(),
            duration_hours: 60,
        },
        Course {
            id: CourseId(3),
            title: "Deep Learning and Neural Networks".to_string(),
            description: "Build and train deep learning models".to_string(),
            category: "AI".to_string(),
            difficulty: "Advanced".to_string(),
            duration_hours: 70,
        },
        Course {
            id: CourseId(4),
            title: "Docker Mastery".to_string(),
            description: "Containerize applications from development to production".to_string(),
            category: "Docker".to_string(),
            difficulty: "Beginner".to_string(),
            duration_hours: 25,
        },
        Course {
            id: CourseId(5),
            title: "Kubernetes for Developers".to_string(),
            description: "Deploy and operate workloads on Kubernetes clusters".to_string(),
            category: "Kubernetes".to_string(),
            difficulty: "Intermediate".to_string(),
            duration_hours: 35,
        },
        Course {
            id: CourseId(6),
            title: "DevOps Fundamentals".to_string(),
            description: "CI/CD pipelines, infrastructure as code, and team practices".to_string(),
            category: "DevOps".to_string(),
            difficulty: "Beginner".to_string(),
            duration_hours: 30,
        },
    ]
}
