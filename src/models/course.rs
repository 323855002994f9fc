use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The instructor's description of a course, captured once at course start.
///
/// This is the only client-authored record in the pipeline. Everything
/// downstream (outline, modules, ...) is generated from it and versioned
/// separately; the init record itself is never mutated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CourseInit {
    pub id: Uuid,
    pub title: String,
    pub prerequisites: Vec<String>,
    pub description: String,
    pub learning_objectives: Vec<String>,
    pub target_audience: String,
    /// Free-form duration as the instructor wrote it (e.g. "6 weeks").
    pub duration: String,
    pub credits: u32,
}

/// Input for starting a course. The id is generated when omitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCourseInput {
    #[serde(default)]
    pub id: Option<Uuid>,
    pub title: String,
    #[serde(default)]
    pub prerequisites: Vec<String>,
    pub description: String,
    pub learning_objectives: Vec<String>,
    pub target_audience: String,
    pub duration: String,
    pub credits: u32,
    /// Overrides the server's default feedback mode for this request.
    #[serde(default)]
    pub feedback_mode: Option<super::FeedbackMode>,
}

impl CreateCourseInput {
    pub fn into_init(self) -> CourseInit {
        CourseInit {
            id: self.id.unwrap_or_else(Uuid::new_v4),
            title: self.title,
            prerequisites: self.prerequisites,
            description: self.description,
            learning_objectives: self.learning_objectives,
            target_audience: self.target_audience,
            duration: self.duration,
            credits: self.credits,
        }
    }
}

/// A stored course record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Course {
    pub init: CourseInit,
    pub created_at: DateTime<Utc>,
}

/// The student-facing outline of a course.
///
/// Shares its id with the [`CourseInit`] it was generated from. Learning
/// outcomes are derived from the instructor's objectives rather than copied.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CourseOutline {
    pub course_id: Uuid,
    pub title: String,
    pub prerequisites: Vec<String>,
    pub description: String,
    pub learning_outcomes: Vec<String>,
    pub duration: String,
    pub credits: u32,
}
