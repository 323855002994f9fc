use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A plain-text source the instructor attaches to a content request.
///
/// Extraction from PDFs or web pages happens before the request reaches
/// this service; only the text is accepted here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceMaterial {
    /// Short label such as "lecture notes" or "web article".
    pub label: String,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceSummary {
    pub label: String,
    pub summary: String,
}

/// Reading passage for one activity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReadingMaterial {
    pub activity_id: Uuid,
    /// Markdown body.
    pub content: String,
    /// Condensed bullet summary fed to later stages as context.
    pub summary: String,
    #[serde(default)]
    pub source_summaries: Vec<SourceSummary>,
}

/// Video lecture script for one activity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LectureScript {
    pub activity_id: Uuid,
    pub script: String,
    pub summary: String,
    pub duration_minutes: Option<u32>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
pub enum QuizType {
    #[serde(rename = "MCQ")]
    MultipleChoice,
    #[serde(rename = "T/F")]
    TrueFalse,
}

impl QuizType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MultipleChoice => "MCQ",
            Self::TrueFalse => "T/F",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuizQuestion {
    pub question: String,
    /// Present for multiple choice only.
    pub options: Option<Vec<String>>,
    pub answer: String,
    pub explanation: String,
    pub points: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuizSet {
    pub activity_id: Uuid,
    pub quiz_type: QuizType,
    pub total_score: u32,
    pub questions: Vec<QuizQuestion>,
    /// The material summary the quiz was written against.
    pub material_summary: String,
    pub summary: String,
}

/// Integrative assignment for an assessment or lab activity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Assignment {
    pub activity_id: Uuid,
    pub content: String,
    pub summary: String,
}

/// Nested-bullet mind map of a module's submodules.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MindMap {
    pub module_id: Uuid,
    pub content: String,
}

/// Parameters for a quiz request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuizSpec {
    pub number_of_questions: u32,
    pub quiz_type: QuizType,
    pub total_score: u32,
}

impl QuizSpec {
    /// Splits the total score evenly, giving any remainder to the first
    /// questions so the points always add up to `total_score`.
    pub fn points_for(&self, count: usize) -> Vec<u32> {
        if count == 0 {
            return Vec::new();
        }
        let count_u32 = count as u32;
        let base = self.total_score / count_u32;
        let remainder = (self.total_score % count_u32) as usize;
        (0..count)
            .map(|i| if i < remainder { base + 1 } else { base })
            .collect()
    }
}

/// Instructor parameters for reading material.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReadingRequest {
    pub user_prompt: String,
    /// Summary of earlier material. Filled from preceding activities when omitted.
    #[serde(default)]
    pub previous_summary: Option<String>,
    #[serde(default)]
    pub sources: Vec<SourceMaterial>,
}

/// Instructor parameters for a lecture script.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LectureRequest {
    pub user_prompt: String,
    #[serde(default)]
    pub previous_summary: Option<String>,
    #[serde(default)]
    pub sources: Vec<SourceMaterial>,
    #[serde(default)]
    pub examples: Vec<String>,
    #[serde(default)]
    pub duration_minutes: Option<u32>,
}

/// Instructor parameters for a quiz.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuizRequest {
    pub user_prompt: String,
    #[serde(flatten)]
    pub spec: QuizSpec,
    /// Material to quiz on. Filled from preceding activities when omitted.
    #[serde(default)]
    pub material_summary: Option<String>,
}

/// Instructor parameters for an assignment.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AssignmentRequest {
    pub user_prompt: String,
}
