//! Shapes the model is asked to produce.
//!
//! Drafts carry no server-assigned ids. Their JSON Schema is sent with the
//! request and the reply is validated against the same schema, so unknown
//! fields and missing required fields are both rejected.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::models::ActivityType;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct OutlineDraft {
    pub title: String,
    pub prerequisites: Vec<String>,
    pub description: String,
    /// Student-centred outcomes ("Students will be able to ...").
    #[schemars(length(min = 1))]
    pub learning_outcomes: Vec<String>,
    pub duration: String,
    pub credits: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ModuleDraft {
    /// Id of the existing module this entry keeps, omitted for new modules.
    #[serde(default)]
    pub id: Option<String>,
    pub title: String,
    pub description: String,
    pub hours: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ModuleSetDraft {
    #[schemars(length(min = 1))]
    pub modules: Vec<ModuleDraft>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct SubmoduleDraft {
    #[serde(default)]
    pub id: Option<String>,
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct SubmoduleSetDraft {
    #[schemars(length(min = 1))]
    pub submodules: Vec<SubmoduleDraft>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ActivityDraft {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    pub description: String,
    pub objective: String,
    pub activity_type: ActivityType,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ActivitySetDraft {
    #[schemars(length(min = 1))]
    pub activities: Vec<ActivityDraft>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct QuestionDraft {
    pub question: String,
    /// Four options for multiple choice, omitted for true/false.
    #[serde(default)]
    pub options: Option<Vec<String>>,
    pub answer: String,
    pub explanation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct QuizDraft {
    #[schemars(length(min = 1))]
    pub questions: Vec<QuestionDraft>,
}
