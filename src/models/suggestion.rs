use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// How much reviewer feedback to request after a stage completes.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackMode {
    None,
    #[default]
    Light,
    Detailed,
}

impl FeedbackMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Light => "light",
            Self::Detailed => "detailed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "none" => Some(Self::None),
            "light" => Some(Self::Light),
            "detailed" => Some(Self::Detailed),
            _ => None,
        }
    }
}

/// Reviewer suggestions for a stage artifact.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
pub struct SuggestionOutput {
    pub suggestions: Vec<String>,
    pub message: String,
}

/// Outcome of asking for suggestions.
///
/// Suggestion failures never fail the request that produced the artifact;
/// they are reported inline as `{"error": "..."}` instead.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum SuggestionReport {
    Ready(SuggestionOutput),
    Failed { error: String },
}

impl SuggestionReport {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}
