//! Reviewer suggestions for freshly generated artifacts.

use std::sync::Arc;

use crate::generation::{parse_json, schema_of};
use crate::llm::{GenerationRequest, GenerationService};
use crate::models::{FeedbackMode, Stage, SuggestionOutput, SuggestionReport};

const DISABLED_MESSAGE: &str = "Feedback mode disabled.";

const SYSTEM: &str = "You are an experienced instructional designer reviewing course material. \
Give actionable suggestions the author can apply in a redo request.";

/// Asks the generation service for improvement suggestions.
///
/// Never fails: any problem is folded into [`SuggestionReport::Failed`].
#[derive(Clone)]
pub struct SuggestionAdvisor {
    service: Arc<dyn GenerationService>,
}

impl SuggestionAdvisor {
    pub fn new(service: Arc<dyn GenerationService>) -> Self {
        Self { service }
    }

    pub async fn suggest(
        &self,
        stage: Stage,
        artifact_json: &str,
        mode: FeedbackMode,
    ) -> SuggestionReport {
        if mode == FeedbackMode::None {
            return SuggestionReport::Ready(SuggestionOutput {
                suggestions: Vec::new(),
                message: DISABLED_MESSAGE.to_string(),
            });
        }

        let request = GenerationRequest::json(
            prompt(stage, artifact_json, mode),
            schema_of::<SuggestionOutput>(),
        )
        .with_system(SYSTEM);

        let raw = match self.service.generate(request).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(stage = stage.as_str(), "Suggestion call failed: {}", e);
                return SuggestionReport::Failed {
                    error: e.to_string(),
                };
            }
        };

        match parse_json::<SuggestionOutput>(&raw).into_result() {
            Ok(output) => SuggestionReport::Ready(output),
            Err(e) => {
                tracing::warn!(stage = stage.as_str(), "Unusable suggestion response: {}", e);
                SuggestionReport::Failed {
                    error: e.to_string(),
                }
            }
        }
    }
}

fn guidance(stage: Stage) -> &'static str {
    match stage {
        Stage::Outline => {
            "Check that learning outcomes are measurable, prerequisites are realistic and the description matches the audience."
        }
        Stage::Module => {
            "Check module ordering, overlap between modules, balance of hours and coverage of every learning outcome."
        }
        Stage::Submodule => {
            "Check that submodules progress logically, cover the module description and are neither too broad nor too narrow."
        }
        Stage::Activity => {
            "Check the mix of activity types, whether each objective is assessable and whether the activities fit the submodule."
        }
        Stage::Reading => {
            "Check accuracy, clarity, use of examples, reading level and whether the material repeats earlier content."
        }
        Stage::Lecture => {
            "Check pacing against the target duration, engagement hooks, clarity of explanations and the closing summary."
        }
        Stage::Quiz => {
            "Check question clarity, answer correctness, distractor quality and coverage of the material summary."
        }
        Stage::Assignment => {
            "Check that deliverables are concrete, evaluation criteria are fair and the task integrates the module's concepts."
        }
        Stage::MindMap => {
            "Check that the main themes are present, relationships are meaningful and the hierarchy is easy to follow."
        }
    }
}

fn prompt(stage: Stage, artifact_json: &str, mode: FeedbackMode) -> String {
    let depth = match mode {
        FeedbackMode::Detailed => {
            "Give detailed suggestions, each explaining what to change and how it improves the result."
        }
        _ => "Give at most three short, concise suggestions.",
    };
    format!(
        "Review the following {stage} produced for a course.\n\n{guidance}\n{depth}\n\
Also write a one-sentence overall message.\n\n{artifact_json}",
        stage = stage.as_str().replace('_', " "),
        guidance = guidance(stage),
    )
}
