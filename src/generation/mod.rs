//! Stage generators and the redo layer.
//!
//! [`StageGenerator`] turns a typed [`StageInput`] into a validated
//! [`StageArtifact`] by prompting the generation service. A redo is the same
//! call with the previous artifact and the user's feedback appended to the
//! prompt. Nothing here touches storage.

pub mod draft;
mod ids;
mod normalize;
mod prompts;
mod schema;
mod sources;

pub use ids::reconcile_ids;
pub use normalize::strip_code_fence;
pub use schema::{parse_json, schema_of, ParseOutcome};
pub use sources::{clean_text, truncate_chars, MAX_CONTEXT_CHARS};

use std::sync::Arc;

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::llm::{GenerationRequest, GenerationService, LlmError};
use crate::models::*;
use draft::*;

/// Why a stage could not produce an artifact.
///
/// None of these are retried here; the caller decides.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Generation failed: {0}")]
    GenerationFailed(#[from] LlmError),

    #[error("Malformed response: {reason}")]
    MalformedResponse { raw: String, reason: String },

    #[error("Schema validation failed: {}", .errors.join("; "))]
    SchemaValidationFailed { errors: Vec<String> },

    #[error("Missing context: {0}")]
    MissingContext(String),
}

/// Everything a content stage needs to know about where it sits in the course.
#[derive(Debug, Clone)]
pub struct ContentContext {
    pub outline: CourseOutline,
    pub module: Module,
    pub submodule: Submodule,
    pub activity: Activity,
}

/// Typed input for one stage.
#[derive(Debug, Clone)]
pub enum StageInput {
    Outline(CourseInit),
    /// `count` is `None` on a redo, where the feedback decides cardinality.
    Module {
        outline: CourseOutline,
        count: Option<usize>,
    },
    Submodule {
        outline: CourseOutline,
        module: Module,
    },
    Activity {
        submodule: Submodule,
        preferences: ActivityPreferences,
    },
    Reading {
        context: ContentContext,
        request: ReadingRequest,
    },
    Lecture {
        context: ContentContext,
        request: LectureRequest,
    },
    Quiz {
        context: ContentContext,
        request: QuizRequest,
    },
    Assignment {
        context: ContentContext,
        request: AssignmentRequest,
        submodules: Vec<Submodule>,
    },
    MindMap {
        module: Module,
        submodules: Vec<Submodule>,
    },
}

impl StageInput {
    pub fn stage(&self) -> Stage {
        match self {
            Self::Outline(_) => Stage::Outline,
            Self::Module { .. } => Stage::Module,
            Self::Submodule { .. } => Stage::Submodule,
            Self::Activity { .. } => Stage::Activity,
            Self::Reading { .. } => Stage::Reading,
            Self::Lecture { .. } => Stage::Lecture,
            Self::Quiz { .. } => Stage::Quiz,
            Self::Assignment { .. } => Stage::Assignment,
            Self::MindMap { .. } => Stage::MindMap,
        }
    }
}

struct Revision<'a> {
    previous: &'a StageArtifact,
    feedback: &'a str,
}

impl Revision<'_> {
    fn section(&self) -> Result<String, GenerationError> {
        let body = self
            .previous
            .to_body()
            .and_then(|body| serde_json::to_string_pretty(&body))
            .map_err(|e| {
                GenerationError::MissingContext(format!("previous artifact is unreadable: {e}"))
            })?;
        Ok(prompts::revision(&body, self.feedback))
    }
}

#[derive(Clone)]
pub struct StageGenerator {
    service: Arc<dyn GenerationService>,
    temperature: Option<f32>,
}

impl StageGenerator {
    pub fn new(service: Arc<dyn GenerationService>) -> Self {
        Self {
            service,
            temperature: None,
        }
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    /// Produce a fresh artifact for the stage. Every child entity gets a new id.
    pub async fn generate(&self, input: &StageInput) -> Result<StageArtifact, GenerationError> {
        tracing::info!(stage = input.stage().as_str(), "Generating stage artifact");
        self.run(input, None).await
    }

    /// Regenerate `previous` according to `feedback`.
    ///
    /// Children the model keeps retain their ids; new children get fresh ones.
    /// Fails fast with [`GenerationError::MissingContext`] when `previous`
    /// belongs to another stage.
    pub async fn redo(
        &self,
        input: &StageInput,
        previous: &StageArtifact,
        feedback: &str,
    ) -> Result<StageArtifact, GenerationError> {
        if previous.stage() != input.stage() {
            return Err(GenerationError::MissingContext(format!(
                "redo of {} requires a previous {} artifact, got {}",
                input.stage().as_str(),
                input.stage().as_str(),
                previous.stage().as_str()
            )));
        }
        tracing::info!(stage = input.stage().as_str(), "Redoing stage artifact");
        self.run(input, Some(Revision { previous, feedback })).await
    }

    async fn run(
        &self,
        input: &StageInput,
        revision: Option<Revision<'_>>,
    ) -> Result<StageArtifact, GenerationError> {
        let section = match &revision {
            Some(r) => r.section()?,
            None => String::new(),
        };
        let previous = revision.as_ref().map(|r| r.previous);
        let previous_ids = previous.map(StageArtifact::child_ids).unwrap_or_default();

        match input {
            StageInput::Outline(course) => {
                let draft: OutlineDraft = self
                    .call_json(Stage::Outline, prompts::outline(course) + &section)
                    .await?;
                // A first outline echoes the instructor's scalars; a redo may change them.
                let (duration, credits) = match previous {
                    None => (course.duration.clone(), course.credits),
                    Some(_) => (draft.duration, draft.credits),
                };
                Ok(StageArtifact::Outline(CourseOutline {
                    course_id: course.id,
                    title: draft.title,
                    prerequisites: draft.prerequisites,
                    description: draft.description,
                    learning_outcomes: draft.learning_outcomes,
                    duration,
                    credits,
                }))
            }

            StageInput::Module { outline, count } => {
                let draft: ModuleSetDraft = self
                    .call_json(Stage::Module, prompts::modules(outline, *count) + &section)
                    .await?;
                let ids = reconcile_ids(
                    draft.modules.iter().map(|m| m.id.as_deref()),
                    &previous_ids,
                );
                let modules = draft
                    .modules
                    .into_iter()
                    .zip(ids)
                    .map(|(m, id)| Module {
                        id,
                        title: m.title,
                        description: m.description,
                        hours: m.hours,
                    })
                    .collect();
                Ok(StageArtifact::Module(ModuleSet {
                    course_id: outline.course_id,
                    modules,
                }))
            }

            StageInput::Submodule { outline, module } => {
                let draft: SubmoduleSetDraft = self
                    .call_json(
                        Stage::Submodule,
                        prompts::submodules(outline, module) + &section,
                    )
                    .await?;
                let ids = reconcile_ids(
                    draft.submodules.iter().map(|s| s.id.as_deref()),
                    &previous_ids,
                );
                let submodules = draft
                    .submodules
                    .into_iter()
                    .zip(ids)
                    .map(|(s, id)| Submodule {
                        id,
                        title: s.title,
                        description: s.description,
                    })
                    .collect();
                Ok(StageArtifact::Submodule(SubmoduleSet {
                    module_id: module.id,
                    submodules,
                }))
            }

            StageInput::Activity {
                submodule,
                preferences,
            } => {
                let draft: ActivitySetDraft = self
                    .call_json(
                        Stage::Activity,
                        prompts::activities(submodule, preferences) + &section,
                    )
                    .await?;
                let ids = reconcile_ids(
                    draft.activities.iter().map(|a| a.id.as_deref()),
                    &previous_ids,
                );
                let activities = draft
                    .activities
                    .into_iter()
                    .zip(ids)
                    .map(|(a, id)| Activity {
                        id,
                        name: a.name,
                        description: a.description,
                        objective: a.objective,
                        activity_type: a.activity_type,
                    })
                    .collect();
                Ok(StageArtifact::Activity(ActivitySet {
                    submodule_id: submodule.id,
                    activities,
                }))
            }

            StageInput::Reading { context, request } => {
                let mut source_summaries = self.summarize_sources(&request.sources).await?;
                if source_summaries.is_empty() {
                    if let Some(StageArtifact::Reading(prev)) = previous {
                        source_summaries = prev.source_summaries.clone();
                    }
                }
                let source_context = sources::combine_summaries(&source_summaries);
                let prompt = prompts::reading(
                    context,
                    &request.user_prompt,
                    request.previous_summary.as_deref().unwrap_or_default(),
                    &source_context,
                ) + &section;

                let content = self.call_text(Stage::Reading, prompt).await?;
                let summary = self
                    .summarize(Stage::Reading, &content, "reading material")
                    .await?;
                Ok(StageArtifact::Reading(ReadingMaterial {
                    activity_id: context.activity.id,
                    content,
                    summary,
                    source_summaries,
                }))
            }

            StageInput::Lecture { context, request } => {
                let duration_minutes = match (request.duration_minutes, previous) {
                    (Some(d), _) => Some(d),
                    (None, Some(StageArtifact::Lecture(prev))) => prev.duration_minutes,
                    (None, _) => None,
                };
                let source_text = source_block(&request.sources);
                let prompt = prompts::lecture(
                    context,
                    &request.user_prompt,
                    request.previous_summary.as_deref().unwrap_or_default(),
                    &source_text,
                    &request.examples,
                    duration_minutes,
                ) + &section;

                let script = self.call_text(Stage::Lecture, prompt).await?;
                let summary = self
                    .summarize(Stage::Lecture, &script, "lecture script")
                    .await?;
                Ok(StageArtifact::Lecture(LectureScript {
                    activity_id: context.activity.id,
                    script,
                    summary,
                    duration_minutes,
                }))
            }

            StageInput::Quiz { context, request } => {
                let material = request
                    .material_summary
                    .as_deref()
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .ok_or_else(|| {
                        GenerationError::MissingContext(
                            "a quiz requires a material summary".to_string(),
                        )
                    })?;

                let draft: QuizDraft = self
                    .call_json(
                        Stage::Quiz,
                        prompts::quiz(context, &request.user_prompt, material, &request.spec)
                            + &section,
                    )
                    .await?;
                let errors = check_quiz(&draft, request.spec.quiz_type);
                if !errors.is_empty() {
                    tracing::warn!("Quiz failed format checks: {:?}", errors);
                    return Err(GenerationError::SchemaValidationFailed { errors });
                }

                let points = request.spec.points_for(draft.questions.len());
                let questions: Vec<QuizQuestion> = draft
                    .questions
                    .into_iter()
                    .zip(points)
                    .map(|(q, points)| QuizQuestion {
                        question: q.question,
                        options: q.options,
                        answer: q.answer,
                        explanation: q.explanation,
                        points,
                    })
                    .collect();
                let summary = quiz_summary(&questions, request.spec.quiz_type);
                Ok(StageArtifact::Quiz(QuizSet {
                    activity_id: context.activity.id,
                    quiz_type: request.spec.quiz_type,
                    total_score: request.spec.total_score,
                    questions,
                    material_summary: material.to_string(),
                    summary,
                }))
            }

            StageInput::Assignment {
                context,
                request,
                submodules,
            } => {
                let prompt =
                    prompts::assignment(context, &request.user_prompt, submodules) + &section;
                let content = self.call_text(Stage::Assignment, prompt).await?;
                let summary = self
                    .summarize(Stage::Assignment, &content, "assignment")
                    .await?;
                Ok(StageArtifact::Assignment(Assignment {
                    activity_id: context.activity.id,
                    content,
                    summary,
                }))
            }

            StageInput::MindMap { module, submodules } => {
                if submodules.is_empty() {
                    return Err(GenerationError::MissingContext(
                        "a mind map requires at least one submodule".to_string(),
                    ));
                }
                let content = self
                    .call_text(Stage::MindMap, prompts::mind_map(module, submodules) + &section)
                    .await?;
                Ok(StageArtifact::MindMap(MindMap {
                    module_id: module.id,
                    content,
                }))
            }
        }
    }

    async fn call_json<T: JsonSchema + DeserializeOwned>(
        &self,
        stage: Stage,
        prompt: String,
    ) -> Result<T, GenerationError> {
        let request = GenerationRequest::json(prompt, schema_of::<T>())
            .with_system(prompts::system(stage))
            .with_temperature(self.temperature);
        tracing::debug!(model = self.service.model(), stage = stage.as_str(), "Requesting JSON");
        let raw = self.service.generate(request).await?;
        parse_json::<T>(&raw).into_result().inspect_err(|e| {
            tracing::warn!(stage = stage.as_str(), "Rejected model response: {}", e);
        })
    }

    async fn call_text(&self, stage: Stage, prompt: String) -> Result<String, GenerationError> {
        let request = GenerationRequest::text(prompt)
            .with_system(prompts::system(stage))
            .with_temperature(self.temperature);
        tracing::debug!(model = self.service.model(), stage = stage.as_str(), "Requesting text");
        let raw = self.service.generate(request).await?;
        let text = strip_code_fence(&raw).to_string();
        if text.is_empty() {
            tracing::warn!(stage = stage.as_str(), "Model returned only an empty fence");
            return Err(GenerationError::MalformedResponse {
                raw,
                reason: "response contained no text".to_string(),
            });
        }
        Ok(text)
    }

    async fn summarize(
        &self,
        stage: Stage,
        text: &str,
        label: &str,
    ) -> Result<String, GenerationError> {
        let bounded = truncate_chars(text, MAX_CONTEXT_CHARS);
        self.call_text(stage, prompts::summarize(bounded, label)).await
    }

    async fn summarize_sources(
        &self,
        materials: &[SourceMaterial],
    ) -> Result<Vec<SourceSummary>, GenerationError> {
        let mut summaries = Vec::new();
        for source in materials {
            let cleaned = clean_text(&source.text);
            if cleaned.is_empty() {
                continue;
            }
            let summary = self.summarize(Stage::Reading, &cleaned, &source.label).await?;
            summaries.push(SourceSummary {
                label: source.label.clone(),
                summary,
            });
        }
        Ok(summaries)
    }
}

/// Cleaned source text for prompts that take material verbatim.
fn source_block(materials: &[SourceMaterial]) -> String {
    let joined = materials
        .iter()
        .map(|s| (s.label.as_str(), clean_text(&s.text)))
        .filter(|(_, text)| !text.is_empty())
        .map(|(label, text)| format!("--- {label} ---\n{text}"))
        .collect::<Vec<_>>()
        .join("\n\n");
    truncate_chars(&joined, MAX_CONTEXT_CHARS).to_string()
}

fn check_quiz(draft: &QuizDraft, quiz_type: QuizType) -> Vec<String> {
    let mut errors = Vec::new();
    for (i, q) in draft.questions.iter().enumerate() {
        match quiz_type {
            QuizType::MultipleChoice => match &q.options {
                Some(options) if options.len() == 4 => {
                    if !options.iter().any(|o| o.trim() == q.answer.trim()) {
                        errors.push(format!(
                            "/questions/{i}/answer: not one of the options, got {:?}",
                            q.answer
                        ));
                    }
                }
                Some(options) => errors.push(format!(
                    "/questions/{i}/options: expected 4 options, got {}",
                    options.len()
                )),
                None => errors.push(format!(
                    "/questions/{i}/options: required for multiple choice"
                )),
            },
            QuizType::TrueFalse => {
                if !matches!(q.answer.trim(), "True" | "False") {
                    errors.push(format!(
                        "/questions/{i}/answer: expected \"True\" or \"False\", got {:?}",
                        q.answer
                    ));
                }
            }
        }
    }
    errors
}

fn quiz_summary(questions: &[QuizQuestion], quiz_type: QuizType) -> String {
    let topics = questions
        .iter()
        .map(|q| format!("- {}", q.question))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "{} {} questions:\n{}",
        questions.len(),
        quiz_type.as_str(),
        topics
    )
}
