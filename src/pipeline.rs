//! Per-request orchestration: load context, generate or redo, record, suggest.
//!
//! Every operation is sequential. The latest version id for the target
//! (entity, stage) is read before the model is called and used as the
//! compare-and-swap value when recording, so a concurrent write surfaces as
//! a conflict instead of being overwritten.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{Database, StoreError};
use crate::error::{Error, Result};
use crate::generation::{ContentContext, GenerationError, StageGenerator, StageInput};
use crate::models::*;
use crate::suggest::SuggestionAdvisor;

/// How many preceding activities feed the "previous material" context.
const PRECEDING_ACTIVITIES: usize = 3;

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub store_timeout: Duration,
    pub feedback_mode: FeedbackMode,
    pub module_count: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            store_timeout: Duration::from_secs(10),
            feedback_mode: FeedbackMode::Light,
            module_count: 5,
        }
    }
}

/// Generate a stage from parameters, or redo its latest version from feedback.
///
/// Blank feedback is a redo that asks for no change.
#[derive(Debug, Clone)]
pub enum Action<T> {
    Generate(T),
    Redo(String),
}

impl<T> Action<T> {
    fn split(self) -> (Option<T>, Option<String>) {
        match self {
            Self::Generate(params) => (Some(params), None),
            Self::Redo(feedback) => (None, Some(feedback.trim().to_string())),
        }
    }
}

/// Path ids addressing one activity.
#[derive(Debug, Clone, Copy)]
pub struct ActivityScope {
    pub course_id: Uuid,
    pub module_id: Uuid,
    pub submodule_id: Uuid,
    pub activity_id: Uuid,
}

/// What every generate, redo and rollback call returns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageResponse {
    pub stage: Stage,
    pub result: serde_json::Value,
    pub suggestions: SuggestionReport,
    pub version_id: Uuid,
    pub previous_version_id: Option<Uuid>,
    pub tag: String,
}

#[derive(Clone)]
pub struct Pipeline {
    db: Database,
    generator: StageGenerator,
    advisor: SuggestionAdvisor,
    settings: PipelineSettings,
}

impl Pipeline {
    pub fn new(
        db: Database,
        generator: StageGenerator,
        advisor: SuggestionAdvisor,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            db,
            generator,
            advisor,
            settings,
        }
    }

    // ============================================================
    // Course and outline
    // ============================================================

    pub async fn start_course(&self, input: CreateCourseInput) -> Result<StageResponse> {
        let mode = self.mode(input.feedback_mode);
        let init = input.into_init();
        if init.title.trim().is_empty() {
            return Err(Error::InvalidInput(
                "course title must not be empty".to_string(),
            ));
        }

        let id = init.id;
        if self.store(move |db| db.get_course(id)).await?.is_some() {
            return Err(StoreError::Conflict(format!("course {id} already exists")).into());
        }

        let artifact = self
            .generator
            .generate(&StageInput::Outline(init.clone()))
            .await?;
        let (_, version) = self
            .store(move |db| db.create_course_with_outline(&init, &artifact))
            .await?;
        self.respond(version, mode).await
    }

    pub async fn redo_outline(
        &self,
        course_id: Uuid,
        feedback: String,
        mode: Option<FeedbackMode>,
    ) -> Result<StageResponse> {
        let (_, feedback) = Action::<()>::Redo(feedback).split();
        let course = self.course(course_id).await?;
        let latest = self.latest_of(course_id, Stage::Outline).await?;
        self.finish(
            course_id,
            StageInput::Outline(course.init),
            latest,
            feedback.as_deref(),
            self.mode(mode),
        )
        .await
    }

    // ============================================================
    // Structure stages
    // ============================================================

    pub async fn modules(
        &self,
        course_id: Uuid,
        action: Action<Option<usize>>,
        mode: Option<FeedbackMode>,
    ) -> Result<StageResponse> {
        let (count, feedback) = action.split();
        let outline = self.outline(course_id).await?;
        let latest = self.latest_of(course_id, Stage::Module).await?;

        // No count on redo: the feedback decides the cardinality.
        let count = match count {
            Some(requested) => {
                let count = requested.unwrap_or(self.settings.module_count);
                if count == 0 {
                    return Err(Error::InvalidInput(
                        "module count must be at least 1".to_string(),
                    ));
                }
                Some(count)
            }
            None => None,
        };

        self.finish(
            course_id,
            StageInput::Module { outline, count },
            latest,
            feedback.as_deref(),
            self.mode(mode),
        )
        .await
    }

    pub async fn submodules(
        &self,
        course_id: Uuid,
        module_id: Uuid,
        action: Action<()>,
        mode: Option<FeedbackMode>,
    ) -> Result<StageResponse> {
        let (_, feedback) = action.split();
        let outline = self.outline(course_id).await?;
        let module = self.module(course_id, module_id).await?;
        let latest = self.latest_of(module_id, Stage::Submodule).await?;

        self.finish(
            module_id,
            StageInput::Submodule { outline, module },
            latest,
            feedback.as_deref(),
            self.mode(mode),
        )
        .await
    }

    pub async fn mind_map(
        &self,
        course_id: Uuid,
        module_id: Uuid,
        action: Action<()>,
        mode: Option<FeedbackMode>,
    ) -> Result<StageResponse> {
        let (_, feedback) = action.split();
        let module = self.module(course_id, module_id).await?;
        let submodules = self.submodule_set(module_id).await?.submodules;
        let latest = self.latest_of(module_id, Stage::MindMap).await?;

        self.finish(
            module_id,
            StageInput::MindMap { module, submodules },
            latest,
            feedback.as_deref(),
            self.mode(mode),
        )
        .await
    }

    pub async fn activities(
        &self,
        course_id: Uuid,
        module_id: Uuid,
        submodule_id: Uuid,
        action: Action<ActivityPreferences>,
        mode: Option<FeedbackMode>,
    ) -> Result<StageResponse> {
        let (preferences, feedback) = action.split();
        self.module(course_id, module_id).await?;
        let submodule = self.submodule(module_id, submodule_id).await?;
        let latest = self.latest_of(submodule_id, Stage::Activity).await?;

        self.finish(
            submodule_id,
            StageInput::Activity {
                submodule,
                preferences: preferences.unwrap_or_default(),
            },
            latest,
            feedback.as_deref(),
            self.mode(mode),
        )
        .await
    }

    // ============================================================
    // Content stages
    // ============================================================

    pub async fn reading(
        &self,
        scope: ActivityScope,
        action: Action<ReadingRequest>,
        mode: Option<FeedbackMode>,
    ) -> Result<StageResponse> {
        let (request, feedback) = action.split();
        let (context, set) = self.content_context(&scope).await?;
        let preceding = self.preceding_summaries(&set, scope.activity_id).await?;
        let latest = self.latest_of(scope.activity_id, Stage::Reading).await?;

        let request = match request {
            Some(mut request) => {
                if request.previous_summary.is_none() {
                    request.previous_summary = preceding;
                }
                request
            }
            None => ReadingRequest {
                user_prompt: feedback.clone().unwrap_or_default(),
                previous_summary: preceding,
                sources: Vec::new(),
            },
        };

        self.finish(
            scope.activity_id,
            StageInput::Reading { context, request },
            latest,
            feedback.as_deref(),
            self.mode(mode),
        )
        .await
    }

    pub async fn lecture(
        &self,
        scope: ActivityScope,
        action: Action<LectureRequest>,
        mode: Option<FeedbackMode>,
    ) -> Result<StageResponse> {
        let (request, feedback) = action.split();
        let (context, set) = self.content_context(&scope).await?;
        let preceding = self.preceding_summaries(&set, scope.activity_id).await?;
        let latest = self.latest_of(scope.activity_id, Stage::Lecture).await?;

        let request = match request {
            Some(mut request) => {
                if request.previous_summary.is_none() {
                    request.previous_summary = preceding;
                }
                request
            }
            None => LectureRequest {
                user_prompt: feedback.clone().unwrap_or_default(),
                previous_summary: preceding,
                ..LectureRequest::default()
            },
        };

        self.finish(
            scope.activity_id,
            StageInput::Lecture { context, request },
            latest,
            feedback.as_deref(),
            self.mode(mode),
        )
        .await
    }

    pub async fn quiz(
        &self,
        scope: ActivityScope,
        action: Action<QuizRequest>,
        mode: Option<FeedbackMode>,
    ) -> Result<StageResponse> {
        let (request, feedback) = action.split();
        let (context, set) = self.content_context(&scope).await?;
        let latest = self.latest_of(scope.activity_id, Stage::Quiz).await?;

        let request = match request {
            Some(mut request) => {
                if request.spec.number_of_questions == 0 {
                    return Err(Error::InvalidInput(
                        "number_of_questions must be at least 1".to_string(),
                    ));
                }
                let supplied = request
                    .material_summary
                    .as_deref()
                    .is_some_and(|s| !s.trim().is_empty());
                if !supplied {
                    request.material_summary =
                        self.preceding_summaries(&set, scope.activity_id).await?;
                }
                request
            }
            None => match latest.as_ref().map(|v| &v.artifact) {
                Some(StageArtifact::Quiz(previous)) => QuizRequest {
                    user_prompt: feedback.clone().unwrap_or_default(),
                    spec: QuizSpec {
                        number_of_questions: previous.questions.len() as u32,
                        quiz_type: previous.quiz_type,
                        total_score: previous.total_score,
                    },
                    material_summary: Some(previous.material_summary.clone()),
                },
                _ => {
                    return Err(GenerationError::MissingContext(format!(
                        "activity {} has no quiz to redo",
                        scope.activity_id
                    ))
                    .into())
                }
            },
        };

        self.finish(
            scope.activity_id,
            StageInput::Quiz { context, request },
            latest,
            feedback.as_deref(),
            self.mode(mode),
        )
        .await
    }

    pub async fn assignment(
        &self,
        scope: ActivityScope,
        action: Action<AssignmentRequest>,
        mode: Option<FeedbackMode>,
    ) -> Result<StageResponse> {
        let (request, feedback) = action.split();
        let (context, _) = self.content_context(&scope).await?;
        let submodules = self.submodule_set(scope.module_id).await?.submodules;
        let latest = self.latest_of(scope.activity_id, Stage::Assignment).await?;

        let request = request.unwrap_or_else(|| AssignmentRequest {
            user_prompt: feedback.clone().unwrap_or_default(),
        });

        self.finish(
            scope.activity_id,
            StageInput::Assignment {
                context,
                request,
                submodules,
            },
            latest,
            feedback.as_deref(),
            self.mode(mode),
        )
        .await
    }

    // ============================================================
    // Versions
    // ============================================================

    pub async fn rollback(
        &self,
        version_id: Uuid,
        mode: Option<FeedbackMode>,
    ) -> Result<StageResponse> {
        let version = self.store(move |db| db.rollback(version_id)).await?;
        self.respond(version, self.mode(mode)).await
    }

    pub async fn course(&self, course_id: Uuid) -> Result<Course> {
        self.store(move |db| db.get_course(course_id))
            .await?
            .ok_or_else(|| Error::NotFound(format!("course {course_id}")))
    }

    pub async fn version(&self, version_id: Uuid) -> Result<Version> {
        self.store(move |db| db.get_version(version_id))
            .await?
            .ok_or_else(|| Error::NotFound(format!("version {version_id}")))
    }

    pub async fn latest(&self, entity_id: Uuid, stage: Stage) -> Result<Version> {
        self.latest_of(entity_id, stage).await?.ok_or_else(|| {
            Error::NotFound(format!("no {} for {}", stage.as_str(), entity_id))
        })
    }

    pub async fn history(&self, entity_id: Uuid, stage: Stage) -> Result<Vec<Version>> {
        self.store(move |db| db.history(entity_id, stage)).await
    }

    pub async fn versions_by_tag(&self, tag: String) -> Result<Vec<Version>> {
        self.store(move |db| db.find_by_tag(&tag)).await
    }

    // ============================================================
    // Internals
    // ============================================================

    fn mode(&self, requested: Option<FeedbackMode>) -> FeedbackMode {
        requested.unwrap_or(self.settings.feedback_mode)
    }

    async fn store<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&Database) -> std::result::Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        Ok(self.db.blocking(self.settings.store_timeout, op).await?)
    }

    async fn latest_of(&self, entity_id: Uuid, stage: Stage) -> Result<Option<Version>> {
        self.store(move |db| db.latest_version(entity_id, stage))
            .await
    }

    async fn finish(
        &self,
        entity_id: Uuid,
        input: StageInput,
        latest: Option<Version>,
        feedback: Option<&str>,
        mode: FeedbackMode,
    ) -> Result<StageResponse> {
        let expected = latest.as_ref().map(|v| v.id);
        let (kind, artifact) = match feedback {
            None => (VersionKind::Initial, self.generator.generate(&input).await?),
            Some(feedback) => {
                let previous = latest.ok_or_else(|| {
                    GenerationError::MissingContext(format!(
                        "no {} exists for {} to redo",
                        input.stage().as_str(),
                        entity_id
                    ))
                })?;
                let artifact = self
                    .generator
                    .redo(&input, &previous.artifact, feedback)
                    .await?;
                (VersionKind::Redo, artifact)
            }
        };
        self.commit(entity_id, kind, artifact, expected, mode).await
    }

    async fn commit(
        &self,
        entity_id: Uuid,
        kind: VersionKind,
        artifact: StageArtifact,
        expected: Option<Uuid>,
        mode: FeedbackMode,
    ) -> Result<StageResponse> {
        let version = self
            .store(move |db| db.record(entity_id, kind, &artifact, expected))
            .await?;
        self.respond(version, mode).await
    }

    async fn respond(&self, version: Version, mode: FeedbackMode) -> Result<StageResponse> {
        let result = version.artifact.to_body().map_err(StoreError::from)?;
        let suggestions = self
            .advisor
            .suggest(version.stage, &result.to_string(), mode)
            .await;

        Ok(StageResponse {
            stage: version.stage,
            result,
            suggestions,
            version_id: version.id,
            previous_version_id: version.previous_version_id,
            tag: version.tag,
        })
    }

    async fn outline(&self, course_id: Uuid) -> Result<CourseOutline> {
        self.course(course_id).await?;
        match self.latest_of(course_id, Stage::Outline).await? {
            Some(Version {
                artifact: StageArtifact::Outline(outline),
                ..
            }) => Ok(outline),
            _ => Err(missing(format!("course {course_id} has no outline"))),
        }
    }

    async fn module(&self, course_id: Uuid, module_id: Uuid) -> Result<Module> {
        match self.latest_of(course_id, Stage::Module).await? {
            Some(Version {
                artifact: StageArtifact::Module(set),
                ..
            }) => set
                .find(module_id)
                .cloned()
                .ok_or_else(|| missing(format!("module {module_id} is not in course {course_id}"))),
            _ => Err(missing(format!("course {course_id} has no modules"))),
        }
    }

    async fn submodule_set(&self, module_id: Uuid) -> Result<SubmoduleSet> {
        match self.latest_of(module_id, Stage::Submodule).await? {
            Some(Version {
                artifact: StageArtifact::Submodule(set),
                ..
            }) => Ok(set),
            _ => Err(missing(format!("module {module_id} has no submodules"))),
        }
    }

    async fn submodule(&self, module_id: Uuid, submodule_id: Uuid) -> Result<Submodule> {
        self.submodule_set(module_id)
            .await?
            .find(submodule_id)
            .cloned()
            .ok_or_else(|| {
                missing(format!(
                    "submodule {submodule_id} is not in module {module_id}"
                ))
            })
    }

    async fn activity_set(&self, submodule_id: Uuid) -> Result<ActivitySet> {
        match self.latest_of(submodule_id, Stage::Activity).await? {
            Some(Version {
                artifact: StageArtifact::Activity(set),
                ..
            }) => Ok(set),
            _ => Err(missing(format!(
                "submodule {submodule_id} has no activities"
            ))),
        }
    }

    async fn content_context(&self, scope: &ActivityScope) -> Result<(ContentContext, ActivitySet)> {
        let outline = self.outline(scope.course_id).await?;
        let module = self.module(scope.course_id, scope.module_id).await?;
        let submodule = self.submodule(scope.module_id, scope.submodule_id).await?;
        let set = self.activity_set(scope.submodule_id).await?;
        let activity = set.find(scope.activity_id).cloned().ok_or_else(|| {
            missing(format!(
                "activity {} is not in submodule {}",
                scope.activity_id, scope.submodule_id
            ))
        })?;

        Ok((
            ContentContext {
                outline,
                module,
                submodule,
                activity,
            },
            set,
        ))
    }

    /// Reading and lecture summaries of the activities just before
    /// `activity_id`, oldest first.
    async fn preceding_summaries(
        &self,
        set: &ActivitySet,
        activity_id: Uuid,
    ) -> Result<Option<String>> {
        let position = set
            .activities
            .iter()
            .position(|a| a.id == activity_id)
            .unwrap_or(set.activities.len());
        let ids: Vec<Uuid> = set.activities[..position]
            .iter()
            .rev()
            .take(PRECEDING_ACTIVITIES)
            .map(|a| a.id)
            .collect();

        let mut per_activity = self
            .store(move |db| {
                let mut found = Vec::new();
                for id in ids {
                    let mut own = Vec::new();
                    for stage in [Stage::Reading, Stage::Lecture] {
                        if let Some(version) = db.latest_version(id, stage)? {
                            if let Some(summary) = version.artifact.summary() {
                                own.push(summary.to_string());
                            }
                        }
                    }
                    found.push(own);
                }
                Ok(found)
            })
            .await?;
        per_activity.reverse();
        let summaries: Vec<String> = per_activity.into_iter().flatten().collect();

        if summaries.is_empty() {
            Ok(None)
        } else {
            Ok(Some(summaries.join("\n\n")))
        }
    }
}

fn missing(message: String) -> Error {
    GenerationError::MissingContext(message).into()
}
