use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::db::StoreError;
use crate::error::Error;
use crate::generation::GenerationError;
use crate::models::*;
use crate::pipeline::{Action, ActivityScope, Pipeline, StageResponse};

type ApiResult<T> = Result<Json<T>, (StatusCode, String)>;

// ============================================================
// Error Handling
// ============================================================

/// Map a pipeline error to a status code and message.
///
/// Client and upstream errors are returned verbatim. Storage errors are
/// logged in full and answered with a generic message.
fn api_error(e: Error) -> (StatusCode, String) {
    let status = match &e {
        Error::InvalidInput(_) | Error::Generation(GenerationError::MissingContext(_)) => {
            StatusCode::BAD_REQUEST
        }
        Error::NotFound(_) | Error::Store(StoreError::NotFound(_)) => StatusCode::NOT_FOUND,
        Error::Store(StoreError::Conflict(_)) => StatusCode::CONFLICT,
        Error::Generation(_) => StatusCode::BAD_GATEWAY,
        Error::Store(StoreError::Timeout(_)) => {
            tracing::error!("Store timeout: {}", e);
            return (StatusCode::GATEWAY_TIMEOUT, "Storage timed out".to_string());
        }
        Error::Store(_) => {
            tracing::error!("Internal error: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            );
        }
    };

    if status.is_server_error() {
        tracing::error!("Upstream error: {}", e);
    } else {
        tracing::warn!("Request rejected: {}", e);
    }
    (status, e.to_string())
}

fn parse_stage(raw: &str) -> Result<Stage, (StatusCode, String)> {
    Stage::from_str(raw).ok_or_else(|| (StatusCode::BAD_REQUEST, format!("Unknown stage: {raw}")))
}

// ============================================================
// Request bodies
// ============================================================

#[derive(Debug, Default, Deserialize)]
pub struct ModeBody {
    #[serde(default)]
    pub feedback_mode: Option<FeedbackMode>,
}

#[derive(Debug, Deserialize)]
pub struct RedoBody {
    #[serde(default)]
    pub feedback: String,
    #[serde(default)]
    pub feedback_mode: Option<FeedbackMode>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ModulesBody {
    #[serde(default)]
    pub count: Option<usize>,
    #[serde(default)]
    pub feedback_mode: Option<FeedbackMode>,
}

#[derive(Debug, Deserialize)]
pub struct ActivitiesBody {
    #[serde(flatten)]
    pub preferences: ActivityPreferences,
    #[serde(default)]
    pub feedback_mode: Option<FeedbackMode>,
}

/// A content request plus the feedback mode for its suggestions.
#[derive(Debug, Deserialize)]
pub struct ContentBody<T> {
    #[serde(flatten)]
    pub request: T,
    #[serde(default)]
    pub feedback_mode: Option<FeedbackMode>,
}

#[derive(Debug, Deserialize)]
pub struct ModuleScope {
    pub course_id: Uuid,
    pub module_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct SubmoduleScope {
    pub course_id: Uuid,
    pub module_id: Uuid,
    pub submodule_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct ActivityPath {
    pub course_id: Uuid,
    pub module_id: Uuid,
    pub submodule_id: Uuid,
    pub activity_id: Uuid,
}

impl From<ActivityPath> for ActivityScope {
    fn from(p: ActivityPath) -> Self {
        ActivityScope {
            course_id: p.course_id,
            module_id: p.module_id,
            submodule_id: p.submodule_id,
            activity_id: p.activity_id,
        }
    }
}

// ============================================================
// Health
// ============================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ============================================================
// Courses
// ============================================================

pub async fn create_course(
    State(pipeline): State<Pipeline>,
    Json(input): Json<CreateCourseInput>,
) -> Result<(StatusCode, Json<StageResponse>), (StatusCode, String)> {
    pipeline
        .start_course(input)
        .await
        .map(|r| (StatusCode::CREATED, Json(r)))
        .map_err(api_error)
}

pub async fn get_course(
    State(pipeline): State<Pipeline>,
    Path(course_id): Path<Uuid>,
) -> ApiResult<Course> {
    pipeline.course(course_id).await.map(Json).map_err(api_error)
}

pub async fn redo_outline(
    State(pipeline): State<Pipeline>,
    Path(course_id): Path<Uuid>,
    Json(body): Json<RedoBody>,
) -> ApiResult<StageResponse> {
    pipeline
        .redo_outline(course_id, body.feedback, body.feedback_mode)
        .await
        .map(Json)
        .map_err(api_error)
}

// ============================================================
// Modules, submodules and mind maps
// ============================================================

pub async fn generate_modules(
    State(pipeline): State<Pipeline>,
    Path(course_id): Path<Uuid>,
    Json(body): Json<ModulesBody>,
) -> ApiResult<StageResponse> {
    pipeline
        .modules(course_id, Action::Generate(body.count), body.feedback_mode)
        .await
        .map(Json)
        .map_err(api_error)
}

pub async fn redo_modules(
    State(pipeline): State<Pipeline>,
    Path(course_id): Path<Uuid>,
    Json(body): Json<RedoBody>,
) -> ApiResult<StageResponse> {
    pipeline
        .modules(course_id, Action::Redo(body.feedback), body.feedback_mode)
        .await
        .map(Json)
        .map_err(api_error)
}

pub async fn generate_submodules(
    State(pipeline): State<Pipeline>,
    Path(scope): Path<ModuleScope>,
    Json(body): Json<ModeBody>,
) -> ApiResult<StageResponse> {
    pipeline
        .submodules(
            scope.course_id,
            scope.module_id,
            Action::Generate(()),
            body.feedback_mode,
        )
        .await
        .map(Json)
        .map_err(api_error)
}

pub async fn redo_submodules(
    State(pipeline): State<Pipeline>,
    Path(scope): Path<ModuleScope>,
    Json(body): Json<RedoBody>,
) -> ApiResult<StageResponse> {
    pipeline
        .submodules(
            scope.course_id,
            scope.module_id,
            Action::Redo(body.feedback),
            body.feedback_mode,
        )
        .await
        .map(Json)
        .map_err(api_error)
}

pub async fn generate_mind_map(
    State(pipeline): State<Pipeline>,
    Path(scope): Path<ModuleScope>,
    Json(body): Json<ModeBody>,
) -> ApiResult<StageResponse> {
    pipeline
        .mind_map(
            scope.course_id,
            scope.module_id,
            Action::Generate(()),
            body.feedback_mode,
        )
        .await
        .map(Json)
        .map_err(api_error)
}

pub async fn redo_mind_map(
    State(pipeline): State<Pipeline>,
    Path(scope): Path<ModuleScope>,
    Json(body): Json<RedoBody>,
) -> ApiResult<StageResponse> {
    pipeline
        .mind_map(
            scope.course_id,
            scope.module_id,
            Action::Redo(body.feedback),
            body.feedback_mode,
        )
        .await
        .map(Json)
        .map_err(api_error)
}

// ============================================================
// Activities
// ============================================================

pub async fn generate_activities(
    State(pipeline): State<Pipeline>,
    Path(scope): Path<SubmoduleScope>,
    Json(body): Json<ActivitiesBody>,
) -> ApiResult<StageResponse> {
    pipeline
        .activities(
            scope.course_id,
            scope.module_id,
            scope.submodule_id,
            Action::Generate(body.preferences),
            body.feedback_mode,
        )
        .await
        .map(Json)
        .map_err(api_error)
}

pub async fn redo_activities(
    State(pipeline): State<Pipeline>,
    Path(scope): Path<SubmoduleScope>,
    Json(body): Json<RedoBody>,
) -> ApiResult<StageResponse> {
    pipeline
        .activities(
            scope.course_id,
            scope.module_id,
            scope.submodule_id,
            Action::Redo(body.feedback),
            body.feedback_mode,
        )
        .await
        .map(Json)
        .map_err(api_error)
}

// ============================================================
// Activity content
// ============================================================

pub async fn generate_reading(
    State(pipeline): State<Pipeline>,
    Path(path): Path<ActivityPath>,
    Json(body): Json<ContentBody<ReadingRequest>>,
) -> ApiResult<StageResponse> {
    pipeline
        .reading(path.into(), Action::Generate(body.request), body.feedback_mode)
        .await
        .map(Json)
        .map_err(api_error)
}

pub async fn redo_reading(
    State(pipeline): State<Pipeline>,
    Path(path): Path<ActivityPath>,
    Json(body): Json<RedoBody>,
) -> ApiResult<StageResponse> {
    pipeline
        .reading(path.into(), Action::Redo(body.feedback), body.feedback_mode)
        .await
        .map(Json)
        .map_err(api_error)
}

pub async fn generate_lecture(
    State(pipeline): State<Pipeline>,
    Path(path): Path<ActivityPath>,
    Json(body): Json<ContentBody<LectureRequest>>,
) -> ApiResult<StageResponse> {
    pipeline
        .lecture(path.into(), Action::Generate(body.request), body.feedback_mode)
        .await
        .map(Json)
        .map_err(api_error)
}

pub async fn redo_lecture(
    State(pipeline): State<Pipeline>,
    Path(path): Path<ActivityPath>,
    Json(body): Json<RedoBody>,
) -> ApiResult<StageResponse> {
    pipeline
        .lecture(path.into(), Action::Redo(body.feedback), body.feedback_mode)
        .await
        .map(Json)
        .map_err(api_error)
}

pub async fn generate_quiz(
    State(pipeline): State<Pipeline>,
    Path(path): Path<ActivityPath>,
    Json(body): Json<ContentBody<QuizRequest>>,
) -> ApiResult<StageResponse> {
    pipeline
        .quiz(path.into(), Action::Generate(body.request), body.feedback_mode)
        .await
        .map(Json)
        .map_err(api_error)
}

pub async fn redo_quiz(
    State(pipeline): State<Pipeline>,
    Path(path): Path<ActivityPath>,
    Json(body): Json<RedoBody>,
) -> ApiResult<StageResponse> {
    pipeline
        .quiz(path.into(), Action::Redo(body.feedback), body.feedback_mode)
        .await
        .map(Json)
        .map_err(api_error)
}

pub async fn generate_assignment(
    State(pipeline): State<Pipeline>,
    Path(path): Path<ActivityPath>,
    Json(body): Json<ContentBody<AssignmentRequest>>,
) -> ApiResult<StageResponse> {
    pipeline
        .assignment(path.into(), Action::Generate(body.request), body.feedback_mode)
        .await
        .map(Json)
        .map_err(api_error)
}

pub async fn redo_assignment(
    State(pipeline): State<Pipeline>,
    Path(path): Path<ActivityPath>,
    Json(body): Json<RedoBody>,
) -> ApiResult<StageResponse> {
    pipeline
        .assignment(path.into(), Action::Redo(body.feedback), body.feedback_mode)
        .await
        .map(Json)
        .map_err(api_error)
}

// ============================================================
// Versions
// ============================================================

pub async fn get_version(
    State(pipeline): State<Pipeline>,
    Path(version_id): Path<Uuid>,
) -> ApiResult<Version> {
    pipeline.version(version_id).await.map(Json).map_err(api_error)
}

pub async fn rollback_version(
    State(pipeline): State<Pipeline>,
    Path(version_id): Path<Uuid>,
    Query(query): Query<ModeBody>,
) -> ApiResult<StageResponse> {
    pipeline
        .rollback(version_id, query.feedback_mode)
        .await
        .map(Json)
        .map_err(api_error)
}

pub async fn latest_version(
    State(pipeline): State<Pipeline>,
    Path((entity_id, stage)): Path<(Uuid, String)>,
) -> ApiResult<Version> {
    let stage = parse_stage(&stage)?;
    pipeline
        .latest(entity_id, stage)
        .await
        .map(Json)
        .map_err(api_error)
}

pub async fn version_history(
    State(pipeline): State<Pipeline>,
    Path((entity_id, stage)): Path<(Uuid, String)>,
) -> ApiResult<Vec<Version>> {
    let stage = parse_stage(&stage)?;
    pipeline
        .history(entity_id, stage)
        .await
        .map(Json)
        .map_err(api_error)
}

pub async fn versions_by_tag(
    State(pipeline): State<Pipeline>,
    Path(tag): Path<String>,
) -> ApiResult<Vec<Version>> {
    pipeline
        .versions_by_tag(tag)
        .await
        .map(Json)
        .map_err(api_error)
}
