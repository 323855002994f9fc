mod handlers;

use axum::{
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::pipeline::Pipeline;

const ACTIVITY: &str = "/courses/{course_id}/modules/{module_id}/submodules/{submodule_id}/activities/{activity_id}";

pub fn create_router(pipeline: Pipeline, cors_origins: &[String]) -> Router {
    let api = Router::new()
        // Courses and outline
        .route("/courses", post(handlers::create_course))
        .route("/courses/{course_id}", get(handlers::get_course))
        .route("/courses/{course_id}/outline/redo", post(handlers::redo_outline))
        // Structure
        .route("/courses/{course_id}/modules", post(handlers::generate_modules))
        .route("/courses/{course_id}/modules/redo", post(handlers::redo_modules))
        .route(
            "/courses/{course_id}/modules/{module_id}/submodules",
            post(handlers::generate_submodules),
        )
        .route(
            "/courses/{course_id}/modules/{module_id}/submodules/redo",
            post(handlers::redo_submodules),
        )
        .route(
            "/courses/{course_id}/modules/{module_id}/mindmap",
            post(handlers::generate_mind_map),
        )
        .route(
            "/courses/{course_id}/modules/{module_id}/mindmap/redo",
            post(handlers::redo_mind_map),
        )
        .route(
            "/courses/{course_id}/modules/{module_id}/submodules/{submodule_id}/activities",
            post(handlers::generate_activities),
        )
        .route(
            "/courses/{course_id}/modules/{module_id}/submodules/{submodule_id}/activities/redo",
            post(handlers::redo_activities),
        )
        // Content
        .route(&format!("{ACTIVITY}/reading"), post(handlers::generate_reading))
        .route(&format!("{ACTIVITY}/reading/redo"), post(handlers::redo_reading))
        .route(&format!("{ACTIVITY}/lecture"), post(handlers::generate_lecture))
        .route(&format!("{ACTIVITY}/lecture/redo"), post(handlers::redo_lecture))
        .route(&format!("{ACTIVITY}/quiz"), post(handlers::generate_quiz))
        .route(&format!("{ACTIVITY}/quiz/redo"), post(handlers::redo_quiz))
        .route(&format!("{ACTIVITY}/assignment"), post(handlers::generate_assignment))
        .route(&format!("{ACTIVITY}/assignment/redo"), post(handlers::redo_assignment))
        // Versions
        .route("/versions/{version_id}", get(handlers::get_version))
        .route("/versions/{version_id}/rollback", post(handlers::rollback_version))
        .route("/entities/{entity_id}/{stage}/latest", get(handlers::latest_version))
        .route("/entities/{entity_id}/{stage}/history", get(handlers::version_history))
        .route("/tags/{tag}", get(handlers::versions_by_tag))
        // Health
        .route("/health", get(handlers::health));

    Router::new()
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(cors_origins))
        .with_state(pipeline)
}

/// Permissive when no origins are configured, otherwise an allow-list.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    if allowed.is_empty() {
        return CorsLayer::permissive();
    }
    CorsLayer::permissive().allow_origin(AllowOrigin::list(allowed))
}
