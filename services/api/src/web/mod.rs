pub mod auth;
pub mod middleware;
pub mod rest;
pub mod roster;
pub mod sessions;
pub mod state;
pub mod terms;

use axum::{
    http::{
        header::{ACCEPT, CONTENT_TYPE},
        HeaderValue, Method, StatusCode,
    },
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use roster_core::ports::PortError;
use roster_core::roles::{Permission, RequestContext};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::error;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use uuid::Uuid;

pub use middleware::require_auth;

use crate::web::state::AppState;

/// Builds the complete application: public auth routes, cookie-protected
/// roster and session routes, and the Swagger UI.
pub fn router(app_state: Arc<AppState>, allowed_origin: HeaderValue) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(allowed_origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, ACCEPT]);

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/logout", post(auth::logout_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/chapters", get(terms::list_chapters_handler))
        .route("/terms", get(terms::list_terms_handler))
        .route("/terms/current", get(terms::current_term_handler))
        .route("/chapters/{chapter_id}/roster", get(roster::roster_handler))
        .route(
            "/chapters/{chapter_id}/roster/export",
            get(roster::roster_export_handler),
        )
        .route(
            "/chapters/{chapter_id}/sessions",
            get(sessions::list_sessions_handler),
        )
        .route(
            "/chapters/{chapter_id}/students/{student_id}/sessions",
            post(sessions::create_session_handler),
        )
        .route(
            "/chapters/{chapter_id}/students/{student_id}/unavailable",
            get(sessions::student_unavailable_form_handler)
                .post(sessions::mark_student_unavailable_handler),
        )
        .route(
            "/chapters/{chapter_id}/students/{student_id}/expected-sessions",
            get(roster::expected_sessions_handler),
        )
        .route(
            "/chapters/{chapter_id}/mentors/{mentor_id}/unavailable",
            get(sessions::mentor_unavailable_form_handler)
                .post(sessions::mark_mentor_unavailable_handler),
        )
        .route("/sessions/{session_id}", get(sessions::get_session_handler))
        .route(
            "/sessions/{session_id}/cancel",
            get(sessions::cancel_form_handler).post(sessions::cancel_session_handler),
        )
        .route(
            "/sessions/{session_id}/report",
            post(sessions::submit_report_handler),
        )
        .route(
            "/sessions/{session_id}/sign-off",
            post(sessions::sign_off_handler),
        )
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    let api_router = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state);

    Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", rest::ApiDoc::openapi()))
}

/// Maps the core's failure channel onto an HTTP status and a client-safe message.
pub fn port_error_response(e: PortError) -> (StatusCode, String) {
    match e {
        PortError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        PortError::Conflict { .. } => (StatusCode::CONFLICT, e.to_string()),
        PortError::Invalid(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
        PortError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
        PortError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
        PortError::Unexpected(msg) => {
            error!("Unexpected port error: {}", msg);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            )
        }
    }
}

/// Rejects the request unless the caller holds `permission` within `chapter_id`.
pub fn authorize(
    ctx: &RequestContext,
    permission: Permission,
    chapter_id: Uuid,
) -> Result<(), (StatusCode, String)> {
    if ctx.can(permission, chapter_id) {
        Ok(())
    } else {
        Err(port_error_response(PortError::Forbidden(format!(
            "{} may not {:?} in chapter {}",
            ctx.role().as_str(),
            permission,
            chapter_id
        ))))
    }
}
