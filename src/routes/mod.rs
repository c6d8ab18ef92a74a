// ============================================================================
// Axum Routes Module
// ============================================================================
//
// Structure:
// - mod.rs: router assembly and the health endpoint
// - rabbitmq.rs: messaging status and test-publish endpoints
// - auth.rs: login endpoint
// - users.rs: demo user endpoints (bearer-protected)
// - extractors.rs: AuthenticatedUser bearer-token extractor
// - middleware.rs: request logging
//
// ============================================================================

mod auth;
mod extractors;
mod middleware;
mod rabbitmq;
mod users;

use axum::{
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::context::AppContext;

/// Health check endpoint
async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({"status": "ok"})))
}

/// Create the main application router with all routes
pub fn create_router(app_context: Arc<AppContext>) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Messaging gateway test endpoints
        .route("/rabbitmq/test/status", get(rabbitmq::get_status))
        .route("/rabbitmq/test/user", post(rabbitmq::test_user_message))
        .route(
            "/rabbitmq/test/notification",
            post(rabbitmq::test_notification_message),
        )
        .route("/rabbitmq/test/email", post(rabbitmq::test_email_message))
        .route("/rabbitmq/test/log", post(rabbitmq::test_log_message))
        // Authentication
        .route("/auth/login", post(auth::login))
        // User endpoints (bearer-protected via the AuthenticatedUser extractor)
        .route("/userinfo/getUserInfo", get(users::get_user_info))
        .route("/userinfo/registerUser", post(users::register_user))
        // Apply middleware (order matters - last added runs first)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(axum::middleware::from_fn(middleware::request_logging))
                .into_inner(),
        )
        .with_state(app_context)
}
