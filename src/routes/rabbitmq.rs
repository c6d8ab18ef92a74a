// ============================================================================
// Messaging Gateway Routes
// ============================================================================
//
// Endpoints:
// - GET  /rabbitmq/test/status - broker connectivity at the moment of the call
// - POST /rabbitmq/test/{user|notification|email|log} - publish a synthetic
//   test message under the category's default routing key
//
// The test endpoints echo the synthetic message back even when the publish
// was skipped or failed; transport health is reported by the status
// endpoint, not by the publish responses.
//
// ============================================================================

use axum::{extract::State, response::IntoResponse, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::context::AppContext;
use crate::error::AppResult;
use crate::rabbitmq::MessageCategory;
use crate::response::ApiResponse;
use crate::utils::iso_timestamp;

#[derive(Debug, Default, Deserialize)]
pub struct TestMessageRequest {
    pub message: Option<String>,
}

/// Synthetic message echoed back by the test endpoints
#[derive(Debug, Clone, Serialize)]
pub struct TestMessage {
    /// Millisecond epoch at construction time
    pub id: i64,
    pub message: String,
    pub timestamp: String,
    #[serde(rename = "type")]
    pub message_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ConnectionStatus {
    pub connected: bool,
    pub timestamp: String,
    pub message: String,
}

/// GET /rabbitmq/test/status
pub async fn get_status(State(ctx): State<Arc<AppContext>>) -> AppResult<impl IntoResponse> {
    let connected = ctx.gateway.is_connected();

    Ok(ApiResponse::success(ConnectionStatus {
        connected,
        timestamp: iso_timestamp(),
        message: if connected {
            "RabbitMQ connection is healthy".to_string()
        } else {
            "RabbitMQ connection is down".to_string()
        },
    }))
}

/// Build the synthetic message and publish it under the given category.
///
/// The message is returned regardless of the publish outcome: a skipped
/// publish was already warn-logged by the publisher, and a failed one is
/// error-logged here.
async fn publish_test_message(
    ctx: &AppContext,
    category: MessageCategory,
    body: Option<Json<TestMessageRequest>>,
    fallback: &str,
    level: Option<&str>,
) -> AppResult<ApiResponse<TestMessage>> {
    let request = body.map(|Json(b)| b).unwrap_or_default();

    let message = TestMessage {
        id: Utc::now().timestamp_millis(),
        message: request.message.unwrap_or_else(|| fallback.to_string()),
        timestamp: iso_timestamp(),
        message_type: "test".to_string(),
        level: level.map(str::to_string),
    };

    let payload = serde_json::to_value(&message)?;

    if let Err(e) = ctx.gateway.publish(category, None, payload).await {
        tracing::error!(
            category = %category,
            error = %e,
            "Test message publish failed"
        );
    }

    Ok(ApiResponse::success(message))
}

/// POST /rabbitmq/test/user
pub async fn test_user_message(
    State(ctx): State<Arc<AppContext>>,
    body: Option<Json<TestMessageRequest>>,
) -> AppResult<impl IntoResponse> {
    publish_test_message(&ctx, MessageCategory::User, body, "test user message", None).await
}

/// POST /rabbitmq/test/notification
pub async fn test_notification_message(
    State(ctx): State<Arc<AppContext>>,
    body: Option<Json<TestMessageRequest>>,
) -> AppResult<impl IntoResponse> {
    publish_test_message(
        &ctx,
        MessageCategory::Notification,
        body,
        "test notification message",
        None,
    )
    .await
}

/// POST /rabbitmq/test/email
pub async fn test_email_message(
    State(ctx): State<Arc<AppContext>>,
    body: Option<Json<TestMessageRequest>>,
) -> AppResult<impl IntoResponse> {
    publish_test_message(
        &ctx,
        MessageCategory::Email,
        body,
        "test email message",
        None,
    )
    .await
}

/// POST /rabbitmq/test/log
pub async fn test_log_message(
    State(ctx): State<Arc<AppContext>>,
    body: Option<Json<TestMessageRequest>>,
) -> AppResult<impl IntoResponse> {
    publish_test_message(
        &ctx,
        MessageCategory::Log,
        body,
        "test log message",
        Some("info"),
    )
    .await
}
