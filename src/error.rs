use axum::{http::StatusCode, response::IntoResponse};
use serde_json::json;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

/// Numeric code carried in error response envelopes.
pub const DEFAULT_ERROR_CODE: i32 = 9000;

/// Application error type
///
/// Covers both the messaging gateway failure modes (topology validation,
/// connection supervision, publish/consume paths) and the HTTP layer.
/// Structured for logging and for the client-facing response envelope.
#[derive(Error, Debug)]
pub enum AppError {
    // ===== Messaging Topology Errors =====
    #[error("Unknown message category: {0}")]
    UnknownCategory(String),

    #[error("Duplicate binding: {exchange} -> {queue} ({pattern})")]
    DuplicateBinding {
        exchange: String,
        queue: String,
        pattern: String,
    },

    #[error("Binding references unknown exchange or queue: {0}")]
    DanglingReference(String),

    // ===== Messaging Runtime Errors =====
    #[error("Broker connection not established within {0} ms")]
    ConnectionTimeout(u64),

    #[error("Publish error: {0}")]
    Publish(String),

    #[error("Message handler error: {0}")]
    Handler(String),

    // ===== Authentication & Authorization Errors =====
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("Password hashing error: {0}")]
    Bcrypt(#[from] bcrypt::BcryptError),

    // ===== Validation & Serialization Errors =====
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ===== Configuration Errors =====
    #[error("Configuration error: {0}")]
    Config(String),

    // ===== Internal Server Errors =====
    #[error("Internal server error: {0}")]
    Internal(String),

    // ===== Unknown/Generic Errors =====
    #[error("Unknown error: {0}")]
    Unknown(#[from] anyhow::Error),
}

impl AppError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Auth(_) | AppError::Jwt(_) => StatusCode::UNAUTHORIZED,
            AppError::Validation(_) | AppError::Json(_) => StatusCode::BAD_REQUEST,
            AppError::ConnectionTimeout(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Publish(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get a user-friendly error message (without sensitive details)
    pub fn user_message(&self) -> String {
        match self {
            AppError::Auth(msg) => format!("Authentication failed: {}", msg),
            AppError::Jwt(_) => "Invalid or expired token".to_string(),
            AppError::Validation(msg) => format!("Validation error: {}", msg),
            AppError::Json(_) => "Malformed request body".to_string(),
            AppError::ConnectionTimeout(_) => "Message broker unavailable".to_string(),
            AppError::Publish(_) => "Message broker error".to_string(),
            _ => "Internal server error".to_string(),
        }
    }

    /// Get error code for programmatic error handling
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::UnknownCategory(_) => "UNKNOWN_CATEGORY",
            AppError::DuplicateBinding { .. } => "DUPLICATE_BINDING",
            AppError::DanglingReference(_) => "DANGLING_REFERENCE",
            AppError::ConnectionTimeout(_) => "CONNECTION_TIMEOUT",
            AppError::Publish(_) => "PUBLISH_ERROR",
            AppError::Handler(_) => "HANDLER_ERROR",
            AppError::Auth(_) => "AUTH_ERROR",
            AppError::Jwt(_) => "JWT_ERROR",
            AppError::Bcrypt(_) => "BCRYPT_ERROR",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Json(_) => "JSON_ERROR",
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
            AppError::Unknown(_) => "UNKNOWN_ERROR",
        }
    }

    /// Log this error with appropriate level and context
    pub fn log(&self) {
        let status = self.status_code();
        let code = self.error_code();

        if status.is_server_error() {
            tracing::error!(
                error = %self,
                error_code = %code,
                status = %status.as_u16(),
                "Server error occurred"
            );
        } else if status == StatusCode::UNAUTHORIZED {
            tracing::warn!(
                error = %self,
                error_code = %code,
                "Authentication failed"
            );
        } else {
            tracing::debug!(
                error = %self,
                error_code = %code,
                "Client error occurred"
            );
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        self.log();

        let status = self.status_code();

        // Error envelope: {code, data: null, message, date: null}.
        // Server errors don't expose internal details to the client.
        let message = if status.is_server_error() {
            "Internal server error".to_string()
        } else {
            self.user_message()
        };

        let body = json!({
            "code": DEFAULT_ERROR_CODE,
            "data": null,
            "message": message,
            "date": null,
        });

        (status, axum::Json(body)).into_response()
    }
}

// ============================================================================
// Helper functions for creating common errors
// ============================================================================

impl AppError {
    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        AppError::Auth(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        AppError::Config(msg.into())
    }

    /// Create a publish error
    pub fn publish(msg: impl Into<String>) -> Self {
        AppError::Publish(msg.into())
    }

    /// Create an internal server error
    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::Internal(msg.into())
    }
}
