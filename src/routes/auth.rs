use axum::{extract::State, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::auth::validate_user_and_sign_token;
use crate::context::AppContext;
use crate::error::{AppError, AppResult};
use crate::response::ApiResponse;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
}

/// POST /auth/login
/// Validate credentials and issue a JWT
pub async fn login(
    State(ctx): State<Arc<AppContext>>,
    Json(body): Json<LoginRequest>,
) -> AppResult<impl IntoResponse> {
    if body.username.trim().is_empty() || body.password.is_empty() {
        return Err(AppError::validation("username and password are required"));
    }

    let token = validate_user_and_sign_token(
        ctx.user_store.as_ref(),
        &ctx.auth_manager,
        &body.username,
        &body.password,
    )
    .await?;

    Ok(ApiResponse::success(LoginResponse { token }))
}
