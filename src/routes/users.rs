use axum::response::IntoResponse;

use crate::error::AppResult;
use crate::response::ApiResponse;
use crate::routes::extractors::AuthenticatedUser;
use crate::user_service;
use crate::user_service::UserInfoResponse;

/// GET /userinfo/getUserInfo
/// Demo user info, projected through the response DTO
pub async fn get_user_info(user: AuthenticatedUser) -> AppResult<impl IntoResponse> {
    tracing::debug!(username = %user.username, "User info requested");

    let info = user_service::get_user_info();
    Ok(ApiResponse::success(UserInfoResponse::from(info)))
}

/// POST /userinfo/registerUser
/// Registration stub
pub async fn register_user(user: AuthenticatedUser) -> AppResult<impl IntoResponse> {
    tracing::debug!(username = %user.username, "User registration requested");

    Ok(ApiResponse::success(user_service::register_user()))
}
