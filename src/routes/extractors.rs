// ============================================================================
// Custom Axum Extractors
// ============================================================================

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use std::sync::Arc;

use crate::context::AppContext;
use crate::error::AppError;

/// Bearer-token authenticated user
///
/// Adding this extractor to a handler makes the route require a valid
/// `Authorization: Bearer <jwt>` header.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: u64,
    pub username: String,
}

#[async_trait]
impl FromRequestParts<Arc<AppContext>> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppContext>,
    ) -> Result<Self, Self::Rejection> {
        let header_value = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::auth("missing Authorization header"))?;

        let token = extract_bearer_token(header_value)
            .ok_or_else(|| AppError::auth("missing or invalid Authorization header"))?;

        let claims = state.auth_manager.verify_token(token)?;

        let user_id = claims
            .sub
            .parse()
            .map_err(|_| AppError::auth("invalid token subject"))?;

        Ok(Self {
            user_id,
            username: claims.username,
        })
    }
}

/// Pull the token out of an "Authorization: Bearer <token>" header value.
/// The scheme comparison is case-insensitive.
fn extract_bearer_token(header: &str) -> Option<&str> {
    let mut parts = header.splitn(2, ' ');
    let scheme = parts.next()?;
    let token = parts.next()?.trim();

    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return None;
    }
    Some(token)
}
