// ============================================================================
// Response Envelope
// ============================================================================
//
// Every successful response is wrapped as {code, data, message, date} so
// clients can switch on `code` without inspecting HTTP status lines.
// Errors produce the same shape with a null data field (see error.rs).
//
// ============================================================================

use axum::{http::StatusCode, response::IntoResponse};
use serde::Serialize;

use crate::utils::iso_timestamp;

/// Numeric code carried in success envelopes.
pub const DEFAULT_SUCCESS_CODE: i32 = 0;

/// Success envelope wrapping an arbitrary payload
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub code: i32,
    pub data: T,
    pub message: String,
    pub date: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            code: DEFAULT_SUCCESS_CODE,
            data,
            message: "success".to_string(),
            date: Some(iso_timestamp()),
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> axum::response::Response {
        (StatusCode::OK, axum::Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_envelope_shape() {
        let response = ApiResponse::success(serde_json::json!({"hello": "world"}));
        let value = serde_json::to_value(&response).unwrap();

        assert_eq!(value["code"], 0);
        assert_eq!(value["message"], "success");
        assert_eq!(value["data"]["hello"], "world");
        assert!(value["date"].is_string());
    }
}
