use axum::{
    Json,
    response::{IntoResponse, Response},
};
use http::StatusCode;
use tollgate_core::HttpError;

/// Request-level failures of the HTTP surface
///
/// Governance failures never show up here; they are degraded inside
/// the governor and answered with `200`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    InvalidRequest(String),
}

impl HttpError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn error_type(&self) -> &str {
        match self {
            Self::InvalidRequest(_) => "invalid_request_error",
        }
    }

    fn client_message(&self) -> String {
        self.to_string()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": {
                "type": self.error_type(),
                "message": self.client_message(),
            }
        });

        (self.status_code(), Json(body)).into_response()
    }
}
