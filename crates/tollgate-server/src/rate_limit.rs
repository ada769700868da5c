use std::sync::Arc;

use axum::{
    Json,
    extract::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use http::{HeaderValue, StatusCode, header::RETRY_AFTER};
use tollgate_ratelimit::{RateLimitError, RouteLimiter};

/// Reject requests over the global limit before they reach a handler
pub async fn global_rate_limit(limiter: Arc<RouteLimiter>, request: Request, next: Next) -> Response {
    match limiter.check_global().await {
        Ok(()) => next.run(request).await,
        Err(RateLimitError::Exceeded { retry_after }) => {
            let body = serde_json::json!({
                "error": {
                    "type": "rate_limit_error",
                    "message": format!("rate limit exceeded, retry after {retry_after}s"),
                }
            });

            let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
            response
                .headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from(retry_after));
            response
        }
        Err(e) => {
            tracing::warn!(error = %e, "global rate limiter failed, allowing request");
            next.run(request).await
        }
    }
}
