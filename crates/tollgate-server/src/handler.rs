//! Governance endpoints

use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    response::{IntoResponse, Response},
    routing,
};
use serde::Deserialize;
use tollgate_governor::Governor;

use crate::error::ApiError;

/// Body of `POST /v1/govern`
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GovernRequest {
    pub task_type: String,
    pub user_id: String,
    pub prompt: String,
}

pub fn governance_router(governor: Governor) -> Router {
    Router::new()
        .route("/v1/govern", routing::post(govern))
        .route("/v1/usage", routing::get(global_usage))
        .route("/v1/usage/users/{user_id}", routing::get(user_usage))
        .route("/v1/usage/limits", routing::get(scope_limits))
        .with_state(governor)
}

/// Handle `POST /v1/govern`
///
/// Answers `200` with either a generated or a degraded result; only a
/// malformed body is an error.
async fn govern(State(governor): State<Governor>, body: Result<Json<GovernRequest>, JsonRejection>) -> Response {
    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => return ApiError::InvalidRequest(rejection.body_text()).into_response(),
    };

    if request.user_id.trim().is_empty() {
        return ApiError::InvalidRequest("user_id must not be empty".to_owned()).into_response();
    }

    let governed = governor
        .govern(&request.task_type, &request.user_id, &request.prompt)
        .await;

    Json(governed).into_response()
}

/// Handle `GET /v1/usage`
async fn global_usage(State(governor): State<Governor>) -> Response {
    Json(governor.reporter().global_stats()).into_response()
}

/// Handle `GET /v1/usage/users/{user_id}`
async fn user_usage(State(governor): State<Governor>, Path(user_id): Path<String>) -> Response {
    Json(governor.reporter().user_stats(&user_id)).into_response()
}

/// Handle `GET /v1/usage/limits`
async fn scope_limits(State(governor): State<Governor>) -> Response {
    Json(governor.reporter().scope_limits()).into_response()
}
