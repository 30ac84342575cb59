//! Job status handlers.

use crate::api::AppState;
use crate::types::{JobId, JobStatusView};
use axum::{
    Json,
    extract::{Path, State},
    response::{IntoResponse, Response},
};

/// GET /jobs/:id - Job state, per-target status and summary
#[utoipa::path(
    get,
    path = "/jobs/{id}",
    tag = "jobs",
    params(
        ("id" = String, Path, description = "Job id")
    ),
    responses(
        (status = 200, description = "Job status", body = JobStatusView),
        (status = 404, description = "Unknown job", body = crate::error::ApiError)
    )
)]
pub async fn get_job(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.publisher.job_status(&JobId::from(id)).await {
        Ok(view) => Json(view).into_response(),
        Err(e) => e.into_response(),
    }
}
