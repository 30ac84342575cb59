//! Job submission handlers.

use crate::api::AppState;
use crate::api::error_response::bad_request;
use crate::types::JobRequest;
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use super::SubmitResponse;

/// POST /publish-all/post - Submit a job
///
/// Also mounted as `POST /jobs`.
#[utoipa::path(
    post,
    path = "/publish-all/post",
    tag = "jobs",
    request_body = JobRequest,
    responses(
        (status = 202, description = "Job accepted, dispatch continues in the background", body = SubmitResponse),
        (status = 400, description = "Invalid job", body = crate::error::ApiError),
        (status = 401, description = "Missing or invalid API key", body = crate::error::ApiError),
        (status = 503, description = "Shutting down", body = crate::error::ApiError)
    )
)]
pub async fn submit_job(
    State(state): State<AppState>,
    payload: Result<Json<JobRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(request) => request,
        Err(rejection) => return bad_request(rejection),
    };

    match state.publisher.submit(request).await {
        Ok(job_id) => (StatusCode::ACCEPTED, Json(SubmitResponse { job_id })).into_response(),
        Err(e) => {
            tracing::info!(error = %e, "Job submission rejected");
            e.into_response()
        }
    }
}
