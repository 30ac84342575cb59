//! Single-target handlers.

use crate::adapters::canonical_id;
use crate::api::AppState;
use crate::api::error_response::bad_request;
use crate::error::Error;
use crate::types::{DirectPostRequest, StatusRecord, TargetResult};
use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use super::{BlogsResponse, DirectPostResponse};

/// POST /:target/post - Publish to one target and wait for the result
#[utoipa::path(
    post,
    path = "/{target}/post",
    tag = "targets",
    params(
        ("target" = String, Path, description = "Target identifier, e.g. tumblr, twitter, x, bluesky, threads")
    ),
    request_body = DirectPostRequest,
    responses(
        (status = 201, description = "Published or scheduled", body = DirectPostResponse),
        (status = 400, description = "Invalid post or unknown target", body = crate::error::ApiError),
        (status = 401, description = "Missing or invalid API key", body = crate::error::ApiError),
        (status = 422, description = "Target has no credentials", body = crate::error::ApiError),
        (status = 502, description = "The platform rejected the post", body = crate::error::ApiError),
        (status = 503, description = "Shutting down", body = crate::error::ApiError)
    )
)]
pub async fn publish_to_target(
    State(state): State<AppState>,
    Path(target): Path<String>,
    payload: Result<Json<DirectPostRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(request) => request,
        Err(rejection) => return bad_request(rejection),
    };

    match state.publisher.publish_direct(&target, request).await {
        Ok(TargetResult::Failure { reason, .. }) => {
            Error::platform(canonical_id(&target), None, reason).into_response()
        }
        Ok(result) => {
            let record = StatusRecord::from_result(&result);
            let body = DirectPostResponse {
                target: canonical_id(&target),
                status: record.status,
                retry_at: record.retry_at,
                data: record.data.unwrap_or_default(),
            };
            (StatusCode::CREATED, Json(body)).into_response()
        }
        Err(e) => {
            tracing::info!(target = %target, error = %e, "Direct post rejected");
            e.into_response()
        }
    }
}

/// GET /tumblr/blogs - Blogs the Tumblr account can post to
#[utoipa::path(
    get,
    path = "/tumblr/blogs",
    tag = "targets",
    responses(
        (status = 200, description = "Blog names", body = BlogsResponse),
        (status = 422, description = "Tumblr has no credentials", body = crate::error::ApiError),
        (status = 502, description = "Tumblr request failed", body = crate::error::ApiError)
    )
)]
pub async fn list_tumblr_blogs(State(state): State<AppState>) -> Response {
    match state.publisher.tumblr_blogs().await {
        Ok(blogs) => Json(BlogsResponse { blogs }).into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "Listing Tumblr blogs failed");
            e.into_response()
        }
    }
}
