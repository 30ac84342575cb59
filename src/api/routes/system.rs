//! System handlers: targets, health, OpenAPI, events.

use crate::api::AppState;
use crate::publisher::TargetInfo;
use axum::{
    Json,
    extract::{Query, State},
    response::{
        IntoResponse,
        sse::{Event as SseEvent, KeepAlive, Sse},
    },
};
use serde_json::json;
use std::convert::Infallible;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;

use super::EventsQuery;

/// GET /targets - Configured targets and their capabilities
#[utoipa::path(
    get,
    path = "/targets",
    tag = "system",
    responses(
        (status = 200, description = "Configured targets", body = [TargetInfo])
    )
)]
pub async fn list_targets(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.publisher.targets())
}

/// GET /health - Health check
#[utoipa::path(
    get,
    path = "/health",
    tag = "system",
    responses(
        (status = 200, description = "Service is healthy")
    )
)]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "activeJobs": state.publisher.active_jobs(),
    }))
}

/// GET /openapi.json - OpenAPI specification
#[utoipa::path(
    get,
    path = "/openapi.json",
    tag = "system",
    responses(
        (status = 200, description = "OpenAPI specification in JSON format")
    )
)]
pub async fn openapi_spec() -> impl IntoResponse {
    use crate::api::openapi::ApiDoc;
    use utoipa::OpenApi;

    Json(ApiDoc::openapi())
}

/// GET /events - Server-sent events stream
///
/// Event names are `progressUpdate` and `taskCompleted`; the data is the
/// event JSON.
#[utoipa::path(
    get,
    path = "/events",
    tag = "system",
    params(EventsQuery),
    responses(
        (status = 200, description = "Server-sent events stream (text/event-stream)", content_type = "text/event-stream")
    )
)]
pub async fn event_stream(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
) -> Sse<impl tokio_stream::Stream<Item = Result<SseEvent, Infallible>>> {
    let receiver = state.publisher.subscribe();
    let stream = BroadcastStream::new(receiver);
    let job_filter = query.job_id;

    let sse_stream = stream.filter_map(move |result| match result {
        Ok(event) => {
            if job_filter
                .as_deref()
                .is_some_and(|id| event.job_id().as_str() != id)
            {
                return None;
            }
            match serde_json::to_string(&event) {
                Ok(json_data) => Some(Ok(SseEvent::default().event(event.name()).data(json_data))),
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to serialize event to JSON");
                    None
                }
            }
        }
        Err(tokio_stream::wrappers::errors::BroadcastStreamRecvError::Lagged(skipped)) => {
            tracing::warn!(skipped, "SSE client lagged");
            Some(Ok(SseEvent::default().event("error").data(format!(
                r#"{{"error":"lagged","skipped":{}}}"#,
                skipped
            ))))
        }
    });

    Sse::new(sse_stream).keep_alive(KeepAlive::default())
}
