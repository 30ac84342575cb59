//! HTTP error response handling for the API
//!
//! Domain errors become JSON [`ApiError`] bodies with the status code from
//! [`ToHttpStatus`].

use crate::error::{ApiError, Error, ToHttpStatus};
use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status_code =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let api_error: ApiError = self.into();

        (status_code, Json(api_error)).into_response()
    }
}

/// Direct conversions default to 500; prefer going through [`Error`]
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (StatusCode::INTERNAL_SERVER_ERROR, Json(self)).into_response()
    }
}

/// Unreadable request bodies in the usual error shape
///
/// Bodies over `api.max_body_bytes` answer 413, anything else 400.
pub(crate) fn bad_request(rejection: JsonRejection) -> Response {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        let body = ApiError::new("payload_too_large", rejection.body_text());
        return (StatusCode::PAYLOAD_TOO_LARGE, Json(body)).into_response();
    }
    let body = ApiError::new("invalid_request", rejection.body_text());
    (StatusCode::BAD_REQUEST, Json(body)).into_response()
}
