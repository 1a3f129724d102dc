//! Mapping of library errors onto HTTP responses.

use axum::{http::StatusCode, response::Json};
use racket_draw::{DrawError, ErrorKind};
use serde::{Deserialize, Serialize};

/// Error body returned by every failing endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Handler result: JSON body or a status code with [`ErrorResponse`]
pub type ApiResult<T> = Result<T, (StatusCode, Json<ErrorResponse>)>;

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::State => StatusCode::CONFLICT,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Unauthorized => StatusCode::FORBIDDEN,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Convert a [`DrawError`] into the response tuple, logging server faults.
pub fn error_response(err: DrawError) -> (StatusCode, Json<ErrorResponse>) {
    let status = status_for(err.kind());
    if status.is_server_error() {
        tracing::error!(error = %err, "Request failed");
    } else {
        tracing::debug!(error = %err, status = %status, "Request rejected");
    }

    (
        status,
        Json(ErrorResponse {
            error: err.client_message(),
        }),
    )
}
