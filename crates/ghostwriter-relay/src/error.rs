//! Relay errors and the JSON error body for the HTTP endpoints.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use ghostwriter_core::GhostwriterError;

/// Errors raised inside the relay.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// An inbound event is missing required fields. Reported to its sender.
    #[error("validation error: {0}")]
    Validation(String),

    /// The coordinator task has stopped.
    #[error("relay coordinator is not running")]
    CoordinatorClosed,

    /// A selected reply could not be archived.
    #[error("archive error: {0}")]
    Archive(String),
}

impl From<RelayError> for GhostwriterError {
    fn from(err: RelayError) -> Self {
        match err {
            RelayError::Validation(msg) => GhostwriterError::Validation(msg),
            RelayError::CoordinatorClosed => GhostwriterError::Api(err.to_string()),
            RelayError::Archive(msg) => GhostwriterError::StoreUnavailable(msg),
        }
    }
}

/// JSON error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code, e.g. "bad_request".
    pub error: String,
    pub message: String,
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Internal(String),
    /// The coordinator is gone.
    ServiceUnavailable(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg),
            ApiError::ServiceUnavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, "service_unavailable", msg)
            }
        };

        let body = ErrorBody {
            error: error_code.to_string(),
            message,
        };

        (status, Json(body)).into_response()
    }
}

impl From<RelayError> for ApiError {
    fn from(err: RelayError) -> Self {
        match err {
            RelayError::Validation(msg) => ApiError::BadRequest(msg),
            RelayError::CoordinatorClosed => ApiError::ServiceUnavailable(err.to_string()),
            RelayError::Archive(msg) => ApiError::Internal(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let resp = ApiError::from(RelayError::CoordinatorClosed).into_response();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);

        let resp = ApiError::from(RelayError::Validation("missing content".into())).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = ApiError::from(RelayError::Archive("disk full".into())).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_validation_maps_to_top_level() {
        let err: GhostwriterError = RelayError::Validation("missing timestamp".into()).into();
        assert!(matches!(err, GhostwriterError::Validation(ref m) if m == "missing timestamp"));
    }
}
