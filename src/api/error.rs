//! Error envelope returned by every synchronous failure
//!
//! Each failure becomes `{"error": "<message>"}`. Unmatched routes answer 404,
//! everything else 500.

use crate::core::constants::NOT_FOUND_MESSAGE;
use crate::core::upstream::UpstreamError;
use crate::models::ollama::ErrorResponse;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::error;

/// Error types surfaced by route handlers
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error("Failed to read request body: {0}")]
    BodyRead(String),

    #[error("{0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("{0}")]
    Internal(String),

    #[error("{}", NOT_FOUND_MESSAGE)]
    NotFound,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }
        let body = ErrorResponse {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message() {
        assert_eq!(ApiError::NotFound.to_string(), "Not found");
        assert_eq!(ApiError::NotFound.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_upstream_status_is_normalized() {
        let err = ApiError::from(UpstreamError::Status {
            status: 429,
            body: "slow down".to_string(),
        });
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "HTTP 429: slow down");
    }
}
