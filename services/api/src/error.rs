//! services/api/src/error.rs
//!
//! Defines the primary error type for the API service and how each variant
//! is rendered as an HTTP response.

use crate::config::ConfigError;
use axum::{
    extract::{
        multipart::MultipartRejection,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use math_tutor_core::PortError;
use serde_json::json;
use tracing::error;

/// Body text for every missing, malformed or foreign record.
pub const NOT_FOUND_DETAIL: &str = "Item not found";

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from one of the core service ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration Error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The request itself was unusable.
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Item not found")]
    NotFound,

    /// A model provider failed; the message is surfaced to the client.
    #[error("Upstream provider error: {0}")]
    Upstream(String),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

impl ApiError {
    /// Wraps a provider failure, keeping `NotFound` as-is.
    pub fn upstream(err: PortError) -> Self {
        match err {
            PortError::NotFound(_) => ApiError::NotFound,
            PortError::InvalidInput(msg) => ApiError::BadRequest(msg),
            PortError::Unexpected(msg) => ApiError::Upstream(msg),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::BadRequest(msg) | ApiError::Port(PortError::InvalidInput(msg)) => {
                (StatusCode::BAD_REQUEST, json!({ "error": msg }))
            }
            ApiError::NotFound | ApiError::Port(PortError::NotFound(_)) => (
                StatusCode::NOT_FOUND,
                json!({ "detail": NOT_FOUND_DETAIL }),
            ),
            ApiError::Upstream(msg) => {
                error!(error = %msg, "Model provider request failed");
                (StatusCode::BAD_GATEWAY, json!({ "error": msg }))
            }
            other => {
                error!(error = %other, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "detail": other.to_string() }),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    async fn render(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn not_found_variants_share_one_body() {
        let (status, body) = render(ApiError::NotFound).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "detail": "Item not found" }));

        let (status, body) = render(ApiError::Port(PortError::NotFound("record 42".into()))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "detail": "Item not found" }));
    }

    #[tokio::test]
    async fn upstream_failures_are_bad_gateway() {
        let (status, body) = render(ApiError::upstream(PortError::Unexpected("quota".into()))).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body, json!({ "error": "quota" }));
    }

    #[tokio::test]
    async fn storage_failures_are_internal() {
        let (status, body) = render(ApiError::Port(PortError::Unexpected("pool closed".into()))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["detail"].as_str().unwrap().contains("pool closed"));
    }
}
