use axum::response::IntoResponse;
use axum::Json;
use http::StatusCode;
use log::error;
use oauth_engine::{EngineError, StoreError};
use serde_json::json;
use std::path::PathBuf;
use thiserror::Error;

/// Failures outside the OAuth protocol, rendered as `{"detail": ...}`
#[derive(Debug, Clone)]
pub struct ApiError {
    pub detail: String,
    pub status_code: StatusCode,
}

impl ApiError {
    /// Create a new ApiError with a detail message and status code
    pub fn new<S: ToString>(detail: S, status_code: StatusCode) -> Self {
        Self {
            detail: detail.to_string(),
            status_code,
        }
    }

    /// Create new Internal Server Error (500) with a detail message
    pub fn internal<S: ToString>(detail: S) -> Self {
        Self::new(detail, StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        error!("Failed to render OAuth response: {}", err);
        Self::internal("Failed to render the response")
    }
}

impl From<tera::Error> for ApiError {
    fn from(err: tera::Error) -> Self {
        error!("Failed to render template: {:?}", err);
        Self::internal("Failed to render the login form")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status_code = self.status_code;
        let body = json!({
            "detail": self.detail,
        });
        (status_code, Json(body)).into_response()
    }
}

/// Errors that abort start-up
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("Authorization server error: {0}")]
    Engine(#[from] EngineError),
    #[error("Template error: {0}")]
    Template(#[from] tera::Error),
    #[error("Failed to read seed file {path}: {source}")]
    SeedRead {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid seed file: {0}")]
    SeedParse(#[from] serde_json::Error),
}
