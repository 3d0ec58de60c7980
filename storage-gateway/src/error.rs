use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ConfigError;

/// Application-wide error types
///
/// Every store failure is surfaced with the store's own message attached;
/// nothing is retried and nothing is fatal to the process.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Missing environment variables")]
    Configuration(String),

    #[error("{0}")]
    Validation(String),

    #[error("Upload failed")]
    Upload(String),

    #[error("List failed")]
    List(String),

    #[error("Download failed")]
    Signing(String),

    #[error("Delete failed")]
    Delete(String),

    #[error("Method not allowed")]
    MethodNotAllowed,
}

/// Error response structure for JSON API
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl GatewayError {
    fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::Validation(_) => StatusCode::BAD_REQUEST,
            GatewayError::Upload(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::List(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::Signing(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::Delete(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
        }
    }

    fn details(&self) -> Option<String> {
        match self {
            GatewayError::Configuration(details)
            | GatewayError::Upload(details)
            | GatewayError::List(details)
            | GatewayError::Signing(details)
            | GatewayError::Delete(details) => Some(details.clone()),
            GatewayError::Validation(_) | GatewayError::MethodNotAllowed => None,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: self.to_string(),
            details: self.details(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<ConfigError> for GatewayError {
    fn from(err: ConfigError) -> Self {
        GatewayError::Configuration(err.to_string())
    }
}

/// Result type alias for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;
