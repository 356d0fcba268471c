//! API error type and its HTTP mapping

use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::{error, warn};

use crate::deploy::DeployError;
use crate::site::SiteError;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or unresolvable id or name
    #[error("not found")]
    NotFound,

    /// Rejected by the access gate; answered exactly like `NotFound`
    #[error("unauthorized")]
    Unauthorized,

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::NotFound | ApiError::Unauthorized => StatusCode::NOT_FOUND.into_response(),
            ApiError::BadRequest(message) => {
                warn!(message = %message, "Client error");
                (StatusCode::BAD_REQUEST, message).into_response()
            }
            ApiError::Internal(message) => {
                error!(message = %message, "Internal error occurred");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
            }
        }
    }
}

impl From<SiteError> for ApiError {
    fn from(err: SiteError) -> Self {
        match err {
            SiteError::NotFound(_) | SiteError::PoolNotFound(_) => ApiError::NotFound,
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<DeployError> for ApiError {
    fn from(err: DeployError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        ApiError::BadRequest(err.body_text())
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        ApiError::Internal(err.to_string())
    }
}
