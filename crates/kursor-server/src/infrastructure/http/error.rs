//! HTTP error responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::application::room_registry::RegistryError;

/// Result type for HTTP handlers.
pub type ApiResult<T> = Result<T, ApiError>;

/// Errors a room API handler can answer with.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Unknown room id, or a token that does not belong to the room.
    #[error("room not found")]
    NotFound,

    #[error("invalid password")]
    InvalidPassword,

    /// Anything the client cannot fix.  The detail is logged, not returned.
    #[error("internal error")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::InvalidPassword => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error response JSON structure.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(detail) = &self {
            error!("room API internal error: {detail}");
        }
        let status = self.status();
        let body = Json(ErrorBody {
            error: self.to_string(),
        });
        (status, body).into_response()
    }
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound => ApiError::NotFound,
            RegistryError::InvalidPassword => ApiError::InvalidPassword,
            other => ApiError::Internal(other.to_string()),
        }
    }
}
