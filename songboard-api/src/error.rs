//! Service error taxonomy and its HTTP mapping

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::error;

use crate::resolver::ResolverError;

/// Field name -> messages, as returned in 422 bodies
pub type FieldErrors = BTreeMap<String, Vec<String>>;

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Request body failed schema validation (422)
    #[error("{message}")]
    Validation { message: String, errors: FieldErrors },

    /// Malformed query or path parameter (400)
    #[error("{0}")]
    InvalidArgument(String),

    /// The submitted URL could not be resolved to a video (400)
    #[error("Failed to process YouTube URL: {0}")]
    InvalidSubmission(#[from] ResolverError),

    /// `youtube_id` already present on some row (409)
    #[error("This song has already been suggested")]
    DuplicateSong(String),

    #[error("Unauthenticated.")]
    Unauthenticated,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    /// Details are logged, never returned
    #[error("Internal server error")]
    Internal(String),
}

impl ServiceError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        let mut errors = FieldErrors::new();
        errors.insert(field.to_string(), vec![message.clone()]);
        ServiceError::Validation { message, errors }
    }

    pub fn song_not_found() -> Self {
        ServiceError::NotFound("Song not found".to_string())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ServiceError::InvalidArgument(_) | ServiceError::InvalidSubmission(_) => {
                StatusCode::BAD_REQUEST
            }
            ServiceError::DuplicateSong(_) => StatusCode::CONFLICT,
            ServiceError::Unauthenticated | ServiceError::InvalidCredentials => {
                StatusCode::UNAUTHORIZED
            }
            ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<songboard_common::Error> for ServiceError {
    fn from(err: songboard_common::Error) -> Self {
        use songboard_common::Error;

        match err {
            Error::NotFound(what) => ServiceError::NotFound(what),
            Error::Conflict(what) => ServiceError::DuplicateSong(what),
            Error::InvalidInput(msg) => ServiceError::InvalidArgument(msg),
            other => ServiceError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let body = match &self {
            ServiceError::Validation { message, errors } => json!({
                "success": false,
                "message": message,
                "errors": errors,
            }),
            ServiceError::Unauthenticated | ServiceError::Forbidden(_) => json!({
                "message": self.to_string(),
            }),
            ServiceError::Internal(details) => {
                error!("Internal error: {}", details);
                json!({
                    "success": false,
                    "message": self.to_string(),
                })
            }
            _ => json!({
                "success": false,
                "message": self.to_string(),
            }),
        };

        (status, Json(body)).into_response()
    }
}
