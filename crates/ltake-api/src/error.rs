//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use ltake_drive::DriveError;
use ltake_media::MediaError;

pub type ApiResult<T> = Result<T, ApiError>;

/// Job-level failure taxonomy.
///
/// Validation failures never reach the process or upload stages; transcode
/// and upload failures short-circuit the remaining pipeline and surface with
/// their diagnostics; anything uncaught becomes `Internal` and renders a
/// generic message.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Transcode failed: {0}")]
    Transcode(String),

    #[error("Transcode timed out after {0} seconds")]
    TranscodeTimeout(u64),

    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Transcode(_)
            | ApiError::TranscodeTimeout(_)
            | ApiError::Upload(_)
            | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<MediaError> for ApiError {
    fn from(err: MediaError) -> Self {
        match err {
            MediaError::Timeout(secs) => ApiError::TranscodeTimeout(secs),
            MediaError::EmptyConcatList => ApiError::Validation(err.to_string()),
            MediaError::Io(e) => ApiError::Internal(e.to_string()),
            other => ApiError::Transcode(other.diagnostic()),
        }
    }
}

impl From<DriveError> for ApiError {
    fn from(err: DriveError) -> Self {
        ApiError::Upload(err.to_string())
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Internal details are logged, never sent to the caller.
        let error = match &self {
            ApiError::Internal(detail) => {
                error!(detail, "Unexpected error");
                "Unexpected error".to_string()
            }
            _ => self.to_string(),
        };

        (status, Json(ErrorResponse { error })).into_response()
    }
}
