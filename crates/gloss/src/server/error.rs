//! Mapping of pipeline failures to HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use gloss_core::error::UpstreamError;
use gloss_core::{ErrorBody, PipelineError};

/// An error response: status code plus JSON body.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorBody,
}

impl ApiError {
    pub fn new(status: StatusCode, error: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody::new(error),
        }
    }

    fn with_details(mut self, details: impl Into<String>) -> Self {
        self.body = self.body.with_details(details);
        self
    }

    /// Response for a failed `POST /upload`.
    pub fn upload(err: PipelineError) -> Self {
        match err {
            PipelineError::Validation(message) => Self::new(StatusCode::BAD_REQUEST, message),
            other => {
                tracing::error!(error = %other, "Upload failed");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Failed to upload image")
            }
        }
    }

    /// Response for a failed `POST /beautify/:id`.
    pub fn beautify(err: PipelineError) -> Self {
        match err {
            PipelineError::NotFound(_) => Self::not_found(),
            PipelineError::Validation(message) => Self::new(StatusCode::BAD_REQUEST, message),
            PipelineError::Upstream(e @ (UpstreamError::EmptyResult | UpstreamError::MissingPayload)) => {
                tracing::error!(error = %e, "Beautify failed");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
            PipelineError::Upstream(e) => {
                if e.is_rate_limited() {
                    tracing::warn!(error = %e, "Image-edit API rate limit hit");
                } else {
                    tracing::error!(error = %e, "Beautify failed");
                }
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Beautify failed").with_details(e.details())
            }
            other => {
                tracing::error!(error = %other, "Beautify failed");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Beautify failed")
                    .with_details(other.to_string())
            }
        }
    }

    /// Response for a failed record lookup.
    pub fn lookup(err: PipelineError) -> Self {
        match err {
            PipelineError::NotFound(_) => Self::not_found(),
            other => {
                tracing::error!(error = %other, "Image lookup failed");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Failed to load image")
            }
        }
    }

    fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "Image not found")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
