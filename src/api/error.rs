//! Response mapping: pipeline errors to HTTP status and JSON bodies.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::api::types::VerifyResponse;
use crate::pipeline::error::PipelineError;
use crate::pipeline::types::PipelineResult;

pub const METHOD_NOT_ALLOWED: &str = "Method Not Allowed";

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Extraction endpoints: `{success: false, error}`.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// Verification endpoint: `{status: "FAILED", error}`.
    #[error("Verification failed: {0}")]
    Verification(PipelineError),

    #[error("Method not allowed")]
    MethodNotAllowed,
}

/// Validation failures are the client's fault; everything else is ours.
pub fn status_for(error: &PipelineError) -> StatusCode {
    match error {
        PipelineError::Validation(_) => StatusCode::BAD_REQUEST,
        PipelineError::ProcessFailure(_)
        | PipelineError::Timeout
        | PipelineError::ParseFailure(_)
        | PipelineError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

// Extraction failures are already logged by the processor.
fn log_failure(error: &PipelineError) {
    match error {
        PipelineError::Validation(message) => {
            tracing::debug!(message = %message, "Request rejected")
        }
        PipelineError::Unexpected(detail) => tracing::error!(detail, "API internal error"),
        _ => {}
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Pipeline(error) => {
                log_failure(&error);
                (status_for(&error), Json(PipelineResult::failed(&error))).into_response()
            }
            ApiError::Verification(error) => {
                log_failure(&error);
                (status_for(&error), Json(VerifyResponse::failed(&error))).into_response()
            }
            ApiError::MethodNotAllowed => {
                let body = PipelineResult {
                    success: false,
                    data: None,
                    error: Some(METHOD_NOT_ALLOWED.to_string()),
                };
                let mut response = (StatusCode::METHOD_NOT_ALLOWED, Json(body)).into_response();
                response
                    .headers_mut()
                    .insert(header::ALLOW, HeaderValue::from_static("POST, OPTIONS"));
                response
            }
        }
    }
}
