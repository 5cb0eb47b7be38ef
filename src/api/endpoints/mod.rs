//! API endpoint handlers.

pub mod batch;
pub mod extract;
pub mod health;
pub mod verify;

use axum::extract::multipart::MultipartRejection;
use axum::extract::Multipart;
use axum::http::StatusCode;

use crate::api::error::ApiError;
use crate::pipeline::error::{PipelineError, NO_FILE_UPLOADED};

/// Form field carrying the document on the extraction routes.
pub const FILE_FIELD: &str = "file";

/// A body that is not multipart at all carries no file.
pub(crate) fn require_multipart(
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Multipart, PipelineError> {
    multipart.map_err(|rejection| {
        tracing::debug!(error = %rejection, "Request is not multipart");
        PipelineError::validation(NO_FILE_UPLOADED)
    })
}

/// `OPTIONS` on an upload route. CORS preflights are answered by the CORS
/// layer before reaching here.
pub async fn preflight() -> StatusCode {
    StatusCode::OK
}

/// Any other method on an upload route.
pub async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}
