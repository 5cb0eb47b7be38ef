//! PDF verification endpoint.

use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::Json;

use super::require_multipart;
use crate::api::error::ApiError;
use crate::api::types::{ApiContext, VerifyResponse};
use crate::pipeline::upload::{receive_single, TypeRule};

pub const PDF_FIELD: &str = "pdf_file";

/// `POST /api/aadhar-pdf-verify`: a PDF in `pdf_file` either yields
/// `VERIFIED` with its fields or `FAILED` with a reason.
pub async fn verify_pdf(
    State(ctx): State<ApiContext>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<VerifyResponse>, ApiError> {
    let mut multipart = require_multipart(multipart).map_err(ApiError::Verification)?;
    let document = receive_single(&mut multipart, PDF_FIELD, TypeRule::PdfOnly, &ctx.upload_policy)
        .await
        .map_err(ApiError::Verification)?;

    let fields = ctx
        .processor
        .process_isolated(document)
        .await
        .map_err(ApiError::Verification)?;
    Ok(Json(VerifyResponse::verified(fields)))
}
