//! Single-document extraction endpoint.

use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::Json;

use super::{require_multipart, FILE_FIELD};
use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::pipeline::types::PipelineResult;
use crate::pipeline::upload::{receive_single, TypeRule};

/// `POST /api/extract-aadhar`: one `file` field, one pipeline result.
pub async fn extract(
    State(ctx): State<ApiContext>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<PipelineResult>, ApiError> {
    let mut multipart = require_multipart(multipart)?;
    let document =
        receive_single(&mut multipart, FILE_FIELD, TypeRule::ImageOrPdf, &ctx.upload_policy).await?;

    tracing::info!(
        file = %document.original_name,
        mime = %document.mime_type,
        size = document.size_bytes,
        "Upload received"
    );

    let fields = ctx.processor.process_isolated(document).await?;
    Ok(Json(PipelineResult::succeeded(fields)))
}
