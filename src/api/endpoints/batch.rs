//! Multi-document extraction endpoint.

use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::Json;

use super::{require_multipart, FILE_FIELD};
use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::pipeline::batch::run_batch;
use crate::pipeline::types::PipelineResult;
use crate::pipeline::upload::{receive_many, TypeRule};

/// `POST /api/extract-aadhar/batch`: every `file` field runs its own
/// pipeline concurrently. The response is a bare array in upload order;
/// per-file failures stay in their slot and the status is still 200.
pub async fn extract_batch(
    State(ctx): State<ApiContext>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Vec<PipelineResult>>, ApiError> {
    let mut multipart = require_multipart(multipart)?;
    let uploads =
        receive_many(&mut multipart, FILE_FIELD, TypeRule::ImageOrPdf, &ctx.upload_policy).await?;

    tracing::info!(files = uploads.len(), "Batch received");
    Ok(Json(run_batch(&ctx.processor, uploads).await))
}
