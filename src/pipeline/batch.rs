//! Batch orchestrator: fan out one pipeline per file, fan in in order.
//!
//! Every file is dispatched immediately on its own task; there is no
//! concurrency cap (batches are a handful of pages). A failing file never
//! cancels its siblings, and the batch completes only when all have settled.

use futures_util::future::join_all;

use super::error::PipelineError;
use super::processor::DocumentProcessor;
use super::types::{PipelineResult, UploadedDocument};

/// Run every received file and return results index-aligned with `files`.
///
/// Entries that already failed upload validation are passed through as
/// failures at their index without dispatching anything.
pub async fn run_batch(
    processor: &DocumentProcessor,
    files: Vec<Result<UploadedDocument, PipelineError>>,
) -> Vec<PipelineResult> {
    let total = files.len();
    let pipelines = files.into_iter().map(|file| async move {
        match file {
            Ok(document) => PipelineResult::from(processor.process_isolated(document).await),
            Err(e) => PipelineResult::failed(&e),
        }
    });

    let results = join_all(pipelines).await;

    let succeeded = results.iter().filter(|r| r.success).count();
    tracing::info!(total, succeeded, failed = total - succeeded, "Batch completed");
    results
}
