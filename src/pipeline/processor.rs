//! Document processor: one pipeline instance per uploaded file.
//!
//! invoke (temp file removed) → normalize → `Result<ExtractedFields, _>`.
//! No retries: a failed extraction is reported, not re-attempted.

use std::sync::Arc;
use std::time::{Duration, Instant};

use super::error::PipelineError;
use super::invoker::{summarize_failure, ExtractionInvoker, Extractor};
use super::normalizer::normalize;
use super::types::{ExtractedFields, ExtractionRequest, UploadedDocument};

/// Runs pipeline instances against a shared extractor.
#[derive(Clone)]
pub struct DocumentProcessor {
    invoker: ExtractionInvoker,
    timeout: Duration,
}

impl DocumentProcessor {
    pub fn new(extractor: Arc<dyn Extractor>, timeout: Duration) -> Self {
        Self {
            invoker: ExtractionInvoker::new(extractor),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Process one document in the caller's task.
    ///
    /// The document's temp file is gone by the time this returns.
    pub async fn process(&self, document: UploadedDocument) -> Result<ExtractedFields, PipelineError> {
        let file = document.original_name.clone();
        let temp_path = document.temporary_path().to_path_buf();
        let started = Instant::now();

        let outcome = self
            .invoker
            .run(ExtractionRequest::new(document, self.timeout))
            .await;
        let result = outcome.into_raw_output().and_then(|raw| {
            normalize(&raw).map_err(|e| summarize_failure(e, &temp_path, &file))
        });

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(fields) => tracing::info!(
                file = %file,
                elapsed_ms,
                structured = fields.has_structured(),
                "Document processed"
            ),
            Err(e) => tracing::warn!(
                file = %file,
                elapsed_ms,
                kind = e.kind(),
                error = %e,
                "Document processing failed"
            ),
        }
        result
    }

    /// Process one document on its own task.
    ///
    /// A panic inside the pipeline becomes `Unexpected` instead of taking
    /// the caller down; the document is dropped during unwinding, which
    /// removes its file.
    pub async fn process_isolated(
        &self,
        document: UploadedDocument,
    ) -> Result<ExtractedFields, PipelineError> {
        let processor = self.clone();
        match tokio::spawn(async move { processor.process(document).await }).await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(error = %e, "Pipeline task aborted");
                Err(PipelineError::Unexpected(format!("pipeline task failed: {e}")))
            }
        }
    }
}
