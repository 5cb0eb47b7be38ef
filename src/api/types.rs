//! Shared state and response bodies for the HTTP layer.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::ServiceConfig;
use crate::pipeline::error::PipelineError;
use crate::pipeline::invoker::{Extractor, ProcessExtractor};
use crate::pipeline::processor::DocumentProcessor;
use crate::pipeline::types::ExtractedFields;
use crate::pipeline::upload::UploadPolicy;

// ═══════════════════════════════════════════════════════════
// API context: shared state for the router
// ═══════════════════════════════════════════════════════════

/// Shared context for all routes. Cheap to clone.
#[derive(Clone)]
pub struct ApiContext {
    pub processor: DocumentProcessor,
    pub upload_policy: Arc<UploadPolicy>,
    /// Present when the extractor is an external process that can be probed.
    pub probe: Option<Arc<ProcessExtractor>>,
}

impl ApiContext {
    /// Context backed by any extractor. `/check-extractor` reports it as
    /// not probeable.
    pub fn new(processor: DocumentProcessor, upload_policy: UploadPolicy) -> Self {
        Self {
            processor,
            upload_policy: Arc::new(upload_policy),
            probe: None,
        }
    }

    /// Context backed by the configured external extractor process.
    pub fn from_config(config: &ServiceConfig) -> Self {
        let extractor = Arc::new(ProcessExtractor::new(
            config.interpreter.clone(),
            config.script.clone(),
        ));
        let processor =
            DocumentProcessor::new(extractor.clone() as Arc<dyn Extractor>, config.timeout);
        Self {
            processor,
            upload_policy: Arc::new(config.upload_policy()),
            probe: Some(extractor),
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Response bodies
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VerifyStatus {
    Verified,
    Failed,
}

/// Body of `POST /api/aadhar-pdf-verify`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyResponse {
    pub status: VerifyStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<ExtractedFields>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl VerifyResponse {
    pub fn verified(data: ExtractedFields) -> Self {
        Self {
            status: VerifyStatus::Verified,
            data: Some(data),
            error: None,
        }
    }

    pub fn failed(error: &PipelineError) -> Self {
        Self {
            status: VerifyStatus::Failed,
            data: None,
            error: Some(error.public_message()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Body of `GET /check-extractor`.
#[derive(Debug, Serialize)]
pub struct ExtractorCheckResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
