//! Values that flow through one pipeline instance:
//! upload → extraction request → outcome → extracted fields → result.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tempfile::TempPath;

use super::error::PipelineError;

// ═══════════════════════════════════════════════════════════
// Upload
// ═══════════════════════════════════════════════════════════

/// An uploaded file materialized in the upload directory.
///
/// The document owns its backing file. `discard` removes it and reports
/// the outcome; if the document is dropped instead (panic, cancelled
/// request) the file is removed on drop. Both paths consume the handle,
/// so removal is attempted at most once.
#[derive(Debug)]
pub struct UploadedDocument {
    temp_path: TempPath,
    pub original_name: String,
    pub mime_type: String,
    pub size_bytes: u64,
}

impl UploadedDocument {
    pub fn new(
        temp_path: TempPath,
        original_name: String,
        mime_type: String,
        size_bytes: u64,
    ) -> Self {
        Self {
            temp_path,
            original_name,
            mime_type,
            size_bytes,
        }
    }

    pub fn temporary_path(&self) -> &Path {
        &self.temp_path
    }

    /// Remove the backing file.
    pub fn discard(self) -> std::io::Result<()> {
        self.temp_path.close()
    }
}

/// Input to the extraction invoker. Fields are fixed at construction.
#[derive(Debug)]
pub struct ExtractionRequest {
    document: UploadedDocument,
    timeout: Duration,
}

impl ExtractionRequest {
    pub fn new(document: UploadedDocument, timeout: Duration) -> Self {
        Self { document, timeout }
    }

    pub fn document(&self) -> &UploadedDocument {
        &self.document
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn into_parts(self) -> (UploadedDocument, Duration) {
        (self.document, self.timeout)
    }
}

// ═══════════════════════════════════════════════════════════
// Extraction
// ═══════════════════════════════════════════════════════════

/// How an extraction attempt settled. Exactly one is produced per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionOutcome {
    /// Process exited cleanly; `raw_output` is its stdout, already known to
    /// be well-formed JSON.
    Success { raw_output: String },
    ProcessFailure { message: String },
    Timeout,
    ParseFailure { message: String },
}

impl ExtractionOutcome {
    /// Failures as pipeline errors; `Success` yields its raw output.
    pub fn into_raw_output(self) -> Result<String, PipelineError> {
        match self {
            Self::Success { raw_output } => Ok(raw_output),
            Self::ProcessFailure { message } => Err(PipelineError::ProcessFailure(message)),
            Self::Timeout => Err(PipelineError::Timeout),
            Self::ParseFailure { message } => Err(PipelineError::ParseFailure(message)),
        }
    }
}

/// Canonical fields of an identity document.
///
/// Keys match the extractor's JSON contract so a normalized payload can be
/// fed back through the normalizer unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedFields {
    #[serde(rename = "aadhar_number", skip_serializing_if = "Option::is_none")]
    pub document_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "dob", skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_text: Option<String>,
}

impl ExtractedFields {
    /// True when any canonical field was recognized.
    pub fn has_structured(&self) -> bool {
        self.document_number.is_some()
            || self.name.is_some()
            || self.date_of_birth.is_some()
            || self.gender.is_some()
    }

    pub fn raw(text: impl Into<String>) -> Self {
        Self {
            raw_text: Some(text.into()),
            ..Self::default()
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Result
// ═══════════════════════════════════════════════════════════

/// Externally visible outcome of one pipeline instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<ExtractedFields>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PipelineResult {
    pub fn succeeded(data: ExtractedFields) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failed(error: &PipelineError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.public_message()),
        }
    }
}

impl From<Result<ExtractedFields, PipelineError>> for PipelineResult {
    fn from(result: Result<ExtractedFields, PipelineError>) -> Self {
        match result {
            Ok(data) => Self::succeeded(data),
            Err(e) => Self::failed(&e),
        }
    }
}
