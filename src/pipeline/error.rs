//! Failure taxonomy for a single pipeline instance.
//!
//! Every variant carries (or implies) a short message that is safe to show
//! a client. Diagnostics with more detail are logged where the failure is
//! detected and never stored here.

use thiserror::Error;

pub const NO_FILE_UPLOADED: &str = "No file uploaded";
pub const UPLOAD_FAILED: &str = "File upload error";
pub const EMPTY_FILE: &str = "Uploaded file is empty";
pub const FILE_TOO_LARGE: &str = "File too large";
pub const UNSUPPORTED_TYPE: &str = "Unsupported file type. Please upload an image or PDF.";
pub const PDF_REQUIRED: &str = "Only PDF files can be verified";
pub const REQUEST_TIMED_OUT: &str = "Request timed out";
pub const PARSE_FAILED: &str = "Failed to parse extracted data";
pub const NO_DATA_EXTRACTED: &str = "No data extracted from the file";
pub const EXTRACTION_FAILED: &str = "Extraction failed";
pub const INTERNAL_ERROR: &str = "An internal error occurred";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// Bad or missing input. The message is user-correctable guidance.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The extraction process crashed or reported an error.
    #[error("Extraction process failed: {0}")]
    ProcessFailure(String),

    #[error("Extraction process exceeded its time budget")]
    Timeout,

    /// The process exited cleanly but its output was unusable.
    #[error("Extraction output unusable: {0}")]
    ParseFailure(String),

    /// Anything else, e.g. a failed temp-file write or a panicked task.
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl PipelineError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Message for the client. `Unexpected` details stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            Self::Validation(message)
            | Self::ProcessFailure(message)
            | Self::ParseFailure(message) => message.clone(),
            Self::Timeout => REQUEST_TIMED_OUT.to_string(),
            Self::Unexpected(_) => INTERNAL_ERROR.to_string(),
        }
    }

    /// Stable machine-readable tag, used in log records.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::ProcessFailure(_) => "process_failure",
            Self::Timeout => "timeout",
            Self::ParseFailure(_) => "parse_failure",
            Self::Unexpected(_) => "unexpected",
        }
    }
}
