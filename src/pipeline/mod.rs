//! Extraction pipeline.
//!
//! receive upload (temp file) → invoke extractor (temp file removed) →
//! normalize output → `PipelineResult`. Batches run one pipeline per file.

pub mod batch;
pub mod error;
pub mod invoker;
pub mod normalizer;
pub mod processor;
pub mod types;
pub mod upload;
