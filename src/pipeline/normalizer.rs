//! Result normalizer: extractor JSON → canonical `ExtractedFields`.
//!
//! Canonical keys are `aadhar_number`, `name`, `dob`, `gender`. If none is
//! present the payload is surfaced as `raw_text` so unrecognized documents
//! still return something. All other keys are dropped.

use serde_json::{Map, Value};

use super::error::{PipelineError, EXTRACTION_FAILED, PARSE_FAILED};
use super::types::ExtractedFields;

const DOCUMENT_NUMBER: &str = "aadhar_number";
const NAME: &str = "name";
const DATE_OF_BIRTH: &str = "dob";
const GENDER: &str = "gender";
const RAW_TEXT: &str = "raw_text";

/// Normalize the extractor's stdout.
pub fn normalize(raw_output: &str) -> Result<ExtractedFields, PipelineError> {
    let value: Value = serde_json::from_str(raw_output).map_err(|e| {
        tracing::warn!(error = %e, "Extractor output failed to parse");
        PipelineError::ParseFailure(PARSE_FAILED.into())
    })?;
    normalize_value(value)
}

pub fn normalize_value(value: Value) -> Result<ExtractedFields, PipelineError> {
    match value {
        Value::Object(map) => normalize_page(&map).map(|page| page.finish(&map)),
        // Multi-page PDFs come back as one object per page.
        Value::Array(pages) => normalize_pages(pages),
        Value::String(text) => Ok(ExtractedFields::raw(text)),
        other => {
            tracing::warn!(kind = value_kind(&other), "Extractor output has unexpected shape");
            Err(PipelineError::ParseFailure(PARSE_FAILED.into()))
        }
    }
}

/// Canonical fields of one page, before the raw-text fallback is applied.
struct Page {
    fields: ExtractedFields,
    raw_text: Option<String>,
}

impl Page {
    fn finish(self, payload: &Map<String, Value>) -> ExtractedFields {
        if self.fields.has_structured() {
            return self.fields;
        }
        let raw = self
            .raw_text
            .unwrap_or_else(|| Value::Object(payload.clone()).to_string());
        ExtractedFields::raw(raw)
    }
}

fn normalize_page(map: &Map<String, Value>) -> Result<Page, PipelineError> {
    if map.get("success") == Some(&Value::Bool(false)) {
        let message = map
            .get("error")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(EXTRACTION_FAILED);
        return Err(PipelineError::ProcessFailure(message.to_string()));
    }

    Ok(Page {
        fields: ExtractedFields {
            document_number: field_text(map, DOCUMENT_NUMBER),
            name: field_text(map, NAME),
            date_of_birth: field_text(map, DATE_OF_BIRTH),
            gender: field_text(map, GENDER),
            raw_text: None,
        },
        raw_text: field_text(map, RAW_TEXT),
    })
}

fn normalize_pages(pages: Vec<Value>) -> Result<ExtractedFields, PipelineError> {
    let mut merged = ExtractedFields::default();
    let mut raw_texts = Vec::new();
    let mut first_error = None;
    let mut usable_pages = 0usize;

    for (index, page) in pages.iter().enumerate() {
        let Value::Object(map) = page else {
            tracing::debug!(page = index + 1, "Skipping non-object page");
            continue;
        };
        match normalize_page(map) {
            Ok(page) => {
                usable_pages += 1;
                // First page that has a field wins.
                merged.document_number = merged.document_number.or(page.fields.document_number);
                merged.name = merged.name.or(page.fields.name);
                merged.date_of_birth = merged.date_of_birth.or(page.fields.date_of_birth);
                merged.gender = merged.gender.or(page.fields.gender);
                if let Some(text) = page.raw_text {
                    raw_texts.push(text);
                }
            }
            Err(e) => {
                tracing::debug!(page = index + 1, error = %e, "Page reported failure");
                first_error.get_or_insert(e);
            }
        }
    }

    if usable_pages == 0 {
        return Err(first_error.unwrap_or_else(|| PipelineError::ParseFailure(PARSE_FAILED.into())));
    }
    if merged.has_structured() {
        return Ok(merged);
    }
    if raw_texts.is_empty() {
        return Ok(ExtractedFields::raw(Value::Array(pages).to_string()));
    }
    Ok(ExtractedFields::raw(raw_texts.join("\n\n")))
}

/// A present, non-blank value rendered as text. Numbers are stringified.
fn field_text(map: &Map<String, Value>, key: &str) -> Option<String> {
    let text = match map.get(key)? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
