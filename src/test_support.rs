//! Shared fixtures for unit tests: staged documents, a scripted extractor,
//! and a multipart body builder.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request};
use futures_util::future::BoxFuture;

use crate::pipeline::invoker::Extractor;
use crate::pipeline::types::{ExtractionOutcome, UploadedDocument};

pub const BOUNDARY: &str = "idextract-test-boundary";

/// A PDF-looking document staged in `dir`. The temp file name starts with
/// `name` so scripted extractors can tell documents apart.
pub fn staged_document(dir: &Path, name: &str) -> UploadedDocument {
    use std::io::Write;
    let mut file = tempfile::Builder::new()
        .prefix(&format!("{name}-"))
        .suffix(".pdf")
        .tempfile_in(dir)
        .unwrap();
    file.write_all(b"%PDF-1.4 test").unwrap();
    UploadedDocument::new(
        file.into_temp_path(),
        name.to_string(),
        "application/pdf".into(),
        13,
    )
}

// ═══════════════════════════════════════════════════════════
// Scripted extractor
// ═══════════════════════════════════════════════════════════

enum Behavior {
    Always(ExtractionOutcome),
    FailingWithPath,
    Panicking,
    PanickingFor { name: String, otherwise: String },
    ByName(Vec<(String, Duration, String)>),
}

/// In-process `Extractor` with canned behavior; records every path it sees.
pub struct ScriptedExtractor {
    behavior: Behavior,
    seen: Mutex<Vec<PathBuf>>,
}

impl ScriptedExtractor {
    fn with(behavior: Behavior) -> Self {
        Self {
            behavior,
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn always(outcome: ExtractionOutcome) -> Self {
        Self::with(Behavior::Always(outcome))
    }

    /// Fails with a message that mentions the file path it was given.
    pub fn failing_with_path() -> Self {
        Self::with(Behavior::FailingWithPath)
    }

    pub fn panicking() -> Self {
        Self::with(Behavior::Panicking)
    }

    /// Panics for files whose name starts with `name`, succeeds otherwise.
    pub fn panicking_for(name: &str, otherwise: &str) -> Self {
        Self::with(Behavior::PanickingFor {
            name: name.into(),
            otherwise: otherwise.into(),
        })
    }

    /// Per-name delay and JSON output.
    pub fn by_name(entries: &[(&str, Duration, &str)]) -> Self {
        Self::with(Behavior::ByName(
            entries
                .iter()
                .map(|(n, d, o)| (n.to_string(), *d, o.to_string()))
                .collect(),
        ))
    }

    pub fn seen_paths(&self) -> Vec<PathBuf> {
        self.seen.lock().unwrap().clone()
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

impl Extractor for ScriptedExtractor {
    fn invoke<'a>(&'a self, path: &'a Path, _timeout: Duration) -> BoxFuture<'a, ExtractionOutcome> {
        Box::pin(async move {
            self.seen.lock().unwrap().push(path.to_path_buf());
            let name = file_name(path);

            match &self.behavior {
                Behavior::Always(outcome) => outcome.clone(),
                Behavior::FailingWithPath => ExtractionOutcome::ProcessFailure {
                    message: format!("Traceback (most recent call last):\ncannot open {}\n", path.display()),
                },
                Behavior::Panicking => panic!("extractor blew up"),
                Behavior::PanickingFor { name: bad, otherwise } => {
                    if name.starts_with(bad.as_str()) {
                        panic!("extractor blew up on {name}");
                    }
                    ExtractionOutcome::Success {
                        raw_output: otherwise.clone(),
                    }
                }
                Behavior::ByName(entries) => {
                    let (_, delay, output) = entries
                        .iter()
                        .find(|(n, _, _)| name.starts_with(n.as_str()))
                        .expect("no scripted entry for file");
                    tokio::time::sleep(*delay).await;
                    ExtractionOutcome::Success {
                        raw_output: output.clone(),
                    }
                }
            }
        })
    }
}

// ═══════════════════════════════════════════════════════════
// Multipart
// ═══════════════════════════════════════════════════════════

pub enum Part<'a> {
    Text {
        name: &'a str,
        value: &'a str,
    },
    File {
        name: &'a str,
        filename: &'a str,
        content_type: &'a str,
        bytes: &'a [u8],
    },
}

impl<'a> Part<'a> {
    pub fn text(name: &'a str, value: &'a str) -> Self {
        Part::Text { name, value }
    }

    pub fn file(name: &'a str, filename: &'a str, content_type: &'a str, bytes: &'a [u8]) -> Self {
        Part::File {
            name,
            filename,
            content_type,
            bytes,
        }
    }
}

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text { name, value } => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File {
                name,
                filename,
                content_type,
                bytes,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n\
                         Content-Type: {content_type}\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

/// `POST uri` with a multipart/form-data body.
pub fn multipart_request(uri: &str, parts: &[Part<'_>]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}
