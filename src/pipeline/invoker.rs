//! Extraction invoker: runs the external extractor over one uploaded file.
//!
//! The extractor sits behind the `Extractor` trait so the OCR technology can
//! change without touching the pipeline. `ProcessExtractor` is the
//! subprocess implementation: `<interpreter> <script> <absolute-path>`,
//! JSON on stdout, failure signalled by exit status or stderr.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::future::BoxFuture;
use serde::de::IgnoredAny;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};

use super::error::{PipelineError, EXTRACTION_FAILED, NO_DATA_EXTRACTED, PARSE_FAILED};
use super::types::{ExtractionOutcome, ExtractionRequest};

/// Longest process diagnostic passed on to clients.
const MAX_DIAGNOSTIC_CHARS: usize = 200;

// ═══════════════════════════════════════════════════════════
// Extractor capability
// ═══════════════════════════════════════════════════════════

/// Something that turns a document file into extractor JSON.
///
/// Implementations must settle exactly once and must not leave work
/// running after `timeout` has elapsed.
pub trait Extractor: Send + Sync {
    fn invoke<'a>(&'a self, path: &'a Path, timeout: Duration) -> BoxFuture<'a, ExtractionOutcome>;
}

/// Runs an interpreter + script as a child process per document.
#[derive(Debug, Clone)]
pub struct ProcessExtractor {
    interpreter: OsString,
    script: PathBuf,
}

impl ProcessExtractor {
    pub fn new(interpreter: impl Into<OsString>, script: impl Into<PathBuf>) -> Self {
        Self {
            interpreter: interpreter.into(),
            script: script.into(),
        }
    }

    /// Report the interpreter's version string (`<interpreter> --version`).
    pub async fn probe(&self, timeout: Duration) -> Result<String, PipelineError> {
        let mut command = Command::new(&self.interpreter);
        command.arg("--version");
        match run_to_completion(command, timeout).await {
            Ok(Settled::Finished(finished)) if finished.status.success() => {
                // Older interpreters print their version on stderr.
                let text = if finished.stdout.trim().is_empty() {
                    finished.stderr
                } else {
                    finished.stdout
                };
                Ok(text.trim().to_string())
            }
            Ok(Settled::Finished(finished)) => Err(PipelineError::ProcessFailure(
                failure_message(finished.status, &finished.stderr, &finished.stdout),
            )),
            Ok(Settled::TimedOut) => Err(PipelineError::Timeout),
            Err(e) => Err(PipelineError::ProcessFailure(format!(
                "Failed to start interpreter: {e}"
            ))),
        }
    }

    async fn extract(&self, path: &Path, timeout: Duration) -> ExtractionOutcome {
        let mut command = Command::new(&self.interpreter);
        command.arg(&self.script).arg(path);

        let started = Instant::now();
        let settled = match run_to_completion(command, timeout).await {
            Ok(settled) => settled,
            Err(e) => {
                tracing::error!(error = %e, "Failed to spawn extraction process");
                return ExtractionOutcome::ProcessFailure {
                    message: format!("Failed to start extraction process: {e}"),
                };
            }
        };

        let finished = match settled {
            Settled::TimedOut => {
                tracing::warn!(
                    timeout_ms = timeout.as_millis() as u64,
                    "Extraction process timed out and was killed"
                );
                return ExtractionOutcome::Timeout;
            }
            Settled::Finished(finished) => finished,
        };

        tracing::debug!(
            status = %finished.status,
            elapsed_ms = started.elapsed().as_millis() as u64,
            stdout_len = finished.stdout.len(),
            stderr_len = finished.stderr.len(),
            "Extraction process finished"
        );
        classify(finished)
    }
}

impl Extractor for ProcessExtractor {
    fn invoke<'a>(&'a self, path: &'a Path, timeout: Duration) -> BoxFuture<'a, ExtractionOutcome> {
        Box::pin(self.extract(path, timeout))
    }
}

// ═══════════════════════════════════════════════════════════
// Child process handling
// ═══════════════════════════════════════════════════════════

struct Finished {
    status: ExitStatus,
    stdout: String,
    stderr: String,
    stdout_utf8: bool,
}

enum Settled {
    Finished(Finished),
    TimedOut,
}

/// Spawn `command` and wait for it under `timeout`.
///
/// Output pipes are drained while waiting so a chatty child cannot block
/// on a full pipe. Whichever of exit and deadline comes first decides the
/// result; on the deadline the child is killed and reaped before
/// returning. `kill_on_drop` covers a cancelled caller.
async fn run_to_completion(
    mut command: Command,
    timeout: Duration,
) -> std::io::Result<Settled> {
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = command.spawn()?;
    let pid = child.id();
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let raced = tokio::time::timeout(timeout, async {
        tokio::try_join!(child.wait(), drain(stdout), drain(stderr))
    })
    .await;

    match raced {
        Ok(Ok((status, out, err))) => {
            let (stdout, stdout_utf8) = match String::from_utf8(out) {
                Ok(text) => (text, true),
                Err(e) => (String::from_utf8_lossy(e.as_bytes()).into_owned(), false),
            };
            Ok(Settled::Finished(Finished {
                status,
                stdout,
                stderr: String::from_utf8_lossy(&err).into_owned(),
                stdout_utf8,
            }))
        }
        Ok(Err(e)) => {
            terminate(&mut child, pid).await;
            Err(e)
        }
        Err(_elapsed) => {
            terminate(&mut child, pid).await;
            Ok(Settled::TimedOut)
        }
    }
}

async fn drain<R: AsyncRead + Unpin>(pipe: Option<R>) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        pipe.read_to_end(&mut buf).await?;
    }
    Ok(buf)
}

async fn terminate(child: &mut Child, pid: Option<u32>) {
    if let Err(e) = child.kill().await {
        tracing::warn!(pid, error = %e, "Failed to kill extraction process");
    }
}

/// Map a finished process to an outcome.
fn classify(finished: Finished) -> ExtractionOutcome {
    let stderr = finished.stderr.trim();
    if !finished.status.success() || !stderr.is_empty() {
        tracing::warn!(
            status = %finished.status,
            stderr = %stderr,
            "Extraction process reported failure"
        );
        return ExtractionOutcome::ProcessFailure {
            message: failure_message(finished.status, stderr, &finished.stdout),
        };
    }

    if !finished.stdout_utf8 {
        tracing::warn!("Extraction output is not valid UTF-8");
        return ExtractionOutcome::ParseFailure {
            message: PARSE_FAILED.into(),
        };
    }

    let output = finished.stdout.trim();
    if output.is_empty() {
        return ExtractionOutcome::ParseFailure {
            message: NO_DATA_EXTRACTED.into(),
        };
    }
    if let Err(e) = serde_json::from_str::<IgnoredAny>(output) {
        tracing::warn!(error = %e, "Extraction output is not JSON");
        return ExtractionOutcome::ParseFailure {
            message: PARSE_FAILED.into(),
        };
    }

    ExtractionOutcome::Success {
        raw_output: output.to_string(),
    }
}

/// Best diagnostic for a failed run: stderr, then the script's own JSON
/// error report on stdout, then the exit status.
fn failure_message(status: ExitStatus, stderr: &str, stdout: &str) -> String {
    let stderr = stderr.trim();
    if !stderr.is_empty() {
        return stderr.to_string();
    }
    if let Some(reported) = reported_error(stdout) {
        return reported;
    }
    match status.code() {
        Some(code) => format!("Extraction process exited with status {code}"),
        None => "Extraction process was terminated by a signal".to_string(),
    }
}

fn reported_error(stdout: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(stdout.trim()).ok()?;
    value
        .get("error")
        .and_then(serde_json::Value::as_str)
        .map(str::to_string)
}

// ═══════════════════════════════════════════════════════════
// Invoker
// ═══════════════════════════════════════════════════════════

/// Owns the extraction step of a pipeline instance, including the
/// uploaded file's removal.
#[derive(Clone)]
pub struct ExtractionInvoker {
    extractor: Arc<dyn Extractor>,
}

impl ExtractionInvoker {
    pub fn new(extractor: Arc<dyn Extractor>) -> Self {
        Self { extractor }
    }

    /// Invoke the extractor, then remove the document's temp file.
    ///
    /// Removal happens before this returns, whatever the outcome. A removal
    /// failure is logged and does not change the outcome.
    pub async fn run(&self, request: ExtractionRequest) -> ExtractionOutcome {
        let (document, timeout) = request.into_parts();
        let temp_path = document.temporary_path().to_path_buf();

        let outcome = self.extractor.invoke(&temp_path, timeout).await;
        let outcome = match outcome {
            ExtractionOutcome::ProcessFailure { message } => ExtractionOutcome::ProcessFailure {
                message: summarize_diagnostic(&message, &temp_path, &document.original_name),
            },
            other => other,
        };

        let original_name = document.original_name.clone();
        if let Err(e) = document.discard() {
            tracing::warn!(
                file = %original_name,
                error = %e,
                "Failed to remove uploaded file"
            );
        }
        outcome
    }
}

/// Same treatment for failures detected after extraction, such as an
/// in-band `"success": false` report in the extractor's JSON.
pub(crate) fn summarize_failure(
    error: PipelineError,
    temp_path: &Path,
    original_name: &str,
) -> PipelineError {
    match error {
        PipelineError::ProcessFailure(message) => PipelineError::ProcessFailure(
            summarize_diagnostic(&message, temp_path, original_name),
        ),
        other => other,
    }
}

/// One line, no internal paths, bounded length.
fn summarize_diagnostic(message: &str, temp_path: &Path, original_name: &str) -> String {
    let redacted = message.replace(&*temp_path.to_string_lossy(), original_name);
    let line = redacted
        .lines()
        .map(str::trim)
        .rev()
        .find(|l| !l.is_empty())
        .unwrap_or(EXTRACTION_FAILED);
    let mut summary: String = line.chars().take(MAX_DIAGNOSTIC_CHARS).collect();
    if line.chars().count() > MAX_DIAGNOSTIC_CHARS {
        summary.push('…');
    }
    summary
}
