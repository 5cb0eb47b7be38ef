//! Upload receiver: multipart request → `UploadedDocument` in the upload dir.
//!
//! Type detection trusts magic bytes over the declared Content-Type; the
//! declared type is only consulted when the bytes are not recognized.

use std::io::Write;
use std::path::{Path, PathBuf};

use axum::extract::multipart::{Field, Multipart, MultipartError};

use super::error::{
    PipelineError, EMPTY_FILE, FILE_TOO_LARGE, NO_FILE_UPLOADED, PDF_REQUIRED, UNSUPPORTED_TYPE,
    UPLOAD_FAILED,
};
use super::types::UploadedDocument;

const OCTET_STREAM: &str = "application/octet-stream";
const PDF: &str = "application/pdf";

/// Which file types an endpoint accepts when validation is enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeRule {
    ImageOrPdf,
    PdfOnly,
}

/// Upload limits and destination, derived from `ServiceConfig`.
#[derive(Debug, Clone)]
pub struct UploadPolicy {
    pub upload_dir: PathBuf,
    pub max_file_bytes: u64,
    /// When false, any file type is accepted (lenient deployment).
    pub strict_types: bool,
}

// ═══════════════════════════════════════════════════════════
// Receiving
// ═══════════════════════════════════════════════════════════

/// Receive the first `field_name` file from a multipart body.
///
/// Other fields are skipped. A missing field is "No file uploaded"; a
/// malformed body is "File upload error".
pub async fn receive_single(
    multipart: &mut Multipart,
    field_name: &str,
    rule: TypeRule,
    policy: &UploadPolicy,
) -> Result<UploadedDocument, PipelineError> {
    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        if field.name() == Some(field_name) {
            return receive_field(field, rule, policy).await;
        }
    }
    Err(PipelineError::validation(NO_FILE_UPLOADED))
}

/// Receive every `field_name` file from a multipart body, in order.
///
/// Per-file validation failures are kept at their index so the batch can
/// report them without affecting siblings. The outer error covers the
/// request as a whole: malformed body or zero files.
pub async fn receive_many(
    multipart: &mut Multipart,
    field_name: &str,
    rule: TypeRule,
    policy: &UploadPolicy,
) -> Result<Vec<Result<UploadedDocument, PipelineError>>, PipelineError> {
    let mut received = Vec::new();
    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        if field.name() != Some(field_name) {
            continue;
        }
        let outcome = receive_field(field, rule, policy).await;
        if let Err(PipelineError::Validation(message)) = &outcome {
            if message == UPLOAD_FAILED {
                return Err(PipelineError::validation(UPLOAD_FAILED));
            }
        }
        received.push(outcome);
    }

    if received.is_empty() {
        return Err(PipelineError::validation(NO_FILE_UPLOADED));
    }
    Ok(received)
}

async fn receive_field(
    mut field: Field<'_>,
    rule: TypeRule,
    policy: &UploadPolicy,
) -> Result<UploadedDocument, PipelineError> {
    let original_name = sanitize_filename(field.file_name().unwrap_or("document"));
    let declared_type = field.content_type().map(str::to_string);

    let mut bytes = Vec::new();
    while let Some(chunk) = field.chunk().await.map_err(malformed)? {
        if (bytes.len() + chunk.len()) as u64 > policy.max_file_bytes {
            tracing::info!(
                file = %original_name,
                limit = policy.max_file_bytes,
                "Upload rejected: file too large"
            );
            return Err(PipelineError::validation(FILE_TOO_LARGE));
        }
        bytes.extend_from_slice(&chunk);
    }

    materialize(policy, rule, original_name, declared_type.as_deref(), bytes).await
}

fn malformed(err: MultipartError) -> PipelineError {
    tracing::warn!(error = %err, "Malformed multipart upload");
    PipelineError::validation(UPLOAD_FAILED)
}

// ═══════════════════════════════════════════════════════════
// Validation + staging
// ═══════════════════════════════════════════════════════════

/// Validate the bytes and write them to a uniquely named temp file.
pub async fn materialize(
    policy: &UploadPolicy,
    rule: TypeRule,
    original_name: String,
    declared_type: Option<&str>,
    bytes: Vec<u8>,
) -> Result<UploadedDocument, PipelineError> {
    if bytes.is_empty() {
        return Err(PipelineError::validation(EMPTY_FILE));
    }

    let mime_type = resolve_mime(&bytes, declared_type);
    check_type(&mime_type, rule, policy.strict_types)?;

    let size_bytes = bytes.len() as u64;
    let suffix = format!(".{}", extension_for(&mime_type));
    let dir = policy.upload_dir.clone();

    let temp_path = tokio::task::spawn_blocking(move || write_temp(&dir, &suffix, &bytes))
        .await
        .map_err(|e| PipelineError::Unexpected(format!("staging task failed: {e}")))?
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to stage upload");
            PipelineError::Unexpected(format!("staging write failed: {e}"))
        })?;

    tracing::info!(
        file = %original_name,
        mime = %mime_type,
        size = size_bytes,
        "Upload staged"
    );

    Ok(UploadedDocument::new(
        temp_path,
        original_name,
        mime_type,
        size_bytes,
    ))
}

fn write_temp(dir: &Path, suffix: &str, bytes: &[u8]) -> std::io::Result<tempfile::TempPath> {
    let mut file = tempfile::Builder::new()
        .prefix("upload-")
        .suffix(suffix)
        .tempfile_in(dir)?;
    file.write_all(bytes)?;
    file.flush()?;
    Ok(file.into_temp_path())
}

fn check_type(mime_type: &str, rule: TypeRule, strict: bool) -> Result<(), PipelineError> {
    if !strict {
        return Ok(());
    }
    match rule {
        TypeRule::ImageOrPdf if mime_type == PDF || mime_type.starts_with("image/") => Ok(()),
        TypeRule::ImageOrPdf => Err(PipelineError::validation(UNSUPPORTED_TYPE)),
        TypeRule::PdfOnly if mime_type == PDF => Ok(()),
        TypeRule::PdfOnly => Err(PipelineError::validation(PDF_REQUIRED)),
    }
}

/// Magic-byte type, falling back to the declared Content-Type.
pub fn resolve_mime(bytes: &[u8], declared_type: Option<&str>) -> String {
    let detected = detect_mime_from_bytes(bytes);
    if detected != OCTET_STREAM {
        return detected.to_string();
    }
    declared_type
        .and_then(|t| t.split(';').next())
        .map(|t| t.trim().to_ascii_lowercase())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| OCTET_STREAM.to_string())
}

/// Detect MIME type from file magic bytes.
pub fn detect_mime_from_bytes(bytes: &[u8]) -> &'static str {
    if bytes.len() < 4 {
        return OCTET_STREAM;
    }

    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return "image/jpeg";
    }
    if bytes.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
        return "image/png";
    }
    if bytes.starts_with(b"%PDF") {
        return PDF;
    }
    if bytes.starts_with(b"GIF8") {
        return "image/gif";
    }
    if bytes.starts_with(b"II*\0") || bytes.starts_with(b"MM\0*") {
        return "image/tiff";
    }
    if bytes.len() >= 12 && bytes[..4] == *b"RIFF" && bytes[8..12] == *b"WEBP" {
        return "image/webp";
    }
    // HEIF/HEIC: ....ftyp at offset 4
    if bytes.len() >= 12 && bytes[4..8] == *b"ftyp" {
        let brand = &bytes[8..12];
        if brand == b"heic" || brand == b"heix" || brand == b"mif1" {
            return "image/heic";
        }
    }
    // BMP last: "BM" is only two bytes and collides easily.
    if bytes.starts_with(b"BM") && bytes.len() >= 14 {
        return "image/bmp";
    }

    OCTET_STREAM
}

fn extension_for(mime_type: &str) -> &'static str {
    match mime_type {
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/tiff" => "tiff",
        "image/webp" => "webp",
        "image/heic" => "heic",
        "image/bmp" => "bmp",
        PDF => "pdf",
        _ => "bin",
    }
}

/// Sanitize a filename: removes path traversal and special characters.
pub fn sanitize_filename(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .filter(|&c| c != '/' && c != '\\' && !c.is_control())
        .map(|c| {
            if c.is_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    let sanitized = sanitized.replace("..", "");
    let sanitized: String = sanitized.chars().take(100).collect();

    if sanitized.is_empty() {
        "document".into()
    } else {
        sanitized
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{multipart_request, Part};
    use axum::extract::FromRequest;

    fn policy(dir: &Path) -> UploadPolicy {
        UploadPolicy {
            upload_dir: dir.to_path_buf(),
            max_file_bytes: 1024,
            strict_types: true,
        }
    }

    async fn multipart(parts: &[Part<'_>]) -> Multipart {
        Multipart::from_request(multipart_request("/", parts), &())
            .await
            .unwrap()
    }

    fn dir_entries(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    // -- MIME detection -------------------------------------------------------

    #[test]
    fn detect_common_formats() {
        assert_eq!(detect_mime_from_bytes(&[0xFF, 0xD8, 0xFF, 0xE0]), "image/jpeg");
        assert_eq!(detect_mime_from_bytes(&[0x89, 0x50, 0x4E, 0x47, 0x0D]), "image/png");
        assert_eq!(detect_mime_from_bytes(b"%PDF-1.7\n"), "application/pdf");
        assert_eq!(detect_mime_from_bytes(b"GIF89a"), "image/gif");
        assert_eq!(detect_mime_from_bytes(b"II*\0rest"), "image/tiff");
    }

    #[test]
    fn detect_heic_brand() {
        let mut bytes = vec![0u8; 12];
        bytes[4..8].copy_from_slice(b"ftyp");
        bytes[8..12].copy_from_slice(b"heic");
        assert_eq!(detect_mime_from_bytes(&bytes), "image/heic");
    }

    #[test]
    fn detect_too_short_is_octet_stream() {
        assert_eq!(detect_mime_from_bytes(&[0xFF]), OCTET_STREAM);
        assert_eq!(detect_mime_from_bytes(&[]), OCTET_STREAM);
    }

    #[test]
    fn declared_type_used_only_for_unknown_bytes() {
        assert_eq!(
            resolve_mime(b"plain text body", Some("image/x-custom; q=1")),
            "image/x-custom"
        );
        assert_eq!(resolve_mime(b"%PDF-1.4", Some("text/plain")), PDF);
        assert_eq!(resolve_mime(b"plain text body", None), OCTET_STREAM);
    }

    // -- Type rules -----------------------------------------------------------

    #[test]
    fn strict_rules() {
        assert!(check_type("image/png", TypeRule::ImageOrPdf, true).is_ok());
        assert!(check_type(PDF, TypeRule::ImageOrPdf, true).is_ok());
        assert_eq!(
            check_type("text/plain", TypeRule::ImageOrPdf, true),
            Err(PipelineError::validation(UNSUPPORTED_TYPE))
        );
        assert_eq!(
            check_type("image/png", TypeRule::PdfOnly, true),
            Err(PipelineError::validation(PDF_REQUIRED))
        );
    }

    #[test]
    fn lenient_accepts_anything() {
        assert!(check_type("text/plain", TypeRule::ImageOrPdf, false).is_ok());
        assert!(check_type(OCTET_STREAM, TypeRule::PdfOnly, false).is_ok());
    }

    // -- Filename sanitization ------------------------------------------------

    #[test]
    fn sanitize_path_traversal() {
        let result = sanitize_filename("../../../etc/passwd");
        assert!(!result.contains(".."));
        assert!(!result.contains('/'));
    }

    #[test]
    fn sanitize_special_chars_and_empty() {
        assert_eq!(sanitize_filename("my card (1).jpg"), "my_card__1_.jpg");
        assert_eq!(sanitize_filename(""), "document");
        assert_eq!(sanitize_filename("file\0name.pdf"), "filename.pdf");
        assert!(sanitize_filename(&"a".repeat(300)).len() <= 100);
    }

    // -- Staging --------------------------------------------------------------

    #[tokio::test]
    async fn materialize_writes_unique_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let policy = policy(dir.path());

        let a = materialize(&policy, TypeRule::ImageOrPdf, "a.pdf".into(), None, b"%PDF-1.4 a".to_vec())
            .await
            .unwrap();
        let b = materialize(&policy, TypeRule::ImageOrPdf, "a.pdf".into(), None, b"%PDF-1.4 b".to_vec())
            .await
            .unwrap();

        assert_ne!(a.temporary_path(), b.temporary_path());
        assert!(a.temporary_path().starts_with(dir.path()));
        assert_eq!(a.temporary_path().extension().unwrap(), "pdf");
        assert_eq!(std::fs::read(a.temporary_path()).unwrap(), b"%PDF-1.4 a");
        assert_eq!(a.size_bytes, 10);
        assert_eq!(a.mime_type, PDF);
    }

    #[tokio::test]
    async fn materialize_rejects_empty_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let err = materialize(&policy(dir.path()), TypeRule::ImageOrPdf, "x".into(), None, Vec::new())
            .await
            .unwrap_err();
        assert_eq!(err, PipelineError::validation(EMPTY_FILE));
        assert_eq!(dir_entries(dir.path()), 0);
    }

    #[tokio::test]
    async fn materialize_into_missing_dir_is_unexpected() {
        let dir = tempfile::tempdir().unwrap();
        let policy = policy(&dir.path().join("gone"));
        let err = materialize(&policy, TypeRule::ImageOrPdf, "x.pdf".into(), None, b"%PDF-1".to_vec())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Unexpected(_)));
    }

    // -- Multipart ------------------------------------------------------------

    #[tokio::test]
    async fn receive_single_finds_named_field() {
        let dir = tempfile::tempdir().unwrap();
        let mut mp = multipart(&[
            Part::text("note", "ignored"),
            Part::file("file", "card.png", "image/png", &[0x89, 0x50, 0x4E, 0x47, 1, 2]),
        ])
        .await;

        let doc = receive_single(&mut mp, "file", TypeRule::ImageOrPdf, &policy(dir.path()))
            .await
            .unwrap();
        assert_eq!(doc.original_name, "card.png");
        assert_eq!(doc.mime_type, "image/png");
        assert_eq!(dir_entries(dir.path()), 1);
    }

    #[tokio::test]
    async fn receive_single_without_file_field() {
        let dir = tempfile::tempdir().unwrap();
        let mut mp = multipart(&[Part::text("note", "hello")]).await;

        let err = receive_single(&mut mp, "file", TypeRule::ImageOrPdf, &policy(dir.path()))
            .await
            .unwrap_err();
        assert_eq!(err.public_message(), "No file uploaded");
    }

    #[tokio::test]
    async fn receive_single_rejects_oversized_file() {
        let dir = tempfile::tempdir().unwrap();
        let big = vec![b'%'; 2048];
        let mut mp = multipart(&[Part::file("file", "big.pdf", PDF, &big)]).await;

        let err = receive_single(&mut mp, "file", TypeRule::ImageOrPdf, &policy(dir.path()))
            .await
            .unwrap_err();
        assert_eq!(err, PipelineError::validation(FILE_TOO_LARGE));
        assert_eq!(dir_entries(dir.path()), 0);
    }

    #[tokio::test]
    async fn receive_many_keeps_per_file_failures_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let mut mp = multipart(&[
            Part::file("file", "p1.pdf", PDF, b"%PDF-1.4 one"),
            Part::file("file", "notes.txt", "text/plain", b"just words"),
            Part::file("file", "p3.jpg", "image/jpeg", &[0xFF, 0xD8, 0xFF, 0xE0, 9]),
        ])
        .await;

        let received = receive_many(&mut mp, "file", TypeRule::ImageOrPdf, &policy(dir.path()))
            .await
            .unwrap();
        assert_eq!(received.len(), 3);
        assert!(received[0].is_ok());
        assert_eq!(
            received[1].as_ref().unwrap_err(),
            &PipelineError::validation(UNSUPPORTED_TYPE)
        );
        assert!(received[2].is_ok());
    }

    #[tokio::test]
    async fn receive_many_requires_at_least_one_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut mp = multipart(&[Part::text("pin", "123456")]).await;

        let err = receive_many(&mut mp, "file", TypeRule::ImageOrPdf, &policy(dir.path()))
            .await
            .unwrap_err();
        assert_eq!(err.public_message(), "No file uploaded");
    }
}
