//! Text extraction for uploaded documents.
//!
//! Supported: PDF (`pdf-extract`), DOCX (`docx.rs`), plain text and markdown.
//! Anything else, or a file that fails to parse, is skipped with a warning so
//! one bad attachment does not sink the whole upload.

mod docx;

use axum::extract::multipart::Field;
use bytes::Bytes;
use tracing::{debug, warn};

use crate::errors::AppError;

const PDF_MIME: &str = "application/pdf";
const DOCX_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Decompressed DOCX body may be at most this many times the upload limit.
pub const DOCX_EXPANSION_FACTOR: usize = 8;

/// A file received in a multipart request.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Docx,
    PlainText,
}

impl UploadedFile {
    /// Reads a multipart file field into memory.
    pub async fn from_field(field: Field<'_>) -> Result<Self, AppError> {
        let file_name = field.file_name().unwrap_or("unnamed").to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Failed to read file '{file_name}': {e}")))?;
        Ok(Self {
            file_name,
            content_type,
            bytes,
        })
    }

    /// Detects the document kind from the declared content type, falling back to
    /// the file extension when the client sent none or a generic one.
    pub fn kind(&self) -> Option<DocumentKind> {
        let declared = self
            .content_type
            .as_deref()
            .map(|ct| ct.split(';').next().unwrap_or(ct).trim().to_ascii_lowercase())
            .filter(|ct| ct != "application/octet-stream");

        let mime = declared.or_else(|| {
            mime_guess::from_path(&self.file_name)
                .first()
                .map(|m| m.essence_str().to_string())
        })?;

        match mime.as_str() {
            PDF_MIME => Some(DocumentKind::Pdf),
            DOCX_MIME => Some(DocumentKind::Docx),
            "text/plain" | "text/markdown" | "text/x-markdown" => Some(DocumentKind::PlainText),
            _ => None,
        }
    }

    fn extract(&self, max_upload_bytes: usize) -> Option<String> {
        let kind = match self.kind() {
            Some(kind) => kind,
            None => {
                warn!(
                    "Skipping '{}': unsupported content type {:?}",
                    self.file_name, self.content_type
                );
                return None;
            }
        };

        let result = match kind {
            // pdf-extract panics on some malformed inputs instead of returning an error.
            DocumentKind::Pdf => std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                pdf_extract::extract_text_from_mem(&self.bytes)
            }))
            .map_err(|_| "PDF parser panicked".to_string())
            .and_then(|r| r.map_err(|e| e.to_string())),
            DocumentKind::Docx => docx::extract_text(
                &self.bytes,
                max_upload_bytes.saturating_mul(DOCX_EXPANSION_FACTOR),
            ),
            DocumentKind::PlainText => Ok(String::from_utf8_lossy(&self.bytes).into_owned()),
        };

        match result {
            Ok(text) => {
                debug!("Extracted {} chars from '{}'", text.len(), self.file_name);
                Some(text)
            }
            Err(e) => {
                warn!("Skipping '{}': failed to extract text: {e}", self.file_name);
                None
            }
        }
    }
}

/// Concatenates the text of every file that could be read. CPU-bound.
pub fn extract_text(files: &[UploadedFile], max_upload_bytes: usize) -> String {
    files
        .iter()
        .filter_map(|f| f.extract(max_upload_bytes))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Runs `extract_text` on the blocking pool so PDF parsing never stalls the runtime.
pub async fn extract_text_blocking(
    files: Vec<UploadedFile>,
    max_upload_bytes: usize,
) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || extract_text(&files, max_upload_bytes))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Text extraction task failed: {e}")))
}
