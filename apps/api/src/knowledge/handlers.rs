use axum::extract::{Multipart, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::documents::{extract_text_blocking, UploadedFile};
use crate::errors::AppError;
use crate::knowledge::splitter::TextSplitter;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: &'static str,
    pub file_names: Vec<String>,
    pub chunk_count: usize,
    pub knowledge_base_id: Uuid,
    pub built_at: DateTime<Utc>,
}

/// POST /upload
///
/// Extracts text from every `files` field, chunks it and replaces the current
/// knowledge base with one built from those chunks.
pub async fn handle_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let mut files = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed multipart body: {e}")))?
    {
        if field.name() == Some("files") {
            files.push(UploadedFile::from_field(field).await?);
        }
    }

    let file_names: Vec<String> = files.iter().map(|f| f.file_name.clone()).collect();
    let text = extract_text_blocking(files, state.config.max_upload_bytes).await?;
    if text.trim().is_empty() {
        return Err(AppError::Validation(
            "No text could be extracted from the uploaded files.".to_string(),
        ));
    }

    let chunks = TextSplitter::new(state.config.chunk_size, state.config.chunk_overlap).split(&text);
    info!(
        "Building knowledge base from {} files: {} chars, {} chunks",
        file_names.len(),
        text.len(),
        chunks.len()
    );

    let base = state
        .knowledge
        .rebuild(chunks, state.embedder.as_ref())
        .await?;

    if let Some(archive) = &state.archive {
        if let Err(e) = archive.store(base.id, &text).await {
            warn!("Failed to archive knowledge base source {}: {e}", base.id);
        }
    }

    Ok(Json(UploadResponse {
        message: "Knowledge base processed and ready.",
        file_names,
        chunk_count: base.len(),
        knowledge_base_id: base.id,
        built_at: base.built_at,
    }))
}
