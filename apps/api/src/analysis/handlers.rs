use std::sync::Arc;

use axum::extract::{Multipart, State};
use axum::Json;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::analysis::models::{CandidateSubmission, Penalties};
use crate::analysis::pipeline::{persist_report, run_pipeline};
use crate::analysis::tools::KnowledgeBaseSearchTool;
use crate::documents::{extract_text_blocking, UploadedFile};
use crate::errors::AppError;
use crate::llm_client::tools::Tool;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub report: String,
    pub report_id: Uuid,
    pub score: i32,
}

/// Raw multipart fields of an analysis request, before validation.
#[derive(Default)]
struct AnalyzeForm {
    candidate_name: Option<String>,
    written_submissions: String,
    critical_penalty: Option<String>,
    minor_penalty: Option<String>,
    files: Vec<UploadedFile>,
}

impl AnalyzeForm {
    async fn read(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = Self::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::Validation(format!("Malformed multipart body: {e}")))?
        {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "candidate_files" => {
                    let file = UploadedFile::from_field(field).await?;
                    if !file.bytes.is_empty() {
                        form.files.push(file);
                    }
                }
                "candidate_name" => form.candidate_name = Some(read_text(field).await?),
                "candidate_written_submissions" => {
                    form.written_submissions = read_text(field).await?
                }
                "critical_penalty" => form.critical_penalty = Some(read_text(field).await?),
                "minor_penalty" => form.minor_penalty = Some(read_text(field).await?),
                _ => {}
            }
        }
        Ok(form)
    }
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> Result<String, AppError> {
    let name = field.name().unwrap_or_default().to_string();
    field
        .text()
        .await
        .map_err(|e| AppError::Validation(format!("Failed to read field '{name}': {e}")))
}

fn parse_penalty(field: &str, raw: Option<&str>) -> Result<u32, AppError> {
    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::Validation(format!("Field '{field}' is required.")))?;
    raw.parse::<u32>().map_err(|_| {
        AppError::Validation(format!(
            "Field '{field}' must be a non-negative integer, got '{raw}'."
        ))
    })
}

/// POST /analyze
pub async fn handle_analyze(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<AnalyzeResponse>, AppError> {
    let form = AnalyzeForm::read(multipart).await?;

    let name = form
        .candidate_name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| AppError::Validation("Field 'candidate_name' is required.".to_string()))?
        .to_string();
    let penalties = Penalties {
        critical: parse_penalty("critical_penalty", form.critical_penalty.as_deref())?,
        minor: parse_penalty("minor_penalty", form.minor_penalty.as_deref())?,
    };

    if !state.api_key.is_configured() {
        return Err(AppError::Configuration(
            "API Key not configured.".to_string(),
        ));
    }
    let knowledge_base = state.knowledge.current().await?;

    let uploaded_text = if form.files.is_empty() {
        String::new()
    } else {
        extract_text_blocking(form.files, state.config.max_upload_bytes).await?
    };
    let text = format!("{}\n{}", form.written_submissions, uploaded_text);
    if text.trim().is_empty() {
        return Err(AppError::Validation(
            "No candidate text provided.".to_string(),
        ));
    }

    let submission = CandidateSubmission {
        name,
        text,
        penalties,
    };
    info!(
        "Analyzing '{}' ({} chars) against knowledge base {}",
        submission.name,
        submission.text.len(),
        knowledge_base.id
    );

    let search: Arc<dyn Tool> = Arc::new(KnowledgeBaseSearchTool::new(
        knowledge_base,
        state.embedder.clone(),
        state.config.search_top_k,
    ));
    let agent = state.agent.clone();
    let reports = state.reports.clone();
    let timeout = state.config.analysis_timeout;

    // The run gets its own task; the pipeline is bounded by the timeout, persistence is not.
    let run = tokio::spawn(async move {
        let outcome = tokio::time::timeout(
            timeout,
            run_pipeline(agent.as_ref(), search, &submission),
        )
        .await
        .map_err(|_| AppError::Timeout(format!("no result after {}s", timeout.as_secs())))??;
        let report_id = persist_report(reports.as_ref(), &submission, &outcome).await?;
        Ok::<_, AppError>((report_id, outcome))
    });

    let (report_id, outcome) = run
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Analysis task failed: {e}")))??;
    match outcome.tally {
        Some(tally) => info!(
            "Report {report_id} saved: score {} ({} critical, {} minor conflicts)",
            outcome.score, tally.critical, tally.minor
        ),
        None => info!("Report {report_id} saved: score {}", outcome.score),
    }

    Ok(Json(AnalyzeResponse {
        report: outcome.report_markdown,
        report_id,
        score: outcome.score,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_penalty_accepts_non_negative_integers() {
        assert_eq!(parse_penalty("critical_penalty", Some(" 10 ")).unwrap(), 10);
        assert_eq!(parse_penalty("minor_penalty", Some("0")).unwrap(), 0);
    }

    #[test]
    fn test_parse_penalty_rejects_bad_input() {
        for raw in [None, Some(""), Some("-5"), Some("2.5"), Some("ten")] {
            let err = parse_penalty("critical_penalty", raw).unwrap_err();
            assert!(matches!(err, AppError::Validation(_)), "{raw:?}");
        }
    }
}
