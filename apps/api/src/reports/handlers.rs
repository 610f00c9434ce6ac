use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::report::{HistoryEntry, Report};
use crate::state::AppState;

/// GET /history
pub async fn handle_history(
    State(state): State<AppState>,
) -> Result<Json<Vec<HistoryEntry>>, AppError> {
    let entries = state.reports.list_summaries().await?;
    Ok(Json(entries))
}

/// GET /report/:id
///
/// The id is taken as a raw string so a malformed one is rejected here, before
/// the store is touched.
pub async fn handle_get_report(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<Report>, AppError> {
    let id = Uuid::parse_str(raw_id.trim())
        .map_err(|_| AppError::Validation("Invalid report ID format.".to_string()))?;

    let report = state
        .reports
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Report not found.".to_string()))?;
    Ok(Json(report))
}
