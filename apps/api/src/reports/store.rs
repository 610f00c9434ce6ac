use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::report::{decode_summaries, HistoryEntry, NewReport, Report, ReportDocument};
use crate::reports::ReportStore;

/// PostgreSQL-backed report store.
///
/// Reads go through `to_jsonb` so each row is decoded independently and a
/// single malformed legacy row cannot fail the whole listing.
#[derive(Clone)]
pub struct PgReportStore {
    db: PgPool,
}

impl PgReportStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ReportStore for PgReportStore {
    async fn insert(&self, report: NewReport) -> Result<Uuid, AppError> {
        let id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO reports (id, candidate_name, score, date, full_report)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(id)
        .bind(&report.candidate_name)
        .bind(report.score)
        .bind(report.date)
        .bind(&report.full_report)
        .execute(&self.db)
        .await?;

        info!("Saved report {id} for '{}'", report.candidate_name);
        Ok(id)
    }

    async fn list_summaries(&self) -> Result<Vec<HistoryEntry>, AppError> {
        let documents: Vec<Value> = sqlx::query_scalar(
            "SELECT to_jsonb(r) FROM reports r ORDER BY r.date DESC NULLS LAST",
        )
        .fetch_all(&self.db)
        .await?;

        Ok(decode_summaries(documents))
    }

    async fn get(&self, id: Uuid) -> Result<Option<Report>, AppError> {
        let document: Option<Value> =
            sqlx::query_scalar("SELECT to_jsonb(r) FROM reports r WHERE r.id = $1")
                .bind(id)
                .fetch_optional(&self.db)
                .await?;

        document
            .map(|doc| {
                serde_json::from_value::<ReportDocument>(doc)
                    .map(|d| d.into_report(Utc::now()))
                    .map_err(|e| AppError::Internal(anyhow::anyhow!("Corrupt report {id}: {e}")))
            })
            .transpose()
    }
}
