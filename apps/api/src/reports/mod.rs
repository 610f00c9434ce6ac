// Persistence of finished analysis reports and the history index.

pub mod handlers;
pub mod store;

use async_trait::async_trait;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::report::{HistoryEntry, NewReport, Report};

#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Inserts a finished report and returns its new id.
    async fn insert(&self, report: NewReport) -> Result<Uuid, AppError>;

    /// All reports, newest first. Records that cannot be decoded are skipped.
    async fn list_summaries(&self) -> Result<Vec<HistoryEntry>, AppError>;

    async fn get(&self, id: Uuid) -> Result<Option<Report>, AppError>;
}
