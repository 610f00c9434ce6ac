use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

pub const UNKNOWN_CANDIDATE: &str = "Unknown";
pub const LEGACY_REPORT_PLACEHOLDER: &str =
    "Report content is not available for this legacy entry.";

/// A stored report as read back from the store.
///
/// Every field except the id is optional so records written by older versions
/// still decode; the defaults are applied when projecting.
#[derive(Debug, Clone, Deserialize)]
pub struct ReportDocument {
    #[serde(alias = "_id")]
    pub id: Uuid,
    #[serde(default)]
    pub candidate_name: Option<String>,
    #[serde(default)]
    pub score: Option<i32>,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub full_report: Option<String>,
}

impl ReportDocument {
    pub fn into_summary(self, now: DateTime<Utc>) -> HistoryEntry {
        HistoryEntry {
            id: self.id,
            candidate_name: self
                .candidate_name
                .unwrap_or_else(|| UNKNOWN_CANDIDATE.to_string()),
            score: self.score.unwrap_or(0),
            date: self.date.unwrap_or(now),
        }
    }

    pub fn into_report(self, now: DateTime<Utc>) -> Report {
        Report {
            id: self.id,
            candidate_name: self
                .candidate_name
                .unwrap_or_else(|| UNKNOWN_CANDIDATE.to_string()),
            score: self.score.unwrap_or(0),
            date: self.date.unwrap_or(now),
            full_report: self
                .full_report
                .unwrap_or_else(|| LEGACY_REPORT_PLACEHOLDER.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: Uuid,
    pub candidate_name: String,
    pub score: i32,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub id: Uuid,
    pub candidate_name: String,
    pub score: i32,
    pub date: DateTime<Utc>,
    pub full_report: String,
}

/// A report about to be inserted. The store assigns the id.
#[derive(Debug, Clone)]
pub struct NewReport {
    pub candidate_name: String,
    pub score: i32,
    pub date: DateTime<Utc>,
    pub full_report: String,
}

/// Decodes raw documents into history entries, skipping any that cannot be read.
pub fn decode_summaries(documents: Vec<Value>) -> Vec<HistoryEntry> {
    let now = Utc::now();
    documents
        .into_iter()
        .filter_map(|doc| match serde_json::from_value::<ReportDocument>(doc) {
            Ok(report) => Some(report.into_summary(now)),
            Err(e) => {
                warn!("Skipping malformed history entry: {e}");
                None
            }
        })
        .collect()
}
