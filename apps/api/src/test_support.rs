//! Fakes and helpers shared by unit and router tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request};
use axum::response::Response;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::config::Config;
use crate::errors::AppError;
use crate::knowledge::archive::SourceArchive;
use crate::knowledge::embedder::HashingEmbedder;
use crate::knowledge::KnowledgeBaseHandle;
use crate::llm_client::agent::{StageAgent, StageRequest};
use crate::llm_client::credentials::ApiKeyHandle;
use crate::llm_client::tools::{Tool, ToolError};
use crate::llm_client::LlmError;
use crate::models::report::{decode_summaries, HistoryEntry, NewReport, Report, ReportDocument};
use crate::reports::ReportStore;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Stage agent
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub role: &'static str,
    pub instructions: String,
    pub context: Vec<String>,
    pub tool_names: Vec<String>,
}

/// Replies to stage calls from a fixed script, in order, and records each request.
#[derive(Default)]
pub struct ScriptedAgent {
    responses: Mutex<VecDeque<Result<String, LlmError>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedAgent {
    pub fn new(responses: Vec<Result<String, LlmError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            calls: Mutex::default(),
        }
    }

    pub fn replying(outputs: &[&str]) -> Self {
        Self::new(outputs.iter().map(|o| Ok(o.to_string())).collect())
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl StageAgent for ScriptedAgent {
    async fn run(&self, request: StageRequest) -> Result<String, LlmError> {
        self.calls.lock().unwrap().push(RecordedCall {
            role: request.role.name,
            instructions: request.instructions.clone(),
            context: request.context.iter().map(|c| c.text.clone()).collect(),
            tool_names: request.tools.iter().map(|t| t.name().to_string()).collect(),
        });
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(LlmError::Api {
                    status: 500,
                    message: "script exhausted".to_string(),
                })
            })
    }
}

/// Sleeps for `delay` on every stage call, then answers with empty JSON.
pub struct SlowAgent {
    pub delay: std::time::Duration,
}

#[async_trait]
impl StageAgent for SlowAgent {
    async fn run(&self, _request: StageRequest) -> Result<String, LlmError> {
        tokio::time::sleep(self.delay).await;
        Ok("{}".to_string())
    }
}

/// A tool that always answers with the same text.
pub struct StaticTool {
    name: &'static str,
    reply: &'static str,
}

impl StaticTool {
    pub fn new(name: &'static str, reply: &'static str) -> Self {
        Self { name, reply }
    }
}

#[async_trait]
impl Tool for StaticTool {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        "static test tool"
    }

    fn input_schema(&self) -> Value {
        json!({"type": "object", "properties": {}})
    }

    async fn invoke(&self, _input: &Value) -> Result<String, ToolError> {
        Ok(self.reply.to_string())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Report store
// ────────────────────────────────────────────────────────────────────────────

/// Keeps reports as raw JSON documents so tests can seed legacy or corrupt records.
#[derive(Default)]
pub struct InMemoryReportStore {
    documents: Mutex<Vec<Value>>,
    accesses: AtomicUsize,
}

impl InMemoryReportStore {
    pub fn with_documents(documents: Vec<Value>) -> Self {
        Self {
            documents: Mutex::new(documents),
            accesses: AtomicUsize::new(0),
        }
    }

    pub fn len(&self) -> usize {
        self.documents.lock().unwrap().len()
    }

    /// Number of store operations performed so far.
    pub fn accesses(&self) -> usize {
        self.accesses.load(Ordering::SeqCst)
    }

    fn touch(&self) {
        self.accesses.fetch_add(1, Ordering::SeqCst);
    }
}

fn document_date(doc: &Value) -> Option<DateTime<Utc>> {
    doc.get("date")
        .and_then(Value::as_str)
        .and_then(|d| DateTime::parse_from_rfc3339(d).ok())
        .map(|d| d.with_timezone(&Utc))
}

#[async_trait]
impl ReportStore for InMemoryReportStore {
    async fn insert(&self, report: NewReport) -> Result<Uuid, AppError> {
        self.touch();
        let id = Uuid::new_v4();
        self.documents.lock().unwrap().push(json!({
            "id": id,
            "candidate_name": report.candidate_name,
            "score": report.score,
            "date": report.date,
            "full_report": report.full_report,
        }));
        Ok(id)
    }

    async fn list_summaries(&self) -> Result<Vec<HistoryEntry>, AppError> {
        self.touch();
        let mut documents = self.documents.lock().unwrap().clone();
        // Newest first, undated last.
        documents.sort_by_key(|doc| std::cmp::Reverse(document_date(doc)));
        Ok(decode_summaries(documents))
    }

    async fn get(&self, id: Uuid) -> Result<Option<Report>, AppError> {
        self.touch();
        let documents = self.documents.lock().unwrap().clone();
        Ok(documents
            .into_iter()
            .filter_map(|doc| serde_json::from_value::<ReportDocument>(doc).ok())
            .find(|doc| doc.id == id)
            .map(|doc| doc.into_report(Utc::now())))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Archive
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingArchive {
    stored: Mutex<Vec<(Uuid, String)>>,
}

impl RecordingArchive {
    pub fn stored(&self) -> Vec<(Uuid, String)> {
        self.stored.lock().unwrap().clone()
    }
}

#[async_trait]
impl SourceArchive for RecordingArchive {
    async fn store(&self, build_id: Uuid, text: &str) -> anyhow::Result<String> {
        self.stored
            .lock()
            .unwrap()
            .push((build_id, text.to_string()));
        Ok(crate::knowledge::archive::archive_key(build_id))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Router helpers
// ────────────────────────────────────────────────────────────────────────────

/// App state with a configured credential, an empty knowledge base and no archive.
pub fn test_state(agent: Arc<ScriptedAgent>, reports: Arc<InMemoryReportStore>) -> AppState {
    AppState {
        config: Config::for_tests(),
        api_key: ApiKeyHandle::new(Some("test-key".to_string())),
        agent,
        embedder: Arc::new(HashingEmbedder::default()),
        knowledge: KnowledgeBaseHandle::new(),
        reports,
        archive: None,
    }
}

pub enum Part<'a> {
    Text(&'a str, &'a str),
    File {
        field: &'a str,
        file_name: &'a str,
        content_type: &'a str,
        body: &'a [u8],
    },
}

const BOUNDARY: &str = "compass-test-boundary";

pub fn multipart_request(uri: &str, parts: &[Part<'_>]) -> Request<Body> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File {
                field,
                file_name,
                content_type,
                body: bytes,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\n\
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

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

pub async fn body_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
