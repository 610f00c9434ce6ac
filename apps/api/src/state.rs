use std::sync::Arc;

use crate::config::Config;
use crate::knowledge::archive::SourceArchive;
use crate::knowledge::embedder::Embedder;
use crate::knowledge::KnowledgeBaseHandle;
use crate::llm_client::agent::StageAgent;
use crate::llm_client::credentials::ApiKeyHandle;
use crate::reports::ReportStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Model credential; set at startup or through POST /configure.
    pub api_key: ApiKeyHandle,
    pub agent: Arc<dyn StageAgent>,
    pub embedder: Arc<dyn Embedder>,
    pub knowledge: KnowledgeBaseHandle,
    pub reports: Arc<dyn ReportStore>,
    /// Present only when S3 is configured.
    pub archive: Option<Arc<dyn SourceArchive>>,
}
