mod analysis;
mod config;
mod db;
mod documents;
mod errors;
mod knowledge;
mod llm_client;
mod models;
mod reports;
mod routes;
mod state;
#[cfg(test)]
mod test_support;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::knowledge::archive::{S3Archive, SourceArchive};
use crate::knowledge::embedder::{Embedder, HashingEmbedder, VoyageEmbedder};
use crate::knowledge::KnowledgeBaseHandle;
use crate::llm_client::credentials::ApiKeyHandle;
use crate::llm_client::LlmClient;
use crate::reports::store::PgReportStore;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Compass API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;
    let reports = Arc::new(PgReportStore::new(db));

    // Model credential and client
    let api_key = ApiKeyHandle::new(config.anthropic_api_key.clone());
    if !api_key.is_configured() {
        info!("No ANTHROPIC_API_KEY set; waiting for POST /configure");
    }
    let agent = Arc::new(LlmClient::new(
        config.anthropic_api_url.clone(),
        api_key.clone(),
    ));
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    // Embeddings: Voyage when a key is present, local hashing otherwise
    let embedder: Arc<dyn Embedder> = match &config.voyage_api_key {
        Some(key) => Arc::new(VoyageEmbedder::new(key.clone())),
        None => Arc::new(HashingEmbedder::default()),
    };
    info!("Embedder initialized ({})", embedder.name());

    // Optional S3 / MinIO archive of knowledge base sources
    let archive: Option<Arc<dyn SourceArchive>> = match &config.s3 {
        Some(s3) => {
            info!("S3 archive enabled (bucket: {})", s3.bucket);
            Some(Arc::new(S3Archive::connect(s3).await))
        }
        None => None,
    };

    let state = AppState {
        config: config.clone(),
        api_key,
        agent,
        embedder,
        knowledge: KnowledgeBaseHandle::new(),
        reports,
        archive,
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
