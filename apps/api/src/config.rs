use std::time::Duration;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub rust_log: String,
    /// Seeds the model credential at startup. `POST /configure` can replace it later.
    pub anthropic_api_key: Option<String>,
    pub anthropic_api_url: String,
    /// When set, chunks are embedded remotely instead of with the local hashing embedder.
    pub voyage_api_key: Option<String>,
    pub analysis_timeout: Duration,
    pub max_upload_bytes: usize,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub search_top_k: usize,
    pub s3: Option<S3Config>,
}

/// Knowledge-base source archive. Only enabled when every field is present.
#[derive(Debug, Clone)]
pub struct S3Config {
    pub bucket: String,
    pub endpoint: String,
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let chunk_size = parse_env("CHUNK_SIZE", 1000usize)?;
        let chunk_overlap = parse_env("CHUNK_OVERLAP", 200usize)?;
        if chunk_overlap >= chunk_size {
            anyhow::bail!("CHUNK_OVERLAP ({chunk_overlap}) must be smaller than CHUNK_SIZE ({chunk_size})");
        }

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            port: parse_env("PORT", 8080u16)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            anthropic_api_key: optional_env("ANTHROPIC_API_KEY"),
            anthropic_api_url: std::env::var("ANTHROPIC_API_URL")
                .unwrap_or_else(|_| crate::llm_client::ANTHROPIC_API_URL.to_string()),
            voyage_api_key: optional_env("VOYAGE_API_KEY"),
            analysis_timeout: Duration::from_secs(parse_env("ANALYSIS_TIMEOUT_SECS", 600u64)?),
            max_upload_bytes: parse_env("MAX_UPLOAD_BYTES", 25 * 1024 * 1024usize)?,
            chunk_size,
            chunk_overlap,
            search_top_k: parse_env("SEARCH_TOP_K", 3usize)?,
            s3: s3_from_env(),
        })
    }
}

fn s3_from_env() -> Option<S3Config> {
    Some(S3Config {
        bucket: optional_env("S3_BUCKET")?,
        endpoint: optional_env("S3_ENDPOINT")?,
        access_key_id: optional_env("AWS_ACCESS_KEY_ID")?,
        secret_access_key: optional_env("AWS_SECRET_ACCESS_KEY")?,
    })
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
impl Config {
    /// Configuration used by router tests. Never touches the environment.
    pub fn for_tests() -> Self {
        Config {
            database_url: "postgres://localhost/compass_test".to_string(),
            port: 0,
            rust_log: "debug".to_string(),
            anthropic_api_key: None,
            anthropic_api_url: crate::llm_client::ANTHROPIC_API_URL.to_string(),
            voyage_api_key: None,
            analysis_timeout: Duration::from_secs(5),
            max_upload_bytes: 1024 * 1024,
            chunk_size: 200,
            chunk_overlap: 40,
            search_top_k: 3,
            s3: None,
        }
    }
}
