use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ConfigureRequest {
    #[serde(default, alias = "google_api_key")]
    pub api_key: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ConfigureResponse {
    pub message: &'static str,
}

/// POST /configure
pub async fn handle_configure(
    State(state): State<AppState>,
    Json(req): Json<ConfigureRequest>,
) -> Result<Json<ConfigureResponse>, AppError> {
    let key = req
        .api_key
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .ok_or_else(|| AppError::Validation("API key not provided.".to_string()))?;

    state.api_key.set(key);
    info!("Model API key updated");

    Ok(Json(ConfigureResponse {
        message: "API Key configured successfully.",
    }))
}
