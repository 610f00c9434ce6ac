/// LLM Client: the single point of entry for all Claude API calls in Compass.
///
/// ARCHITECTURAL RULE: No other module may call the Anthropic API directly.
/// Pipeline stages talk to the model through the `StageAgent` contract in `agent.rs`;
/// this module provides its production implementation.
///
/// Model: claude-sonnet-4-5 (hardcoded; do not make configurable to prevent drift)
use std::sync::Arc;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, warn};

pub mod agent;
pub mod credentials;
pub mod prompts;
pub mod tools;

use credentials::ApiKeyHandle;
use tools::Tool;

pub const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
/// The model used for all LLM calls in Compass.
/// This is intentionally hardcoded to prevent accidental drift.
pub const MODEL: &str = "claude-sonnet-4-5";
const MAX_TOKENS: u32 = 4096;
const TEMPERATURE: f32 = 0.1;
const MAX_RETRIES: u32 = 3;
/// Upper bound on tool-use round trips inside a single stage call.
const MAX_TOOL_ROUNDS: usize = 8;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("LLM returned empty content")]
    EmptyContent,

    #[error("API key not configured")]
    MissingApiKey,

    #[error("Model kept requesting tools after {rounds} rounds")]
    ToolLoop { rounds: usize },
}

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: &'a [Message],
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ToolSpec<'a>>,
}

/// A conversation turn. `content` is either a plain string or an array of content blocks.
#[derive(Debug, Clone, Serialize)]
struct Message {
    role: &'static str,
    content: Value,
}

#[derive(Debug, Serialize)]
struct ToolSpec<'a> {
    name: &'a str,
    description: &'a str,
    input_schema: Value,
}

#[derive(Debug, Deserialize)]
pub struct LlmResponse {
    pub content: Vec<ContentBlock>,
    #[serde(default)]
    pub stop_reason: Option<String>,
    pub usage: Usage,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl LlmResponse {
    /// Concatenates every text block of the response.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|b| match b {
                ContentBlock::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn tool_calls(&self) -> Vec<(&str, &str, &Value)> {
        self.content
            .iter()
            .filter_map(|b| match b {
                ContentBlock::ToolUse { id, name, input } => {
                    Some((id.as_str(), name.as_str(), input))
                }
                _ => None,
            })
            .collect()
    }

    fn wants_tools(&self) -> bool {
        self.stop_reason.as_deref() == Some("tool_use") && !self.tool_calls().is_empty()
    }
}

#[derive(Debug, Deserialize)]
struct AnthropicError {
    error: AnthropicErrorBody,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorBody {
    message: String,
}

/// The single LLM client used by all services in Compass.
/// Wraps the Anthropic Messages API with retry logic and a tool-use loop.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_url: String,
    api_key: ApiKeyHandle,
}

impl LlmClient {
    pub fn new(api_url: String, api_key: ApiKeyHandle) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .build()
                .expect("Failed to build HTTP client"),
            api_url,
            api_key,
        }
    }

    /// Makes a raw call to the Claude API, returning the full response object.
    /// Retries on 429 (rate limit) and 5xx errors with exponential backoff.
    async fn send(
        &self,
        system: &str,
        messages: &[Message],
        tools: &[Arc<dyn Tool>],
    ) -> Result<LlmResponse, LlmError> {
        let api_key = self.api_key.get().ok_or(LlmError::MissingApiKey)?;

        let request_body = AnthropicRequest {
            model: MODEL,
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
            system,
            messages,
            tools: tools
                .iter()
                .map(|t| ToolSpec {
                    name: t.name(),
                    description: t.description(),
                    input_schema: t.input_schema(),
                })
                .collect(),
        };

        let mut last_error: Option<LlmError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s
                let delay = std::time::Duration::from_millis(1000 * (1 << (attempt - 1)));
                warn!(
                    "LLM call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = self
                .client
                .post(&self.api_url)
                .header("x-api-key", &api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .header("content-type", "application/json")
                .json(&request_body)
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(LlmError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("LLM API returned {}: {}", status, body);
                last_error = Some(LlmError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<AnthropicError>(&body)
                    .map(|e| e.error.message)
                    .unwrap_or(body);
                return Err(LlmError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let llm_response: LlmResponse = response.json().await?;

            debug!(
                "LLM call succeeded: input_tokens={}, output_tokens={}, stop_reason={:?}",
                llm_response.usage.input_tokens,
                llm_response.usage.output_tokens,
                llm_response.stop_reason
            );

            return Ok(llm_response);
        }

        Err(last_error.unwrap_or(LlmError::RateLimited {
            retries: MAX_RETRIES,
        }))
    }

    /// Runs a single prompt to completion, executing tool calls the model asks for
    /// and feeding their results back until it produces a final text answer.
    pub async fn complete(
        &self,
        system: &str,
        prompt: &str,
        tools: &[Arc<dyn Tool>],
    ) -> Result<String, LlmError> {
        let mut messages = vec![Message {
            role: "user",
            content: Value::String(prompt.to_string()),
        }];

        for round in 0..=MAX_TOOL_ROUNDS {
            let response = self.send(system, &messages, tools).await?;

            if !response.wants_tools() {
                let text = response.text();
                if text.trim().is_empty() {
                    return Err(LlmError::EmptyContent);
                }
                return Ok(text);
            }

            if round == MAX_TOOL_ROUNDS {
                break;
            }

            let mut results = Vec::new();
            for (id, name, input) in response.tool_calls() {
                results.push(run_tool(tools, id, name, input).await);
            }

            let echoed: Vec<&ContentBlock> = response
                .content
                .iter()
                .filter(|b| !matches!(b, ContentBlock::Unsupported))
                .collect();
            messages.push(Message {
                role: "assistant",
                content: serde_json::to_value(echoed)?,
            });
            messages.push(Message {
                role: "user",
                content: Value::Array(results),
            });
        }

        Err(LlmError::ToolLoop {
            rounds: MAX_TOOL_ROUNDS,
        })
    }
}

/// Executes one tool call and renders it as a `tool_result` block.
/// Tool failures are reported back to the model rather than aborting the stage.
async fn run_tool(tools: &[Arc<dyn Tool>], id: &str, name: &str, input: &Value) -> Value {
    let outcome = match tools.iter().find(|t| t.name() == name) {
        Some(tool) => tool.invoke(input).await.map_err(|e| e.to_string()),
        None => Err(format!("Unknown tool '{name}'")),
    };

    match outcome {
        Ok(content) => {
            debug!("Tool '{name}' returned {} chars", content.len());
            json!({ "type": "tool_result", "tool_use_id": id, "content": content })
        }
        Err(message) => {
            warn!("Tool '{name}' failed: {message}");
            json!({
                "type": "tool_result",
                "tool_use_id": id,
                "content": message,
                "is_error": true
            })
        }
    }
}
