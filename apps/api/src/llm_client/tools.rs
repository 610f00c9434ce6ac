//! Tool capabilities a stage may be granted during its model call.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("invalid tool input: {0}")]
    InvalidInput(String),

    #[error("{0}")]
    Failed(String),
}

/// A callable capability exposed to the model.
///
/// Input arrives as the JSON object the model produced against `input_schema`.
/// The returned string is passed back to the model verbatim.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn input_schema(&self) -> Value;
    async fn invoke(&self, input: &Value) -> Result<String, ToolError>;
}

/// Reads a required string field from a tool input object.
pub fn string_arg<'a>(input: &'a Value, field: &str) -> Result<&'a str, ToolError> {
    input
        .get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ToolError::InvalidInput(format!("missing string field '{field}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_string_arg_present() {
        let input = json!({"query": "academic integrity"});
        assert_eq!(string_arg(&input, "query").unwrap(), "academic integrity");
    }

    #[test]
    fn test_string_arg_missing_or_blank() {
        assert!(string_arg(&json!({}), "query").is_err());
        assert!(string_arg(&json!({"query": "  "}), "query").is_err());
        assert!(string_arg(&json!({"query": 3}), "query").is_err());
    }
}
