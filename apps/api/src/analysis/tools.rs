// Tools granted to individual stages: knowledge-base search for profiling,
// the calculator for report synthesis.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use crate::analysis::calculator;
use crate::knowledge::embedder::Embedder;
use crate::knowledge::KnowledgeBase;
use crate::llm_client::tools::{string_arg, Tool, ToolError};

pub const KNOWLEDGE_SEARCH_TOOL: &str = "knowledge_base_search";
pub const CALCULATOR_TOOL: &str = "calculator";

const NO_MATCHES: &str = "No matching passages found in the knowledge base.";

/// Similarity search over the knowledge-base snapshot captured when the run started.
pub struct KnowledgeBaseSearchTool {
    base: Arc<KnowledgeBase>,
    embedder: Arc<dyn Embedder>,
    k: usize,
}

impl KnowledgeBaseSearchTool {
    pub fn new(base: Arc<KnowledgeBase>, embedder: Arc<dyn Embedder>, k: usize) -> Self {
        Self { base, embedder, k }
    }
}

#[async_trait]
impl Tool for KnowledgeBaseSearchTool {
    fn name(&self) -> &str {
        KNOWLEDGE_SEARCH_TOOL
    }

    fn description(&self) -> &str {
        "Searches the institution's knowledge base (mission statements, values, \
         policies) and returns the most relevant passages."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "What to look up, e.g. 'core values' or 'academic integrity policy'."
                }
            },
            "required": ["query"]
        })
    }

    async fn invoke(&self, input: &Value) -> Result<String, ToolError> {
        let query = string_arg(input, "query")?;
        if self.base.is_empty() {
            return Ok(NO_MATCHES.to_string());
        }
        debug!("Knowledge base search in {}: {query}", self.base.id);

        self.base
            .search(self.embedder.as_ref(), query, self.k)
            .await
            .map_err(|e| ToolError::Failed(format!("Knowledge base search failed: {e}")))
    }
}

pub struct CalculatorTool;

#[async_trait]
impl Tool for CalculatorTool {
    fn name(&self) -> &str {
        CALCULATOR_TOOL
    }

    fn description(&self) -> &str {
        "Evaluates an arithmetic expression with + - * / and parentheses. \
         Use it for every calculation."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "expression": {
                    "type": "string",
                    "description": "For example: 100 - (10 * 2) - (5 * 1)"
                }
            },
            "required": ["expression"]
        })
    }

    async fn invoke(&self, input: &Value) -> Result<String, ToolError> {
        let expression = string_arg(input, "expression")?;
        let value = calculator::evaluate(expression)
            .map_err(|e| ToolError::Failed(format!("Cannot evaluate '{expression}': {e}")))?;
        Ok(format_number(value))
    }
}

/// Integral values print without a fractional part.
fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::embedder::HashingEmbedder;

    #[tokio::test]
    async fn test_calculator_tool_formats_integers() {
        let out = CalculatorTool
            .invoke(&json!({"expression": "100 - 10 * 2 - 5"}))
            .await
            .unwrap();
        assert_eq!(out, "75");

        let out = CalculatorTool
            .invoke(&json!({"expression": "7 / 2"}))
            .await
            .unwrap();
        assert_eq!(out, "3.5");
    }

    #[tokio::test]
    async fn test_calculator_tool_reports_failures() {
        let err = CalculatorTool
            .invoke(&json!({"expression": "1 / 0"}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("division by zero"));

        let err = CalculatorTool.invoke(&json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_knowledge_search_tool_returns_passages() {
        let embedder: Arc<dyn Embedder> = Arc::new(HashingEmbedder::default());
        let base = KnowledgeBase::build(
            vec![
                "Our mission is service to the community.".to_string(),
                "Faculty must uphold academic integrity.".to_string(),
            ],
            embedder.as_ref(),
        )
        .await
        .unwrap();
        let tool = KnowledgeBaseSearchTool::new(Arc::new(base), embedder, 1);

        let out = tool
            .invoke(&json!({"query": "academic integrity"}))
            .await
            .unwrap();
        assert_eq!(out, "Faculty must uphold academic integrity.");
    }

    #[tokio::test]
    async fn test_knowledge_search_tool_empty_base() {
        let embedder: Arc<dyn Embedder> = Arc::new(HashingEmbedder::default());
        let base = KnowledgeBase::build(vec![], embedder.as_ref()).await.unwrap();
        let tool = KnowledgeBaseSearchTool::new(Arc::new(base), embedder, 3);

        let out = tool.invoke(&json!({"query": "values"})).await.unwrap();
        assert_eq!(out, NO_MATCHES);
    }
}
