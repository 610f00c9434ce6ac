//! Stage agent contract: role instructions + context + optional tools → text.
//!
//! The analysis pipeline only depends on `StageAgent`; any model client that
//! satisfies it can stand in for `LlmClient`.

use std::sync::Arc;

use async_trait::async_trait;

use crate::llm_client::prompts::{CONTEXT_SEPARATOR, FINAL_ANSWER_INSTRUCTION, JSON_ONLY_SYSTEM};
use crate::llm_client::tools::Tool;
use crate::llm_client::{LlmClient, LlmError};

/// Identity of a role-specialized agent.
#[derive(Debug, Clone, Copy)]
pub struct AgentRole {
    pub name: &'static str,
    pub goal: &'static str,
    pub backstory: &'static str,
}

/// A labelled piece of prior-stage output handed to a later stage.
#[derive(Debug, Clone)]
pub struct ContextItem {
    pub label: &'static str,
    pub text: String,
}

/// Everything a single stage call needs.
pub struct StageRequest {
    pub role: AgentRole,
    pub instructions: String,
    pub expected_output: &'static str,
    pub context: Vec<ContextItem>,
    pub tools: Vec<Arc<dyn Tool>>,
}

#[async_trait]
pub trait StageAgent: Send + Sync {
    /// Runs one stage to completion and returns its final text.
    async fn run(&self, request: StageRequest) -> Result<String, LlmError>;
}

#[async_trait]
impl StageAgent for LlmClient {
    async fn run(&self, request: StageRequest) -> Result<String, LlmError> {
        let system = render_system(&request.role);
        let prompt = render_prompt(&request);
        self.complete(&system, &prompt, &request.tools).await
    }
}

pub fn render_system(role: &AgentRole) -> String {
    format!(
        "You are {}. {}\nYour personal goal is: {}\n\n{}",
        role.name, role.backstory, role.goal, JSON_ONLY_SYSTEM
    )
}

pub fn render_prompt(request: &StageRequest) -> String {
    let mut prompt = request.instructions.clone();

    if !request.context.is_empty() {
        let context = request
            .context
            .iter()
            .map(|item| format!("## {}\n{}", item.label, item.text))
            .collect::<Vec<_>>()
            .join(CONTEXT_SEPARATOR);
        prompt.push_str("\n\nThis is the context you're working with:\n");
        prompt.push_str(&context);
    }

    if !request.tools.is_empty() {
        let names = request
            .tools
            .iter()
            .map(|t| t.name())
            .collect::<Vec<_>>()
            .join(", ");
        prompt.push_str(&format!("\n\nTools available to you: {names}."));
    }

    prompt.push_str("\n\nThis is the expected criteria for your final answer: ");
    prompt.push_str(request.expected_output);
    prompt.push_str("\n\n");
    prompt.push_str(FINAL_ANSWER_INSTRUCTION);
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROLE: AgentRole = AgentRole {
        name: "Conflict Detector Agent",
        goal: "Compare JSON profiles to find misalignments.",
        backstory: "Meticulous logic engine.",
    };

    fn request(context: Vec<ContextItem>) -> StageRequest {
        StageRequest {
            role: ROLE,
            instructions: "Compare the profiles.".to_string(),
            expected_output: "JSON with a 'conflicts' key.",
            context,
            tools: vec![],
        }
    }

    #[test]
    fn test_system_names_role_and_goal() {
        let system = render_system(&ROLE);
        assert!(system.starts_with("You are Conflict Detector Agent."));
        assert!(system.contains("Compare JSON profiles"));
        assert!(system.contains("valid JSON object"));
    }

    #[test]
    fn test_prompt_without_context_has_no_context_section() {
        let prompt = render_prompt(&request(vec![]));
        assert!(prompt.starts_with("Compare the profiles."));
        assert!(!prompt.contains("context you're working with"));
        assert!(prompt.contains("JSON with a 'conflicts' key."));
    }

    #[test]
    fn test_prompt_renders_context_in_order() {
        let prompt = render_prompt(&request(vec![
            ContextItem {
                label: "Profiling output",
                text: "{\"a\": 1}".to_string(),
            },
            ContextItem {
                label: "Conflict detection output",
                text: "{\"b\": 2}".to_string(),
            },
        ]));
        let first = prompt.find("Profiling output").unwrap();
        let second = prompt.find("Conflict detection output").unwrap();
        assert!(first < second);
        assert!(prompt.contains(CONTEXT_SEPARATOR));
    }
}
