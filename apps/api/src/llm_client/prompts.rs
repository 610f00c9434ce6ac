// Shared prompt constants and prompt-building fragments.
// Each service that needs LLM calls defines its own prompts.rs alongside it.
// This file contains cross-cutting prompt fragments.

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You are a precise, structured assistant. \
    Your final answer MUST be a single valid JSON object. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Separates prior-stage outputs when they are rendered into a prompt.
pub const CONTEXT_SEPARATOR: &str = "\n\n----------\n\n";

/// Closing instruction appended to every stage prompt.
pub const FINAL_ANSWER_INSTRUCTION: &str = "\
    You MUST return the actual complete content as the final answer, not a summary. \
    If you use tools, only your last message counts as the final answer.";
