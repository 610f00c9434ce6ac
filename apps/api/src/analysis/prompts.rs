// Prompt templates for the four analysis stages.
// Placeholders in braces are substituted by the pipeline before each call.

use crate::llm_client::agent::AgentRole;

pub const PROFILER: AgentRole = AgentRole {
    name: "Profiler Agent",
    goal: "Create structured JSON profiles for the institution and the candidate.",
    backstory: "Expert analyst, distills complex documents into clear, machine-readable data.",
};

pub const CONFLICT_DETECTOR: AgentRole = AgentRole {
    name: "Conflict Detector Agent",
    goal: "Compare JSON profiles to find misalignments.",
    backstory: "Meticulous logic engine.",
};

pub const SCENARIO_EVALUATOR: AgentRole = AgentRole {
    name: "Case Scenario Evaluator Agent",
    goal: "Generate and evaluate ethical dilemmas.",
    backstory: "Expert in ethical pedagogy.",
};

pub const REPORT_GENERATOR: AgentRole = AgentRole {
    name: "Final Report Generator Agent",
    goal: "Synthesize analyses into a comprehensive report.",
    backstory: "Expert HR strategist who uses a calculator for all math.",
};

/// Placeholders: {candidate_name}, {candidate_text}
pub const PROFILING_INSTRUCTIONS: &str = "\
First, use the 'knowledge_base_search' tool to understand the institution's values, \
mission and policies. Search as many times as you need.
Second, analyze the submissions of '{candidate_name}':

{candidate_text}

Create two separate JSON objects: one profiling the institution and one profiling the candidate. \
Cover values, ethical commitments, priorities and stated practices.";

pub const PROFILING_EXPECTED: &str =
    "A single JSON object with two keys: 'institution_profile' and 'candidate_profile'.";

pub const CONFLICT_INSTRUCTIONS: &str = "\
Compare the institution's JSON profile with the candidate's. Identify value clashes. \
Rate every conflict's severity as either 'Critical' or 'Minor'.";

pub const CONFLICT_EXPECTED: &str = "\
JSON with a 'conflicts' key, listing objects with 'area', 'severity' ('Critical' or 'Minor'), \
and 'explanation'. Use an empty list when there are no conflicts.";

/// Placeholder: {conflict_json}
pub const SCENARIO_INSTRUCTIONS_SELECTED: &str = "\
The most severe conflict in the conflict report is:

{conflict_json}

Generate THREE distinct case scenarios built around this conflict and evaluate how the \
candidate would likely respond to each.";

pub const SCENARIO_INSTRUCTIONS_FALLBACK: &str = "\
From the conflict report, take the most 'Critical' conflict and generate THREE distinct case \
scenarios. Evaluate how the candidate would likely respond to each.";

pub const SCENARIO_INSTRUCTIONS_NO_CONFLICTS: &str = "\
The conflict report lists no conflicts. Generate THREE distinct case scenarios that test the \
institution's most central values and evaluate how the candidate would likely respond to each.";

pub const SCENARIO_EXPECTED: &str = "\
JSON with a 'scenarios' key, a list of 3 objects with 'scenario_title', 'dilemma', \
'predicted_response', 'alignment_score' (1-10), 'reasoning_strengths', and 'reasoning_weaknesses'.";

/// Placeholders: {candidate_name}, {critical_penalty}, {minor_penalty}
pub const REPORT_INSTRUCTIONS: &str = "\
Synthesize all outputs into a final report for '{candidate_name}'. \
Count the 'Critical' and 'Minor' conflicts, then use the 'calculator' tool to compute the final score: \
100 - ({critical_penalty} * num_critical) - ({minor_penalty} * num_minor).
The report must summarize the profiles, list every conflict, discuss each scenario and \
explain the score.";

pub const REPORT_EXPECTED: &str = "\
A JSON object with two keys: 'final_score' (number) and 'report_markdown' (string). \
Nothing may appear before or after the JSON object.";

/// Substitutes `{key}` placeholders in one pass over `template`.
/// Inserted values are never scanned for further placeholders.
pub fn fill(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let replacement = after.find('}').and_then(|close| {
            values
                .iter()
                .find(|(key, _)| *key == &after[..close])
                .map(|(_, value)| (close, *value))
        });
        match replacement {
            Some((close, value)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}
