//! Sequential four-stage analysis run.
//!
//! Profiling → conflict detection → scenario evaluation → report synthesis.
//! Each stage sees only the outputs of strictly earlier stages. Any stage
//! failure aborts the run; nothing is persisted unless extraction succeeds.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::analysis::extraction::extract_report;
use crate::analysis::models::{most_severe, parse_conflicts, CandidateSubmission, Conflict};
use crate::analysis::prompts::{self, fill};
use crate::analysis::scoring::{clamp_score, compute_final_score, ConflictTally};
use crate::analysis::stages::{Stage, StageContext};
use crate::analysis::tools::CalculatorTool;
use crate::errors::AppError;
use crate::llm_client::agent::{StageAgent, StageRequest};
use crate::llm_client::tools::Tool;
use crate::llm_client::LlmError;
use crate::models::report::NewReport;
use crate::reports::ReportStore;

#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub score: i32,
    pub report_markdown: String,
    /// Conflict counts computed from the conflict detector's output, when it parsed.
    pub tally: Option<ConflictTally>,
}

/// Runs all four stages for `submission` and extracts the scored report.
///
/// `knowledge_search` is bound to the knowledge-base snapshot the caller
/// captured; only the profiling stage receives it.
pub async fn run_pipeline(
    agent: &dyn StageAgent,
    knowledge_search: Arc<dyn Tool>,
    submission: &CandidateSubmission,
) -> Result<PipelineOutcome, AppError> {
    let run_started = Instant::now();
    let mut context = StageContext::default();
    let mut conflicts: Option<Vec<Conflict>> = None;

    for stage in Stage::SEQUENCE {
        let request = build_request(
            stage,
            submission,
            &context,
            conflicts.as_deref(),
            knowledge_search.clone(),
        );

        info!("Stage {} started for '{}'", stage.label(), submission.name);
        let started = Instant::now();
        let output = agent
            .run(request)
            .await
            .map_err(|e| stage_failure(stage, e))?;
        info!(
            "Stage {} finished in {:.1}s ({} chars)",
            stage.label(),
            started.elapsed().as_secs_f64(),
            output.len()
        );

        if stage == Stage::ConflictDetection {
            conflicts = parse_conflicts(&output);
            match &conflicts {
                Some(list) => info!("Conflict detector reported {} conflicts", list.len()),
                None => warn!("Conflict detector output is not well-formed JSON; scenario stage will select the conflict itself"),
            }
        }

        context.record(stage, output);
    }

    let raw = context.output(Stage::ReportSynthesis).unwrap_or_default();
    if raw.trim().is_empty() {
        return Err(AppError::Timeout(
            "report synthesis produced no output".to_string(),
        ));
    }

    let report = extract_report(raw).map_err(|e| {
        error!("Error parsing agent's JSON output: {e}\n--- Full Agent Output ---\n{raw}");
        AppError::Parse(e.to_string())
    })?;

    let tally = conflicts.as_deref().map(ConflictTally::from_conflicts);
    if let Some(tally) = tally {
        let expected = clamp_score(compute_final_score(submission.penalties, tally));
        if expected != report.final_score {
            warn!(
                "Score mismatch for '{}': model reported {}, conflicts ({} critical, {} minor) give {}",
                submission.name, report.final_score, tally.critical, tally.minor, expected
            );
        }
    }

    info!(
        "Analysis for '{}' completed in {:.1}s with score {}",
        submission.name,
        run_started.elapsed().as_secs_f64(),
        report.final_score
    );

    Ok(PipelineOutcome {
        score: report.final_score,
        report_markdown: report.report_markdown,
        tally,
    })
}

/// Inserts the finished report. Called only after a successful run.
pub async fn persist_report(
    reports: &dyn ReportStore,
    submission: &CandidateSubmission,
    outcome: &PipelineOutcome,
) -> Result<Uuid, AppError> {
    reports
        .insert(NewReport {
            candidate_name: submission.name.clone(),
            score: outcome.score,
            date: Utc::now(),
            full_report: outcome.report_markdown.clone(),
        })
        .await
}

fn build_request(
    stage: Stage,
    submission: &CandidateSubmission,
    context: &StageContext,
    conflicts: Option<&[Conflict]>,
    knowledge_search: Arc<dyn Tool>,
) -> StageRequest {
    let critical = submission.penalties.critical.to_string();
    let minor = submission.penalties.minor.to_string();

    let (role, instructions, expected_output, tools): (_, String, _, Vec<Arc<dyn Tool>>) =
        match stage {
            Stage::Profiling => (
                prompts::PROFILER,
                fill(
                    prompts::PROFILING_INSTRUCTIONS,
                    &[
                        ("candidate_name", submission.name.as_str()),
                        ("candidate_text", submission.text.as_str()),
                    ],
                ),
                prompts::PROFILING_EXPECTED,
                vec![knowledge_search],
            ),
            Stage::ConflictDetection => (
                prompts::CONFLICT_DETECTOR,
                prompts::CONFLICT_INSTRUCTIONS.to_string(),
                prompts::CONFLICT_EXPECTED,
                vec![],
            ),
            Stage::ScenarioEvaluation => (
                prompts::SCENARIO_EVALUATOR,
                scenario_instructions(conflicts),
                prompts::SCENARIO_EXPECTED,
                vec![],
            ),
            Stage::ReportSynthesis => (
                prompts::REPORT_GENERATOR,
                fill(
                    prompts::REPORT_INSTRUCTIONS,
                    &[
                        ("candidate_name", submission.name.as_str()),
                        ("critical_penalty", critical.as_str()),
                        ("minor_penalty", minor.as_str()),
                    ],
                ),
                prompts::REPORT_EXPECTED,
                vec![Arc::new(CalculatorTool) as Arc<dyn Tool>],
            ),
        };

    StageRequest {
        role,
        instructions,
        expected_output,
        context: context.context_for(stage),
        tools,
    }
}

fn scenario_instructions(conflicts: Option<&[Conflict]>) -> String {
    let Some(conflicts) = conflicts else {
        return prompts::SCENARIO_INSTRUCTIONS_FALLBACK.to_string();
    };
    match most_severe(conflicts).map(serde_json::to_string_pretty) {
        Some(Ok(conflict_json)) => fill(
            prompts::SCENARIO_INSTRUCTIONS_SELECTED,
            &[("conflict_json", conflict_json.as_str())],
        ),
        Some(Err(_)) => prompts::SCENARIO_INSTRUCTIONS_FALLBACK.to_string(),
        None => prompts::SCENARIO_INSTRUCTIONS_NO_CONFLICTS.to_string(),
    }
}

fn stage_failure(stage: Stage, e: LlmError) -> AppError {
    match e {
        LlmError::EmptyContent => {
            AppError::Timeout(format!("stage {} returned no output", stage.label()))
        }
        LlmError::MissingApiKey => AppError::Configuration("API Key not configured.".to_string()),
        other => AppError::Llm(format!("stage {} failed: {other}", stage.label())),
    }
}
