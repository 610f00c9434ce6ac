//! The fixed four-stage sequence and the context each stage may see.

use crate::llm_client::agent::ContextItem;

/// Pipeline stages in execution order. The derived `Ord` follows that order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Profiling,
    ConflictDetection,
    ScenarioEvaluation,
    ReportSynthesis,
}

impl Stage {
    pub const SEQUENCE: [Stage; 4] = [
        Stage::Profiling,
        Stage::ConflictDetection,
        Stage::ScenarioEvaluation,
        Stage::ReportSynthesis,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Stage::Profiling => "profiling",
            Stage::ConflictDetection => "conflict_detection",
            Stage::ScenarioEvaluation => "scenario_evaluation",
            Stage::ReportSynthesis => "report_synthesis",
        }
    }

    /// Heading used when this stage's output is shown to a later stage.
    pub fn output_heading(self) -> &'static str {
        match self {
            Stage::Profiling => "Profiling output (institution_profile, candidate_profile)",
            Stage::ConflictDetection => "Conflict detection output (conflicts)",
            Stage::ScenarioEvaluation => "Scenario evaluation output (scenarios)",
            Stage::ReportSynthesis => "Report synthesis output",
        }
    }

    /// Earlier stages whose output this stage consumes.
    pub fn context_sources(self) -> &'static [Stage] {
        match self {
            Stage::Profiling => &[],
            Stage::ConflictDetection => &[Stage::Profiling],
            Stage::ScenarioEvaluation => &[Stage::ConflictDetection],
            Stage::ReportSynthesis => &[
                Stage::Profiling,
                Stage::ConflictDetection,
                Stage::ScenarioEvaluation,
            ],
        }
    }
}

/// Outputs of the stages that have completed so far, in execution order.
#[derive(Debug, Default)]
pub struct StageContext {
    outputs: Vec<(Stage, String)>,
}

impl StageContext {
    /// Records a finished stage. Stages must be recorded in sequence.
    pub fn record(&mut self, stage: Stage, output: String) {
        debug_assert_eq!(
            Stage::SEQUENCE.get(self.outputs.len()),
            Some(&stage),
            "stages recorded out of order"
        );
        self.outputs.push((stage, output));
    }

    pub fn output(&self, stage: Stage) -> Option<&str> {
        self.outputs
            .iter()
            .find(|(s, _)| *s == stage)
            .map(|(_, text)| text.as_str())
    }

    /// Context for `stage`: its declared sources, restricted to strictly earlier stages.
    pub fn context_for(&self, stage: Stage) -> Vec<ContextItem> {
        stage
            .context_sources()
            .iter()
            .filter(|source| **source < stage)
            .filter_map(|source| {
                self.output(*source).map(|text| ContextItem {
                    label: source.output_heading(),
                    text: text.to_string(),
                })
            })
            .collect()
    }
}
