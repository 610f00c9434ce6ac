use serde::{Deserialize, Serialize};

use crate::analysis::extraction::extract_json_object;

/// Per-conflict deductions applied to the base score of 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Penalties {
    pub critical: u32,
    pub minor: u32,
}

/// One candidate's analysis request. Lives only for the duration of a run.
#[derive(Debug, Clone)]
pub struct CandidateSubmission {
    pub name: String,
    /// Written submissions followed by any text extracted from attached files.
    pub text: String,
    pub penalties: Penalties,
}

/// Conflict severity as reported by the conflict detector. Parsed case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Severity {
    Critical,
    Major,
    Moderate,
    Minor,
    Other(String),
}

impl Severity {
    /// Higher is more severe.
    pub fn rank(&self) -> u8 {
        match self {
            Severity::Critical => 4,
            Severity::Major => 3,
            Severity::Moderate => 2,
            Severity::Minor => 1,
            Severity::Other(_) => 0,
        }
    }
}

impl From<String> for Severity {
    fn from(raw: String) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "critical" => Severity::Critical,
            "major" | "high" => Severity::Major,
            "moderate" | "medium" => Severity::Moderate,
            "minor" | "low" => Severity::Minor,
            _ => Severity::Other(raw),
        }
    }
}

impl From<Severity> for String {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Critical => "Critical".to_string(),
            Severity::Major => "Major".to_string(),
            Severity::Moderate => "Moderate".to_string(),
            Severity::Minor => "Minor".to_string(),
            Severity::Other(raw) => raw,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conflict {
    #[serde(default)]
    pub area: String,
    pub severity: Severity,
    #[serde(default)]
    pub explanation: String,
}

#[derive(Debug, Deserialize)]
struct ConflictReport {
    conflicts: Vec<Conflict>,
}

/// Reads the `conflicts` list out of the conflict detector's output, if it is well formed.
pub fn parse_conflicts(output: &str) -> Option<Vec<Conflict>> {
    let value = extract_json_object(output).ok()?;
    serde_json::from_value::<ConflictReport>(value)
        .ok()
        .map(|r| r.conflicts)
}

/// The most severe conflict; the earliest one wins a tie.
pub fn most_severe(conflicts: &[Conflict]) -> Option<&Conflict> {
    conflicts.iter().fold(None, |best: Option<&Conflict>, c| match best {
        Some(b) if b.severity.rank() >= c.severity.rank() => Some(b),
        _ => Some(c),
    })
}
