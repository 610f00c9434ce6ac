use serde::Serialize;

use crate::analysis::models::{Conflict, Penalties, Severity};

pub const BASE_SCORE: i64 = 100;
pub const MIN_SCORE: i64 = 0;
pub const MAX_SCORE: i64 = 100;

/// Number of conflicts that carry a penalty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConflictTally {
    pub critical: u32,
    pub minor: u32,
}

impl ConflictTally {
    pub fn from_conflicts(conflicts: &[Conflict]) -> Self {
        conflicts
            .iter()
            .fold(Self::default(), |mut tally, c| {
                match c.severity {
                    Severity::Critical => tally.critical += 1,
                    Severity::Minor => tally.minor += 1,
                    _ => {}
                }
                tally
            })
    }
}

/// `100 − critical_penalty × num_critical − minor_penalty × num_minor`, unclamped.
pub fn compute_final_score(penalties: Penalties, tally: ConflictTally) -> i64 {
    BASE_SCORE
        - i64::from(penalties.critical) * i64::from(tally.critical)
        - i64::from(penalties.minor) * i64::from(tally.minor)
}

/// Brings any integer score into the stored range.
pub fn clamp_score(raw: i64) -> i32 {
    raw.clamp(MIN_SCORE, MAX_SCORE) as i32
}
