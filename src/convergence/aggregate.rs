//! Score aggregation.

use crate::domain::CriterionScore;
use crate::error::{RefinrError, Result};

/// Arithmetic mean of the scores.
///
/// An empty slice has no mean; callers must guarantee at least one criterion.
pub fn average(scores: &[CriterionScore]) -> Result<f64> {
    if scores.is_empty() {
        return Err(RefinrError::DivisionUndefined);
    }
    let sum: u32 = total(scores);
    Ok(f64::from(sum) / scores.len() as f64)
}

/// Integer sum of the scores.
pub fn total(scores: &[CriterionScore]) -> u32 {
    scores.iter().map(|s| u32::from(s.score)).sum()
}
