//! Best-attempt selection at termination.

use crate::domain::Attempt;
use crate::error::{RefinrError, Result};

/// Pick the attempt with the highest score total.
///
/// Earlier attempts win ties. Without any evaluated attempt the newest
/// attempt is returned; an empty history has no candidate at all.
pub fn select_best(attempts: &[Attempt]) -> Result<&Attempt> {
    let mut best: Option<(&Attempt, u32)> = None;

    for attempt in attempts {
        let Some(evaluation) = attempt.evaluation() else {
            continue;
        };
        let total = evaluation.total();
        if best.is_none_or(|(_, best_total)| total > best_total) {
            best = Some((attempt, total));
        }
    }

    match best {
        Some((attempt, _)) => Ok(attempt),
        None => attempts.last().ok_or(RefinrError::NoCandidatesProduced),
    }
}
