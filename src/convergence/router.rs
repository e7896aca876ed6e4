//! Convergence routing.
//!
//! Decides, from the iteration count and the scored history, whether the loop
//! keeps refining with the current plan, formulates a new plan, or stops.
//! Routing is a pure function of its inputs so that every transition of the
//! controller can be tested without a reasoner.
//!
//! Precedence:
//!
//! 1. Finish when the latest average reaches the threshold or the iteration
//!    cap is hit.
//! 2. From the second iteration on, revise strategy when the latest average
//!    does not exceed the previous one (a tie is a stall).
//! 3. Otherwise continue.
//!
//! Only the immediately preceding average is compared, never the best-ever.

use serde::{Deserialize, Serialize};

use crate::domain::Attempt;
use crate::error::{RefinrError, Result};

/// Average score at which a run is considered done
pub const DEFAULT_SCORE_THRESHOLD: f64 = 8.5;

/// Hard cap on routing passes per run
pub const DEFAULT_MAX_ITERATIONS: u32 = 5;

/// Why the router chose to finish
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    ScoreThreshold,
    IterationCap,
}

/// Router decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Generate again with the current plan
    Continue,
    /// Progress stalled; formulate a new plan
    ReviseStrategy,
    /// Stop and select the best attempt
    Finish(FinishReason),
}

/// Thresholds the router applies
///
/// The defaults are hard stops: a policy may finish earlier than 8.5 or 5
/// iterations, never later.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConvergencePolicy {
    score_threshold: f64,
    max_iterations: u32,
}

impl Default for ConvergencePolicy {
    fn default() -> Self {
        Self {
            score_threshold: DEFAULT_SCORE_THRESHOLD,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

impl ConvergencePolicy {
    /// Values beyond the hard stops are pulled back to them.
    pub fn new(score_threshold: f64, max_iterations: u32) -> Self {
        Self {
            score_threshold: score_threshold.min(DEFAULT_SCORE_THRESHOLD),
            max_iterations: max_iterations.clamp(1, DEFAULT_MAX_ITERATIONS),
        }
    }

    pub fn score_threshold(&self) -> f64 {
        self.score_threshold
    }

    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    /// Route after `iteration_count` completed iterations.
    pub fn route(&self, iteration_count: u32, history: &[Attempt]) -> Result<Verdict> {
        if iteration_count == 0 {
            return Err(RefinrError::MalformedHistory(
                "routing requires at least one completed iteration".to_string(),
            ));
        }

        let latest = history
            .last()
            .ok_or_else(|| RefinrError::MalformedHistory("history is empty".to_string()))?;
        let avg_latest = evaluated_average(latest, "latest")?;

        if avg_latest >= self.score_threshold {
            return Ok(Verdict::Finish(FinishReason::ScoreThreshold));
        }
        if iteration_count >= self.max_iterations {
            return Ok(Verdict::Finish(FinishReason::IterationCap));
        }

        if iteration_count >= 2 {
            let previous = history
                .len()
                .checked_sub(2)
                .and_then(|i| history.get(i))
                .ok_or_else(|| {
                    RefinrError::MalformedHistory(format!(
                        "iteration {} needs a previous attempt, history has {}",
                        iteration_count,
                        history.len()
                    ))
                })?;
            let avg_prev = evaluated_average(previous, "previous")?;

            if avg_latest <= avg_prev {
                return Ok(Verdict::ReviseStrategy);
            }
        }

        Ok(Verdict::Continue)
    }
}

/// Route with the default thresholds (8.5 average, 5 iterations).
pub fn route(iteration_count: u32, history: &[Attempt]) -> Result<Verdict> {
    ConvergencePolicy::default().route(iteration_count, history)
}

fn evaluated_average(attempt: &Attempt, which: &str) -> Result<f64> {
    attempt
        .evaluation()
        .ok_or_else(|| RefinrError::MalformedHistory(format!("{} attempt has no evaluation", which)))?
        .average()
}
