//! Domain types for Refinr
//!
//! - attempt: Criterion, Candidate, CriterionScore, Evaluation, Attempt
//! - state: Plan, Reflection, and the per-run LoopState
//! - outcome: TerminationReason and RunOutcome

pub mod attempt;
pub mod outcome;
pub mod state;

pub use attempt::{Attempt, Candidate, Criterion, CriterionScore, Evaluation, MAX_SCORE, MIN_SCORE};
pub use outcome::{RunOutcome, TerminationReason};
pub use state::{LoopState, Plan, Reflection};
