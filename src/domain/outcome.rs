//! Run outcome types.
//!
//! This module defines what a finished run hands back to its caller.

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use super::attempt::{Attempt, Criterion};
use crate::convergence::FinishReason;
use crate::error::{RefinrError, Result};

/// Why a run stopped
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason", content = "error", rename_all = "snake_case")]
pub enum TerminationReason {
    /// Latest average score reached the threshold
    ScoreThresholdMet,
    /// Iteration cap reached
    MaxIterationsReached,
    /// External cancellation observed between stages
    Cancelled,
    /// A stage failed and the run was abandoned
    Fatal(#[serde(serialize_with = "serialize_error")] RefinrError),
}

impl TerminationReason {
    pub fn is_fatal(&self) -> bool {
        matches!(self, TerminationReason::Fatal(_))
    }
}

impl From<FinishReason> for TerminationReason {
    fn from(reason: FinishReason) -> Self {
        match reason {
            FinishReason::ScoreThreshold => TerminationReason::ScoreThresholdMet,
            FinishReason::IterationCap => TerminationReason::MaxIterationsReached,
        }
    }
}

fn serialize_error<S: Serializer>(error: &RefinrError, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&error.to_string())
}

/// Result of one complete run
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub run_id: String,

    /// Best attempt's content; None when no candidate was produced
    pub final_artifact: Option<String>,

    /// Every attempt, oldest first
    pub history: Vec<Attempt>,

    pub criteria: Vec<Criterion>,

    /// Completed routing passes
    pub iterations: u32,

    pub termination_reason: TerminationReason,

    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunOutcome {
    /// The selected artifact, or NoCandidatesProduced for an empty run
    pub fn final_artifact(&self) -> Result<&str> {
        self.final_artifact
            .as_deref()
            .ok_or(RefinrError::NoCandidatesProduced)
    }

    /// True when the run ended without a fatal error
    pub fn is_success(&self) -> bool {
        matches!(
            self.termination_reason,
            TerminationReason::ScoreThresholdMet | TerminationReason::MaxIterationsReached
        )
    }
}
