//! Error types for Refinr
//!
//! Centralized error handling using thiserror. Every variant is fatal to the
//! run that raised it and to nothing else.

use thiserror::Error;

use crate::reasoner::{ReasonerError, TaskKind};

/// All error types that can end a refinement run
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RefinrError {
    /// The reasoner call failed or returned output of the wrong shape
    #[error("Reasoner unavailable during {task}: {source}")]
    ReasonerUnavailable {
        task: TaskKind,
        #[source]
        source: ReasonerError,
    },

    /// Goal decomposition produced no criteria
    #[error("Goal decomposition produced an empty criteria set")]
    EmptyCriteriaSet,

    /// Evaluation did not score every active criterion exactly once
    #[error("Score count mismatch: expected {expected} scores, got {actual}")]
    ScoreCountMismatch { expected: usize, actual: usize },

    /// Scores are not labelled with the active criteria in order
    #[error("Score {position} is for criterion '{actual}', expected '{expected}'")]
    CriterionMismatch {
        position: usize,
        expected: String,
        actual: String,
    },

    /// A criterion score fell outside 1..=10
    #[error("Score {score} for criterion '{criterion}' is outside 1..=10")]
    ScoreOutOfRange { criterion: String, score: u8 },

    /// The router was handed a history it cannot reason about
    #[error("Malformed history: {0}")]
    MalformedHistory(String),

    /// attach_evaluation called with no unevaluated attempt at the tail
    #[error("No open attempt to attach an evaluation to")]
    NoOpenAttempt,

    /// A stage was entered before its prerequisites were in place
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    /// The run ended without producing a single candidate
    #[error("No candidates were produced")]
    NoCandidatesProduced,

    /// Averaging an empty score list
    #[error("Average of an empty score list is undefined")]
    DivisionUndefined,
}

impl RefinrError {
    /// Wrap a reasoner failure with the task that was being performed
    pub fn reasoner(task: TaskKind, source: ReasonerError) -> Self {
        RefinrError::ReasonerUnavailable { task, source }
    }

    /// True for contract breaches between components (as opposed to
    /// collaborator failures or an empty run)
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            RefinrError::EmptyCriteriaSet
                | RefinrError::ScoreCountMismatch { .. }
                | RefinrError::CriterionMismatch { .. }
                | RefinrError::ScoreOutOfRange { .. }
                | RefinrError::MalformedHistory(_)
                | RefinrError::NoOpenAttempt
                | RefinrError::InvalidTransition(_)
                | RefinrError::DivisionUndefined
        )
    }
}

/// Result type alias for Refinr operations
pub type Result<T> = std::result::Result<T, RefinrError>;
