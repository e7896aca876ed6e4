//! Attempt and evaluation types
//!
//! An Attempt is one iteration's candidate artifact. It is created by the
//! generation stage and gains its Evaluation exactly once, through the
//! history store.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::convergence::aggregate;
use crate::error::Result;

/// Lowest score a criterion can receive
pub const MIN_SCORE: u8 = 1;

/// Highest score a criterion can receive
pub const MAX_SCORE: u8 = 10;

/// One measurable quality dimension derived from the goal
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Criterion(String);

impl Criterion {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Criterion {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

/// Generator output: revised content plus the reasoning behind it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub content: String,
    pub rationale: String,
}

impl Candidate {
    pub fn new(content: impl Into<String>, rationale: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            rationale: rationale.into(),
        }
    }
}

/// Score for a single criterion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriterionScore {
    pub criterion: Criterion,
    pub score: u8,
    pub justification: String,
}

impl CriterionScore {
    pub fn new(criterion: impl Into<Criterion>, score: u8, justification: impl Into<String>) -> Self {
        Self {
            criterion: criterion.into(),
            score,
            justification: justification.into(),
        }
    }

    /// True when the score lies within 1..=10
    pub fn in_range(&self) -> bool {
        (MIN_SCORE..=MAX_SCORE).contains(&self.score)
    }
}

/// Scores for every active criterion plus qualitative feedback
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    pub scores: Vec<CriterionScore>,
    pub feedback: String,
}

impl Evaluation {
    pub fn new(scores: Vec<CriterionScore>, feedback: impl Into<String>) -> Self {
        Self {
            scores,
            feedback: feedback.into(),
        }
    }

    /// Mean score across criteria
    pub fn average(&self) -> Result<f64> {
        aggregate::average(&self.scores)
    }

    /// Sum of all criterion scores
    pub fn total(&self) -> u32 {
        aggregate::total(&self.scores)
    }
}

/// One iteration's candidate artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attempt {
    pub content: String,
    pub rationale: String,
    evaluation: Option<Evaluation>,
}

impl Attempt {
    /// Create an attempt that has not been scored yet
    pub fn new(content: impl Into<String>, rationale: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            rationale: rationale.into(),
            evaluation: None,
        }
    }

    /// Create an already-scored attempt, used when rebuilding a history
    pub fn evaluated(content: impl Into<String>, rationale: impl Into<String>, evaluation: Evaluation) -> Self {
        Self {
            content: content.into(),
            rationale: rationale.into(),
            evaluation: Some(evaluation),
        }
    }

    pub fn evaluation(&self) -> Option<&Evaluation> {
        self.evaluation.as_ref()
    }

    pub fn is_evaluated(&self) -> bool {
        self.evaluation.is_some()
    }

    /// Only the history store may call this, and only once.
    pub(crate) fn set_evaluation(&mut self, evaluation: Evaluation) {
        debug_assert!(self.evaluation.is_none());
        self.evaluation = Some(evaluation);
    }
}

impl From<Candidate> for Attempt {
    fn from(candidate: Candidate) -> Self {
        Attempt::new(candidate.content, candidate.rationale)
    }
}
