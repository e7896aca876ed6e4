//! Iteration record store.
//!
//! Append-only sequence of attempts with a single mutable step: attaching the
//! evaluation to the newest attempt, once.

use serde::Serialize;

use crate::domain::{Attempt, Candidate, Evaluation};
use crate::error::{RefinrError, Result};

/// Ordered attempts of one run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct IterationRecord {
    attempts: Vec<Attempt>,
}

impl IterationRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an unevaluated attempt built from the candidate. Returns its index.
    pub fn append(&mut self, candidate: Candidate) -> usize {
        self.attempts.push(candidate.into());
        self.attempts.len() - 1
    }

    /// Attach the evaluation to the newest attempt.
    ///
    /// Fails with NoOpenAttempt when there is no attempt or the newest one is
    /// already scored.
    pub fn attach_evaluation(&mut self, evaluation: Evaluation) -> Result<()> {
        match self.attempts.last_mut() {
            Some(attempt) if !attempt.is_evaluated() => {
                attempt.set_evaluation(evaluation);
                Ok(())
            }
            _ => Err(RefinrError::NoOpenAttempt),
        }
    }

    /// True when the newest attempt is waiting for its evaluation
    pub fn has_open_attempt(&self) -> bool {
        self.attempts.last().is_some_and(|a| !a.is_evaluated())
    }

    pub fn attempts(&self) -> &[Attempt] {
        &self.attempts
    }

    pub fn last(&self) -> Option<&Attempt> {
        self.attempts.last()
    }

    pub fn len(&self) -> usize {
        self.attempts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attempts.is_empty()
    }

    pub fn into_attempts(self) -> Vec<Attempt> {
        self.attempts
    }
}
