//! Live state of a single refinement run
//!
//! LoopState is owned by exactly one LoopController run. Nothing here is
//! shared between runs.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::attempt::Criterion;
use crate::history::IterationRecord;
use crate::id::generate_run_id;

/// Free-text improvement strategy, replaced wholesale on every revision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Plan(String);

impl Plan {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Directive for the next generation step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Reflection(String);

impl Reflection {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Reflection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Everything a run carries from stage to stage
#[derive(Debug, Clone)]
pub struct LoopState {
    /// Tags every log line of the run
    pub run_id: String,

    //=== Inputs (immutable for the run) ===
    initial_artifact: String,
    goal: String,

    //=== Derived ===
    /// Criteria produced by goal decomposition
    pub criteria: Vec<Criterion>,

    /// Current strategy, None until the first FormulatingStrategy pass
    pub plan: Option<Plan>,

    /// Ordered attempts, append-only with a mutable tail
    pub history: IterationRecord,

    /// Latest reflection
    pub reflection: Reflection,

    //=== Progress ===
    /// Completed routing passes
    pub iteration: u32,

    /// Set only at termination
    pub final_artifact: Option<String>,
}

impl LoopState {
    pub fn new(initial_artifact: impl Into<String>, goal: impl Into<String>, initial_reflection: Reflection) -> Self {
        Self {
            run_id: generate_run_id(),
            initial_artifact: initial_artifact.into(),
            goal: goal.into(),
            criteria: Vec::new(),
            plan: None,
            history: IterationRecord::new(),
            reflection: initial_reflection,
            iteration: 0,
            final_artifact: None,
        }
    }

    pub fn initial_artifact(&self) -> &str {
        &self.initial_artifact
    }

    pub fn goal(&self) -> &str {
        &self.goal
    }

    /// Content the next generation step should revise
    pub fn base_artifact(&self) -> &str {
        self.history
            .last()
            .map(|attempt| attempt.content.as_str())
            .unwrap_or(&self.initial_artifact)
    }
}
