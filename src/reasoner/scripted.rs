//! Scripted reasoner - replays a fixed sequence of responses.
//!
//! Used by tests and by `refinr run --script` for deterministic dry runs.
//! Every request is recorded so callers can assert on what the loop asked.
//!
//! Script files are YAML lists. Each entry is either a tagged response or a
//! failure:
//!
//! ```yaml
//! - kind: criteria
//!   criteria: [clarity]
//! - kind: plan
//!   plan: "1. Tighten the wording"
//! - kind: candidate
//!   content: "A1"
//!   rationale: "shorter"
//! - fail: "service down"
//! ```

use async_trait::async_trait;
use eyre::{Context, Result};
use serde::Deserialize;
use std::collections::VecDeque;
use std::fs;
use std::path::Path;
use std::sync::Mutex;

use super::{Reasoner, ReasonerError, ReasonerRequest, ReasonerResponse};

type Step = std::result::Result<ReasonerResponse, ReasonerError>;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ScriptEntry {
    Failure { fail: String },
    Response(ReasonerResponse),
}

impl From<ScriptEntry> for Step {
    fn from(entry: ScriptEntry) -> Self {
        match entry {
            ScriptEntry::Failure { fail } => Err(ReasonerError::Unavailable(fail)),
            ScriptEntry::Response(response) => Ok(response),
        }
    }
}

/// Reasoner that answers from a queue, oldest first
#[derive(Debug, Default)]
pub struct ScriptedReasoner {
    script: Mutex<VecDeque<Step>>,
    requests: Mutex<Vec<ReasonerRequest>>,
}

impl ScriptedReasoner {
    pub fn new(responses: impl IntoIterator<Item = ReasonerResponse>) -> Self {
        Self {
            script: Mutex::new(responses.into_iter().map(Ok).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue another response
    pub fn push(&self, response: ReasonerResponse) {
        self.lock_script().push_back(Ok(response));
    }

    /// Queue a failed call
    pub fn push_failure(&self, error: ReasonerError) {
        self.lock_script().push_back(Err(error));
    }

    /// Builder form of push_failure
    pub fn then_fail(self, error: ReasonerError) -> Self {
        self.push_failure(error);
        self
    }

    /// Parse a YAML script
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let entries: Vec<ScriptEntry> = serde_yaml::from_str(yaml).context("Failed to parse reasoner script")?;
        Ok(Self {
            script: Mutex::new(entries.into_iter().map(Step::from).collect()),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Load a YAML script from disk
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content =
            fs::read_to_string(path).with_context(|| format!("Failed to read reasoner script {}", path.display()))?;
        let reasoner = Self::from_yaml_str(&content)?;
        log::info!("Loaded {} scripted responses from {}", reasoner.remaining(), path.display());
        Ok(reasoner)
    }

    /// Requests received so far, in order
    pub fn requests(&self) -> Vec<ReasonerRequest> {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Responses not yet consumed
    pub fn remaining(&self) -> usize {
        self.lock_script().len()
    }

    fn lock_script(&self) -> std::sync::MutexGuard<'_, VecDeque<Step>> {
        self.script.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl Reasoner for ScriptedReasoner {
    async fn invoke(&self, request: ReasonerRequest) -> std::result::Result<ReasonerResponse, ReasonerError> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request);
        self.lock_script().pop_front().unwrap_or(Err(ReasonerError::Exhausted))
    }
}
