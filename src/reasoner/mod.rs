//! Reasoner collaborator - the boundary to whatever produces text.
//!
//! This module provides:
//! - Reasoner trait: one structured request in, one structured response out
//! - TaskKind and the request/response enums shared by every implementation
//! - ScriptedReasoner: deterministic replay for tests and dry runs
//! - TimeoutReasoner: bounds each call of an inner reasoner
//!
//! The loop never interprets or repairs reasoner output. A response of the
//! wrong kind is a failed call.

pub mod scripted;
pub mod timeout;

pub use scripted::ScriptedReasoner;
pub use timeout::TimeoutReasoner;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::domain::{Attempt, Candidate, Criterion, Evaluation, Plan, Reflection};

/// Stateless reasoner - each call is independent and answered exactly once
#[async_trait]
pub trait Reasoner: Send + Sync {
    async fn invoke(&self, request: ReasonerRequest) -> Result<ReasonerResponse, ReasonerError>;
}

#[async_trait]
impl<R: Reasoner + ?Sized> Reasoner for Arc<R> {
    async fn invoke(&self, request: ReasonerRequest) -> Result<ReasonerResponse, ReasonerError> {
        (**self).invoke(request).await
    }
}

/// The five things a reasoner is asked to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    DecomposeGoal,
    FormulateStrategy,
    GeneratePrompt,
    EvaluatePrompt,
    SynthesizeReflection,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::DecomposeGoal => "decompose_goal",
            TaskKind::FormulateStrategy => "formulate_strategy",
            TaskKind::GeneratePrompt => "generate_prompt",
            TaskKind::EvaluatePrompt => "evaluate_prompt",
            TaskKind::SynthesizeReflection => "synthesize_reflection",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured context for one reasoner call
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "task", rename_all = "snake_case")]
pub enum ReasonerRequest {
    DecomposeGoal {
        goal: String,
    },
    FormulateStrategy {
        goal: String,
        initial_artifact: String,
        /// Newest attempt's content, None on the first pass
        latest_artifact: Option<String>,
        criteria: Vec<Criterion>,
        /// Full history so a revised plan can avoid repeating a failed one
        history: Vec<Attempt>,
    },
    GeneratePrompt {
        plan: Plan,
        base_artifact: String,
        reflection: Reflection,
    },
    EvaluatePrompt {
        content: String,
        criteria: Vec<Criterion>,
    },
    SynthesizeReflection {
        evaluation: Evaluation,
    },
}

impl ReasonerRequest {
    pub fn kind(&self) -> TaskKind {
        match self {
            ReasonerRequest::DecomposeGoal { .. } => TaskKind::DecomposeGoal,
            ReasonerRequest::FormulateStrategy { .. } => TaskKind::FormulateStrategy,
            ReasonerRequest::GeneratePrompt { .. } => TaskKind::GeneratePrompt,
            ReasonerRequest::EvaluatePrompt { .. } => TaskKind::EvaluatePrompt,
            ReasonerRequest::SynthesizeReflection { .. } => TaskKind::SynthesizeReflection,
        }
    }
}

/// Structured result of one reasoner call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReasonerResponse {
    Criteria { criteria: Vec<Criterion> },
    Plan { plan: Plan },
    Candidate(Candidate),
    Evaluation(Evaluation),
    Reflection { summary: Reflection },
}

impl ReasonerResponse {
    /// The task this response answers
    pub fn kind(&self) -> TaskKind {
        match self {
            ReasonerResponse::Criteria { .. } => TaskKind::DecomposeGoal,
            ReasonerResponse::Plan { .. } => TaskKind::FormulateStrategy,
            ReasonerResponse::Candidate(_) => TaskKind::GeneratePrompt,
            ReasonerResponse::Evaluation(_) => TaskKind::EvaluatePrompt,
            ReasonerResponse::Reflection { .. } => TaskKind::SynthesizeReflection,
        }
    }

    pub fn criteria(criteria: impl IntoIterator<Item = impl Into<Criterion>>) -> Self {
        ReasonerResponse::Criteria {
            criteria: criteria.into_iter().map(Into::into).collect(),
        }
    }

    pub fn plan(plan: impl Into<String>) -> Self {
        ReasonerResponse::Plan { plan: Plan::new(plan) }
    }

    pub fn candidate(content: impl Into<String>, rationale: impl Into<String>) -> Self {
        ReasonerResponse::Candidate(Candidate::new(content, rationale))
    }

    pub fn reflection(summary: impl Into<String>) -> Self {
        ReasonerResponse::Reflection {
            summary: Reflection::new(summary),
        }
    }
}

/// Errors a reasoner call can end with
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReasonerError {
    #[error("Reasoner unavailable: {0}")]
    Unavailable(String),

    #[error("Reasoner timed out after {0:?}")]
    Timeout(Duration),

    #[error("Expected a {expected} response, got {actual}")]
    UnexpectedResponse { expected: TaskKind, actual: TaskKind },

    #[error("Reasoner has no responses left")]
    Exhausted,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_kinds() {
        let request = ReasonerRequest::DecomposeGoal { goal: "G".to_string() };
        assert_eq!(request.kind(), TaskKind::DecomposeGoal);

        let request = ReasonerRequest::EvaluatePrompt {
            content: "A".to_string(),
            criteria: vec![Criterion::new("clarity")],
        };
        assert_eq!(request.kind(), TaskKind::EvaluatePrompt);
    }

    #[test]
    fn test_response_kinds_match_tasks() {
        assert_eq!(ReasonerResponse::criteria(["a"]).kind(), TaskKind::DecomposeGoal);
        assert_eq!(ReasonerResponse::plan("p").kind(), TaskKind::FormulateStrategy);
        assert_eq!(ReasonerResponse::candidate("c", "r").kind(), TaskKind::GeneratePrompt);
        assert_eq!(
            ReasonerResponse::Evaluation(Evaluation::new(vec![], "f")).kind(),
            TaskKind::EvaluatePrompt
        );
        assert_eq!(ReasonerResponse::reflection("s").kind(), TaskKind::SynthesizeReflection);
    }

    #[test]
    fn test_task_kind_display() {
        assert_eq!(TaskKind::GeneratePrompt.to_string(), "generate_prompt");
        assert_eq!(
            serde_json::to_string(&TaskKind::SynthesizeReflection).unwrap(),
            "\"synthesize_reflection\""
        );
    }

    #[test]
    fn test_response_deserializes_from_tagged_json() {
        let json = r#"{"kind": "criteria", "criteria": ["clarity", "brevity"]}"#;
        let response: ReasonerResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response, ReasonerResponse::criteria(["clarity", "brevity"]));

        let json = r#"{"kind": "candidate", "content": "A1", "rationale": "shorter"}"#;
        let response: ReasonerResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response, ReasonerResponse::candidate("A1", "shorter"));
    }

    #[test]
    fn test_request_serializes_with_task_tag() {
        let request = ReasonerRequest::SynthesizeReflection {
            evaluation: Evaluation::new(vec![], "meh"),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["task"], "synthesize_reflection");
        assert_eq!(json["evaluation"]["feedback"], "meh");
    }

    #[test]
    fn test_unexpected_response_message() {
        let err = ReasonerError::UnexpectedResponse {
            expected: TaskKind::FormulateStrategy,
            actual: TaskKind::GeneratePrompt,
        };
        assert_eq!(
            err.to_string(),
            "Expected a formulate_strategy response, got generate_prompt"
        );
    }
}
