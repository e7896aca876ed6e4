//! Loop controller - the refinement state machine.
//!
//! Each run walks the stages
//!
//! ```text
//! DecomposingGoal -> FormulatingStrategy -> Generating -> Evaluating
//!     -> Reflecting -> Routing -> {FormulatingStrategy | Generating | Finished}
//! ```
//!
//! one at a time, awaiting the reasoner inside each stage. Routing delegates
//! to the pure ConvergencePolicy. Any failure ends the run; a failed stage
//! leaves the LoopState exactly as it found it.

use chrono::Utc;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

use super::cancel::{CancelSignal, NoOpCancelSignal};
use crate::config::{Config, DEFAULT_INITIAL_REFLECTION};
use crate::convergence::{ConvergencePolicy, FinishReason, Verdict};
use crate::domain::{LoopState, Reflection, RunOutcome, TerminationReason};
use crate::error::{RefinrError, Result};
use crate::history::select_best;
use crate::reasoner::{Reasoner, ReasonerError, ReasonerRequest, ReasonerResponse, TaskKind};

/// Where a run currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    DecomposingGoal,
    FormulatingStrategy,
    Generating,
    Evaluating,
    Reflecting,
    Routing,
    Finished(FinishReason),
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::DecomposingGoal => "decomposing_goal",
            Stage::FormulatingStrategy => "formulating_strategy",
            Stage::Generating => "generating",
            Stage::Evaluating => "evaluating",
            Stage::Reflecting => "reflecting",
            Stage::Routing => "routing",
            Stage::Finished(_) => "finished",
        };
        f.write_str(name)
    }
}

/// Configuration for the LoopController.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Thresholds for the routing decision
    pub policy: ConvergencePolicy,
    /// Reflection handed to the first generation step
    pub initial_reflection: Reflection,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            policy: ConvergencePolicy::default(),
            initial_reflection: Reflection::new(DEFAULT_INITIAL_REFLECTION),
        }
    }
}

impl From<&Config> for ControllerConfig {
    fn from(config: &Config) -> Self {
        Self {
            policy: config.policy(),
            initial_reflection: Reflection::new(config.run.initial_reflection.clone()),
        }
    }
}

/// Drives refinement runs against a reasoner.
///
/// The controller holds no per-run state, so one controller can serve many
/// runs, sequentially or concurrently.
pub struct LoopController<R: Reasoner> {
    reasoner: Arc<R>,
    cancel: Arc<dyn CancelSignal>,
    config: ControllerConfig,
}

impl<R: Reasoner> LoopController<R> {
    /// Create a controller with default configuration and no cancellation.
    pub fn new(reasoner: Arc<R>) -> Self {
        Self::with_config(reasoner, ControllerConfig::default())
    }

    /// Create a controller with custom configuration.
    pub fn with_config(reasoner: Arc<R>, config: ControllerConfig) -> Self {
        Self {
            reasoner,
            cancel: Arc::new(NoOpCancelSignal),
            config,
        }
    }

    /// Check `cancel` before every stage.
    pub fn with_cancel_signal(mut self, cancel: Arc<dyn CancelSignal>) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Fresh state for a run of this controller.
    pub fn new_state(&self, initial_artifact: impl Into<String>, goal: impl Into<String>) -> LoopState {
        LoopState::new(initial_artifact, goal, self.config.initial_reflection.clone())
    }

    /// Run the loop to termination.
    ///
    /// Never fails: fatal errors are reported through the outcome's
    /// termination reason, together with whatever history was produced.
    pub async fn run(&self, initial_artifact: impl Into<String>, goal: impl Into<String>) -> RunOutcome {
        let started_at = Utc::now();
        let mut state = self.new_state(initial_artifact, goal);
        tracing::info!(run_id = %state.run_id, "Refinement run started");

        let mut stage = Stage::DecomposingGoal;
        let termination_reason = loop {
            if let Stage::Finished(reason) = stage {
                break TerminationReason::from(reason);
            }
            if self.cancel.should_stop(&state.run_id).await {
                tracing::warn!(run_id = %state.run_id, stage = %stage, "Run cancelled");
                break TerminationReason::Cancelled;
            }

            match self.step(stage, &mut state).await {
                Ok(next) => {
                    tracing::debug!(
                        run_id = %state.run_id,
                        from = %stage,
                        to = %next,
                        iteration = state.iteration,
                        "Stage transition"
                    );
                    stage = next;
                }
                Err(error) => {
                    tracing::error!(
                        run_id = %state.run_id,
                        stage = %stage,
                        invariant = error.is_invariant_violation(),
                        error = %error,
                        "Run failed"
                    );
                    break TerminationReason::Fatal(error);
                }
            }
        };

        if state.final_artifact.is_none() {
            state.final_artifact = select_best(state.history.attempts()).ok().map(|a| a.content.clone());
        }

        tracing::info!(
            run_id = %state.run_id,
            iterations = state.iteration,
            attempts = state.history.len(),
            reason = ?termination_reason,
            "Refinement run finished"
        );

        RunOutcome {
            run_id: state.run_id,
            final_artifact: state.final_artifact,
            history: state.history.into_attempts(),
            criteria: state.criteria,
            iterations: state.iteration,
            termination_reason,
            started_at,
            finished_at: Utc::now(),
        }
    }

    /// Execute one stage and return the stage that follows it.
    pub async fn step(&self, stage: Stage, state: &mut LoopState) -> Result<Stage> {
        match stage {
            Stage::DecomposingGoal => self.decompose_goal(state).await,
            Stage::FormulatingStrategy => self.formulate_strategy(state).await,
            Stage::Generating => self.generate(state).await,
            Stage::Evaluating => self.evaluate(state).await,
            Stage::Reflecting => self.reflect(state).await,
            Stage::Routing => self.route(state),
            Stage::Finished(_) => Ok(stage),
        }
    }

    async fn decompose_goal(&self, state: &mut LoopState) -> Result<Stage> {
        if !state.criteria.is_empty() {
            return Err(RefinrError::InvalidTransition(
                "goal decomposition runs once per run".to_string(),
            ));
        }

        let request = ReasonerRequest::DecomposeGoal {
            goal: state.goal().to_string(),
        };
        let criteria = match self.call(request).await? {
            ReasonerResponse::Criteria { criteria } => criteria,
            other => return Err(unexpected(TaskKind::DecomposeGoal, &other)),
        };
        if criteria.is_empty() {
            return Err(RefinrError::EmptyCriteriaSet);
        }

        tracing::info!(run_id = %state.run_id, count = criteria.len(), "Goal decomposed into criteria");
        state.criteria = criteria;
        Ok(Stage::FormulatingStrategy)
    }

    async fn formulate_strategy(&self, state: &mut LoopState) -> Result<Stage> {
        let request = ReasonerRequest::FormulateStrategy {
            goal: state.goal().to_string(),
            initial_artifact: state.initial_artifact().to_string(),
            latest_artifact: state.history.last().map(|a| a.content.clone()),
            criteria: state.criteria.clone(),
            history: state.history.attempts().to_vec(),
        };
        let plan = match self.call(request).await? {
            ReasonerResponse::Plan { plan } => plan,
            other => return Err(unexpected(TaskKind::FormulateStrategy, &other)),
        };

        tracing::info!(
            run_id = %state.run_id,
            revision = state.plan.is_some(),
            "Strategy formulated"
        );
        state.plan = Some(plan);
        Ok(Stage::Generating)
    }

    async fn generate(&self, state: &mut LoopState) -> Result<Stage> {
        let plan = state
            .plan
            .clone()
            .ok_or_else(|| RefinrError::InvalidTransition("generation requires a plan".to_string()))?;

        let request = ReasonerRequest::GeneratePrompt {
            plan,
            base_artifact: state.base_artifact().to_string(),
            reflection: state.reflection.clone(),
        };
        let candidate = match self.call(request).await? {
            ReasonerResponse::Candidate(candidate) => candidate,
            other => return Err(unexpected(TaskKind::GeneratePrompt, &other)),
        };

        let index = state.history.append(candidate);
        tracing::debug!(run_id = %state.run_id, attempt = index + 1, "Candidate generated");
        Ok(Stage::Evaluating)
    }

    async fn evaluate(&self, state: &mut LoopState) -> Result<Stage> {
        let content = match state.history.last() {
            Some(attempt) if !attempt.is_evaluated() => attempt.content.clone(),
            _ => return Err(RefinrError::NoOpenAttempt),
        };

        let request = ReasonerRequest::EvaluatePrompt {
            content,
            criteria: state.criteria.clone(),
        };
        let evaluation = match self.call(request).await? {
            ReasonerResponse::Evaluation(evaluation) => evaluation,
            other => return Err(unexpected(TaskKind::EvaluatePrompt, &other)),
        };

        if evaluation.scores.len() != state.criteria.len() {
            return Err(RefinrError::ScoreCountMismatch {
                expected: state.criteria.len(),
                actual: evaluation.scores.len(),
            });
        }
        if let Some((position, (score, criterion))) = evaluation
            .scores
            .iter()
            .zip(&state.criteria)
            .enumerate()
            .find(|(_, (score, criterion))| score.criterion != **criterion)
        {
            return Err(RefinrError::CriterionMismatch {
                position,
                expected: criterion.to_string(),
                actual: score.criterion.to_string(),
            });
        }
        if let Some(score) = evaluation.scores.iter().find(|s| !s.in_range()) {
            return Err(RefinrError::ScoreOutOfRange {
                criterion: score.criterion.to_string(),
                score: score.score,
            });
        }

        let average = evaluation.average()?;
        state.history.attach_evaluation(evaluation)?;
        tracing::info!(
            run_id = %state.run_id,
            attempt = state.history.len(),
            average = average,
            "Candidate evaluated"
        );
        Ok(Stage::Reflecting)
    }

    async fn reflect(&self, state: &mut LoopState) -> Result<Stage> {
        let evaluation = state
            .history
            .last()
            .and_then(|a| a.evaluation())
            .cloned()
            .ok_or_else(|| RefinrError::InvalidTransition("reflection requires an evaluated attempt".to_string()))?;

        let request = ReasonerRequest::SynthesizeReflection { evaluation };
        let reflection = match self.call(request).await? {
            ReasonerResponse::Reflection { summary } => summary,
            other => return Err(unexpected(TaskKind::SynthesizeReflection, &other)),
        };

        state.reflection = reflection;
        Ok(Stage::Routing)
    }

    fn route(&self, state: &mut LoopState) -> Result<Stage> {
        let iteration = state.iteration + 1;
        let verdict = self.config.policy.route(iteration, state.history.attempts())?;

        let next = match verdict {
            Verdict::Finish(reason) => {
                let best = select_best(state.history.attempts())?.content.clone();
                state.final_artifact = Some(best);
                Stage::Finished(reason)
            }
            Verdict::ReviseStrategy => Stage::FormulatingStrategy,
            Verdict::Continue => Stage::Generating,
        };
        state.iteration = iteration;

        tracing::info!(run_id = %state.run_id, iteration = iteration, verdict = ?verdict, "Routed");
        Ok(next)
    }

    async fn call(&self, request: ReasonerRequest) -> Result<ReasonerResponse> {
        let task = request.kind();
        tracing::debug!(task = %task, "Invoking reasoner");
        self.reasoner
            .invoke(request)
            .await
            .map_err(|e| RefinrError::reasoner(task, e))
    }
}

fn unexpected(expected: TaskKind, response: &ReasonerResponse) -> RefinrError {
    RefinrError::reasoner(
        expected,
        ReasonerError::UnexpectedResponse {
            expected,
            actual: response.kind(),
        },
    )
}
