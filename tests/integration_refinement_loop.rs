//! Refinement loop integration tests
//!
//! Drives complete runs through the public API with scripted reasoners.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use refinr::config::Config;
use refinr::convergence::{ConvergencePolicy, FinishReason, Verdict, route};
use refinr::domain::{Attempt, Criterion, CriterionScore, Evaluation, TerminationReason};
use refinr::history::{IterationRecord, select_best};
use refinr::reasoner::{
    Reasoner, ReasonerError, ReasonerRequest, ReasonerResponse, ScriptedReasoner, TaskKind, TimeoutReasoner,
};
use refinr::runner::{ControllerConfig, LoopController};
use refinr::{RefinrError, Result};
use tempfile::NamedTempFile;

const SCRIPT: &str = r#"
- kind: criteria
  criteria: [clarity]
- kind: plan
  plan: "1. Say what the prompt is for"
- kind: candidate
  content: "A1"
  rationale: "added purpose"
- kind: evaluation
  scores:
    - criterion: clarity
      score: 6
      justification: "still vague"
  feedback: "name the audience"
- kind: reflection
  summary: "name the audience"
- kind: candidate
  content: "A2"
  rationale: "named the audience"
- kind: evaluation
  scores:
    - criterion: clarity
      score: 9
      justification: "clear"
  feedback: "good"
- kind: reflection
  summary: "done"
"#;

fn scored(content: &str, scores: &[u8]) -> Attempt {
    let scores = scores
        .iter()
        .enumerate()
        .map(|(i, s)| CriterionScore::new(Criterion::new(format!("c{}", i)), *s, ""))
        .collect();
    Attempt::evaluated(content, "", Evaluation::new(scores, ""))
}

/// Integration test: the two-iteration scenario from a YAML script on disk
#[tokio::test]
async fn test_scripted_run_from_file() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{}", SCRIPT).unwrap();

    let reasoner = Arc::new(ScriptedReasoner::from_file(file.path()).unwrap());
    let outcome = LoopController::new(reasoner.clone()).run("A", "G").await;

    assert_eq!(outcome.termination_reason, TerminationReason::ScoreThresholdMet);
    assert_eq!(outcome.final_artifact().unwrap(), "A2");
    assert_eq!(outcome.iterations, 2);
    assert_eq!(reasoner.remaining(), 0);

    let kinds: Vec<TaskKind> = reasoner.requests().iter().map(|r| r.kind()).collect();
    assert_eq!(
        kinds,
        vec![
            TaskKind::DecomposeGoal,
            TaskKind::FormulateStrategy,
            TaskKind::GeneratePrompt,
            TaskKind::EvaluatePrompt,
            TaskKind::SynthesizeReflection,
            TaskKind::GeneratePrompt,
            TaskKind::EvaluatePrompt,
            TaskKind::SynthesizeReflection,
        ]
    );
}

/// Integration test: outcome JSON carries history and reason
#[tokio::test]
async fn test_outcome_serializes_to_json() {
    let reasoner = Arc::new(ScriptedReasoner::from_yaml_str(SCRIPT).unwrap());
    let outcome = LoopController::new(reasoner).run("A", "G").await;

    let json = serde_json::to_value(&outcome).unwrap();
    assert_eq!(json["final_artifact"], "A2");
    assert_eq!(json["termination_reason"]["reason"], "score_threshold_met");
    assert_eq!(json["history"].as_array().unwrap().len(), 2);
    assert_eq!(json["criteria"][0], "clarity");
}

/// Integration test: a failure entry in the script ends the run
#[tokio::test]
async fn test_scripted_failure_is_fatal() {
    let yaml = r#"
- kind: criteria
  criteria: [clarity]
- fail: "rate limited"
"#;
    let reasoner = Arc::new(ScriptedReasoner::from_yaml_str(yaml).unwrap());
    let outcome = LoopController::new(reasoner).run("A", "G").await;

    assert_eq!(
        outcome.termination_reason,
        TerminationReason::Fatal(RefinrError::ReasonerUnavailable {
            task: TaskKind::FormulateStrategy,
            source: ReasonerError::Unavailable("rate limited".to_string()),
        })
    );
    assert_eq!(outcome.final_artifact(), Err(RefinrError::NoCandidatesProduced));
}

/// Integration test: config thresholds flow into the controller
#[tokio::test]
async fn test_config_policy_drives_run() {
    let mut config_file = NamedTempFile::new().unwrap();
    writeln!(
        config_file,
        "convergence:\n  score_threshold: 6.0\n  max_iterations: 3\nrun:\n  initial_reflection: \"go\""
    )
    .unwrap();
    let config = Config::load(Some(&config_file.path().to_path_buf())).unwrap();

    let reasoner = Arc::new(ScriptedReasoner::from_yaml_str(SCRIPT).unwrap());
    let controller = LoopController::with_config(reasoner.clone(), ControllerConfig::from(&config));
    let outcome = controller.run("A", "G").await;

    // 6 already clears the lowered threshold
    assert_eq!(outcome.termination_reason, TerminationReason::ScoreThresholdMet);
    assert_eq!(outcome.iterations, 1);
    assert_eq!(outcome.final_artifact().unwrap(), "A1");

    match &reasoner.requests()[2] {
        ReasonerRequest::GeneratePrompt { reflection, .. } => assert_eq!(reflection.as_str(), "go"),
        other => panic!("expected generation request, got {:?}", other),
    }
}

struct StuckReasoner;

#[async_trait]
impl Reasoner for StuckReasoner {
    async fn invoke(&self, _request: ReasonerRequest) -> std::result::Result<ReasonerResponse, ReasonerError> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(ReasonerResponse::criteria(["never"]))
    }
}

/// Integration test: a hung reasoner is cut off by the timeout wrapper
#[tokio::test]
async fn test_timeout_ends_run() {
    let reasoner = Arc::new(TimeoutReasoner::new(StuckReasoner, Duration::from_millis(50)));
    let outcome = LoopController::new(reasoner).run("A", "G").await;

    assert_eq!(
        outcome.termination_reason,
        TerminationReason::Fatal(RefinrError::ReasonerUnavailable {
            task: TaskKind::DecomposeGoal,
            source: ReasonerError::Timeout(Duration::from_millis(50)),
        })
    );
}

/// Integration test: append then attach keeps exactly one open attempt
#[test]
fn test_history_append_then_attach() -> Result<()> {
    let mut record = IterationRecord::new();
    assert_eq!(
        record.attach_evaluation(Evaluation::new(vec![], "")),
        Err(RefinrError::NoOpenAttempt)
    );

    record.append(refinr::domain::Candidate::new("A1", "r"));
    assert!(record.has_open_attempt());
    record.attach_evaluation(Evaluation::new(vec![CriterionScore::new("clarity", 7, "")], ""))?;
    assert!(!record.has_open_attempt());
    assert_eq!(
        record.attach_evaluation(Evaluation::new(vec![], "")),
        Err(RefinrError::NoOpenAttempt)
    );
    Ok(())
}

/// Integration test: routing properties over hand-built histories
#[test]
fn test_routing_properties() -> Result<()> {
    // Threshold short-circuits on the first iteration
    assert_eq!(route(1, &[scored("A1", &[9, 8])])?, Verdict::Finish(FinishReason::ScoreThreshold));

    // Tie is a stall
    let tie = [scored("A1", &[7]), scored("A2", &[7])];
    assert_eq!(route(2, &tie)?, Verdict::ReviseStrategy);

    // Cap wins over a stall
    assert_eq!(route(5, &tie)?, Verdict::Finish(FinishReason::IterationCap));

    // Strict improvement continues
    let up = [scored("A1", &[6]), scored("A2", &[7])];
    assert_eq!(route(2, &up)?, Verdict::Continue);

    // A custom policy moves the cap
    assert_eq!(
        ConvergencePolicy::new(8.5, 2).route(2, &up)?,
        Verdict::Finish(FinishReason::IterationCap)
    );

    assert!(matches!(route(0, &up), Err(RefinrError::MalformedHistory(_))));
    Ok(())
}

/// Integration test: the best attempt wins by total, earliest on ties
#[test]
fn test_best_attempt_selection() -> Result<()> {
    let history = [scored("A1", &[8, 8]), scored("A2", &[9, 7]), scored("A3", &[5, 5])];
    assert_eq!(select_best(&history)?.content, "A1");

    let history = [scored("A1", &[5, 5]), scored("A2", &[9, 8])];
    assert_eq!(select_best(&history)?.content, "A2");

    assert_eq!(select_best(&[]).err(), Some(RefinrError::NoCandidatesProduced));
    Ok(())
}
