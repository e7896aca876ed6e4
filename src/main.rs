use clap::Parser;
use colored::*;
use eyre::{Context, Result, bail};
use log::info;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

mod cli;

use cli::Cli;
use cli::commands::{Commands, ScoreList};
use refinr::config::Config;
use refinr::convergence::{FinishReason, Verdict};
use refinr::domain::{Attempt, Criterion, CriterionScore, Evaluation, RunOutcome, TerminationReason};
use refinr::reasoner::{ScriptedReasoner, TimeoutReasoner};
use refinr::runner::{CancelFlag, ControllerConfig, LoopController};

fn setup_logging(level: Option<&str>) -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("refinr")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("refinr.log");

    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    // RUST_LOG wins over the configured level
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level.unwrap_or("info")))
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

async fn run_application(cli: &Cli, config: &Config) -> Result<()> {
    info!("Starting application");

    if cli.is_verbose() {
        println!("{}", "Verbose mode enabled".yellow());
    }

    match &cli.command {
        Commands::Run {
            goal,
            artifact,
            artifact_file,
            script,
            json,
        } => {
            let initial = read_artifact(artifact.as_deref(), artifact_file.as_ref())?;
            handle_run_command(goal, &initial, script, *json, cli.is_verbose(), config).await
        }
        Commands::Route { iteration, scores } => handle_route_command(*iteration, scores, config),
    }
}

fn read_artifact(artifact: Option<&str>, artifact_file: Option<&PathBuf>) -> Result<String> {
    match (artifact, artifact_file) {
        (Some(text), _) => Ok(text.to_string()),
        (None, Some(path)) => {
            fs::read_to_string(path).with_context(|| format!("Failed to read artifact from {}", path.display()))
        }
        (None, None) => bail!("Either --artifact or --artifact-file is required"),
    }
}

async fn handle_run_command(
    goal: &str,
    initial: &str,
    script: &PathBuf,
    json: bool,
    verbose: bool,
    config: &Config,
) -> Result<()> {
    info!("Running refinement for goal: {}", goal);

    let scripted = ScriptedReasoner::from_file(script)?;
    let reasoner = Arc::new(TimeoutReasoner::new(scripted, config.reasoner.timeout()));

    let cancel = CancelFlag::new();
    let handle = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupt received, cancelling run");
            handle.cancel();
        }
    });

    let controller =
        LoopController::with_config(reasoner, ControllerConfig::from(config)).with_cancel_signal(Arc::new(cancel));
    let outcome = controller.run(initial, goal).await;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&outcome).context("Failed to serialize run outcome")?
        );
    } else {
        print_outcome(&outcome, verbose);
    }

    if outcome.termination_reason.is_fatal() {
        bail!("Run {} did not complete", outcome.run_id);
    }
    Ok(())
}

fn print_outcome(outcome: &RunOutcome, verbose: bool) {
    println!("{} {}", "Run:".cyan(), outcome.run_id);

    for (i, attempt) in outcome.history.iter().enumerate() {
        let score = match attempt.evaluation().and_then(|e| e.average().ok()) {
            Some(average) => format!("{:.2}", average),
            None => "unscored".to_string(),
        };
        println!("  {} {} {}", format!("#{}", i + 1).bold(), score.yellow(), attempt.rationale);
        if verbose {
            if let Some(evaluation) = attempt.evaluation() {
                for score in &evaluation.scores {
                    println!("      {} {}: {}", score.score, score.criterion, score.justification);
                }
            }
        }
    }

    let reason = match &outcome.termination_reason {
        TerminationReason::ScoreThresholdMet => "score threshold met".green(),
        TerminationReason::MaxIterationsReached => "iteration cap reached".yellow(),
        TerminationReason::Cancelled => "cancelled".yellow(),
        TerminationReason::Fatal(error) => format!("failed: {}", error).red(),
    };
    println!(
        "{} {} after {} iteration(s)",
        "Finished:".cyan(),
        reason,
        outcome.iterations
    );

    match outcome.final_artifact() {
        Ok(artifact) => {
            println!("{}", "Final artifact:".green());
            println!("{}", artifact);
        }
        Err(e) => println!("{} {}", "No final artifact:".red(), e),
    }
}

fn handle_route_command(iteration: u32, scores: &[ScoreList], config: &Config) -> Result<()> {
    info!("Routing iteration {} over {} attempts", iteration, scores.len());

    let history: Vec<Attempt> = scores
        .iter()
        .enumerate()
        .map(|(i, list)| {
            let scored = list
                .0
                .iter()
                .enumerate()
                .map(|(c, s)| CriterionScore::new(Criterion::new(format!("criterion {}", c + 1)), *s, ""))
                .collect();
            Attempt::evaluated(format!("attempt {}", i + 1), "", Evaluation::new(scored, ""))
        })
        .collect();

    for (i, attempt) in history.iter().enumerate() {
        if let Some(average) = attempt.evaluation().and_then(|e| e.average().ok()) {
            println!("  {} average {:.2}", format!("#{}", i + 1).bold(), average);
        }
    }

    let verdict = config.policy().route(iteration, &history).context("Routing failed")?;
    let text = match verdict {
        Verdict::Continue => "continue".green(),
        Verdict::ReviseStrategy => "revise strategy".yellow(),
        Verdict::Finish(FinishReason::ScoreThreshold) => "finish (score threshold met)".cyan(),
        Verdict::Finish(FinishReason::IterationCap) => "finish (iteration cap reached)".cyan(),
    };
    println!("{} {}", "Verdict:".bold(), text);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    setup_logging(config.log_level.as_deref()).context("Failed to setup logging")?;

    info!("Starting with config from: {:?}", cli.config);

    // Run the main application logic
    run_application(&cli, &config).await.context("Application failed")?;

    Ok(())
}
