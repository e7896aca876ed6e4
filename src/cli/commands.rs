//! CLI command definitions using clap.
//!
//! Defines the main CLI structure and subcommands:
//! - run: refine an artifact against a scripted reasoner
//! - route: evaluate the convergence policy against score lists

use clap::{Parser, Subcommand};
use refinr::domain::{MAX_SCORE, MIN_SCORE};
use std::path::PathBuf;

/// Refinr - iterative artifact refinement
#[derive(Parser, Debug)]
#[command(name = "refinr")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// Main subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Refine an artifact toward a goal
    Run {
        /// What the refined artifact should achieve
        #[arg(short, long)]
        goal: String,

        /// Initial artifact text
        #[arg(short, long, conflicts_with = "artifact_file", required_unless_present = "artifact_file")]
        artifact: Option<String>,

        /// Read the initial artifact from a file
        #[arg(short = 'f', long)]
        artifact_file: Option<PathBuf>,

        /// YAML script of reasoner responses
        #[arg(short, long)]
        script: PathBuf,

        /// Print the run outcome as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show what the router decides for a score history
    Route {
        /// Completed iterations, counting the latest
        #[arg(short, long)]
        iteration: u32,

        /// Comma-separated scores for one attempt; repeat oldest first
        #[arg(short, long = "scores", required = true, value_parser = parse_score_list)]
        scores: Vec<ScoreList>,
    },
}

/// Per-criterion scores of one attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreList(pub Vec<u8>);

fn parse_score_list(value: &str) -> Result<ScoreList, String> {
    value
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| {
            let score = s.parse::<u8>().map_err(|e| format!("invalid score '{}': {}", s, e))?;
            if (MIN_SCORE..=MAX_SCORE).contains(&score) {
                Ok(score)
            } else {
                Err(format!("score {} is outside {}..={}", score, MIN_SCORE, MAX_SCORE))
            }
        })
        .collect::<Result<Vec<_>, _>>()
        .and_then(|scores| {
            if scores.is_empty() {
                Err("score list is empty".to_string())
            } else {
                Ok(ScoreList(scores))
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_requires_subcommand() {
        assert!(Cli::try_parse_from(["refinr"]).is_err());
    }

    #[test]
    fn test_cli_global_flags() {
        let cli = Cli::try_parse_from([
            "refinr", "-v", "-c", "/tmp/refinr.yml", "route", "-i", "1", "-s", "9",
        ])
        .unwrap();
        assert!(cli.is_verbose());
        assert_eq!(cli.config.as_ref(), Some(&PathBuf::from("/tmp/refinr.yml")));
    }

    #[test]
    fn test_run_command() {
        let cli = Cli::try_parse_from([
            "refinr", "run", "--goal", "G", "--artifact", "A", "--script", "s.yml",
        ])
        .unwrap();
        match cli.command {
            Commands::Run {
                goal,
                artifact,
                artifact_file,
                script,
                json,
            } => {
                assert_eq!(goal, "G");
                assert_eq!(artifact.as_deref(), Some("A"));
                assert!(artifact_file.is_none());
                assert_eq!(script, PathBuf::from("s.yml"));
                assert!(!json);
            }
            _ => panic!("Expected run command"),
        }
    }

    #[test]
    fn test_run_with_artifact_file_and_json() {
        let cli = Cli::try_parse_from([
            "refinr", "run", "-g", "G", "-f", "prompt.txt", "-s", "s.yml", "--json",
        ])
        .unwrap();
        match cli.command {
            Commands::Run {
                artifact,
                artifact_file,
                json,
                ..
            } => {
                assert!(artifact.is_none());
                assert_eq!(artifact_file, Some(PathBuf::from("prompt.txt")));
                assert!(json);
            }
            _ => panic!("Expected run command"),
        }
    }

    #[test]
    fn test_run_requires_an_artifact() {
        assert!(Cli::try_parse_from(["refinr", "run", "-g", "G", "-s", "s.yml"]).is_err());
    }

    #[test]
    fn test_run_rejects_both_artifact_sources() {
        let result = Cli::try_parse_from([
            "refinr", "run", "-g", "G", "-a", "A", "-f", "prompt.txt", "-s", "s.yml",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_route_command() {
        let cli = Cli::try_parse_from(["refinr", "route", "-i", "2", "-s", "7,7", "-s", "6, 8"]).unwrap();
        match cli.command {
            Commands::Route { iteration, scores } => {
                assert_eq!(iteration, 2);
                assert_eq!(scores, vec![ScoreList(vec![7, 7]), ScoreList(vec![6, 8])]);
            }
            _ => panic!("Expected route command"),
        }
    }

    #[test]
    fn test_route_rejects_bad_scores() {
        assert!(Cli::try_parse_from(["refinr", "route", "-i", "1", "-s", "7,x"]).is_err());
        assert!(Cli::try_parse_from(["refinr", "route", "-i", "1", "-s", ","]).is_err());
        assert!(Cli::try_parse_from(["refinr", "route", "-i", "1"]).is_err());
    }

    #[test]
    fn test_route_rejects_out_of_range_scores() {
        assert!(Cli::try_parse_from(["refinr", "route", "-i", "1", "-s", "11,11"]).is_err());
        assert!(Cli::try_parse_from(["refinr", "route", "-i", "2", "-s", "0", "-s", "200"]).is_err());
        assert!(Cli::try_parse_from(["refinr", "route", "-i", "1", "-s", "1,10"]).is_ok());
    }

    #[test]
    fn test_help_works() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_version_flag() {
        let result = Cli::try_parse_from(["refinr", "--version"]);
        // Version flag causes early exit with error (expected)
        assert!(result.is_err());
    }
}
