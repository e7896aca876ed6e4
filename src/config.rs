use eyre::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::convergence::{ConvergencePolicy, DEFAULT_MAX_ITERATIONS, DEFAULT_SCORE_THRESHOLD};

/// Reflection the first generation step sees before any evaluation exists.
pub const DEFAULT_INITIAL_REFLECTION: &str =
    "This is the first iteration, so the goal is to establish a baseline improvement based on the initial plan.";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log_level: Option<String>,
    pub convergence: ConvergenceConfig,
    pub reasoner: ReasonerConfig,
    pub run: RunConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvergenceConfig {
    pub score_threshold: f64,
    pub max_iterations: u32,
}

impl Default for ConvergenceConfig {
    fn default() -> Self {
        Self {
            score_threshold: DEFAULT_SCORE_THRESHOLD,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

impl From<&ConvergenceConfig> for ConvergencePolicy {
    fn from(config: &ConvergenceConfig) -> Self {
        ConvergencePolicy::new(config.score_threshold, config.max_iterations)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReasonerConfig {
    pub timeout_ms: u64,
}

impl ReasonerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for ReasonerConfig {
    fn default() -> Self {
        Self { timeout_ms: 300000 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub initial_reflection: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            initial_reflection: DEFAULT_INITIAL_REFLECTION.to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: Some("info".to_string()),
            convergence: ConvergenceConfig::default(),
            reasoner: ReasonerConfig::default(),
            run: RunConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try primary location: ~/.config/<project>/<project>.yml
        if let Some(config_dir) = dirs::config_dir() {
            let project_name = env!("CARGO_PKG_NAME");
            let primary_config = config_dir.join(project_name).join(format!("{}.yml", project_name));
            if primary_config.exists() {
                match Self::load_from_file(&primary_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from {}: {}", primary_config.display(), e);
                    }
                }
            }
        }

        // Try fallback location: ./<project>.yml
        let project_name = env!("CARGO_PKG_NAME");
        let fallback_config = PathBuf::from(format!("{}.yml", project_name));
        if fallback_config.exists() {
            match Self::load_from_file(&fallback_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    log::warn!("Failed to load config from {}: {}", fallback_config.display(), e);
                }
            }
        }

        // No config file found, use defaults
        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        config.validate()?;

        log::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Reject values the router cannot work with or that loosen its stops
    pub fn validate(&self) -> Result<()> {
        let threshold = self.convergence.score_threshold;
        if !(threshold > 0.0 && threshold <= DEFAULT_SCORE_THRESHOLD) {
            bail!(
                "convergence.score_threshold must be in (0, {}], got {}",
                DEFAULT_SCORE_THRESHOLD,
                threshold
            );
        }
        let max_iterations = self.convergence.max_iterations;
        if !(1..=DEFAULT_MAX_ITERATIONS).contains(&max_iterations) {
            bail!(
                "convergence.max_iterations must be in 1..={}, got {}",
                DEFAULT_MAX_ITERATIONS,
                max_iterations
            );
        }
        if self.reasoner.timeout_ms == 0 {
            bail!("reasoner.timeout_ms must be positive");
        }
        Ok(())
    }

    pub fn policy(&self) -> ConvergencePolicy {
        ConvergencePolicy::from(&self.convergence)
    }
}
