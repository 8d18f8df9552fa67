//! Batch experiment runner for systematic scenario comparison.

use log::info;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::bulk::{AgentTable, BulkOrchestrator};
use crate::metrics::MetricRecord;
use crate::scenario::Scenario;
use crate::seed;
use crate::simulation::Simulation;

/// Configuration for a batch of experiments, loaded from YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentBatch {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub experiments: Vec<ExperimentConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    PerAgent,
    Bulk,
}

impl Default for ExecutionMode {
    fn default() -> Self {
        ExecutionMode::PerAgent
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionMode::PerAgent => f.write_str("per_agent"),
            ExecutionMode::Bulk => f.write_str("bulk"),
        }
    }
}

/// Configuration for a single experiment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentConfig {
    pub name: String,
    pub scenario: PathBuf,
    #[serde(default)]
    pub mode: ExecutionMode,
    #[serde(default)]
    pub overrides: ExperimentOverrides,
    #[serde(default = "default_repeat")]
    pub repeat: usize,
}

fn default_repeat() -> usize {
    1
}

/// Parameter overrides applied on top of the scenario file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExperimentOverrides {
    pub steps: Option<u32>,
    pub population: Option<u32>,
    pub random_seed: Option<u64>,
}

/// Result of running one experiment (last repeat wins for the metric row;
/// repeats only vary the seed).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentResult {
    pub name: String,
    pub mode: ExecutionMode,
    pub success: bool,
    pub error: Option<String>,
    pub final_metrics: Option<MetricRecord>,
    pub outcomes_valid: usize,
    pub outcomes_total: usize,
    pub duration_ms: u64,
}

impl ExperimentBatch {
    /// Load batch configuration from a YAML file.
    pub fn load_from_file(path: &Path) -> Result<Self, String> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read experiment file: {e}"))?;
        serde_yaml::from_str(&contents).map_err(|e| format!("failed to parse YAML: {e}"))
    }

    /// Run every experiment sequentially. Runs are deterministic given the
    /// scenario seeds, so order does not matter.
    pub fn run(&self, quiet: bool) -> Vec<ExperimentResult> {
        self.experiments
            .iter()
            .map(|config| {
                if !quiet {
                    println!("Running experiment: {}", config.name);
                }
                run_single_experiment(config)
            })
            .collect()
    }
}

fn run_single_experiment(config: &ExperimentConfig) -> ExperimentResult {
    let start = std::time::Instant::now();
    let mut last: Option<(Option<MetricRecord>, usize, usize)> = None;

    let repeats = config.repeat.max(1);
    for repeat in 0..repeats {
        match run_once(config, repeat as u64) {
            Ok(outcome) => last = Some(outcome),
            Err(error) => {
                return ExperimentResult {
                    name: config.name.clone(),
                    mode: config.mode,
                    success: false,
                    error: Some(error),
                    final_metrics: None,
                    outcomes_valid: 0,
                    outcomes_total: 0,
                    duration_ms: start.elapsed().as_millis() as u64,
                };
            }
        }
    }

    let (final_metrics, outcomes_valid, outcomes_total) = last.unwrap_or((None, 0, 0));
    ExperimentResult {
        name: config.name.clone(),
        mode: config.mode,
        success: true,
        error: None,
        final_metrics,
        outcomes_valid,
        outcomes_total,
        duration_ms: start.elapsed().as_millis() as u64,
    }
}

fn run_once(
    config: &ExperimentConfig,
    repeat: u64,
) -> Result<(Option<MetricRecord>, usize, usize), String> {
    let path = config
        .scenario
        .to_str()
        .ok_or_else(|| "scenario path is not valid UTF-8".to_string())?;
    let mut scenario = Scenario::load_validated(path)?;

    if let Some(steps) = config.overrides.steps {
        scenario.parameters.duration_steps = steps;
    }
    if let Some(population) = config.overrides.population {
        scenario.parameters.agent_population = population;
    }
    if let Some(seed) = config.overrides.random_seed {
        scenario.parameters.random_seed = Some(seed);
    }
    // Vary the seed across repeats so they are not identical runs.
    if repeat > 0 {
        let base = scenario.parameters.random_seed.unwrap_or(42);
        scenario.parameters.random_seed = Some(base.wrapping_add(repeat));
    }

    let seed_value = scenario.parameters.random_seed.unwrap_or(42);
    let population = seed::synthetic_population(
        scenario.parameters.agent_population as usize,
        0.8,
        seed_value,
    );

    let report = match config.mode {
        ExecutionMode::PerAgent => Simulation::new(scenario, population).run(),
        ExecutionMode::Bulk => {
            let table = AgentTable::from_arena(&population);
            BulkOrchestrator::new(scenario, table).run()
        }
    };

    let valid = report
        .outcome_validation
        .iter()
        .filter(|r| r.valid)
        .count();
    let total = report.outcome_validation.len();
    info!(
        "experiment '{}' repeat {repeat}: {valid}/{total} outcomes valid",
        config.name
    );
    Ok((report.final_metrics().cloned(), valid, total))
}

/// Plain-text comparison table across experiment results.
pub fn comparison_summary(results: &[ExperimentResult]) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{:<24} {:>9} {:>8} {:>8} {:>8} {:>9} {:>10}\n",
        "experiment", "mode", "satisf", "churn", "digital", "outcomes", "time(ms)"
    ));
    for result in results {
        match (&result.final_metrics, result.success) {
            (Some(metrics), true) => {
                out.push_str(&format!(
                    "{:<24} {:>9} {:>8.3} {:>8.3} {:>8.3} {:>6}/{:<2} {:>10}\n",
                    result.name,
                    result.mode.to_string(),
                    metrics.avg_satisfaction,
                    metrics.churn_rate,
                    metrics.digital_share,
                    result.outcomes_valid,
                    result.outcomes_total,
                    result.duration_ms
                ));
            }
            _ => {
                out.push_str(&format!(
                    "{:<24} {:>9} FAILED: {}\n",
                    result.name,
                    result.mode.to_string(),
                    result.error.as_deref().unwrap_or("unknown error")
                ));
            }
        }
    }
    out
}
