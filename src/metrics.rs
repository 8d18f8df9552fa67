use serde::{Deserialize, Serialize};
use std::fmt;

use crate::agent::AgentArena;
use crate::scenario::{ComparisonType, ExpectedOutcome};

/// Aggregate statistics for one step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRecord {
    pub step: u32,
    /// Mean satisfaction over active agents.
    pub avg_satisfaction: f64,
    /// Cumulative share of the population that has churned.
    pub churn_rate: f64,
    /// Share of the population still active.
    pub retention_rate: f64,
    /// Share of active agents whose channel preference is mostly digital.
    pub digital_share: f64,
    /// Mean owned products per active agent.
    pub active_products: f64,
}

impl MetricRecord {
    /// Look a metric up by its scenario-facing name.
    pub fn metric(&self, name: &str) -> Option<f64> {
        match name {
            "avg_satisfaction" | "average_satisfaction" => Some(self.avg_satisfaction),
            "churn_rate" => Some(self.churn_rate),
            "retention_rate" => Some(self.retention_rate),
            "digital_share" | "digital_usage" => Some(self.digital_share),
            "active_products" => Some(self.active_products),
            _ => None,
        }
    }
}

/// Raw counts both execution paths produce for the collector, so the
/// per-agent arena and the columnar table feed identical aggregation.
#[derive(Debug, Clone, Default)]
pub struct PopulationObservation {
    pub total: usize,
    pub active: usize,
    pub satisfaction_sum: f64,
    pub digital_dominant: usize,
    pub products_sum: usize,
}

impl PopulationObservation {
    pub fn from_arena(arena: &AgentArena) -> Self {
        let mut observation = Self {
            total: arena.len(),
            ..Default::default()
        };
        for agent in arena.iter() {
            if !agent.is_active() {
                continue;
            }
            observation.active += 1;
            observation.satisfaction_sum += agent.satisfaction;
            if agent.channels.digital_share() > 0.5 {
                observation.digital_dominant += 1;
            }
            observation.products_sum += agent.products.len();
        }
        observation
    }

    fn to_record(&self, step: u32) -> MetricRecord {
        let active = self.active.max(1) as f64;
        let total = self.total.max(1) as f64;
        MetricRecord {
            step,
            avg_satisfaction: self.satisfaction_sum / active,
            churn_rate: (self.total - self.active) as f64 / total,
            retention_rate: self.active as f64 / total,
            digital_share: self.digital_dominant as f64 / active,
            active_products: self.products_sum as f64 / active,
        }
    }
}

/// Verdict for one expected outcome at one measurement step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub metric_name: String,
    pub step: u32,
    pub target_value: f64,
    pub actual_value: Option<f64>,
    pub comparison_type: ComparisonType,
    pub valid: bool,
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let actual = match self.actual_value {
            Some(v) => format!("{v:.4}"),
            None => "missing".to_string(),
        };
        write!(
            f,
            "{} at step {}: target {:?} {}, actual {} -> {}",
            self.metric_name,
            self.step,
            self.comparison_type,
            self.target_value,
            actual,
            if self.valid { "ok" } else { "FAILED" }
        )
    }
}

/// Collects per-step aggregates and checks them against expected outcomes.
#[derive(Debug, Default)]
pub struct MetricsCollector {
    history: Vec<MetricRecord>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, step: u32, observation: &PopulationObservation) {
        self.history.push(observation.to_record(step));
    }

    pub fn history(&self) -> &[MetricRecord] {
        &self.history
    }

    pub fn latest(&self) -> Option<&MetricRecord> {
        self.history.last()
    }

    pub fn record_at(&self, step: u32) -> Option<&MetricRecord> {
        self.history.iter().find(|r| r.step == step)
    }

    /// Apply each outcome's comparison at its declared measurement steps.
    /// A missing snapshot for a declared step fails that check.
    pub fn validate(&self, outcomes: &[ExpectedOutcome]) -> Vec<ValidationResult> {
        let mut results = Vec::new();
        for outcome in outcomes {
            for &step in &outcome.measurement_steps {
                let actual = self
                    .record_at(step)
                    .and_then(|record| record.metric(&outcome.metric_name));
                let valid = match actual {
                    Some(value) => outcome.check(value, step),
                    None => false,
                };
                results.push(ValidationResult {
                    metric_name: outcome.metric_name.clone(),
                    step,
                    target_value: outcome.target_value,
                    actual_value: actual,
                    comparison_type: outcome.comparison_type,
                    valid,
                });
            }
        }
        results
    }

    pub fn save_to_file(&self, path: &str) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(&self.history)?;
        std::fs::write(path, json)
    }
}
