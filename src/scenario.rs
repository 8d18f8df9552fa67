use log::info;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::events::{
    BranchClosureParams, CompetitorActionParams, DigitalTransformationParams, EconomicShockParams,
    Event, EventKind, EventType, MarketingCampaignParams, ProductLaunchParams,
};
use crate::scheduler::EventScheduler;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioMetadata {
    pub name: String,
    pub description: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_difficulty")]
    pub difficulty_level: String,
    #[serde(default = "default_duration")]
    pub estimated_duration: u32,
}

fn default_version() -> String {
    "1.0".to_string()
}

fn default_difficulty() -> String {
    "medium".to_string()
}

fn default_duration() -> u32 {
    100
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationParameters {
    pub duration_steps: u32,
    #[serde(default)]
    pub warm_up_steps: u32,
    pub agent_population: u32,
    #[serde(default)]
    pub random_seed: Option<u64>,
    #[serde(default = "default_output_frequency")]
    pub output_frequency: u32,
}

fn default_output_frequency() -> u32 {
    5
}

impl Default for SimulationParameters {
    fn default() -> Self {
        Self {
            duration_steps: 100,
            warm_up_steps: 10,
            agent_population: 1000,
            random_seed: None,
            output_frequency: 5,
        }
    }
}

/// One scheduled event inside a scenario document; converted into a
/// scheduler [`Event`] at execution time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioEvent {
    #[serde(flatten)]
    pub kind: EventKind,
    pub step: u32,
    #[serde(default)]
    pub event_id: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl ScenarioEvent {
    /// Build the scheduler event. Explicit ids are honored; otherwise an id
    /// is derived from the scenario position so re-execution is stable.
    pub fn to_event(&self, index: usize) -> Event {
        let id = self
            .event_id
            .clone()
            .unwrap_or_else(|| format!("evt_{:03}_{}", index, self.kind.event_type()));
        Event::new(id, self.step, self.kind.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonType {
    Equals,
    GreaterThan,
    LessThan,
}

impl Default for ComparisonType {
    fn default() -> Self {
        ComparisonType::Equals
    }
}

/// Post-hoc assertion about a metric value at specific steps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpectedOutcome {
    pub metric_name: String,
    pub target_value: f64,
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    #[serde(default)]
    pub measurement_steps: Vec<u32>,
    #[serde(default)]
    pub comparison_type: ComparisonType,
}

fn default_tolerance() -> f64 {
    0.1
}

impl ExpectedOutcome {
    /// Validation is vacuously true outside the declared measurement steps.
    pub fn check(&self, actual: f64, step: u32) -> bool {
        if !self.measurement_steps.is_empty() && !self.measurement_steps.contains(&step) {
            return true;
        }
        match self.comparison_type {
            ComparisonType::Equals => (actual - self.target_value).abs() <= self.tolerance,
            ComparisonType::GreaterThan => actual > self.target_value,
            ComparisonType::LessThan => actual < self.target_value,
        }
    }
}

/// A validated bundle of metadata, run parameters, events and expected
/// outcomes. Read-only once validated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(rename = "scenario_metadata")]
    pub metadata: ScenarioMetadata,
    #[serde(rename = "simulation_parameters")]
    pub parameters: SimulationParameters,
    pub events: Vec<ScenarioEvent>,
    #[serde(default)]
    pub expected_outcomes: Vec<ExpectedOutcome>,
    #[serde(default, rename = "key_metrics_to_track")]
    pub key_metrics: Vec<String>,
    #[serde(default)]
    pub risk_factors: Vec<serde_json::Value>,
}

/// Every violation found during validation, not just the first.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationReport {
    pub issues: Vec<String>,
    pub warnings: Vec<String>,
    pub complexity_score: f64,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            writeln!(f, "Scenario valid (complexity {:.2})", self.complexity_score)?;
        } else {
            writeln!(f, "Scenario INVALID:")?;
        }
        for issue in &self.issues {
            writeln!(f, "  error: {issue}")?;
        }
        for warning in &self.warnings {
            writeln!(f, "  warning: {warning}")?;
        }
        Ok(())
    }
}

/// Outcome of injecting a scenario's events into a scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionSummary {
    pub injected: usize,
    pub failed: usize,
}

impl Scenario {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            metadata: ScenarioMetadata {
                name: name.into(),
                description: String::new(),
                version: default_version(),
                author: String::new(),
                tags: Vec::new(),
                difficulty_level: default_difficulty(),
                estimated_duration: default_duration(),
            },
            parameters: SimulationParameters::default(),
            events: Vec::new(),
            expected_outcomes: Vec::new(),
            key_metrics: Vec::new(),
            risk_factors: Vec::new(),
        }
    }

    pub fn save_to_file(&self, path: &str) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
    }

    /// Structural load: serde handles required fields and types (negative
    /// steps are unrepresentable). Business-rule validation is separate.
    pub fn load_from_file(path: &str) -> Result<Self, String> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read scenario file {path}: {e}"))?;
        serde_json::from_str(&contents).map_err(|e| format!("invalid scenario JSON: {e}"))
    }

    /// Load and run business-rule validation; any hard issue rejects the
    /// scenario before a single event is injected.
    pub fn load_validated(path: &str) -> Result<Self, String> {
        let scenario = Self::load_from_file(path)?;
        let report = scenario.validate();
        if !report.is_valid() {
            return Err(report.to_string());
        }
        for warning in &report.warnings {
            log::warn!("scenario '{}': {warning}", scenario.metadata.name);
        }
        Ok(scenario)
    }

    /// Business-rule validation. Collects every violation found.
    pub fn validate(&self) -> ValidationReport {
        let mut report = ValidationReport {
            complexity_score: self.complexity_score(),
            ..Default::default()
        };
        let duration = self.parameters.duration_steps;

        if self.metadata.name.trim().is_empty() {
            report.issues.push("scenario name must not be empty".to_string());
        }
        if duration == 0 {
            report.issues.push("duration_steps must be at least 1".to_string());
        }
        if self.parameters.agent_population == 0 {
            report
                .issues
                .push("agent_population must be at least 1".to_string());
        }
        if self.parameters.output_frequency == 0 {
            report
                .issues
                .push("output_frequency must be at least 1".to_string());
        }

        // Events scheduled past the end never execute; tolerated as a
        // warning so late-added events don't invalidate a scenario.
        let late: Vec<u32> = self
            .events
            .iter()
            .filter(|e| e.step > duration)
            .map(|e| e.step)
            .collect();
        if !late.is_empty() {
            report.warnings.push(format!(
                "{} event(s) scheduled after simulation end at steps {late:?}",
                late.len()
            ));
        }

        // A closure and a campaign landing on the same step work against
        // each other; flag it.
        let mut conflict_steps = Vec::new();
        let mut by_step: HashMap<u32, Vec<EventType>> = HashMap::new();
        for event in &self.events {
            by_step.entry(event.step).or_default().push(event.kind.event_type());
        }
        for (step, types) in &by_step {
            if types.contains(&EventType::BranchClosure)
                && types.contains(&EventType::MarketingCampaign)
            {
                conflict_steps.push(*step);
            }
        }
        if !conflict_steps.is_empty() {
            conflict_steps.sort_unstable();
            report.warnings.push(format!(
                "potentially conflicting events (closure + campaign) at steps {conflict_steps:?}"
            ));
        }

        let mut seen_ids = HashSet::new();
        for event in &self.events {
            if let Some(id) = &event.event_id {
                if !seen_ids.insert(id.clone()) {
                    report
                        .warnings
                        .push(format!("duplicate event_id '{id}' will be rejected at injection"));
                }
            }
        }

        for outcome in &self.expected_outcomes {
            let invalid: Vec<u32> = outcome
                .measurement_steps
                .iter()
                .copied()
                .filter(|s| *s >= duration)
                .collect();
            if !invalid.is_empty() {
                report.issues.push(format!(
                    "outcome '{}' has measurement steps {invalid:?} >= duration {duration}",
                    outcome.metric_name
                ));
            }
            if outcome.tolerance < 0.0 {
                report.issues.push(format!(
                    "outcome '{}' has negative tolerance",
                    outcome.metric_name
                ));
            }
        }

        report
    }

    /// Deterministic complexity classification in [0,1]; informational only.
    pub fn complexity_score(&self) -> f64 {
        let mut score = 0.0;
        score += (self.events.len() as f64 / 20.0).min(0.3);
        let unique_types: HashSet<EventType> =
            self.events.iter().map(|e| e.kind.event_type()).collect();
        score += (unique_types.len() as f64 / 7.0).min(0.2);
        score += (self.parameters.duration_steps as f64 / 200.0).min(0.2);
        score += (self.parameters.agent_population as f64 / 5000.0).min(0.2);
        score += (self.expected_outcomes.len() as f64 / 10.0).min(0.1);
        score.min(1.0)
    }

    /// Inject every event into the scheduler. Prior pending events are
    /// cleared first; injection failures (duplicates) are counted but never
    /// abort the batch.
    pub fn execute(&self, scheduler: &mut EventScheduler) -> ExecutionSummary {
        scheduler.clear_pending();

        let mut injected = 0;
        let mut failed = 0;
        for (index, scenario_event) in self.events.iter().enumerate() {
            match scheduler.inject(scenario_event.to_event(index)) {
                Ok(()) => injected += 1,
                Err(reason) => {
                    log::warn!(
                        "event {} at step {} rejected: {reason}",
                        index,
                        scenario_event.step
                    );
                    failed += 1;
                }
            }
        }

        info!(
            "scenario '{}': injected {injected}/{} events",
            self.metadata.name,
            self.events.len()
        );
        ExecutionSummary { injected, failed }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Scenario: {}", self.metadata.name)?;
        writeln!(f, "Description: {}", self.metadata.description)?;
        writeln!(f, "Duration: {} steps", self.parameters.duration_steps)?;
        writeln!(f, "Population: {} agents", self.parameters.agent_population)?;
        writeln!(f, "Events ({}):", self.events.len())?;
        for event in &self.events {
            write!(f, "  step {:>4}: {}", event.step, event.kind.event_type())?;
            if let Some(description) = &event.description {
                write!(f, " - {description}")?;
            }
            writeln!(f)?;
        }
        if !self.expected_outcomes.is_empty() {
            writeln!(f, "Expected outcomes:")?;
            for outcome in &self.expected_outcomes {
                writeln!(
                    f,
                    "  {} {:?} {} (±{}) at steps {:?}",
                    outcome.metric_name,
                    outcome.comparison_type,
                    outcome.target_value,
                    outcome.tolerance,
                    outcome.measurement_steps
                )?;
            }
        }
        Ok(())
    }
}

/// Built-in scenarios usable without any scenario file.
pub fn standard_scenarios() -> HashMap<String, Scenario> {
    let mut scenarios = HashMap::new();

    let mut baseline = Scenario::new("baseline");
    baseline.metadata.description = "Quiet market, no interventions".to_string();
    baseline.parameters = SimulationParameters {
        duration_steps: 50,
        warm_up_steps: 5,
        agent_population: 500,
        random_seed: Some(42),
        output_frequency: 5,
    };
    baseline.expected_outcomes.push(ExpectedOutcome {
        metric_name: "churn_rate".to_string(),
        target_value: 0.2,
        tolerance: 0.0,
        measurement_steps: vec![49],
        comparison_type: ComparisonType::LessThan,
    });
    scenarios.insert("baseline".to_string(), baseline);

    let mut digital = Scenario::new("digital_push");
    digital.metadata.description =
        "Digital transformation program followed by a product launch".to_string();
    digital.metadata.tags = vec!["digital".to_string(), "growth".to_string()];
    digital.parameters = SimulationParameters {
        duration_steps: 80,
        warm_up_steps: 10,
        agent_population: 800,
        random_seed: Some(7),
        output_frequency: 10,
    };
    digital.events.push(ScenarioEvent {
        kind: EventKind::DigitalTransformation(DigitalTransformationParams {
            service_type: "mobile_app".to_string(),
            user_experience_score: 0.8,
            engagement_boost: 0.1,
            ..Default::default()
        }),
        step: 10,
        event_id: None,
        description: Some("New mobile app rollout".to_string()),
    });
    digital.events.push(ScenarioEvent {
        kind: EventKind::ProductLaunch(ProductLaunchParams {
            product_type: "mobile_banking".to_string(),
            digital_only: true,
            ..Default::default()
        }),
        step: 20,
        event_id: None,
        description: Some("Mobile banking product launch".to_string()),
    });
    digital.events.push(ScenarioEvent {
        kind: EventKind::MarketingCampaign(MarketingCampaignParams {
            target_segments: vec!["digital_first".to_string()],
            campaign_type: "activation".to_string(),
            intensity: 0.5,
            ..Default::default()
        }),
        step: 25,
        event_id: None,
        description: Some("Activation campaign for digital-first clients".to_string()),
    });
    digital.key_metrics = vec!["digital_share".to_string(), "avg_satisfaction".to_string()];
    scenarios.insert("digital_push".to_string(), digital);

    let mut consolidation = Scenario::new("branch_consolidation");
    consolidation.metadata.description =
        "Two branch closures softened by a retention campaign".to_string();
    consolidation.parameters = SimulationParameters {
        duration_steps: 60,
        warm_up_steps: 5,
        agent_population: 600,
        random_seed: Some(11),
        output_frequency: 5,
    };
    consolidation.events.push(ScenarioEvent {
        kind: EventKind::BranchClosure(BranchClosureParams {
            location: "Sfax".to_string(),
            impact_intensity: 0.15,
            digital_migration_support: true,
            ..Default::default()
        }),
        step: 15,
        event_id: None,
        description: Some("Sfax branch closure".to_string()),
    });
    consolidation.events.push(ScenarioEvent {
        kind: EventKind::BranchClosure(BranchClosureParams {
            location: "Gabes".to_string(),
            impact_intensity: 0.15,
            digital_migration_support: true,
            ..Default::default()
        }),
        step: 30,
        event_id: None,
        description: Some("Gabes branch closure".to_string()),
    });
    consolidation.events.push(ScenarioEvent {
        kind: EventKind::MarketingCampaign(MarketingCampaignParams {
            target_segments: vec!["traditional".to_string()],
            campaign_type: "retention".to_string(),
            intensity: 0.6,
            ..Default::default()
        }),
        step: 32,
        event_id: None,
        description: Some("Retention campaign for affected clients".to_string()),
    });
    scenarios.insert("branch_consolidation".to_string(), consolidation);

    let mut downturn = Scenario::new("downturn");
    downturn.metadata.description =
        "Economic shock with a competitor moving into the gap".to_string();
    downturn.metadata.difficulty_level = "hard".to_string();
    downturn.parameters = SimulationParameters {
        duration_steps: 100,
        warm_up_steps: 10,
        agent_population: 1000,
        random_seed: Some(23),
        output_frequency: 10,
    };
    downturn.events.push(ScenarioEvent {
        kind: EventKind::EconomicShock(EconomicShockParams {
            shock_type: "currency_depreciation".to_string(),
            severity: 0.6,
            affected_sectors: vec!["agriculture".to_string(), "manufacturing".to_string()],
            ..Default::default()
        }),
        step: 20,
        event_id: None,
        description: Some("Currency depreciation".to_string()),
    });
    downturn.events.push(ScenarioEvent {
        kind: EventKind::CompetitorAction(CompetitorActionParams {
            competitor_name: "NeoBank".to_string(),
            action_type: "rate_promotion".to_string(),
            impact_intensity: 0.4,
            ..Default::default()
        }),
        step: 40,
        event_id: None,
        description: Some("Competitor rate promotion".to_string()),
    });
    downturn.expected_outcomes.push(ExpectedOutcome {
        metric_name: "retention_rate".to_string(),
        target_value: 0.5,
        tolerance: 0.0,
        measurement_steps: vec![99],
        comparison_type: ComparisonType::GreaterThan,
    });
    scenarios.insert("downturn".to_string(), downturn);

    scenarios
}
