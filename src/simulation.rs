use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::time::{Duration, Instant};

use crate::agent::AgentArena;
use crate::behavior;
use crate::handlers;
use crate::metrics::{MetricsCollector, PopulationObservation, ValidationResult};
use crate::scheduler::{EventScheduler, SchedulerSummary};
use crate::scenario::Scenario;
use crate::seed;
use crate::social;
use crate::types::{clamp_unit, Product};

/// Soft per-step wall-clock budget. Exceeding it is logged, never aborted.
const SOFT_STEP_BUDGET: Duration = Duration::from_millis(250);

/// Global market scalars. Mutated only by event handlers and the per-step
/// market update; read by every agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketVariables {
    pub economic_climate: f64,
    pub volatility: f64,
    /// Derived from the economic climate each step; couples the market into
    /// individual satisfaction updates.
    pub satisfaction_modifier: f64,
    /// Products made adoptable by ProductLaunch events.
    pub launched_products: BTreeSet<Product>,
}

impl Default for MarketVariables {
    fn default() -> Self {
        Self {
            economic_climate: 0.5,
            volatility: 0.1,
            satisfaction_modifier: 0.0,
            launched_products: BTreeSet::new(),
        }
    }
}

impl MarketVariables {
    /// Seeded random walk of the market scalars.
    pub fn update(&mut self, rng: &mut StdRng) {
        self.volatility = clamp_unit(self.volatility + rng.random_range(-0.01..0.01));
        self.economic_climate = clamp_unit(self.economic_climate + rng.random_range(-0.02..0.02));
        self.satisfaction_modifier = (self.economic_climate - 0.5) * 0.1;
    }
}

/// All mutable state of a running simulation: the step counter, the agent
/// arena (single owner) and the market scalars.
pub struct SimulationState {
    pub current_step: u32,
    pub agents: AgentArena,
    pub market: MarketVariables,
}

impl SimulationState {
    pub fn new(agents: AgentArena) -> Self {
        Self {
            current_step: 0,
            agents,
            market: MarketVariables::default(),
        }
    }
}

/// The population an event handler mutates: the per-agent arena or the
/// columnar table. Handlers implement both strategies so the two execution
/// paths share one scheduler and one rule set.
pub enum Population<'a> {
    Arena(&'a mut AgentArena),
    Table(&'a mut crate::bulk::AgentTable),
}

/// Everything an event handler may touch during dispatch.
pub struct StepContext<'a> {
    pub step: u32,
    pub population: Population<'a>,
    pub market: &'a mut MarketVariables,
    pub rng: &'a mut StdRng,
}

/// Per-agent-path simulation runner: deterministic single-threaded step loop.
pub struct Simulation {
    pub scenario: Scenario,
    pub state: SimulationState,
    pub scheduler: EventScheduler,
    pub metrics: MetricsCollector,
    base_seed: u64,
}

impl Simulation {
    pub fn new(scenario: Scenario, agents: AgentArena) -> Self {
        let base_seed = scenario.parameters.random_seed.unwrap_or(42);
        let mut scheduler = EventScheduler::new();
        handlers::register_default_handlers(&mut scheduler);
        Self {
            scenario,
            state: SimulationState::new(agents),
            scheduler,
            metrics: MetricsCollector::new(),
            base_seed,
        }
    }

    /// Build a runner with a deterministic synthetic population sized from
    /// the scenario parameters.
    pub fn with_synthetic_population(scenario: Scenario) -> Self {
        let seed = scenario.parameters.random_seed.unwrap_or(42);
        let population =
            seed::synthetic_population(scenario.parameters.agent_population as usize, 0.8, seed);
        Self::new(scenario, population)
    }

    /// Inject the scenario's events and run the full step loop.
    pub fn run(&mut self) -> SimulationReport {
        let execution = self.scenario.execute(&mut self.scheduler);
        info!(
            "scenario '{}': {} events injected, {} rejected",
            self.scenario.metadata.name, execution.injected, execution.failed
        );

        let duration = self.scenario.parameters.duration_steps;
        for step in 0..=duration {
            self.step(step);
            if step % self.scenario.parameters.output_frequency.max(1) == 0 {
                if let Some(record) = self.metrics.latest() {
                    debug!(
                        "step {step}: satisfaction={:.3} churn={:.3}",
                        record.avg_satisfaction, record.churn_rate
                    );
                }
            }
        }

        let outcome_validation = self
            .metrics
            .validate(&self.scenario.expected_outcomes);
        SimulationReport {
            scenario_name: self.scenario.metadata.name.clone(),
            steps_completed: duration,
            events_injected: execution.injected,
            events_processed: self.scheduler.processed().len(),
            events_failed: self.scheduler.failed().len(),
            metrics: self.metrics.history().to_vec(),
            outcome_validation,
            event_summary: self.scheduler.summary(),
        }
    }

    /// One full step: event delivery, market update, agent stepping in
    /// seeded shuffled order, influence propagation, metrics snapshot.
    pub fn step(&mut self, step: u32) {
        let started = Instant::now();
        self.state.current_step = step;
        let mut rng = StdRng::seed_from_u64(self.base_seed.wrapping_add(step as u64));

        // Deltas accumulate across event delivery and behavior so the push
        // pass sees everything that moved an agent this step.
        for agent in self.state.agents.iter_mut() {
            agent.last_delta = 0.0;
        }

        {
            let mut ctx = StepContext {
                step,
                population: Population::Arena(&mut self.state.agents),
                market: &mut self.state.market,
                rng: &mut rng,
            };
            self.scheduler.process(step, &mut ctx);
        }

        self.state.market.update(&mut rng);

        // Shuffled-but-seeded stepping order so table order never biases
        // churn and adoption decisions.
        let mut order = self.state.agents.ids();
        order.shuffle(&mut rng);
        let state = &mut self.state;
        let market = &state.market;
        for id in order {
            if let Some(agent) = state.agents.get_mut(id) {
                if agent.is_active() {
                    behavior::step_agent(agent, step, market, &mut rng);
                }
            }
        }

        social::influence_pass(&mut self.state.agents);

        self.metrics
            .observe(step, &PopulationObservation::from_arena(&self.state.agents));

        let elapsed = started.elapsed();
        if elapsed > SOFT_STEP_BUDGET {
            warn!("step {step} exceeded soft budget: {elapsed:?}");
        }
    }
}

/// Final artifact of a run: metric history plus outcome validation plus the
/// scheduler's event summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationReport {
    pub scenario_name: String,
    pub steps_completed: u32,
    pub events_injected: usize,
    pub events_processed: usize,
    pub events_failed: usize,
    pub metrics: Vec<crate::metrics::MetricRecord>,
    pub outcome_validation: Vec<ValidationResult>,
    pub event_summary: SchedulerSummary,
}

impl SimulationReport {
    pub fn save_to_file(&self, path: &str) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
    }

    pub fn final_metrics(&self) -> Option<&crate::metrics::MetricRecord> {
        self.metrics.last()
    }
}

impl fmt::Display for SimulationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Scenario: {}", self.scenario_name)?;
        writeln!(f, "Steps completed: {}", self.steps_completed)?;
        writeln!(
            f,
            "Events: {} injected, {} processed, {} failed",
            self.events_injected, self.events_processed, self.events_failed
        )?;
        if let Some(record) = self.final_metrics() {
            writeln!(f, "Final metrics:")?;
            writeln!(f, "  Avg satisfaction: {:.3}", record.avg_satisfaction)?;
            writeln!(f, "  Churn rate: {:.3}", record.churn_rate)?;
            writeln!(f, "  Retention rate: {:.3}", record.retention_rate)?;
            writeln!(f, "  Digital share: {:.3}", record.digital_share)?;
            writeln!(f, "  Active products: {:.2}", record.active_products)?;
        }
        if !self.outcome_validation.is_empty() {
            writeln!(f, "Outcome validation:")?;
            for result in &self.outcome_validation {
                writeln!(f, "  {result}")?;
            }
        }
        Ok(())
    }
}
