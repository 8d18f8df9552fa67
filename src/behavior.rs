//! Per-agent behavior rules: satisfaction, churn, portfolio, preferences.
//!
//! All probability constants live here so the vectorized path can share the
//! same canonical rule set.

use rand::rngs::StdRng;
use rand::Rng;
use rust_decimal_macros::dec;

use crate::agent::{AgentState, ClientKind, CorporateProfile, RetailProfile};
use crate::simulation::MarketVariables;
use crate::types::{clamp_unit, Channel, CompanySize, Product};

/// Blend rate between current satisfaction and the recent-experience mean.
pub const SATISFACTION_LEARNING_RATE: f64 = 0.1;
/// Amplitude of the per-step background drift.
pub const DRIFT_AMPLITUDE: f64 = 0.02;
/// How much of the market satisfaction modifier reaches each agent per step.
pub const MARKET_COUPLING: f64 = 0.05;
/// Churn base probabilities as a step function of satisfaction.
pub const CHURN_PROB_LOW: f64 = 0.30;
pub const CHURN_PROB_MID: f64 = 0.12;
pub const CHURN_PROB_BASE: f64 = 0.02;
/// Chance of the rare random perturbation.
pub const PERTURBATION_CHANCE: f64 = 0.01;
pub const PERTURBATION_AMPLITUDE: f64 = 0.05;
/// Mean quality of a spontaneous service interaction.
pub const EXPERIENCE_MEAN_QUALITY: f64 = 0.65;

/// Canonical churn rule shared by the per-agent and bulk paths: a step
/// function of satisfaction scaled down by brand loyalty.
pub fn churn_probability(satisfaction: f64, loyalty: f64) -> f64 {
    let base = if satisfaction < 0.3 {
        CHURN_PROB_LOW
    } else if satisfaction < 0.5 {
        CHURN_PROB_MID
    } else {
        CHURN_PROB_BASE
    };
    clamp_unit(base * (1.0 - loyalty))
}

/// Advance one agent by one step. Churned agents must be filtered out by the
/// caller; the social-influence pass runs separately afterwards.
pub fn step_agent(agent: &mut AgentState, step: u32, market: &MarketVariables, rng: &mut StdRng) {
    update_satisfaction(agent, market, rng);

    // Staggered decision-making: each agent re-evaluates its portfolio and
    // its churn inclination on its own jittered cadence, offset by id so the
    // population never decides in lockstep.
    let period = agent.evaluation_period.max(1);
    if step % period == agent.id.0 % period {
        evaluate_portfolio(agent, market, rng);
        if decide_churn(agent, rng) {
            return;
        }
    }

    generate_experiences(agent, step, rng);
    drift_preferences(agent);

    if rng.random_bool(PERTURBATION_CHANCE) {
        let nudge = rng.random_range(-PERTURBATION_AMPLITUDE..PERTURBATION_AMPLITUDE);
        agent.adjust_satisfaction(nudge);
    }
}

/// Exponentially-weighted satisfaction update over queued experience
/// qualities, most recent weighted highest (linear ramp), blended with the
/// previous value so no single interaction shocks the score.
fn update_satisfaction(agent: &mut AgentState, market: &MarketVariables, rng: &mut StdRng) {
    if !agent.pending_experiences.is_empty() {
        let n = agent.pending_experiences.len();
        let mut weighted = 0.0;
        let mut weight_sum = 0.0;
        for (i, quality) in agent.pending_experiences.iter().enumerate() {
            let weight = (i + 1) as f64;
            weighted += quality * weight;
            weight_sum += weight;
        }
        let target = weighted / weight_sum;
        let delta = SATISFACTION_LEARNING_RATE * (target - agent.satisfaction);
        agent.adjust_satisfaction(delta);
        agent.pending_experiences.clear();
    }

    let drift = rng.random_range(-DRIFT_AMPLITUDE..DRIFT_AMPLITUDE);
    agent.adjust_satisfaction(market.satisfaction_modifier * MARKET_COUPLING + drift);
}

/// Evaluate churn on the agent's cadence. Returns true if the agent left.
fn decide_churn(agent: &mut AgentState, rng: &mut StdRng) -> bool {
    let probability = churn_probability(agent.satisfaction, agent.loyalty);
    if rng.random_bool(probability) {
        agent.churn();
        true
    } else {
        false
    }
}

fn evaluate_portfolio(agent: &mut AgentState, market: &MarketVariables, rng: &mut StdRng) {
    match agent.kind.clone() {
        ClientKind::Retail(profile) => evaluate_retail_portfolio(agent, &profile, market, rng),
        ClientKind::Corporate(profile) => {
            evaluate_corporate_portfolio(agent, &profile, market, rng)
        }
    }
}

/// Retail need detection: which products would serve this profile but are
/// not owned yet.
pub fn retail_unmet_needs(agent: &AgentState, profile: &RetailProfile) -> Vec<Product> {
    let mut needs = Vec::new();
    let income = profile.monthly_income;

    if !agent.owns(Product::SavingsAccount)
        && income > dec!(1500)
        && (profile.age > 25 || income > dec!(2000))
    {
        needs.push(Product::SavingsAccount);
    }
    if !agent.owns(Product::CreditCard) && income > dec!(2000) && agent.digital_engagement > 0.5 {
        needs.push(Product::CreditCard);
    }
    if !agent.owns(Product::InvestmentAccount)
        && income > dec!(3500)
        && profile.risk_tolerance > 0.5
        && profile.age > 30
    {
        needs.push(Product::InvestmentAccount);
    }
    if !agent.owns(Product::LifeInsurance) && profile.age > 35 && income > dec!(2500) {
        needs.push(Product::LifeInsurance);
    }
    if !agent.owns(Product::MobileBanking) && agent.digital_engagement > 0.6 {
        needs.push(Product::MobileBanking);
    }
    needs
}

fn evaluate_retail_portfolio(
    agent: &mut AgentState,
    profile: &RetailProfile,
    market: &MarketVariables,
    rng: &mut StdRng,
) {
    let mut candidates = retail_unmet_needs(agent, profile);
    candidates.extend(
        market
            .launched_products
            .iter()
            .filter(|p| !p.is_corporate() && !agent.owns(**p))
            .copied(),
    );

    for product in candidates {
        let mut probability = profile.product_appetite * 0.3 * agent.satisfaction * agent.trust;
        if product.is_digital() {
            probability *= agent.digital_engagement;
        }
        if rng.random_bool(clamp_unit(probability)) {
            if agent.adopt_product(product) {
                agent.add_experience(0.7);
            }
        }
    }

    // Drop pass over a copy so removal does not disturb iteration.
    let owned: Vec<Product> = agent.products.iter().copied().collect();
    for product in owned {
        let mut drop_probability = (1.0 - agent.satisfaction) * 0.05;
        if matches!(product, Product::CreditCard | Product::InvestmentAccount) {
            drop_probability *= profile.price_sensitivity;
        }
        if rng.random_bool(clamp_unit(drop_probability)) {
            agent.drop_product(product);
        }
    }
}

/// Corporate need detection: (product, urgency) pairs from the business
/// profile.
pub fn corporate_needs(agent: &AgentState, profile: &CorporateProfile) -> Vec<(Product, f64)> {
    let mut needs = Vec::new();
    if profile.cash_flow_stability < 0.5 && !agent.owns(Product::BusinessCreditLine) {
        needs.push((Product::BusinessCreditLine, 0.8));
    }
    if profile.growth_orientation > 0.7 && !agent.owns(Product::TermLoan) {
        needs.push((Product::TermLoan, 0.7));
    }
    if profile.digital_maturity > 0.6 && !agent.owns(Product::CorporateOnlineBanking) {
        needs.push((Product::CorporateOnlineBanking, 0.8));
    }
    if profile.annual_revenue > dec!(1000000) && !agent.owns(Product::TradeFinance) {
        needs.push((Product::TradeFinance, 0.9));
    }
    needs
}

fn evaluate_corporate_portfolio(
    agent: &mut AgentState,
    profile: &CorporateProfile,
    market: &MarketVariables,
    rng: &mut StdRng,
) {
    let mut candidates = corporate_needs(agent, profile);
    candidates.extend(
        market
            .launched_products
            .iter()
            .filter(|p| p.is_corporate() && !agent.owns(**p))
            .map(|p| (*p, 0.5)),
    );

    let size_factor = match profile.size {
        CompanySize::Large => 0.7,
        CompanySize::Small | CompanySize::Micro => 1.2,
        CompanySize::Medium => 1.0,
    };
    for (product, urgency) in candidates {
        if urgency < 0.5 {
            continue;
        }
        let mut probability =
            urgency * 0.5 * (0.5 + profile.relationship_quality * 0.5) * size_factor;
        if product.is_digital() {
            probability *= profile.digital_maturity;
        }
        if rng.random_bool(clamp_unit(probability)) && agent.adopt_product(product) {
            agent.add_experience(0.7);
        }
    }

    let owned: Vec<Product> = agent.products.iter().copied().collect();
    for product in owned {
        let drop_probability =
            (1.0 - agent.satisfaction) * 0.03 * (1.0 - profile.relationship_quality);
        if rng.random_bool(clamp_unit(drop_probability)) {
            agent.drop_product(product);
        }
    }
}

/// Spontaneous interactions that queue experience qualities for the next
/// satisfaction update, plus the slow client-type-specific state drift.
fn generate_experiences(agent: &mut AgentState, step: u32, rng: &mut StdRng) {
    match &mut agent.kind {
        ClientKind::Retail(profile) => {
            // Product discovery through the agent's channels.
            if rng.random_bool(clamp_unit(profile.product_appetite * 0.02)) {
                let quality = rng.random_range(0.4..0.9);
                agent.pending_experiences.push(quality);
            }
            // Life events on a long jittered cadence.
            if step % (agent.evaluation_period.max(1) * 5) == agent.id.0 % 5 {
                retail_life_event(profile, rng);
            }
        }
        ClientKind::Corporate(profile) => {
            // Periodic business review shifts the revenue trajectory.
            if step % (agent.evaluation_period.max(1) * 3) == agent.id.0 % 3 {
                let roll: f64 = rng.random();
                if roll < 0.3 {
                    profile.annual_revenue *= dec!(1.1);
                    profile.growth_orientation = clamp_unit(profile.growth_orientation + 0.1);
                } else if roll < 0.4 {
                    profile.annual_revenue *= dec!(0.9);
                    profile.cash_flow_stability = clamp_unit(profile.cash_flow_stability * 0.9);
                }
            }
            // Cash-flow noise, wider for seasonal sectors.
            if rng.random_bool(0.1) {
                let spread = match profile.sector {
                    crate::types::BusinessSector::Agriculture
                    | crate::types::BusinessSector::Retail => 0.2,
                    _ => 0.05,
                };
                let wiggle = rng.random_range(-spread..spread);
                profile.cash_flow_stability = clamp_unit(profile.cash_flow_stability + wiggle);
            }
            // Relationship-manager touchpoint for the larger clients.
            if matches!(profile.size, CompanySize::Medium | CompanySize::Large)
                && rng.random_bool(0.05)
            {
                let quality = if profile.relationship_quality > 0.6 {
                    rng.random_range(0.5..1.0)
                } else {
                    rng.random_range(0.3..0.7)
                };
                profile.relationship_quality =
                    clamp_unit(0.9 * profile.relationship_quality + 0.1 * quality);
                agent.pending_experiences.push(quality);
            }
        }
    }
}

fn retail_life_event(profile: &mut RetailProfile, rng: &mut StdRng) {
    let age = profile.age;
    if (25..=35).contains(&age) && rng.random_bool(0.01) {
        // Marriage: more appetite for shared products.
        profile.product_appetite = clamp_unit(profile.product_appetite + 0.1);
    }
    if age < 45 && rng.random_bool(0.02) {
        // New job: income bump.
        profile.monthly_income *= dec!(1.2);
        profile.product_appetite = clamp_unit(profile.product_appetite + 0.05);
    }
    if age > 55 && rng.random_bool(0.05) {
        // Retirement: risk appetite contracts.
        profile.risk_tolerance *= 0.7;
    }
}

/// Slow movement of channel preferences toward digital, proportional to the
/// agent's digital engagement.
fn drift_preferences(agent: &mut AgentState) {
    if agent.products.iter().any(|p| p.is_digital()) {
        agent.adjust_digital_engagement(0.005);
    }
    let shift = agent.digital_engagement * 0.005;
    agent.channels.shift(Channel::Branch, Channel::Mobile, shift);
}
