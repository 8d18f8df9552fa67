//! Default handlers for the seven business event types.
//!
//! Handlers mutate agent state or market variables synchronously and
//! completely before the scheduler marks the event terminal; their named
//! numeric outputs land in the event's [`EventResult`]. Every handler
//! implements both execution strategies: a per-agent loop over the arena and
//! a masked closed-form update over the columnar table, kept side by side so
//! the two stay in agreement.

use log::info;
use rand::Rng;
use rust_decimal_macros::dec;

use crate::agent::{AgentState, ClientKind};
use crate::events::{Event, EventKind, EventResult, EventType};
use crate::scheduler::EventScheduler;
use crate::simulation::{Population, StepContext};
use crate::types::{clamp_unit, Channel, CompanySize, Product};

/// Wire all seven default handlers into a scheduler.
pub fn register_default_handlers(scheduler: &mut EventScheduler) {
    scheduler.register_handler(EventType::MarketingCampaign, Box::new(handle_marketing_campaign));
    scheduler.register_handler(EventType::BranchClosure, Box::new(handle_branch_closure));
    scheduler.register_handler(
        EventType::DigitalTransformation,
        Box::new(handle_digital_transformation),
    );
    scheduler.register_handler(EventType::CompetitorAction, Box::new(handle_competitor_action));
    scheduler.register_handler(EventType::EconomicShock, Box::new(handle_economic_shock));
    scheduler.register_handler(EventType::RegulatoryChange, Box::new(handle_regulatory_change));
    scheduler.register_handler(EventType::ProductLaunch, Box::new(handle_product_launch));
}

/// Does an agent belong to a named marketing segment?
pub fn segment_matches(agent: &AgentState, segment: &str) -> bool {
    match segment {
        "digital_first" => agent.digital_engagement > 0.7,
        "traditional" => agent.digital_engagement < 0.3,
        "high_value" => match &agent.kind {
            ClientKind::Retail(p) => p.monthly_income > dec!(2000),
            ClientKind::Corporate(p) => p.annual_revenue > dec!(500000),
        },
        "young_professionals" => match &agent.kind {
            ClientKind::Retail(p) => (25..=40).contains(&p.age),
            ClientKind::Corporate(_) => false,
        },
        "sme" => match &agent.kind {
            ClientKind::Retail(_) => false,
            ClientKind::Corporate(p) => matches!(p.size, CompanySize::Small | CompanySize::Medium),
        },
        _ => false,
    }
}

fn handle_marketing_campaign(event: &Event, ctx: &mut StepContext) -> Result<EventResult, String> {
    let EventKind::MarketingCampaign(params) = &event.kind else {
        return Err("wrong payload for MarketingCampaignEvent".to_string());
    };

    let mut result = EventResult::new();
    result.set("retention_effect", (params.intensity * 1.2).min(1.0));

    match &mut ctx.population {
        Population::Arena(arena) => {
            let mut responded = 0usize;
            for agent in arena.iter_mut() {
                if !agent.is_active() {
                    continue;
                }
                let targeted = params.target_segments.is_empty()
                    || params
                        .target_segments
                        .iter()
                        .any(|s| segment_matches(agent, s));
                if !targeted {
                    continue;
                }
                // Response hinges on how satisfied the client already is.
                let response_probability = clamp_unit(params.intensity * agent.satisfaction);
                if ctx.rng.random_bool(response_probability) {
                    agent.adjust_satisfaction(0.05);
                    agent.adjust_trust(0.02);
                    responded += 1;
                }
            }
            result.set("responded_agents", responded as f64);
            info!(
                "marketing campaign at step {}: {} agents responded",
                ctx.step, responded
            );
        }
        Population::Table(table) => {
            // Expected-value form of the per-agent response draw:
            // E[delta] = P(response) * effect = intensity * s * effect.
            let mask = table.mask_segments(&params.target_segments);
            let mut expected_responses = 0.0;
            for (i, selected) in mask.iter().enumerate() {
                if *selected {
                    let p = clamp_unit(params.intensity * table.satisfaction[i]);
                    table.satisfaction[i] = clamp_unit(table.satisfaction[i] + p * 0.05);
                    table.trust[i] = clamp_unit(table.trust[i] + p * 0.02);
                    expected_responses += p;
                }
            }
            result.set("responded_agents", expected_responses.round());
        }
    }

    Ok(result)
}

fn handle_branch_closure(event: &Event, ctx: &mut StepContext) -> Result<EventResult, String> {
    let EventKind::BranchClosure(params) = &event.kind else {
        return Err("wrong payload for BranchClosureEvent".to_string());
    };

    let mut result = EventResult::new();
    result.set("satisfaction_impact", -params.impact_intensity);

    let churn_probability = event_churn_probability(EventType::BranchClosure);
    match &mut ctx.population {
        Population::Arena(arena) => {
            let mut affected = 0usize;
            let mut churned = 0usize;
            for agent in arena.iter_mut() {
                if !agent.is_active() || agent.governorate != params.location {
                    continue;
                }
                let impact = if params.digital_migration_support && agent.digital_engagement > 0.6
                {
                    params.impact_intensity * 0.5
                } else {
                    params.impact_intensity
                };
                agent.adjust_satisfaction(-impact);
                // Losing the branch pushes preference toward digital channels.
                agent.channels.shift(Channel::Branch, Channel::Mobile, 0.1);
                affected += 1;
                if ctx.rng.random_bool(churn_probability) {
                    agent.churn();
                    churned += 1;
                }
            }
            result.set("affected_agents", affected as f64);
            result.set("churned_agents", churned as f64);
        }
        Population::Table(table) => {
            let mask = table.mask_governorate(&params.location);
            let mut affected = 0usize;
            for (i, selected) in mask.iter().enumerate() {
                if *selected {
                    let impact =
                        if params.digital_migration_support && table.digital[i] > 0.6 {
                            params.impact_intensity * 0.5
                        } else {
                            params.impact_intensity
                        };
                    table.satisfaction[i] = clamp_unit(table.satisfaction[i] - impact);
                    let dc = table.digital_channel[i];
                    table.digital_channel[i] = clamp_unit(dc + 0.1 * (1.0 - dc));
                    affected += 1;
                }
            }
            table.push_spillover(affected, -params.impact_intensity);
            let churned = table.churn_draw(&mask, churn_probability, ctx.rng);
            result.set("affected_agents", affected as f64);
            result.set("churned_agents", churned as f64);
        }
    }

    Ok(result)
}

fn handle_digital_transformation(
    event: &Event,
    ctx: &mut StepContext,
) -> Result<EventResult, String> {
    let EventKind::DigitalTransformation(params) = &event.kind else {
        return Err("wrong payload for DigitalTransformationEvent".to_string());
    };

    let boost = if params.engagement_boost > 0.0 {
        params.engagement_boost
    } else {
        params.user_experience_score * 0.1
    };

    let mut result = EventResult::new();
    result.set("adoption_increase", params.user_experience_score * 0.5);

    match &mut ctx.population {
        Population::Arena(arena) => {
            let mut boosted = 0usize;
            for agent in arena.iter_mut() {
                if !agent.is_active() {
                    continue;
                }
                if !params.target_regions.is_empty()
                    && !params.target_regions.contains(&agent.governorate)
                {
                    continue;
                }
                agent.adjust_digital_engagement(boost);
                agent.channels.shift(Channel::Branch, Channel::Online, boost * 0.05);
                boosted += 1;
            }
            result.set("boosted_agents", boosted as f64);
        }
        Population::Table(table) => {
            let mask = if params.target_regions.is_empty() {
                table.mask_active()
            } else {
                let mut mask = vec![false; table.len()];
                for region in &params.target_regions {
                    for (slot, hit) in mask.iter_mut().zip(table.mask_governorate(region)) {
                        *slot = *slot || hit;
                    }
                }
                mask
            };
            table.adjust_digital(&mask, boost);
            let mut boosted = 0usize;
            for (i, selected) in mask.iter().enumerate() {
                if *selected {
                    let dc = table.digital_channel[i];
                    table.digital_channel[i] = clamp_unit(dc + boost * 0.05 * (1.0 - dc));
                    boosted += 1;
                }
            }
            result.set("boosted_agents", boosted as f64);
        }
    }

    Ok(result)
}

fn handle_competitor_action(event: &Event, ctx: &mut StepContext) -> Result<EventResult, String> {
    let EventKind::CompetitorAction(params) = &event.kind else {
        return Err("wrong payload for CompetitorActionEvent".to_string());
    };

    let mut result = EventResult::new();
    result.set(
        "retention_effect",
        (1.0 - params.impact_intensity * 0.5).max(0.0),
    );

    // The competitor lures away a slice of the affected clients outright;
    // the rest just get less happy.
    let churn_probability =
        event_churn_probability(EventType::CompetitorAction) * params.impact_intensity;
    match &mut ctx.population {
        Population::Arena(arena) => {
            let mut churned = 0usize;
            for agent in arena.iter_mut() {
                if !agent.is_active() {
                    continue;
                }
                if !params.affected_region.is_empty()
                    && agent.governorate != params.affected_region
                {
                    continue;
                }
                agent.adjust_trust(-params.impact_intensity * 0.1);
                agent.adjust_satisfaction(-params.impact_intensity * 0.05);
                if ctx.rng.random_bool(clamp_unit(churn_probability)) {
                    agent.churn();
                    churned += 1;
                }
            }
            result.set("churned_agents", churned as f64);
        }
        Population::Table(table) => {
            let mask = table.mask_governorate(&params.affected_region);
            table.adjust_trust(&mask, -params.impact_intensity * 0.1);
            table.adjust_satisfaction(&mask, -params.impact_intensity * 0.05);
            let churned = table.churn_draw(&mask, churn_probability, ctx.rng);
            result.set("churned_agents", churned as f64);
        }
    }

    Ok(result)
}

fn handle_economic_shock(event: &Event, ctx: &mut StepContext) -> Result<EventResult, String> {
    let EventKind::EconomicShock(params) = &event.kind else {
        return Err("wrong payload for EconomicShockEvent".to_string());
    };

    ctx.market.economic_climate = clamp_unit(ctx.market.economic_climate - params.severity * 0.2);
    ctx.market.volatility = clamp_unit(ctx.market.volatility + params.severity * 0.3);

    let churn_probability = event_churn_probability(EventType::EconomicShock) * params.severity;
    match &mut ctx.population {
        Population::Arena(arena) => {
            for agent in arena.iter_mut() {
                if !agent.is_active() {
                    continue;
                }
                let in_sector = params.affected_sectors.is_empty()
                    || match &agent.kind {
                        ClientKind::Retail(p) => params
                            .affected_sectors
                            .iter()
                            .any(|s| s == employment_sector_name(p.sector)),
                        ClientKind::Corporate(p) => {
                            params.affected_sectors.iter().any(|s| s == p.sector.as_str())
                        }
                    };
                if in_sector {
                    agent.adjust_satisfaction(-params.severity * 0.1);
                    if ctx.rng.random_bool(clamp_unit(churn_probability)) {
                        agent.churn();
                    }
                }
            }
        }
        Population::Table(table) => {
            let mask = table.mask_sectors(&params.affected_sectors);
            let touched = table.adjust_satisfaction(&mask, -params.severity * 0.1);
            table.push_spillover(touched, -params.severity * 0.1);
            table.churn_draw(&mask, churn_probability, ctx.rng);
        }
    }

    let mut result = EventResult::new();
    result.set("impact_factor", params.severity);
    Ok(result)
}

fn employment_sector_name(sector: crate::types::EmploymentSector) -> &'static str {
    match sector {
        crate::types::EmploymentSector::Government => "government",
        crate::types::EmploymentSector::Services => "services",
        crate::types::EmploymentSector::Private => "private",
        crate::types::EmploymentSector::Agriculture => "agriculture",
    }
}

fn handle_regulatory_change(event: &Event, ctx: &mut StepContext) -> Result<EventResult, String> {
    let EventKind::RegulatoryChange(params) = &event.kind else {
        return Err("wrong payload for RegulatoryChangeEvent".to_string());
    };

    let affected: Vec<Product> = params
        .affected_products
        .iter()
        .filter_map(|name| Product::parse(name))
        .collect();

    match &mut ctx.population {
        Population::Arena(arena) => {
            for agent in arena.iter_mut() {
                if !agent.is_active() {
                    continue;
                }
                let owns_affected =
                    affected.is_empty() || affected.iter().any(|product| agent.owns(*product));
                if owns_affected {
                    agent.adjust_satisfaction(-params.impact_severity * 0.05);
                }
            }
        }
        Population::Table(table) => {
            // The table does not carry per-product ownership; when specific
            // products are named, the impact is halved to approximate the
            // owner share of the population.
            let mask = table.mask_active();
            let scale = if affected.is_empty() { 1.0 } else { 0.5 };
            table.adjust_satisfaction(&mask, -params.impact_severity * 0.05 * scale);
        }
    }

    let mut result = EventResult::new();
    result.set("regulatory_impact", params.impact_severity);
    Ok(result)
}

fn handle_product_launch(event: &Event, ctx: &mut StepContext) -> Result<EventResult, String> {
    let EventKind::ProductLaunch(params) = &event.kind else {
        return Err("wrong payload for ProductLaunchEvent".to_string());
    };

    let product = Product::parse(&params.product_type)
        .ok_or_else(|| format!("unknown product type '{}'", params.product_type))?;
    ctx.market.launched_products.insert(product);

    let mut result = EventResult::new();
    result.set("launch_regions", params.launch_governorates.len() as f64);
    result.set("launched", 1.0);
    Ok(result)
}

/// Canonical per-event-type churn probabilities. One rule set for both
/// execution paths; see DESIGN.md for the constants decision.
pub fn event_churn_probability(event_type: EventType) -> f64 {
    match event_type {
        EventType::BranchClosure => 0.05,
        EventType::CompetitorAction => 0.08,
        EventType::EconomicShock => 0.04,
        _ => 0.0,
    }
}
