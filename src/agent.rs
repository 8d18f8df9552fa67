use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::types::{
    clamp_unit, AgentId, BusinessSector, Channel, CompanySize, EducationLevel, EmploymentSector,
    Product,
};

/// Normalized weights over the service channels.
///
/// Weights always sum to 1 (±1e-6). Every mutation goes through
/// [`ChannelMix::shift`] or [`ChannelMix::normalize`] so the invariant holds
/// after arbitrary adjustments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelMix {
    weights: [f64; 5],
}

impl ChannelMix {
    pub fn uniform() -> Self {
        Self { weights: [0.2; 5] }
    }

    /// Mix centered on a preferred channel, mirroring the seed-record mapping.
    pub fn centered_on(primary: Channel) -> Self {
        let mut mix = Self {
            weights: [0.05; 5],
        };
        mix.weights[primary as usize] = 0.6;
        // Secondary mass goes to the nearest substitute channel.
        let secondary = match primary {
            Channel::Branch => Channel::Atm,
            Channel::Mobile => Channel::Online,
            Channel::Online => Channel::Mobile,
            Channel::Atm => Channel::Branch,
            Channel::CallCenter => Channel::Branch,
        };
        mix.weights[secondary as usize] = 0.2;
        mix.normalize();
        mix
    }

    pub fn weight(&self, channel: Channel) -> f64 {
        self.weights[channel as usize]
    }

    /// Fraction of preference mass on digital channels.
    pub fn digital_share(&self) -> f64 {
        self.weight(Channel::Mobile) + self.weight(Channel::Online)
    }

    /// Channel with the largest weight.
    pub fn dominant(&self) -> Channel {
        let mut best = Channel::Branch;
        let mut best_w = f64::MIN;
        for channel in Channel::ALL {
            if self.weights[channel as usize] > best_w {
                best_w = self.weights[channel as usize];
                best = channel;
            }
        }
        best
    }

    /// Move `amount` of weight from one channel to another, then renormalize.
    /// The transfer is limited by what the source channel actually holds.
    pub fn shift(&mut self, from: Channel, to: Channel, amount: f64) {
        let moved = amount.max(0.0).min(self.weights[from as usize]);
        self.weights[from as usize] -= moved;
        self.weights[to as usize] += moved;
        self.normalize();
    }

    pub fn normalize(&mut self) {
        for w in self.weights.iter_mut() {
            *w = w.max(0.0);
        }
        let total: f64 = self.weights.iter().sum();
        if total <= f64::EPSILON {
            self.weights = [0.2; 5];
        } else {
            for w in self.weights.iter_mut() {
                *w /= total;
            }
        }
    }

    pub fn sum(&self) -> f64 {
        self.weights.iter().sum()
    }
}

/// Retail-specific profile attributes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetailProfile {
    pub age: u32,
    pub monthly_income: Decimal,
    pub education: EducationLevel,
    pub sector: EmploymentSector,
    pub risk_tolerance: f64,
    pub price_sensitivity: f64,
    pub product_appetite: f64,
}

/// Corporate-specific profile attributes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorporateProfile {
    pub company_name: String,
    pub sector: BusinessSector,
    pub size: CompanySize,
    pub annual_revenue: Decimal,
    pub digital_maturity: f64,
    pub relationship_quality: f64,
    pub growth_orientation: f64,
    pub cash_flow_stability: f64,
}

/// Client-type specialization as a tagged variant instead of a class
/// hierarchy: behavior functions dispatch on the tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "client_type", rename_all = "snake_case")]
pub enum ClientKind {
    Retail(RetailProfile),
    Corporate(CorporateProfile),
}

impl ClientKind {
    pub fn is_retail(&self) -> bool {
        matches!(self, ClientKind::Retail(_))
    }

    /// The one product of each client type that is never dropped.
    pub fn core_product(&self) -> Product {
        match self {
            ClientKind::Retail(_) => Product::CurrentAccount,
            ClientKind::Corporate(_) => Product::BusinessChecking,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            ClientKind::Retail(_) => "retail",
            ClientKind::Corporate(_) => "corporate",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Active,
    Churned,
}

/// Full per-agent state.
///
/// Satisfaction, trust, loyalty and digital engagement live in `[0,1]`;
/// mutation sites clamp rather than relying on post-hoc correction.
/// `Churned` is terminal: a churned agent is skipped by behavior stepping
/// and influence propagation but stays in the arena for aggregates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentState {
    pub id: AgentId,
    pub client_id: String,
    pub kind: ClientKind,
    pub governorate: String,
    pub satisfaction: f64,
    pub trust: f64,
    pub loyalty: f64,
    pub digital_engagement: f64,
    pub status: AgentStatus,
    pub products: BTreeSet<Product>,
    pub channels: ChannelMix,
    pub peers: Vec<AgentId>,
    /// How strongly this agent's changes push onto peers.
    pub influence: f64,
    /// How strongly this agent is pulled toward its peers.
    pub susceptibility: f64,
    /// Per-agent jittered cadence for churn/portfolio evaluation.
    pub evaluation_period: u32,
    /// Interaction-quality samples accumulated since the last step.
    pub pending_experiences: Vec<f64>,
    /// Satisfaction change produced by the most recent step; drives the
    /// dirty-flag push pass of social influence.
    pub last_delta: f64,
}

impl AgentState {
    pub fn is_active(&self) -> bool {
        self.status == AgentStatus::Active
    }

    pub fn set_satisfaction(&mut self, value: f64) {
        let clamped = clamp_unit(value);
        self.last_delta += clamped - self.satisfaction;
        self.satisfaction = clamped;
    }

    pub fn adjust_satisfaction(&mut self, delta: f64) {
        self.set_satisfaction(self.satisfaction + delta);
    }

    pub fn adjust_trust(&mut self, delta: f64) {
        self.trust = clamp_unit(self.trust + delta);
    }

    pub fn adjust_digital_engagement(&mut self, delta: f64) {
        self.digital_engagement = clamp_unit(self.digital_engagement + delta);
    }

    /// Record a service interaction; its quality feeds the next
    /// satisfaction update.
    pub fn add_experience(&mut self, quality: f64) {
        self.pending_experiences.push(clamp_unit(quality));
    }

    pub fn churn(&mut self) {
        self.status = AgentStatus::Churned;
    }

    pub fn owns(&self, product: Product) -> bool {
        self.products.contains(&product)
    }

    pub fn adopt_product(&mut self, product: Product) -> bool {
        self.products.insert(product)
    }

    /// Drop a product. The client type's core product is never dropped.
    pub fn drop_product(&mut self, product: Product) -> bool {
        if product == self.kind.core_product() {
            return false;
        }
        let removed = self.products.remove(&product);
        if removed {
            // Losing a product stings a little.
            self.satisfaction = clamp_unit(self.satisfaction * 0.95);
        }
        removed
    }
}

/// Owned agent table: the single place agent state lives. Subsystems borrow
/// it; nothing self-registers.
#[derive(Debug, Default, Clone)]
pub struct AgentArena {
    agents: Vec<AgentState>,
}

impl AgentArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, agent: AgentState) {
        debug_assert_eq!(agent.id.0 as usize, self.agents.len());
        self.agents.push(agent);
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn get(&self, id: AgentId) -> Option<&AgentState> {
        self.agents.get(id.0 as usize)
    }

    pub fn get_mut(&mut self, id: AgentId) -> Option<&mut AgentState> {
        self.agents.get_mut(id.0 as usize)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AgentState> {
        self.agents.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut AgentState> {
        self.agents.iter_mut()
    }

    pub fn ids(&self) -> Vec<AgentId> {
        self.agents.iter().map(|a| a.id).collect()
    }

    pub fn active_count(&self) -> usize {
        self.agents.iter().filter(|a| a.is_active()).count()
    }

    /// Snapshot of every agent's satisfaction, indexed by id. Used by the
    /// influence pass so pull reads pre-pass values.
    pub fn satisfaction_snapshot(&self) -> Vec<f64> {
        self.agents.iter().map(|a| a.satisfaction).collect()
    }
}
