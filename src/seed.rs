//! Agent seed records and population construction.
//!
//! Seed records are the external boundary: upstream data pipelines produce
//! them, this module turns them into a fully wired [`AgentArena`]. A
//! deterministic synthetic generator stands in when no real seed data is
//! available.

use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::agent::{
    AgentArena, AgentState, AgentStatus, ChannelMix, ClientKind, CorporateProfile, RetailProfile,
};
use crate::types::{
    clamp_unit, AgentId, BusinessSector, Channel, CompanySize, EducationLevel, EmploymentSector,
    Product,
};

/// Per-retail-client seed record, as produced by the data pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetailSeedRecord {
    pub client_id: String,
    pub age: u32,
    pub governorate: String,
    pub monthly_income: Decimal,
    pub risk_tolerance: f64,
    pub satisfaction_score: f64,
    pub digital_engagement_score: f64,
    pub preferred_channel: String,
}

/// Per-corporate-client seed record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorporateSeedRecord {
    pub client_id: String,
    pub company_name: String,
    pub business_sector: String,
    pub company_size: String,
    pub annual_revenue: Decimal,
    pub digital_maturity_score: f64,
    pub headquarters_governorate: String,
}

pub fn load_retail_seeds(path: &str) -> Result<Vec<RetailSeedRecord>, String> {
    let contents =
        std::fs::read_to_string(path).map_err(|e| format!("failed to read {path}: {e}"))?;
    serde_json::from_str(&contents).map_err(|e| format!("invalid retail seed JSON: {e}"))
}

pub fn load_corporate_seeds(path: &str) -> Result<Vec<CorporateSeedRecord>, String> {
    let contents =
        std::fs::read_to_string(path).map_err(|e| format!("failed to read {path}: {e}"))?;
    serde_json::from_str(&contents).map_err(|e| format!("invalid corporate seed JSON: {e}"))
}

/// Education is not in the seed schema; infer it from income and digital
/// engagement the way the upstream profiles were built.
fn infer_education(income: Decimal, digital: f64) -> EducationLevel {
    if income > dec!(4000) && digital > 0.7 {
        EducationLevel::Graduate
    } else if income > dec!(2500) || digital > 0.6 {
        EducationLevel::University
    } else if income > dec!(1500) {
        EducationLevel::Secondary
    } else {
        EducationLevel::Primary
    }
}

fn infer_employment_sector(income: Decimal, risk: f64) -> EmploymentSector {
    if income > dec!(3000) && risk < 0.4 {
        EmploymentSector::Government
    } else if income > dec!(2500) {
        EmploymentSector::Services
    } else if risk > 0.6 {
        EmploymentSector::Private
    } else {
        EmploymentSector::Agriculture
    }
}

fn retail_product_appetite(age: u32, income: Decimal, digital: f64) -> f64 {
    let mut appetite = 0.5;
    if (25..=45).contains(&age) {
        appetite += 0.2;
    } else if age < 25 {
        appetite += 0.1;
    }
    if income > dec!(3000) {
        appetite += 0.2;
    } else if income > dec!(2000) {
        appetite += 0.1;
    }
    appetite += digital * 0.2;
    clamp_unit(appetite)
}

fn initial_retail_products(record: &RetailSeedRecord, rng: &mut StdRng) -> BTreeSet<Product> {
    let mut products = BTreeSet::from([Product::CurrentAccount]);
    if record.monthly_income > dec!(1500) && rng.random_bool(0.6) {
        products.insert(Product::SavingsAccount);
    }
    if record.monthly_income > dec!(2500) && record.age > 25 && rng.random_bool(0.4) {
        products.insert(Product::PersonalLoan);
    }
    if record.digital_engagement_score > 0.6 && rng.random_bool(0.7) {
        products.insert(Product::MobileBanking);
    }
    if record.age > 30 && record.monthly_income > dec!(2000) && rng.random_bool(0.3) {
        products.insert(Product::Mortgage);
    }
    products
}

fn corporate_risk_tolerance(sector: BusinessSector, size: CompanySize, digital: f64) -> f64 {
    let sector_risk = match sector {
        BusinessSector::Technology => 0.7,
        BusinessSector::Retail => 0.5,
        BusinessSector::Manufacturing => 0.4,
        BusinessSector::Services => 0.5,
        BusinessSector::Agriculture => 0.3,
        BusinessSector::Construction => 0.6,
    };
    let size_factor = match size {
        CompanySize::Micro => 0.8,
        CompanySize::Small => 1.0,
        CompanySize::Medium => 0.9,
        CompanySize::Large => 0.7,
    };
    (sector_risk * size_factor + digital * 0.1).clamp(0.1, 1.0)
}

fn corporate_growth_orientation(sector: BusinessSector, size: CompanySize, digital: f64) -> f64 {
    let mut growth = match sector {
        BusinessSector::Technology => 0.8,
        BusinessSector::Services | BusinessSector::Retail => 0.6,
        BusinessSector::Manufacturing | BusinessSector::Agriculture => 0.4,
        BusinessSector::Construction => 0.5,
    };
    if size == CompanySize::Small {
        growth += 0.1;
    }
    growth += digital * 0.2;
    clamp_unit(growth)
}

fn initial_corporate_products(
    record: &CorporateSeedRecord,
    rng: &mut StdRng,
) -> BTreeSet<Product> {
    let mut products = BTreeSet::from([Product::BusinessChecking]);
    if record.annual_revenue > dec!(500000) {
        products.insert(Product::CashManagement);
        if rng.random_bool(0.7) {
            products.insert(Product::BusinessCreditLine);
        }
    }
    if record.annual_revenue > dec!(1000000) && rng.random_bool(0.3) {
        products.insert(Product::TradeFinance);
        products.insert(Product::FxServices);
    }
    if record.digital_maturity_score > 0.6 {
        products.insert(Product::CorporateOnlineBanking);
    }
    let size = CompanySize::parse(&record.company_size);
    if matches!(size, CompanySize::Medium | CompanySize::Large) && rng.random_bool(0.5) {
        products.insert(Product::PayrollServices);
    }
    products
}

/// Build the agent arena from seed records and wire the peer graph.
/// Behavioral attributes not present in the seed schema are drawn from the
/// seeded generator, so the same records and seed always produce the same
/// population.
pub fn build_population(
    retail: &[RetailSeedRecord],
    corporate: &[CorporateSeedRecord],
    seed: u64,
) -> AgentArena {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut arena = AgentArena::new();
    let mut next_id = 0u32;

    for record in retail {
        let profile = RetailProfile {
            age: record.age,
            monthly_income: record.monthly_income,
            education: infer_education(record.monthly_income, record.digital_engagement_score),
            sector: infer_employment_sector(record.monthly_income, record.risk_tolerance),
            risk_tolerance: clamp_unit(record.risk_tolerance),
            price_sensitivity: rng.random_range(0.2..0.8),
            product_appetite: retail_product_appetite(
                record.age,
                record.monthly_income,
                record.digital_engagement_score,
            ),
        };
        let channel = Channel::parse(&record.preferred_channel).unwrap_or(Channel::Branch);
        let agent = AgentState {
            id: AgentId(next_id),
            client_id: record.client_id.clone(),
            kind: ClientKind::Retail(profile),
            governorate: record.governorate.clone(),
            satisfaction: clamp_unit(record.satisfaction_score),
            trust: rng.random_range(0.3..0.9),
            loyalty: rng.random_range(0.3..0.9),
            digital_engagement: clamp_unit(record.digital_engagement_score),
            status: AgentStatus::Active,
            products: initial_retail_products(record, &mut rng),
            channels: ChannelMix::centered_on(channel),
            peers: Vec::new(),
            influence: rng.random_range(0.1..0.9),
            susceptibility: rng.random_range(0.1..0.8),
            evaluation_period: rng.random_range(3..=8),
            pending_experiences: Vec::new(),
            last_delta: 0.0,
        };
        arena.insert(agent);
        next_id += 1;
    }

    for record in corporate {
        let sector = BusinessSector::parse(&record.business_sector);
        let size = CompanySize::parse(&record.company_size);
        let profile = CorporateProfile {
            company_name: record.company_name.clone(),
            sector,
            size,
            annual_revenue: record.annual_revenue,
            digital_maturity: clamp_unit(record.digital_maturity_score),
            relationship_quality: if matches!(size, CompanySize::Medium | CompanySize::Large) {
                0.6
            } else {
                0.4
            },
            growth_orientation: corporate_growth_orientation(
                sector,
                size,
                record.digital_maturity_score,
            ),
            cash_flow_stability: rng.random_range(0.4..0.9),
        };
        let primary = if record.digital_maturity_score > 0.6 {
            Channel::Online
        } else {
            Channel::Branch
        };
        let agent = AgentState {
            id: AgentId(next_id),
            client_id: record.client_id.clone(),
            kind: ClientKind::Corporate(profile),
            governorate: record.headquarters_governorate.clone(),
            satisfaction: rng.random_range(0.4..0.8),
            trust: rng.random_range(0.4..0.9),
            loyalty: rng.random_range(0.4..0.9),
            digital_engagement: clamp_unit(record.digital_maturity_score),
            status: AgentStatus::Active,
            products: initial_corporate_products(record, &mut rng),
            channels: ChannelMix::centered_on(primary),
            peers: Vec::new(),
            influence: rng.random_range(0.1..0.9),
            susceptibility: rng.random_range(0.1..0.5),
            evaluation_period: rng.random_range(5..=12),
            pending_experiences: Vec::new(),
            last_delta: 0.0,
        };
        arena.insert(agent);
        next_id += 1;
    }

    wire_peer_graph(&mut arena, &mut rng);
    arena
}

/// Undirected influence graph: each agent draws 3-7 peers; links are added
/// in both directions and deduplicated.
fn wire_peer_graph(arena: &mut AgentArena, rng: &mut StdRng) {
    let ids = arena.ids();
    if ids.len() < 2 {
        return;
    }
    let mut edges: Vec<(AgentId, AgentId)> = Vec::new();
    for &id in &ids {
        let count = rng.random_range(3..=7).min(ids.len() - 1);
        let mut chosen = BTreeSet::new();
        while chosen.len() < count {
            if let Some(&peer) = ids.choose(rng) {
                if peer != id {
                    chosen.insert(peer);
                }
            }
        }
        for peer in chosen {
            edges.push((id, peer));
        }
    }
    for (a, b) in edges {
        if let Some(agent) = arena.get_mut(a) {
            agent.peers.push(b);
        }
        if let Some(agent) = arena.get_mut(b) {
            agent.peers.push(a);
        }
    }
    for agent in arena.iter_mut() {
        agent.peers.sort_unstable();
        agent.peers.dedup();
    }
}

const GOVERNORATES: [&str; 6] = ["Tunis", "Sfax", "Sousse", "Gabes", "Bizerte", "Kairouan"];
const SECTORS: [&str; 6] = [
    "technology",
    "retail",
    "manufacturing",
    "services",
    "agriculture",
    "construction",
];
const SIZES: [&str; 4] = ["micro", "small", "medium", "large"];
const CHANNELS: [&str; 4] = ["branch", "mobile", "online", "whatsapp"];

/// Deterministic mock population for runs without real seed data.
pub fn synthetic_population(n: usize, retail_ratio: f64, seed: u64) -> AgentArena {
    let mut rng = StdRng::seed_from_u64(seed);
    let retail_count = ((n as f64) * clamp_unit(retail_ratio)).round() as usize;
    let corporate_count = n - retail_count;

    let retail: Vec<RetailSeedRecord> = (0..retail_count)
        .map(|i| RetailSeedRecord {
            client_id: format!("R_{i:05}"),
            age: rng.random_range(18..=70),
            governorate: GOVERNORATES.choose(&mut rng).unwrap().to_string(),
            monthly_income: Decimal::from(rng.random_range(800..6000)),
            risk_tolerance: rng.random_range(0.1..0.9),
            satisfaction_score: rng.random_range(0.4..0.8),
            digital_engagement_score: rng.random_range(0.1..0.9),
            preferred_channel: CHANNELS.choose(&mut rng).unwrap().to_string(),
        })
        .collect();

    let corporate: Vec<CorporateSeedRecord> = (0..corporate_count)
        .map(|i| CorporateSeedRecord {
            client_id: format!("C_{i:05}"),
            company_name: format!("Company_{i:04}"),
            business_sector: SECTORS.choose(&mut rng).unwrap().to_string(),
            company_size: SIZES.choose(&mut rng).unwrap().to_string(),
            annual_revenue: Decimal::from(rng.random_range(100_000..5_000_000)),
            digital_maturity_score: rng.random_range(0.1..0.9),
            headquarters_governorate: GOVERNORATES.choose(&mut rng).unwrap().to_string(),
        })
        .collect();

    build_population(&retail, &corporate, seed.wrapping_add(1))
}
