use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Fieldless event-type tag used for handler registration and summaries.
/// Serializes under the same names as the scenario wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventType {
    #[serde(rename = "MarketingCampaignEvent")]
    MarketingCampaign,
    #[serde(rename = "BranchClosureEvent")]
    BranchClosure,
    #[serde(rename = "DigitalTransformationEvent")]
    DigitalTransformation,
    #[serde(rename = "CompetitorActionEvent")]
    CompetitorAction,
    #[serde(rename = "EconomicShockEvent")]
    EconomicShock,
    #[serde(rename = "RegulatoryChangeEvent")]
    RegulatoryChange,
    #[serde(rename = "ProductLaunchEvent")]
    ProductLaunch,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::MarketingCampaign => "MarketingCampaignEvent",
            EventType::BranchClosure => "BranchClosureEvent",
            EventType::DigitalTransformation => "DigitalTransformationEvent",
            EventType::CompetitorAction => "CompetitorActionEvent",
            EventType::EconomicShock => "EconomicShockEvent",
            EventType::RegulatoryChange => "RegulatoryChangeEvent",
            EventType::ProductLaunch => "ProductLaunchEvent",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarketingCampaignParams {
    #[serde(default)]
    pub target_segments: Vec<String>,
    #[serde(default)]
    pub campaign_type: String,
    pub intensity: f64,
    #[serde(default)]
    pub duration: u32,
    #[serde(default)]
    pub budget: f64,
    #[serde(default)]
    pub channels: Vec<String>,
    #[serde(default)]
    pub message: String,
    /// Campaign payloads vary per marketing team; anything not modeled
    /// explicitly lands here.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BranchClosureParams {
    pub location: String,
    pub impact_intensity: f64,
    #[serde(default)]
    pub alternative_branches: Vec<String>,
    #[serde(default)]
    pub compensation_offered: bool,
    #[serde(default)]
    pub digital_migration_support: bool,
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DigitalTransformationParams {
    #[serde(default)]
    pub service_type: String,
    #[serde(default)]
    pub channel: String,
    pub user_experience_score: f64,
    #[serde(default)]
    pub engagement_boost: f64,
    #[serde(default)]
    pub target_regions: Vec<String>,
    #[serde(default)]
    pub features: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompetitorActionParams {
    #[serde(default)]
    pub competitor_name: String,
    #[serde(default)]
    pub action_type: String,
    #[serde(default)]
    pub affected_region: String,
    pub impact_intensity: f64,
    #[serde(default)]
    pub duration: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EconomicShockParams {
    #[serde(default)]
    pub shock_type: String,
    pub severity: f64,
    #[serde(default)]
    pub affected_sectors: Vec<String>,
    #[serde(default)]
    pub duration: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegulatoryChangeParams {
    #[serde(default)]
    pub regulation_type: String,
    #[serde(default)]
    pub affected_products: Vec<String>,
    pub impact_severity: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductLaunchParams {
    pub product_type: String,
    #[serde(default)]
    pub target_market: String,
    #[serde(default)]
    pub pricing: f64,
    #[serde(default)]
    pub digital_only: bool,
    #[serde(default)]
    pub launch_governorates: Vec<String>,
}

/// Closed set of business events with one concrete parameter struct each.
///
/// The wire form matches the scenario document: `event_type` selects the
/// variant, `parameters` holds the payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", content = "parameters")]
pub enum EventKind {
    #[serde(rename = "MarketingCampaignEvent")]
    MarketingCampaign(MarketingCampaignParams),
    #[serde(rename = "BranchClosureEvent")]
    BranchClosure(BranchClosureParams),
    #[serde(rename = "DigitalTransformationEvent")]
    DigitalTransformation(DigitalTransformationParams),
    #[serde(rename = "CompetitorActionEvent")]
    CompetitorAction(CompetitorActionParams),
    #[serde(rename = "EconomicShockEvent")]
    EconomicShock(EconomicShockParams),
    #[serde(rename = "RegulatoryChangeEvent")]
    RegulatoryChange(RegulatoryChangeParams),
    #[serde(rename = "ProductLaunchEvent")]
    ProductLaunch(ProductLaunchParams),
}

impl EventKind {
    pub fn event_type(&self) -> EventType {
        match self {
            EventKind::MarketingCampaign(_) => EventType::MarketingCampaign,
            EventKind::BranchClosure(_) => EventType::BranchClosure,
            EventKind::DigitalTransformation(_) => EventType::DigitalTransformation,
            EventKind::CompetitorAction(_) => EventType::CompetitorAction,
            EventKind::EconomicShock(_) => EventType::EconomicShock,
            EventKind::RegulatoryChange(_) => EventType::RegulatoryChange,
            EventKind::ProductLaunch(_) => EventType::ProductLaunch,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

/// Named numeric outputs written by an event's handlers, consumed by the
/// metrics/reporting side.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventResult(pub BTreeMap<String, f64>);

impl EventResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: &str, value: f64) {
        self.0.insert(key.to_string(), value);
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.0.get(key).copied()
    }

    pub fn merge(&mut self, other: EventResult) {
        self.0.extend(other.0);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A scheduled business event.
///
/// Identity and payload are fixed at creation; `status`, `result` and
/// `error` are written by the scheduler as the event moves through
/// `Pending -> Processing -> {Completed | Failed}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    #[serde(flatten)]
    pub kind: EventKind,
    pub target_step: u32,
    pub injected_at: DateTime<Utc>,
    pub status: EventStatus,
    #[serde(default)]
    pub result: EventResult,
    #[serde(default)]
    pub error: Option<String>,
}

impl Event {
    pub fn new(id: impl Into<String>, target_step: u32, kind: EventKind) -> Self {
        Self {
            id: id.into(),
            kind,
            target_step,
            injected_at: Utc::now(),
            status: EventStatus::Pending,
            result: EventResult::new(),
            error: None,
        }
    }

    pub fn event_type(&self) -> EventType {
        self.kind.event_type()
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[step {}] {} ({}, {:?})",
            self.target_step,
            self.event_type(),
            self.id,
            self.status
        )
    }
}

/// One line of the audit log kept by the scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub step: u32,
    pub event_id: String,
    pub event_type: EventType,
    pub status: EventStatus,
    pub result: EventResult,
    pub error: Option<String>,
    pub processed_at: DateTime<Utc>,
}
