use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for an agent within a simulation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(pub u32);

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "agent_{}", self.0)
    }
}

/// Service channels a client can interact through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Branch,
    Mobile,
    Online,
    Atm,
    CallCenter,
}

impl Channel {
    pub const ALL: [Channel; 5] = [
        Channel::Branch,
        Channel::Mobile,
        Channel::Online,
        Channel::Atm,
        Channel::CallCenter,
    ];

    pub fn is_digital(&self) -> bool {
        matches!(self, Channel::Mobile | Channel::Online)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Branch => "branch",
            Channel::Mobile => "mobile",
            Channel::Online => "online",
            Channel::Atm => "atm",
            Channel::CallCenter => "call_center",
        }
    }

    pub fn parse(s: &str) -> Option<Channel> {
        match s {
            "branch" => Some(Channel::Branch),
            "mobile" | "whatsapp" => Some(Channel::Mobile),
            "online" | "web" => Some(Channel::Online),
            "atm" => Some(Channel::Atm),
            "call_center" | "phone" => Some(Channel::CallCenter),
            _ => None,
        }
    }
}

/// Banking products, retail and corporate lines combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Product {
    // Retail line
    CurrentAccount,
    SavingsAccount,
    CreditCard,
    PersonalLoan,
    Mortgage,
    MobileBanking,
    InvestmentAccount,
    LifeInsurance,
    // Corporate line
    BusinessChecking,
    CashManagement,
    BusinessCreditLine,
    TermLoan,
    TradeFinance,
    FxServices,
    CorporateOnlineBanking,
    PayrollServices,
}

impl Product {
    /// Products delivered primarily through digital channels.
    pub fn is_digital(&self) -> bool {
        matches!(self, Product::MobileBanking | Product::CorporateOnlineBanking)
    }

    pub fn is_corporate(&self) -> bool {
        matches!(
            self,
            Product::BusinessChecking
                | Product::CashManagement
                | Product::BusinessCreditLine
                | Product::TermLoan
                | Product::TradeFinance
                | Product::FxServices
                | Product::CorporateOnlineBanking
                | Product::PayrollServices
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Product::CurrentAccount => "current_account",
            Product::SavingsAccount => "savings_account",
            Product::CreditCard => "credit_card",
            Product::PersonalLoan => "personal_loan",
            Product::Mortgage => "mortgage",
            Product::MobileBanking => "mobile_banking",
            Product::InvestmentAccount => "investment_account",
            Product::LifeInsurance => "life_insurance",
            Product::BusinessChecking => "business_checking",
            Product::CashManagement => "cash_management",
            Product::BusinessCreditLine => "business_credit_line",
            Product::TermLoan => "term_loan",
            Product::TradeFinance => "trade_finance",
            Product::FxServices => "fx_services",
            Product::CorporateOnlineBanking => "corporate_online_banking",
            Product::PayrollServices => "payroll_services",
        }
    }

    pub fn parse(s: &str) -> Option<Product> {
        match s {
            "current_account" | "checking_account" => Some(Product::CurrentAccount),
            "savings_account" => Some(Product::SavingsAccount),
            "credit_card" => Some(Product::CreditCard),
            "personal_loan" => Some(Product::PersonalLoan),
            "mortgage" => Some(Product::Mortgage),
            "mobile_banking" => Some(Product::MobileBanking),
            "investment_account" => Some(Product::InvestmentAccount),
            "life_insurance" => Some(Product::LifeInsurance),
            "business_checking" => Some(Product::BusinessChecking),
            "cash_management" => Some(Product::CashManagement),
            "business_credit_line" => Some(Product::BusinessCreditLine),
            "term_loan" => Some(Product::TermLoan),
            "trade_finance" => Some(Product::TradeFinance),
            "fx_services" => Some(Product::FxServices),
            "corporate_online_banking" | "online_banking_corporate" => {
                Some(Product::CorporateOnlineBanking)
            }
            "payroll_services" => Some(Product::PayrollServices),
            _ => None,
        }
    }
}

/// Education levels inferred for retail clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EducationLevel {
    Primary,
    Secondary,
    University,
    Graduate,
}

/// Employment sector of a retail client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmploymentSector {
    Government,
    Services,
    Private,
    Agriculture,
}

/// Business sector of a corporate client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BusinessSector {
    Technology,
    Retail,
    Manufacturing,
    Services,
    Agriculture,
    Construction,
}

impl BusinessSector {
    pub fn parse(s: &str) -> BusinessSector {
        match s {
            "technology" => BusinessSector::Technology,
            "retail" => BusinessSector::Retail,
            "manufacturing" => BusinessSector::Manufacturing,
            "agriculture" => BusinessSector::Agriculture,
            "construction" => BusinessSector::Construction,
            _ => BusinessSector::Services,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BusinessSector::Technology => "technology",
            BusinessSector::Retail => "retail",
            BusinessSector::Manufacturing => "manufacturing",
            BusinessSector::Services => "services",
            BusinessSector::Agriculture => "agriculture",
            BusinessSector::Construction => "construction",
        }
    }
}

/// Corporate client size bracket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompanySize {
    Micro,
    Small,
    Medium,
    Large,
}

impl CompanySize {
    pub fn parse(s: &str) -> CompanySize {
        match s {
            "micro" => CompanySize::Micro,
            "medium" => CompanySize::Medium,
            "large" => CompanySize::Large,
            _ => CompanySize::Small,
        }
    }
}

/// Clamp a behavioral score into the unit interval.
pub fn clamp_unit(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}
