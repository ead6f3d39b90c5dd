//! Plan Catalog
//!
//! Static pricing and product configuration: the three paid plans, their
//! Creem product ids per billing interval, the credits each plan grants per
//! cycle, and the per-feature credit costs. Parsing the SPA's plan/interval
//! strings happens here, so unknown values fail with a descriptive error
//! before anything reaches the provider.

use serde::{Deserialize, Serialize};
use studio_ledger::{BillingInterval, TransactionKind};

use crate::error::{PaymentError, Result};

/// Paid plan tiers
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanId {
    Basic,
    Pro,
    Max,
}

impl PlanId {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanId::Basic => "basic",
            PlanId::Pro => "pro",
            PlanId::Max => "max",
        }
    }

    /// Parse a plan id; unknown ids fail rather than falling back
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "basic" => Ok(PlanId::Basic),
            "pro" => Ok(PlanId::Pro),
            "max" => Ok(PlanId::Max),
            other => Err(PaymentError::UnknownPlan(other.to_string())),
        }
    }

    /// Display name shown on the pricing page and stored on subscriptions
    pub fn display_name(&self) -> &'static str {
        match self {
            PlanId::Basic => "Basic",
            PlanId::Pro => "Pro",
            PlanId::Max => "Max",
        }
    }

    /// Credits granted per billing cycle
    pub fn credits(&self) -> i64 {
        match self {
            PlanId::Basic => 150,
            PlanId::Pro => 400,
            PlanId::Max => 1000,
        }
    }

    /// Creem product id for this plan at the given interval
    pub fn product_id(&self, interval: BillingInterval) -> &'static str {
        match (self, interval) {
            (PlanId::Basic, BillingInterval::Month) => "prod_2cJDGzjStr2eTZgVx0xfGD",
            (PlanId::Basic, BillingInterval::Year) => "prod_46KCugbYjZn6nN5wDiDxbO",
            (PlanId::Pro, BillingInterval::Month) => "prod_4BV6rfzTZBt37QapS6JPtj",
            (PlanId::Pro, BillingInterval::Year) => "prod_2WXLA8gc9V8fEBXEWwSF7X",
            (PlanId::Max, BillingInterval::Month) => "prod_4fS2iV9lNqvL8Plt0jTDbS",
            (PlanId::Max, BillingInterval::Year) => "prod_2DhOx0qR8mHrfY0rhSpLC",
        }
    }

    /// Get pricing for this plan
    pub fn pricing(&self) -> PlanPricing {
        match self {
            // Yearly prices carry a 20% discount off twelve monthly cycles
            PlanId::Basic => PlanPricing {
                id: "basic",
                name: "Basic",
                monthly_price: 12,
                yearly_price: 115,
                credits: 150,
            },
            PlanId::Pro => PlanPricing {
                id: "pro",
                name: "Pro",
                monthly_price: 29,
                yearly_price: 278,
                credits: 400,
            },
            PlanId::Max => PlanPricing {
                id: "max",
                name: "Max",
                monthly_price: 59,
                yearly_price: 566,
                credits: 1000,
            },
        }
    }

    /// All plans in pricing-page order
    pub fn all() -> [PlanId; 3] {
        [PlanId::Basic, PlanId::Pro, PlanId::Max]
    }
}

impl std::fmt::Display for PlanId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Pricing information
#[derive(Clone, Copy, Debug, Serialize)]
pub struct PlanPricing {
    pub id: &'static str,
    pub name: &'static str,
    pub monthly_price: u32,
    pub yearly_price: u32,
    pub credits: i64,
}

/// Parse a billing interval; unknown intervals fail rather than falling back
pub fn parse_interval(s: &str) -> Result<BillingInterval> {
    BillingInterval::parse(s).ok_or_else(|| PaymentError::UnknownInterval(s.to_string()))
}

/// Reverse lookup from a Creem product id, used for webhook attribution
pub fn plan_for_product(product_id: &str) -> Option<(PlanId, BillingInterval)> {
    for plan in PlanId::all() {
        for interval in [BillingInterval::Month, BillingInterval::Year] {
            if plan.product_id(interval) == product_id {
                return Some((plan, interval));
            }
        }
    }
    None
}

/// Credits one invocation of a feature costs; purchases have no cost
pub fn credit_cost(kind: TransactionKind) -> Option<i64> {
    match kind {
        TransactionKind::Compress => Some(1),
        TransactionKind::RemoveBg => Some(3),
        TransactionKind::Recognize => Some(2),
        TransactionKind::Generate => Some(5),
        TransactionKind::Purchase => None,
    }
}
