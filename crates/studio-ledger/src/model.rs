//! Ledger Domain Types
//!
//! Rust views of the three backing tables: `user_credits`,
//! `credit_transactions` and `user_subscriptions`. Field names match the
//! column names so rows deserialize straight from the REST interface.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-user credit balance (`user_credits` row)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditBalance {
    /// Owning user (auth provider id)
    pub user_id: String,

    /// Spendable credits
    pub credits: i64,

    /// Lifetime credits granted
    pub total_earned: i64,

    /// Lifetime credits spent
    pub total_spent: i64,
}

impl CreditBalance {
    /// Fresh zero balance for a user
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            credits: 0,
            total_earned: 0,
            total_spent: 0,
        }
    }
}

/// What a balance mutation was for
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// Credits bought through a plan
    Purchase,
    /// Image compression
    Compress,
    /// Background removal
    RemoveBg,
    /// Image recognition
    Recognize,
    /// Image generation
    Generate,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Purchase => "purchase",
            TransactionKind::Compress => "compress",
            TransactionKind::RemoveBg => "remove_bg",
            TransactionKind::Recognize => "recognize",
            TransactionKind::Generate => "generate",
        }
    }

    /// Strict parse; unknown kinds are rejected upstream, not coerced
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "purchase" => Some(TransactionKind::Purchase),
            "compress" => Some(TransactionKind::Compress),
            "remove_bg" => Some(TransactionKind::RemoveBg),
            "recognize" => Some(TransactionKind::Recognize),
            "generate" => Some(TransactionKind::Generate),
            _ => None,
        }
    }
}

/// Append-only ledger entry (`credit_transactions` row)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditTransaction {
    /// Row id (UUID)
    pub id: String,

    /// Owning user
    pub user_id: String,

    /// Signed delta: positive = grant, negative = deduct
    pub amount: i64,

    /// What the mutation was for
    #[serde(rename = "type")]
    pub kind: TransactionKind,

    /// Human-readable note shown in the dashboard
    pub description: String,

    /// Provider reference (checkout session id) for idempotent grants
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,

    /// Insertion timestamp
    pub created_at: DateTime<Utc>,
}

/// Billing cadence of a paid plan
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingInterval {
    Month,
    Year,
}

impl BillingInterval {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillingInterval::Month => "month",
            BillingInterval::Year => "year",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "month" => Some(BillingInterval::Month),
            "year" => Some(BillingInterval::Year),
            _ => None,
        }
    }
}

/// Provider-side subscription state we track
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Active,
    Canceled,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Canceled => "canceled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(SubscriptionStatus::Active),
            "canceled" => Some(SubscriptionStatus::Canceled),
            _ => None,
        }
    }
}

/// Subscription record (`user_subscriptions` row, one per user)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    /// Owning user
    pub user_id: String,

    /// Provider-assigned subscription id
    pub subscription_id: String,

    /// Provider product the subscription is for
    pub product_id: String,

    /// Display name of the plan ("Basic", "Pro", "Max")
    pub plan_name: String,

    /// Billing cadence
    pub interval: BillingInterval,

    /// Current provider status
    pub status: SubscriptionStatus,

    /// Start of the current billing period
    #[serde(default)]
    pub current_period_start: Option<DateTime<Utc>>,

    /// End of the current billing period
    #[serde(default)]
    pub current_period_end: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_kind_round_trip() {
        for kind in [
            TransactionKind::Purchase,
            TransactionKind::Compress,
            TransactionKind::RemoveBg,
            TransactionKind::Recognize,
            TransactionKind::Generate,
        ] {
            assert_eq!(TransactionKind::parse(kind.as_str()), Some(kind));
        }
    }

    #[test]
    fn test_transaction_kind_rejects_unknown() {
        assert_eq!(TransactionKind::parse("removebg"), None);
        assert_eq!(TransactionKind::parse("PURCHASE"), None);
        assert_eq!(TransactionKind::parse(""), None);
    }

    #[test]
    fn test_kind_serializes_as_snake_case() {
        let json = serde_json::to_string(&TransactionKind::RemoveBg).unwrap();
        assert_eq!(json, "\"remove_bg\"");
    }

    #[test]
    fn test_new_balance_is_zeroed() {
        let balance = CreditBalance::new("user-1");
        assert_eq!(balance.credits, 0);
        assert_eq!(balance.total_earned, 0);
        assert_eq!(balance.total_spent, 0);
    }

    #[test]
    fn test_interval_parse() {
        assert_eq!(BillingInterval::parse("month"), Some(BillingInterval::Month));
        assert_eq!(BillingInterval::parse("year"), Some(BillingInterval::Year));
        assert_eq!(BillingInterval::parse("weekly"), None);
    }
}
