//! Ledger Storage
//!
//! [`LedgerStore`] is the seam between the HTTP layer and wherever the
//! ledger actually lives. Mutations return outcome enums instead of errors
//! so callers can map "not enough credits" and "already credited" onto
//! proper responses without string-matching.
//!
//! Atomicity contract: `grant` and `deduct` must each apply their balance
//! check and write as one indivisible step. Two concurrent deducts for the
//! same user must never both pass the sufficiency check.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::model::{
    CreditBalance, CreditTransaction, Subscription, SubscriptionStatus, TransactionKind,
};

/// Outcome of a credit grant
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GrantOutcome {
    /// Balance after the grant
    Applied(CreditBalance),

    /// A grant with the same reference was already recorded; nothing changed
    AlreadyApplied,
}

/// Outcome of a conditional deduct
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeductOutcome {
    /// Credits left after the deduct
    Applied { remaining: i64 },

    /// Balance was below the requested amount; nothing changed
    Insufficient { available: i64 },

    /// The user has no balance row at all
    NoAccount,
}

/// Ledger storage trait
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Get a user's balance row
    async fn balance(&self, user_id: &str) -> Result<Option<CreditBalance>>;

    /// Credit a user, creating the balance row on first grant.
    ///
    /// When `reference` is set the grant is idempotent: a second call with
    /// the same reference returns [`GrantOutcome::AlreadyApplied`] without
    /// touching the balance. Webhook replays rely on this.
    async fn grant(
        &self,
        user_id: &str,
        amount: i64,
        kind: TransactionKind,
        description: &str,
        reference: Option<&str>,
    ) -> Result<GrantOutcome>;

    /// Debit a user if and only if the balance covers `amount`
    async fn deduct(
        &self,
        user_id: &str,
        amount: i64,
        kind: TransactionKind,
        description: &str,
    ) -> Result<DeductOutcome>;

    /// Newest-first slice of a user's transaction log
    async fn recent_transactions(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<CreditTransaction>>;

    /// Insert or replace the user's subscription row (one per user)
    async fn upsert_subscription(&self, subscription: &Subscription) -> Result<()>;

    /// Get the user's subscription row
    async fn subscription_for_user(&self, user_id: &str) -> Result<Option<Subscription>>;

    /// Update status/periods by provider subscription id.
    ///
    /// `None` period values leave the stored ones untouched. Returns whether
    /// a row matched.
    async fn update_subscription(
        &self,
        subscription_id: &str,
        status: SubscriptionStatus,
        period_start: Option<DateTime<Utc>>,
        period_end: Option<DateTime<Utc>>,
    ) -> Result<bool>;
}

#[derive(Default)]
struct Inner {
    balances: HashMap<String, CreditBalance>,
    transactions: Vec<CreditTransaction>,
    subscriptions: HashMap<String, Subscription>,
    applied_references: HashSet<String>,
}

impl Inner {
    fn push_transaction(
        &mut self,
        user_id: &str,
        amount: i64,
        kind: TransactionKind,
        description: &str,
        reference: Option<&str>,
    ) {
        self.transactions.push(CreditTransaction {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            amount,
            kind,
            description: description.to_string(),
            reference: reference.map(str::to_string),
            created_at: Utc::now(),
        });
    }
}

/// In-memory ledger (for development and tests)
///
/// Every mutation takes the write lock for its whole read-check-write
/// sequence, so the atomicity contract holds without a real database.
pub struct MemoryLedger {
    inner: RwLock<Inner>,
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
        }
    }
}

#[async_trait]
impl LedgerStore for MemoryLedger {
    async fn balance(&self, user_id: &str) -> Result<Option<CreditBalance>> {
        let inner = self.inner.read().unwrap();
        Ok(inner.balances.get(user_id).cloned())
    }

    async fn grant(
        &self,
        user_id: &str,
        amount: i64,
        kind: TransactionKind,
        description: &str,
        reference: Option<&str>,
    ) -> Result<GrantOutcome> {
        let mut inner = self.inner.write().unwrap();

        if let Some(reference) = reference {
            if !inner.applied_references.insert(reference.to_string()) {
                return Ok(GrantOutcome::AlreadyApplied);
            }
        }

        let balance = inner
            .balances
            .entry(user_id.to_string())
            .or_insert_with(|| CreditBalance::new(user_id));
        balance.credits += amount;
        balance.total_earned += amount;
        let snapshot = balance.clone();

        inner.push_transaction(user_id, amount, kind, description, reference);

        Ok(GrantOutcome::Applied(snapshot))
    }

    async fn deduct(
        &self,
        user_id: &str,
        amount: i64,
        kind: TransactionKind,
        description: &str,
    ) -> Result<DeductOutcome> {
        let mut inner = self.inner.write().unwrap();

        let Some(balance) = inner.balances.get_mut(user_id) else {
            return Ok(DeductOutcome::NoAccount);
        };

        if balance.credits < amount {
            return Ok(DeductOutcome::Insufficient {
                available: balance.credits,
            });
        }

        balance.credits -= amount;
        balance.total_spent += amount;
        let remaining = balance.credits;

        inner.push_transaction(user_id, -amount, kind, description, None);

        Ok(DeductOutcome::Applied { remaining })
    }

    async fn recent_transactions(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<CreditTransaction>> {
        let inner = self.inner.read().unwrap();
        // Append order is chronological, so walking backwards gives newest first
        Ok(inner
            .transactions
            .iter()
            .rev()
            .filter(|tx| tx.user_id == user_id)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn upsert_subscription(&self, subscription: &Subscription) -> Result<()> {
        let mut inner = self.inner.write().unwrap();
        inner
            .subscriptions
            .insert(subscription.user_id.clone(), subscription.clone());
        Ok(())
    }

    async fn subscription_for_user(&self, user_id: &str) -> Result<Option<Subscription>> {
        let inner = self.inner.read().unwrap();
        Ok(inner.subscriptions.get(user_id).cloned())
    }

    async fn update_subscription(
        &self,
        subscription_id: &str,
        status: SubscriptionStatus,
        period_start: Option<DateTime<Utc>>,
        period_end: Option<DateTime<Utc>>,
    ) -> Result<bool> {
        let mut inner = self.inner.write().unwrap();

        let Some(subscription) = inner
            .subscriptions
            .values_mut()
            .find(|s| s.subscription_id == subscription_id)
        else {
            return Ok(false);
        };

        subscription.status = status;
        if period_start.is_some() {
            subscription.current_period_start = period_start;
        }
        if period_end.is_some() {
            subscription.current_period_end = period_end;
        }

        Ok(true)
    }
}
