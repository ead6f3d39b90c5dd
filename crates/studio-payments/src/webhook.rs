//! Creem Webhooks
//!
//! Signature verification and event processing for Creem's webhook
//! callbacks. Verification hashes the raw request bytes exactly as received,
//! never a re-serialization, since JSON key order and whitespace are not
//! byte-stable. The body is only parsed after the signature checks out.
//!
//! Events decode into a tagged union so the processor can match
//! exhaustively; a payload that names a known event type but is missing its
//! fields is an error, not a silent drop.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use tracing::{debug, info, warn};

use studio_ledger::{
    BillingInterval, GrantOutcome, LedgerStore, Subscription, SubscriptionStatus, TransactionKind,
};

use crate::catalog::{self, PlanId};
use crate::error::{PaymentError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Verifies the `x-creem-signature` header
pub struct WebhookVerifier {
    secret: Vec<u8>,
}

impl WebhookVerifier {
    pub fn new(secret: &str) -> Self {
        Self {
            secret: secret.as_bytes().to_vec(),
        }
    }

    /// Check a lowercase-hex HMAC-SHA256 signature over the raw payload.
    ///
    /// Malformed hex counts as a mismatch. The comparison is constant time.
    pub fn verify(&self, payload: &[u8], signature: &str) -> bool {
        let Ok(expected) = hex::decode(signature) else {
            return false;
        };
        let Ok(mut mac) = HmacSha256::new_from_slice(&self.secret) else {
            return false;
        };
        mac.update(payload);
        mac.verify_slice(&expected).is_ok()
    }
}

/// A decoded webhook event
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WebhookEvent {
    /// A hosted checkout finished; credits are owed
    CheckoutCompleted {
        session_id: String,
        user_id: String,
        plan: PlanId,
        interval: BillingInterval,
        email: Option<String>,
    },

    /// A subscription started
    SubscriptionCreated {
        subscription_id: String,
        product_id: String,
        user_id: String,
        period_start: Option<DateTime<Utc>>,
        period_end: Option<DateTime<Utc>>,
    },

    /// A subscription ended
    SubscriptionCanceled { subscription_id: String },

    /// Status or period bounds changed
    SubscriptionUpdated {
        subscription_id: String,
        status: SubscriptionStatus,
        period_start: Option<DateTime<Utc>>,
        period_end: Option<DateTime<Utc>>,
    },

    /// An event type we do not act on; acknowledged and ignored
    Unhandled { kind: String },
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: serde_json::Value,
}

#[derive(Deserialize)]
struct CheckoutData {
    id: String,
    metadata: CheckoutMetadata,
    #[serde(default)]
    customer: Option<CheckoutCustomer>,
}

#[derive(Deserialize)]
struct CheckoutMetadata {
    user_id: String,
    plan_id: String,
    interval: String,
}

#[derive(Deserialize)]
struct CheckoutCustomer {
    #[serde(default)]
    email: Option<String>,
}

#[derive(Deserialize)]
struct SubscriptionCreatedData {
    id: String,
    product_id: String,
    metadata: SubscriptionMetadata,
    #[serde(default)]
    current_period_start: Option<DateTime<Utc>>,
    #[serde(default)]
    current_period_end: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct SubscriptionMetadata {
    user_id: String,
}

#[derive(Deserialize)]
struct SubscriptionCanceledData {
    id: String,
}

#[derive(Deserialize)]
struct SubscriptionUpdatedData {
    id: String,
    status: String,
    #[serde(default)]
    current_period_start: Option<DateTime<Utc>>,
    #[serde(default)]
    current_period_end: Option<DateTime<Utc>>,
}

fn decode<T: serde::de::DeserializeOwned>(kind: &str, data: serde_json::Value) -> Result<T> {
    serde_json::from_value(data).map_err(|e| PaymentError::WebhookParse(format!("{kind}: {e}")))
}

impl WebhookEvent {
    /// Decode a verified payload into an event
    pub fn parse(payload: &[u8]) -> Result<Self> {
        let envelope: Envelope = serde_json::from_slice(payload)
            .map_err(|e| PaymentError::WebhookParse(e.to_string()))?;

        match envelope.kind.as_str() {
            "checkout.session.completed" => {
                let data: CheckoutData = decode(&envelope.kind, envelope.data)?;
                Ok(WebhookEvent::CheckoutCompleted {
                    session_id: data.id,
                    user_id: data.metadata.user_id,
                    plan: PlanId::parse(&data.metadata.plan_id)?,
                    interval: catalog::parse_interval(&data.metadata.interval)?,
                    email: data.customer.and_then(|c| c.email),
                })
            }
            "subscription.created" => {
                let data: SubscriptionCreatedData = decode(&envelope.kind, envelope.data)?;
                Ok(WebhookEvent::SubscriptionCreated {
                    subscription_id: data.id,
                    product_id: data.product_id,
                    user_id: data.metadata.user_id,
                    period_start: data.current_period_start,
                    period_end: data.current_period_end,
                })
            }
            "subscription.canceled" => {
                let data: SubscriptionCanceledData = decode(&envelope.kind, envelope.data)?;
                Ok(WebhookEvent::SubscriptionCanceled {
                    subscription_id: data.id,
                })
            }
            "subscription.updated" => {
                let data: SubscriptionUpdatedData = decode(&envelope.kind, envelope.data)?;
                Ok(WebhookEvent::SubscriptionUpdated {
                    subscription_id: data.id,
                    status: parse_provider_status(&data.status),
                    period_start: data.current_period_start,
                    period_end: data.current_period_end,
                })
            }
            _ => Ok(WebhookEvent::Unhandled {
                kind: envelope.kind,
            }),
        }
    }
}

/// Collapse Creem's status vocabulary onto the two states we track
fn parse_provider_status(status: &str) -> SubscriptionStatus {
    match status {
        "active" | "trialing" => SubscriptionStatus::Active,
        _ => SubscriptionStatus::Canceled,
    }
}

/// Applies verified events to the ledger
pub struct WebhookProcessor<S: ?Sized> {
    store: Arc<S>,
}

impl<S: LedgerStore + ?Sized> WebhookProcessor<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Handle one event end to end
    pub async fn handle(&self, event: WebhookEvent) -> Result<()> {
        match event {
            WebhookEvent::CheckoutCompleted {
                session_id,
                user_id,
                plan,
                interval,
                email,
            } => {
                self.credit_checkout(&session_id, &user_id, plan, interval, email.as_deref())
                    .await
            }
            WebhookEvent::SubscriptionCreated {
                subscription_id,
                product_id,
                user_id,
                period_start,
                period_end,
            } => {
                self.record_subscription(subscription_id, product_id, user_id, period_start, period_end)
                    .await
            }
            WebhookEvent::SubscriptionCanceled { subscription_id } => {
                self.update_status(&subscription_id, SubscriptionStatus::Canceled, None, None)
                    .await
            }
            WebhookEvent::SubscriptionUpdated {
                subscription_id,
                status,
                period_start,
                period_end,
            } => {
                self.update_status(&subscription_id, status, period_start, period_end)
                    .await
            }
            WebhookEvent::Unhandled { kind } => {
                debug!(kind = %kind, "Ignoring unhandled webhook event");
                Ok(())
            }
        }
    }

    async fn credit_checkout(
        &self,
        session_id: &str,
        user_id: &str,
        plan: PlanId,
        interval: BillingInterval,
        email: Option<&str>,
    ) -> Result<()> {
        let credits = plan.credits();
        let description = format!("{} plan purchase ({})", plan.display_name(), interval.as_str());

        // The session id is the idempotency key: Creem retries deliveries,
        // and a replay must not credit twice
        let outcome = self
            .store
            .grant(
                user_id,
                credits,
                TransactionKind::Purchase,
                &description,
                Some(session_id),
            )
            .await?;

        match outcome {
            GrantOutcome::Applied(balance) => {
                info!(
                    user_id = %user_id,
                    email = ?email,
                    credits,
                    balance = balance.credits,
                    "Credited completed checkout"
                );
            }
            GrantOutcome::AlreadyApplied => {
                info!(session_id = %session_id, "Checkout already credited, skipping replay");
            }
        }
        Ok(())
    }

    async fn record_subscription(
        &self,
        subscription_id: String,
        product_id: String,
        user_id: String,
        period_start: Option<DateTime<Utc>>,
        period_end: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let (plan, interval) = catalog::plan_for_product(&product_id)
            .ok_or_else(|| PaymentError::UnknownProduct(product_id.clone()))?;

        let subscription = Subscription {
            user_id,
            subscription_id,
            product_id,
            plan_name: plan.display_name().to_string(),
            interval,
            status: SubscriptionStatus::Active,
            current_period_start: period_start,
            current_period_end: period_end,
        };
        self.store.upsert_subscription(&subscription).await?;

        info!(
            user_id = %subscription.user_id,
            subscription_id = %subscription.subscription_id,
            plan = %plan,
            "Recorded subscription"
        );
        Ok(())
    }

    async fn update_status(
        &self,
        subscription_id: &str,
        status: SubscriptionStatus,
        period_start: Option<DateTime<Utc>>,
        period_end: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let matched = self
            .store
            .update_subscription(subscription_id, status, period_start, period_end)
            .await?;

        if matched {
            info!(subscription_id = %subscription_id, status = %status.as_str(), "Updated subscription");
        } else {
            warn!(subscription_id = %subscription_id, "Update for unknown subscription, ignoring");
        }
        Ok(())
    }
}
