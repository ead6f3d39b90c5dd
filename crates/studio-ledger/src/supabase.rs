//! Supabase-Backed Ledger
//!
//! [`SupabaseLedger`] implements [`LedgerStore`] against the Supabase REST
//! interface. Plain reads and the subscription upsert go through
//! `/rest/v1/<table>`; the two mutations with an atomicity contract
//! (`grant`, `deduct`) call SQL functions through `/rest/v1/rpc/...` so the
//! balance check and write land in a single round trip. The functions live
//! in `supabase/schema.sql` next to the table definitions.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::{LedgerError, Result};
use crate::model::{
    CreditBalance, CreditTransaction, Subscription, SubscriptionStatus, TransactionKind,
};
use crate::store::{DeductOutcome, GrantOutcome, LedgerStore};

/// Supabase connection settings
#[derive(Clone, Debug)]
pub struct SupabaseConfig {
    /// Project URL (`https://<project>.supabase.co`)
    pub url: String,

    /// Service-role key; bypasses row-level security
    pub service_key: String,
}

/// Ledger store over the Supabase REST interface
pub struct SupabaseLedger {
    http: reqwest::Client,
    config: SupabaseConfig,
}

/// Row shape returned by the `grant_credits` SQL function
#[derive(Deserialize)]
struct GrantRow {
    applied: bool,
    #[serde(default)]
    credits: i64,
    #[serde(default)]
    total_earned: i64,
    #[serde(default)]
    total_spent: i64,
}

/// Row shape returned by the `deduct_credits` SQL function
#[derive(Deserialize)]
struct DeductRow {
    status: String,
    #[serde(default)]
    remaining: Option<i64>,
    #[serde(default)]
    available: Option<i64>,
}

impl SupabaseLedger {
    pub fn new(config: SupabaseConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.config.url.trim_end_matches('/'), table)
    }

    fn rpc_url(&self, function: &str) -> String {
        format!(
            "{}/rest/v1/rpc/{}",
            self.config.url.trim_end_matches('/'),
            function
        )
    }

    /// Attach the service-key headers Supabase expects on every call
    fn authed(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.header("apikey", &self.config.service_key)
            .bearer_auth(&self.config.service_key)
    }

    /// Read the body, turning non-2xx responses into [`LedgerError::Api`]
    async fn read_body(resp: reqwest::Response) -> Result<String> {
        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            return Err(LedgerError::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(body)
    }

    fn decode<T: serde::de::DeserializeOwned>(body: &str) -> Result<T> {
        serde_json::from_str(body)
            .map_err(|e| LedgerError::InvalidResponse(format!("{e}; body={body}")))
    }
}

#[async_trait]
impl LedgerStore for SupabaseLedger {
    async fn balance(&self, user_id: &str) -> Result<Option<CreditBalance>> {
        let resp = self
            .authed(self.http.get(self.rest_url("user_credits")))
            .query(&[
                ("user_id", format!("eq.{user_id}")),
                ("select", "user_id,credits,total_earned,total_spent".into()),
            ])
            .send()
            .await?;

        let body = Self::read_body(resp).await?;
        let rows: Vec<CreditBalance> = Self::decode(&body)?;
        Ok(rows.into_iter().next())
    }

    async fn grant(
        &self,
        user_id: &str,
        amount: i64,
        kind: TransactionKind,
        description: &str,
        reference: Option<&str>,
    ) -> Result<GrantOutcome> {
        let resp = self
            .authed(self.http.post(self.rpc_url("grant_credits")))
            .json(&serde_json::json!({
                "p_user_id": user_id,
                "p_amount": amount,
                "p_kind": kind.as_str(),
                "p_description": description,
                "p_reference": reference,
            }))
            .send()
            .await?;

        let body = Self::read_body(resp).await?;
        let row: GrantRow = Self::decode(&body)?;

        if !row.applied {
            tracing::info!(user_id, reference = ?reference, "grant replayed, already applied");
            return Ok(GrantOutcome::AlreadyApplied);
        }

        Ok(GrantOutcome::Applied(CreditBalance {
            user_id: user_id.to_string(),
            credits: row.credits,
            total_earned: row.total_earned,
            total_spent: row.total_spent,
        }))
    }

    async fn deduct(
        &self,
        user_id: &str,
        amount: i64,
        kind: TransactionKind,
        description: &str,
    ) -> Result<DeductOutcome> {
        let resp = self
            .authed(self.http.post(self.rpc_url("deduct_credits")))
            .json(&serde_json::json!({
                "p_user_id": user_id,
                "p_amount": amount,
                "p_kind": kind.as_str(),
                "p_description": description,
            }))
            .send()
            .await?;

        let body = Self::read_body(resp).await?;
        let row: DeductRow = Self::decode(&body)?;

        match row.status.as_str() {
            "applied" => Ok(DeductOutcome::Applied {
                remaining: row.remaining.ok_or_else(|| {
                    LedgerError::InvalidResponse("applied deduct without remaining".into())
                })?,
            }),
            "insufficient" => Ok(DeductOutcome::Insufficient {
                available: row.available.unwrap_or(0),
            }),
            "no_account" => Ok(DeductOutcome::NoAccount),
            other => Err(LedgerError::InvalidResponse(format!(
                "unknown deduct status: {other}"
            ))),
        }
    }

    async fn recent_transactions(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<CreditTransaction>> {
        let resp = self
            .authed(self.http.get(self.rest_url("credit_transactions")))
            .query(&[
                ("user_id", format!("eq.{user_id}")),
                ("order", "created_at.desc".into()),
                ("limit", limit.to_string()),
            ])
            .send()
            .await?;

        let body = Self::read_body(resp).await?;
        Self::decode(&body)
    }

    async fn upsert_subscription(&self, subscription: &Subscription) -> Result<()> {
        let resp = self
            .authed(self.http.post(self.rest_url("user_subscriptions")))
            .query(&[("on_conflict", "user_id")])
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(subscription)
            .send()
            .await?;

        Self::read_body(resp).await?;
        Ok(())
    }

    async fn subscription_for_user(&self, user_id: &str) -> Result<Option<Subscription>> {
        let resp = self
            .authed(self.http.get(self.rest_url("user_subscriptions")))
            .query(&[
                ("user_id", format!("eq.{user_id}")),
                // Active rows sort before canceled ones
                ("order", "status.asc".into()),
                ("limit", "1".into()),
            ])
            .send()
            .await?;

        let body = Self::read_body(resp).await?;
        let rows: Vec<Subscription> = Self::decode(&body)?;
        Ok(rows.into_iter().next())
    }

    async fn update_subscription(
        &self,
        subscription_id: &str,
        status: SubscriptionStatus,
        period_start: Option<DateTime<Utc>>,
        period_end: Option<DateTime<Utc>>,
    ) -> Result<bool> {
        let mut patch = serde_json::json!({ "status": status.as_str() });
        if let Some(start) = period_start {
            patch["current_period_start"] = serde_json::json!(start);
        }
        if let Some(end) = period_end {
            patch["current_period_end"] = serde_json::json!(end);
        }

        let resp = self
            .authed(self.http.patch(self.rest_url("user_subscriptions")))
            .query(&[("subscription_id", format!("eq.{subscription_id}"))])
            .header("Prefer", "return=representation")
            .json(&patch)
            .send()
            .await?;

        let body = Self::read_body(resp).await?;
        let rows: Vec<serde_json::Value> = Self::decode(&body)?;
        Ok(!rows.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_ledger() -> SupabaseLedger {
        SupabaseLedger::new(SupabaseConfig {
            url: "https://example.supabase.co/".into(),
            service_key: "service-key".into(),
        })
    }

    #[test]
    fn test_url_building_trims_trailing_slash() {
        let ledger = test_ledger();
        assert_eq!(
            ledger.rest_url("user_credits"),
            "https://example.supabase.co/rest/v1/user_credits"
        );
        assert_eq!(
            ledger.rpc_url("deduct_credits"),
            "https://example.supabase.co/rest/v1/rpc/deduct_credits"
        );
    }

    #[test]
    fn test_grant_row_decodes_replay() {
        let row: GrantRow = serde_json::from_str(r#"{"applied": false}"#).unwrap();
        assert!(!row.applied);
        assert_eq!(row.credits, 0);
    }

    #[test]
    fn test_deduct_row_decodes_outcomes() {
        let applied: DeductRow =
            serde_json::from_str(r#"{"status": "applied", "remaining": 5}"#).unwrap();
        assert_eq!(applied.status, "applied");
        assert_eq!(applied.remaining, Some(5));

        let insufficient: DeductRow =
            serde_json::from_str(r#"{"status": "insufficient", "available": 3}"#).unwrap();
        assert_eq!(insufficient.available, Some(3));

        let missing: DeductRow = serde_json::from_str(r#"{"status": "no_account"}"#).unwrap();
        assert!(missing.remaining.is_none());
    }
}
