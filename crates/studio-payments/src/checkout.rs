//! Creem Checkout
//!
//! Thin client for the Creem hosted-checkout API. The server never renders
//! payment forms itself: it resolves the plan to a product id, asks Creem for
//! a checkout session, and hands the hosted URL back to the SPA. Fulfillment
//! happens later via the webhook, keyed by the metadata attached here.

use serde::{Deserialize, Serialize};
use tracing::info;

use studio_ledger::BillingInterval;

use crate::catalog::PlanId;
use crate::error::{PaymentError, Result};

const DEFAULT_BASE_URL: &str = "https://api.creem.io";

/// Client for the Creem payments API
pub struct CreemClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

/// Parameters for a new hosted checkout session
#[derive(Clone, Debug)]
pub struct CheckoutRequest {
    pub plan: PlanId,
    pub interval: BillingInterval,
    pub user_id: String,
    pub email: Option<String>,
    /// Where Creem redirects the browser after payment
    pub success_url: String,
}

/// A created checkout session
#[derive(Clone, Debug, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub checkout_url: String,
}

#[derive(Serialize)]
struct CheckoutBody<'a> {
    product_id: &'a str,
    units: u32,
    success_url: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    customer: Option<CheckoutCustomer<'a>>,
    metadata: CheckoutMetadata<'a>,
}

#[derive(Serialize)]
struct CheckoutCustomer<'a> {
    email: &'a str,
}

/// Attribution carried through Creem and echoed back in webhook events
#[derive(Serialize)]
struct CheckoutMetadata<'a> {
    user_id: &'a str,
    plan_id: &'a str,
    interval: &'a str,
}

impl CreemClient {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL.to_string())
    }

    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Create a hosted checkout session for a plan purchase
    pub async fn create_checkout_session(&self, req: &CheckoutRequest) -> Result<CheckoutSession> {
        let product_id = req.plan.product_id(req.interval);

        let body = CheckoutBody {
            product_id,
            units: 1,
            success_url: &req.success_url,
            customer: req
                .email
                .as_deref()
                .map(|email| CheckoutCustomer { email }),
            metadata: CheckoutMetadata {
                user_id: &req.user_id,
                plan_id: req.plan.as_str(),
                interval: req.interval.as_str(),
            },
        };

        let response = self
            .http
            .post(format!("{}/v1/checkouts", self.base_url))
            .header("x-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PaymentError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let session: CheckoutSession = response.json().await?;
        info!(
            session_id = %session.id,
            plan = %req.plan,
            interval = %req.interval.as_str(),
            "Created Creem checkout session"
        );
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkout_body_serialization() {
        let body = CheckoutBody {
            product_id: "prod_4BV6rfzTZBt37QapS6JPtj",
            units: 1,
            success_url: "http://localhost:5174/payment/success?session_id={CHECKOUT_SESSION_ID}",
            customer: Some(CheckoutCustomer {
                email: "user@example.com",
            }),
            metadata: CheckoutMetadata {
                user_id: "user-1",
                plan_id: "pro",
                interval: "month",
            },
        };

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["product_id"], "prod_4BV6rfzTZBt37QapS6JPtj");
        assert_eq!(json["units"], 1);
        assert_eq!(json["customer"]["email"], "user@example.com");
        assert_eq!(json["metadata"]["user_id"], "user-1");
        assert_eq!(json["metadata"]["plan_id"], "pro");
        assert_eq!(json["metadata"]["interval"], "month");
    }

    #[test]
    fn test_checkout_body_omits_missing_customer() {
        let body = CheckoutBody {
            product_id: "prod_2cJDGzjStr2eTZgVx0xfGD",
            units: 1,
            success_url: "http://localhost:5174/payment/success",
            customer: None,
            metadata: CheckoutMetadata {
                user_id: "user-2",
                plan_id: "basic",
                interval: "year",
            },
        };

        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("customer").is_none());
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = CreemClient::with_base_url("key".into(), "https://api.creem.io/".into());
        assert_eq!(client.base_url, "https://api.creem.io");
    }

    #[test]
    fn test_checkout_session_decoding() {
        let session: CheckoutSession = serde_json::from_str(
            r#"{"id": "ch_123", "checkout_url": "https://creem.io/checkout/ch_123", "mode": "subscription"}"#,
        )
        .unwrap();
        assert_eq!(session.id, "ch_123");
        assert_eq!(session.checkout_url, "https://creem.io/checkout/ch_123");
    }
}
