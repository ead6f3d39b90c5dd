//! HTTP Handlers

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};

use studio_ledger::{
    BillingInterval, CreditBalance, CreditTransaction, DeductOutcome, GrantOutcome, Subscription,
    SubscriptionStatus, TransactionKind,
};
use studio_payments::{CheckoutRequest, PlanId, WebhookEvent, WebhookProcessor};

use crate::error::ApiError;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub version: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub monthly_product_id: &'static str,
    pub yearly_product_id: &'static str,
    pub monthly_price: u32,
    pub yearly_price: u32,
    pub credits: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveBgRequest {
    #[serde(default)]
    pub image_base64: Option<String>,
}

#[derive(Serialize)]
pub struct RemoveBgResponse {
    pub success: bool,
    pub image: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecognizeRequest {
    #[serde(default)]
    pub image_base64: Option<String>,
}

#[derive(Serialize)]
pub struct RecognizeResponse {
    pub success: bool,
    pub result: String,
}

#[derive(Debug, Deserialize)]
pub struct GenerateImageRequest {
    #[serde(default)]
    pub prompt: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateImageResponse {
    pub success: bool,
    pub image_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCheckoutRequest {
    #[serde(default)]
    pub plan_id: Option<String>,
    #[serde(default)]
    pub interval: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub user_email: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCheckoutResponse {
    pub success: bool,
    pub checkout_url: String,
    pub session_id: String,
}

#[derive(Serialize)]
pub struct WebhookAck {
    pub received: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeductCreditsRequest {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub amount: Option<i64>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Serialize)]
pub struct DeductCreditsResponse {
    pub success: bool,
    pub remaining: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddCreditsRequest {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub amount: Option<i64>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Serialize)]
pub struct AddCreditsResponse {
    pub success: bool,
    pub balance: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantSubscriptionRequest {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub plan_id: Option<String>,
}

#[derive(Serialize)]
pub struct GrantSubscriptionResponse {
    pub success: bool,
    pub message: String,
}

/// Snapshot served to the test admin panel; key casing matches what the
/// panel reads (`recentTransactions`, snake_case inside the rows)
#[derive(Serialize)]
pub struct UserCreditsInfo {
    pub credits: CreditBalance,
    pub subscription: Option<Subscription>,
    #[serde(rename = "recentTransactions")]
    pub recent_transactions: Vec<CreditTransaction>,
}

// ============================================================================
// Helpers
// ============================================================================

fn required(value: Option<String>, field: &str) -> Result<String, ApiError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::BadRequest(format!("Missing required field: {field}")))
}

fn positive_amount(amount: Option<i64>) -> Result<i64, ApiError> {
    match amount {
        Some(amount) if amount > 0 => Ok(amount),
        Some(_) => Err(ApiError::BadRequest("Amount must be positive".into())),
        None => Err(ApiError::BadRequest("Missing required field: amount".into())),
    }
}

fn parse_kind(kind: &str) -> Result<TransactionKind, ApiError> {
    TransactionKind::parse(kind)
        .ok_or_else(|| ApiError::BadRequest(format!("Invalid transaction type: {kind}")))
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        message: "Server is running",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Plan catalog for the pricing page
pub async fn list_products() -> Json<Vec<ProductInfo>> {
    let products = PlanId::all()
        .into_iter()
        .map(|plan| {
            let pricing = plan.pricing();
            ProductInfo {
                id: pricing.id,
                name: pricing.name,
                monthly_product_id: plan.product_id(BillingInterval::Month),
                yearly_product_id: plan.product_id(BillingInterval::Year),
                monthly_price: pricing.monthly_price,
                yearly_price: pricing.yearly_price,
                credits: pricing.credits,
            }
        })
        .collect();

    Json(products)
}

/// Background removal proxy
pub async fn remove_bg(
    State(state): State<AppState>,
    Json(payload): Json<RemoveBgRequest>,
) -> Result<Json<RemoveBgResponse>, ApiError> {
    let image = payload
        .image_base64
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Missing image data".into()))?;

    let client = state
        .remove_bg
        .as_ref()
        .ok_or(ApiError::Unconfigured("Background removal"))?;

    let image = client
        .remove_background(&image)
        .await
        .map_err(|e| ApiError::from_imaging("Failed to remove background", e))?;

    Ok(Json(RemoveBgResponse {
        success: true,
        image,
    }))
}

/// Image recognition proxy
pub async fn recognize(
    State(state): State<AppState>,
    Json(payload): Json<RecognizeRequest>,
) -> Result<Json<RecognizeResponse>, ApiError> {
    let image = payload
        .image_base64
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Missing image data".into()))?;

    let client = state
        .ark
        .as_ref()
        .ok_or(ApiError::Unconfigured("Image recognition"))?;

    let result = client
        .recognize(&image)
        .await
        .map_err(|e| ApiError::from_imaging("Failed to recognize image", e))?;

    Ok(Json(RecognizeResponse {
        success: true,
        result,
    }))
}

/// AI image generation proxy
pub async fn generate_image(
    State(state): State<AppState>,
    Json(payload): Json<GenerateImageRequest>,
) -> Result<Json<GenerateImageResponse>, ApiError> {
    let prompt = payload
        .prompt
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Missing prompt".into()))?;

    let client = state
        .ark
        .as_ref()
        .ok_or(ApiError::Unconfigured("Image generation"))?;

    let image_url = client
        .generate(&prompt)
        .await
        .map_err(|e| ApiError::from_imaging("Failed to generate image", e))?;

    Ok(Json(GenerateImageResponse {
        success: true,
        image_url,
    }))
}

/// Create a Creem hosted checkout session
pub async fn create_checkout(
    State(state): State<AppState>,
    Json(payload): Json<CreateCheckoutRequest>,
) -> Result<Json<CreateCheckoutResponse>, ApiError> {
    let plan_id = required(payload.plan_id, "planId")?;
    let interval = required(payload.interval, "interval")?;
    let user_id = required(payload.user_id, "userId")?;

    // Catalog validation happens before the configured check so bad input
    // is a 400 even on servers without payment credentials
    let plan = PlanId::parse(&plan_id)?;
    let interval = studio_payments::parse_interval(&interval)?;

    let creem = state
        .creem
        .as_ref()
        .ok_or(ApiError::Unconfigured("Payments"))?;

    let request = CheckoutRequest {
        plan,
        interval,
        user_id,
        email: payload.user_email.filter(|v| !v.is_empty()),
        success_url: format!(
            "{}/payment/success?session_id={{CHECKOUT_SESSION_ID}}",
            state.app_base_url
        ),
    };

    let session = creem.create_checkout_session(&request).await?;

    Ok(Json(CreateCheckoutResponse {
        success: true,
        checkout_url: session.checkout_url,
        session_id: session.id,
    }))
}

/// Creem webhook receiver.
///
/// Takes the raw body: the signature covers the exact bytes Creem sent,
/// so nothing may parse or re-serialize the payload before verification.
pub async fn creem_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, ApiError> {
    let verifier = state
        .webhook_verifier
        .as_ref()
        .ok_or(ApiError::Unconfigured("Webhooks"))?;

    let signature = headers
        .get("x-creem-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or(ApiError::InvalidSignature)?;

    if !verifier.verify(&body, signature) {
        return Err(ApiError::InvalidSignature);
    }

    let event = WebhookEvent::parse(&body)?;

    let processor = WebhookProcessor::new(state.ledger.clone());
    processor.handle(event).await.map_err(|e| {
        ApiError::upstream(
            "Webhook processing failed",
            Some(serde_json::Value::String(e.to_string())),
        )
    })?;

    Ok(Json(WebhookAck { received: true }))
}

/// Spend credits on a feature
pub async fn deduct_credits(
    State(state): State<AppState>,
    Json(payload): Json<DeductCreditsRequest>,
) -> Result<Json<DeductCreditsResponse>, ApiError> {
    let user_id = required(payload.user_id, "userId")?;
    let amount = positive_amount(payload.amount)?;
    let kind = parse_kind(&required(payload.kind, "type")?)?;
    let description = payload
        .description
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| format!("Used {} credits for {}", amount, kind.as_str()));

    let outcome = state
        .ledger
        .deduct(&user_id, amount, kind, &description)
        .await?;

    match outcome {
        DeductOutcome::Applied { remaining } => Ok(Json(DeductCreditsResponse {
            success: true,
            remaining,
        })),
        DeductOutcome::Insufficient { available } => {
            Err(ApiError::InsufficientCredits { available })
        }
        DeductOutcome::NoAccount => Err(ApiError::NoCreditRecord),
    }
}

/// Grant credits outside the checkout flow
pub async fn add_credits(
    State(state): State<AppState>,
    Json(payload): Json<AddCreditsRequest>,
) -> Result<Json<AddCreditsResponse>, ApiError> {
    let user_id = required(payload.user_id, "userId")?;
    let amount = positive_amount(payload.amount)?;
    let kind = match payload.kind.as_deref().filter(|v| !v.is_empty()) {
        Some(kind) => parse_kind(kind)?,
        None => TransactionKind::Purchase,
    };
    let description = payload
        .description
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| format!("Added {amount} credits"));

    let outcome = state
        .ledger
        .grant(&user_id, amount, kind, &description, None)
        .await?;

    let balance = match outcome {
        GrantOutcome::Applied(balance) => balance.credits,
        // Unreachable without a reference; read back to stay truthful
        GrantOutcome::AlreadyApplied => state
            .ledger
            .balance(&user_id)
            .await?
            .map_or(0, |b| b.credits),
    };

    Ok(Json(AddCreditsResponse {
        success: true,
        balance,
    }))
}

/// Test-only: grant a plan without payment
pub async fn test_grant_subscription(
    State(state): State<AppState>,
    Json(payload): Json<GrantSubscriptionRequest>,
) -> Result<Json<GrantSubscriptionResponse>, ApiError> {
    let user_id = required(payload.user_id, "userId")?;
    let plan = PlanId::parse(&required(payload.plan_id, "planId")?)?;

    let credits = plan.credits();
    state
        .ledger
        .grant(
            &user_id,
            credits,
            TransactionKind::Purchase,
            &format!("Test grant: {} plan", plan.display_name()),
            None,
        )
        .await?;

    let now = chrono::Utc::now();
    let subscription = Subscription {
        user_id,
        subscription_id: format!("test_sub_{}", uuid::Uuid::new_v4()),
        product_id: plan.product_id(BillingInterval::Month).to_string(),
        plan_name: plan.display_name().to_string(),
        interval: BillingInterval::Month,
        status: SubscriptionStatus::Active,
        current_period_start: Some(now),
        current_period_end: Some(now + chrono::Duration::days(30)),
    };
    state.ledger.upsert_subscription(&subscription).await?;

    Ok(Json(GrantSubscriptionResponse {
        success: true,
        message: format!(
            "Granted {} plan ({} credits)",
            plan.display_name(),
            credits
        ),
    }))
}

/// Test-only: balance, subscription and recent activity in one shot
pub async fn test_user_credits(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<UserCreditsInfo>, ApiError> {
    let credits = state
        .ledger
        .balance(&user_id)
        .await?
        .unwrap_or_else(|| CreditBalance::new(&user_id));
    let subscription = state.ledger.subscription_for_user(&user_id).await?;
    let recent_transactions = state.ledger.recent_transactions(&user_id, 10).await?;

    Ok(Json(UserCreditsInfo {
        credits,
        subscription,
        recent_transactions,
    }))
}
