//! HTTP-level tests driving the full router with tower::ServiceExt::oneshot,
//! no TCP listener involved. Payment and imaging upstreams stay unconfigured
//! so their endpoints answer 503; everything else runs against the
//! in-memory ledger.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use studio_ledger::{LedgerStore, MemoryLedger, TransactionKind};
use studio_payments::WebhookVerifier;
use studio_server::state::AppState;

const WEBHOOK_SECRET: &str = "whsec_test";

fn build_state(ledger: Arc<MemoryLedger>) -> AppState {
    AppState {
        ledger,
        creem: None,
        webhook_verifier: Some(Arc::new(WebhookVerifier::new(WEBHOOK_SECRET))),
        remove_bg: None,
        ark: None,
        app_base_url: "http://localhost:5174".into(),
    }
}

fn build_app(ledger: Arc<MemoryLedger>, test_endpoints: bool) -> axum::Router {
    studio_server::router(build_state(ledger), test_endpoints)
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

fn sign(payload: &[u8]) -> String {
    use hmac::{Hmac, Mac};
    type HmacSha256 = Hmac<sha2::Sha256>;

    let mut mac = HmacSha256::new_from_slice(WEBHOOK_SECRET.as_bytes()).unwrap();
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

fn signed_webhook(payload: &Value) -> Request<Body> {
    let bytes = serde_json::to_vec(payload).unwrap();
    Request::post("/api/webhooks/creem")
        .header("content-type", "application/json")
        .header("x-creem-signature", sign(&bytes))
        .body(Body::from(bytes))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn checkout_event(session_id: &str, user_id: &str, plan: &str) -> Value {
    json!({
        "id": "evt_1",
        "type": "checkout.session.completed",
        "data": {
            "id": session_id,
            "metadata": {"user_id": user_id, "plan_id": plan, "interval": "month"},
            "customer": {"email": "user@example.com"}
        }
    })
}

// ============================================================================
// Health & catalog
// ============================================================================

#[tokio::test]
async fn test_health_returns_ok() {
    let app = build_app(Arc::new(MemoryLedger::new()), false);

    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["message"], "Server is running");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_products_catalog() {
    let app = build_app(Arc::new(MemoryLedger::new()), false);

    let response = app.oneshot(get("/api/products")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let products = body.as_array().unwrap();
    assert_eq!(products.len(), 3);

    let pro = &products[1];
    assert_eq!(pro["id"], "pro");
    assert_eq!(pro["name"], "Pro");
    assert_eq!(pro["monthlyPrice"], 29);
    assert_eq!(pro["yearlyPrice"], 278);
    assert_eq!(pro["credits"], 400);
    assert_eq!(pro["monthlyProductId"], "prod_4BV6rfzTZBt37QapS6JPtj");
    assert_eq!(pro["yearlyProductId"], "prod_2WXLA8gc9V8fEBXEWwSF7X");
}

// ============================================================================
// Image features
// ============================================================================

#[tokio::test]
async fn test_remove_bg_without_image_is_400() {
    let app = build_app(Arc::new(MemoryLedger::new()), false);

    let response = app
        .oneshot(post_json("/api/remove-bg", &json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["error"], "Missing image data");
}

#[tokio::test]
async fn test_remove_bg_unconfigured_is_503() {
    let app = build_app(Arc::new(MemoryLedger::new()), false);

    let payload = json!({"imageBase64": "data:image/png;base64,AAAA"});
    let response = app
        .oneshot(post_json("/api/remove-bg", &payload))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_recognize_without_image_is_400() {
    let app = build_app(Arc::new(MemoryLedger::new()), false);

    let response = app
        .oneshot(post_json("/api/recognize", &json!({"imageBase64": ""})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["error"], "Missing image data");
}

#[tokio::test]
async fn test_generate_without_prompt_is_400() {
    let app = build_app(Arc::new(MemoryLedger::new()), false);

    let response = app
        .oneshot(post_json("/api/generate-image", &json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["error"], "Missing prompt");
}

// ============================================================================
// Checkout
// ============================================================================

#[tokio::test]
async fn test_checkout_missing_fields_is_400() {
    let app = build_app(Arc::new(MemoryLedger::new()), false);

    let response = app
        .oneshot(post_json("/api/create-checkout", &json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["error"], "Missing required field: planId");
}

#[tokio::test]
async fn test_checkout_invalid_plan_is_400() {
    let app = build_app(Arc::new(MemoryLedger::new()), false);

    let payload = json!({"planId": "enterprise", "interval": "month", "userId": "user-1"});
    let response = app
        .oneshot(post_json("/api/create-checkout", &payload))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["error"], "Invalid plan ID: enterprise");
}

#[tokio::test]
async fn test_checkout_invalid_interval_is_400() {
    let app = build_app(Arc::new(MemoryLedger::new()), false);

    let payload = json!({"planId": "pro", "interval": "weekly", "userId": "user-1"});
    let response = app
        .oneshot(post_json("/api/create-checkout", &payload))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_checkout_unconfigured_is_503() {
    let app = build_app(Arc::new(MemoryLedger::new()), false);

    let payload = json!({"planId": "pro", "interval": "month", "userId": "user-1"});
    let response = app
        .oneshot(post_json("/api/create-checkout", &payload))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

// ============================================================================
// Webhooks
// ============================================================================

#[tokio::test]
async fn test_webhook_without_signature_is_401() {
    let app = build_app(Arc::new(MemoryLedger::new()), false);

    let response = app
        .oneshot(post_json(
            "/api/webhooks/creem",
            &checkout_event("ch_1", "user-1", "pro"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_webhook_with_bad_signature_is_401() {
    let ledger = Arc::new(MemoryLedger::new());
    let app = build_app(ledger.clone(), false);

    let bytes = serde_json::to_vec(&checkout_event("ch_1", "user-1", "pro")).unwrap();
    let request = Request::post("/api/webhooks/creem")
        .header("x-creem-signature", "deadbeef")
        .body(Body::from(bytes))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Nothing was credited
    assert!(ledger.balance("user-1").await.unwrap().is_none());
}

#[tokio::test]
async fn test_webhook_valid_signature_credits_user() {
    let ledger = Arc::new(MemoryLedger::new());
    let app = build_app(ledger.clone(), false);

    let response = app
        .oneshot(signed_webhook(&checkout_event("ch_1", "user-1", "pro")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["received"], true);

    let balance = ledger.balance("user-1").await.unwrap().unwrap();
    assert_eq!(balance.credits, 400);
}

#[tokio::test]
async fn test_webhook_replay_credits_once() {
    let ledger = Arc::new(MemoryLedger::new());
    let app = build_app(ledger.clone(), false);

    let event = checkout_event("ch_2", "user-1", "basic");
    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(signed_webhook(&event))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let balance = ledger.balance("user-1").await.unwrap().unwrap();
    assert_eq!(balance.credits, 150);
}

#[tokio::test]
async fn test_webhook_malformed_event_is_400() {
    let app = build_app(Arc::new(MemoryLedger::new()), false);

    let payload = json!({"type": "checkout.session.completed", "data": {"id": "ch_1"}});
    let response = app.oneshot(signed_webhook(&payload)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_webhook_unrecognized_event_is_acknowledged() {
    let app = build_app(Arc::new(MemoryLedger::new()), false);

    let payload = json!({"type": "dispute.created", "data": {"id": "d_1"}});
    let response = app.oneshot(signed_webhook(&payload)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

// ============================================================================
// Credits
// ============================================================================

#[tokio::test]
async fn test_deduct_happy_path() {
    let ledger = Arc::new(MemoryLedger::new());
    ledger
        .grant("user-1", 10, TransactionKind::Purchase, "Top-up", None)
        .await
        .unwrap();
    let app = build_app(ledger, false);

    let payload = json!({"userId": "user-1", "amount": 3, "type": "remove_bg"});
    let response = app
        .oneshot(post_json("/api/credits/deduct", &payload))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["remaining"], 7);
}

#[tokio::test]
async fn test_deduct_insufficient_is_403_with_available() {
    let ledger = Arc::new(MemoryLedger::new());
    ledger
        .grant("user-1", 3, TransactionKind::Purchase, "Top-up", None)
        .await
        .unwrap();
    let app = build_app(ledger.clone(), false);

    let payload = json!({"userId": "user-1", "amount": 5, "type": "generate"});
    let response = app
        .oneshot(post_json("/api/credits/deduct", &payload))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let body = body_json(response).await;
    assert_eq!(body["error"], "Insufficient credits");
    assert_eq!(body["available"], 3);

    // Balance untouched
    let balance = ledger.balance("user-1").await.unwrap().unwrap();
    assert_eq!(balance.credits, 3);
}

#[tokio::test]
async fn test_deduct_unknown_user_is_404() {
    let app = build_app(Arc::new(MemoryLedger::new()), false);

    let payload = json!({"userId": "ghost", "amount": 1, "type": "compress"});
    let response = app
        .oneshot(post_json("/api/credits/deduct", &payload))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_deduct_rejects_bad_input() {
    let ledger = Arc::new(MemoryLedger::new());
    ledger
        .grant("user-1", 10, TransactionKind::Purchase, "Top-up", None)
        .await
        .unwrap();
    let app = build_app(ledger, false);

    // Unknown transaction type
    let payload = json!({"userId": "user-1", "amount": 3, "type": "removeBg"});
    let response = app
        .clone()
        .oneshot(post_json("/api/credits/deduct", &payload))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Non-positive amount
    let payload = json!({"userId": "user-1", "amount": 0, "type": "compress"});
    let response = app
        .oneshot(post_json("/api/credits/deduct", &payload))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_add_credits_creates_account() {
    let ledger = Arc::new(MemoryLedger::new());
    let app = build_app(ledger.clone(), false);

    let payload = json!({"userId": "new-user", "amount": 25});
    let response = app
        .oneshot(post_json("/api/credits/add", &payload))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["balance"], 25);

    let balance = ledger.balance("new-user").await.unwrap().unwrap();
    assert_eq!(balance.total_earned, 25);
    assert_eq!(balance.total_spent, 0);

    let transactions = ledger.recent_transactions("new-user", 10).await.unwrap();
    assert_eq!(transactions.len(), 1);
    assert_eq!(transactions[0].kind, TransactionKind::Purchase);
}

// ============================================================================
// Test endpoints
// ============================================================================

#[tokio::test]
async fn test_admin_routes_absent_by_default() {
    let app = build_app(Arc::new(MemoryLedger::new()), false);

    let response = app
        .clone()
        .oneshot(get("/api/test/user-credits/user-1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let payload = json!({"userId": "user-1", "planId": "pro"});
    let response = app
        .oneshot(post_json("/api/test/grant-subscription", &payload))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_grant_and_snapshot() {
    let ledger = Arc::new(MemoryLedger::new());
    let app = build_app(ledger, true);

    let payload = json!({"userId": "user-1", "planId": "pro"});
    let response = app
        .clone()
        .oneshot(post_json("/api/test/grant-subscription", &payload))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Granted Pro plan (400 credits)");

    let response = app
        .oneshot(get("/api/test/user-credits/user-1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["credits"]["credits"], 400);
    assert_eq!(body["credits"]["total_earned"], 400);
    assert_eq!(body["subscription"]["plan_name"], "Pro");
    assert_eq!(body["subscription"]["status"], "active");
    assert_eq!(body["recentTransactions"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_admin_snapshot_for_fresh_user_is_zeroed() {
    let app = build_app(Arc::new(MemoryLedger::new()), true);

    let response = app
        .oneshot(get("/api/test/user-credits/nobody"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["credits"]["credits"], 0);
    assert!(body["subscription"].is_null());
    assert_eq!(body["recentTransactions"].as_array().unwrap().len(), 0);
}
