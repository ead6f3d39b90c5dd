//! # studio-server
//!
//! HTTP server for pixel-studio: REST proxies for the image features,
//! Creem checkout and webhook endpoints, and the credit ledger API.
//!
//! The router is built here so integration tests can drive it in-process;
//! `main.rs` only wires configuration into [`AppState`] and serves.

pub mod config;
pub mod error;
pub mod handlers;
pub mod state;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers::{
    add_credits, create_checkout, creem_webhook, deduct_credits, generate_image, health_check,
    list_products, recognize, remove_bg, test_grant_subscription, test_user_credits,
};
use crate::state::AppState;

/// Request body cap; images arrive base64-encoded inside JSON
const BODY_LIMIT: usize = 50 * 1024 * 1024;

/// Build the application router.
///
/// The /api/test routes exist only when asked for; in production they are
/// absent entirely, not merely disabled.
pub fn router(state: AppState, enable_test_endpoints: bool) -> Router {
    let mut app = Router::new()
        // Health & catalog
        .route("/health", get(health_check))
        .route("/api/products", get(list_products))
        // Image features
        .route("/api/remove-bg", post(remove_bg))
        .route("/api/recognize", post(recognize))
        .route("/api/generate-image", post(generate_image))
        // Payments
        .route("/api/create-checkout", post(create_checkout))
        .route("/api/webhooks/creem", post(creem_webhook))
        // Credits
        .route("/api/credits/deduct", post(deduct_credits))
        .route("/api/credits/add", post(add_credits));

    if enable_test_endpoints {
        app = app
            .route("/api/test/grant-subscription", post(test_grant_subscription))
            .route("/api/test/user-credits/{user_id}", get(test_user_credits));
    }

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    app.layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
