//! pixel-studio HTTP Server
//!
//! Axum-based backend for the pixel-studio SPA: image feature proxies,
//! Creem payments, and the credit ledger.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use studio_imaging::{ArkClient, RemoveBgClient};
use studio_ledger::{LedgerStore, MemoryLedger, SupabaseLedger};
use studio_payments::{CreemClient, WebhookVerifier};

use studio_server::config::Config;
use studio_server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment
    dotenvy::dotenv().ok();
    let config = Config::from_env();

    // Credit ledger backend
    let ledger: Arc<dyn LedgerStore> = match config.supabase() {
        Some(supabase) => {
            tracing::info!("✓ Supabase ledger configured");
            Arc::new(SupabaseLedger::new(supabase))
        }
        None => {
            tracing::warn!("⚠ Supabase not configured - using in-memory ledger");
            tracing::warn!("  Credits and subscriptions reset on restart");
            Arc::new(MemoryLedger::new())
        }
    };

    // Upstream image services
    let remove_bg = config
        .remove_bg_api_key
        .clone()
        .map(|key| Arc::new(RemoveBgClient::new(key)));
    if remove_bg.is_some() {
        tracing::info!("✓ remove.bg configured");
    } else {
        tracing::warn!("⚠ remove.bg not configured - background removal disabled");
    }

    let ark = config.ark().map(|ark| Arc::new(ArkClient::from_config(ark)));
    if ark.is_some() {
        tracing::info!("✓ Ark configured");
    } else {
        tracing::warn!("⚠ Ark not configured - recognition and generation disabled");
    }

    // Payments
    let creem = config.creem_api_key.clone().map(|key| {
        Arc::new(match config.creem_api_base.clone() {
            Some(base) => CreemClient::with_base_url(key, base),
            None => CreemClient::new(key),
        })
    });
    let webhook_verifier = config
        .creem_webhook_secret
        .as_deref()
        .map(|secret| Arc::new(WebhookVerifier::new(secret)));
    if creem.is_some() && webhook_verifier.is_some() {
        tracing::info!("✓ Creem configured");
    } else {
        tracing::warn!("⚠ Creem not configured - payments disabled");
        tracing::warn!("  Set CREEM_API_KEY and CREEM_WEBHOOK_SECRET in .env");
    }

    if config.enable_test_endpoints {
        tracing::warn!("⚠ Test endpoints enabled - do not expose in production");
    }

    // Build application state
    let state = AppState {
        ledger,
        creem,
        webhook_verifier,
        remove_bg,
        ark,
        app_base_url: config.app_base_url.clone(),
    };

    let app = studio_server::router(state, config.enable_test_endpoints);

    // Start server
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;

    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("🚀 pixel-studio server running on http://0.0.0.0:{}", config.port);
    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("");
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health               - Health check");
    tracing::info!("  GET  /api/products         - Plan catalog");
    tracing::info!("  POST /api/remove-bg        - Background removal");
    tracing::info!("  POST /api/recognize        - Image recognition");
    tracing::info!("  POST /api/generate-image   - AI image generation");
    tracing::info!("  POST /api/create-checkout  - Creem checkout session");
    tracing::info!("  POST /api/webhooks/creem   - Creem webhook receiver");
    tracing::info!("  POST /api/credits/deduct   - Spend credits");
    tracing::info!("  POST /api/credits/add      - Grant credits");
    if config.enable_test_endpoints {
        tracing::info!("  POST /api/test/grant-subscription - Grant plan without payment");
        tracing::info!("  GET  /api/test/user-credits/{{id}}  - User ledger snapshot");
    }
    tracing::info!("");

    axum::serve(listener, app).await?;

    Ok(())
}
