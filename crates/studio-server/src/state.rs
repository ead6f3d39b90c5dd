//! Application State

use std::sync::Arc;

use studio_imaging::{ArkClient, RemoveBgClient};
use studio_ledger::LedgerStore;
use studio_payments::{CreemClient, WebhookVerifier};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Credit ledger backend (Supabase or in-memory)
    pub ledger: Arc<dyn LedgerStore>,

    /// Creem checkout client (None if not configured)
    pub creem: Option<Arc<CreemClient>>,

    /// Webhook signature verifier (None if not configured)
    pub webhook_verifier: Option<Arc<WebhookVerifier>>,

    /// remove.bg client (None if not configured)
    pub remove_bg: Option<Arc<RemoveBgClient>>,

    /// Ark client (None if not configured)
    pub ark: Option<Arc<ArkClient>>,

    /// SPA base URL for checkout redirects
    pub app_base_url: String,
}
