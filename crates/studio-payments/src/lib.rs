//! # studio-payments
//!
//! Creem payment integration for pixel-studio: the plan catalog, hosted
//! checkout sessions, and webhook fulfillment.
//!
//! The flow is deliberately one-directional. The server creates a checkout
//! session with attribution metadata and sends the SPA to Creem's hosted
//! page; everything that mutates the ledger happens later, when Creem calls
//! back. [`WebhookVerifier`] authenticates the callback over its raw bytes,
//! [`WebhookEvent::parse`] turns it into a typed event, and
//! [`WebhookProcessor`] applies it to a [`studio_ledger::LedgerStore`].
//! Checkout grants are keyed by session id, so redelivered events credit a
//! user exactly once.

mod catalog;
mod checkout;
mod error;
mod webhook;

pub use catalog::{credit_cost, parse_interval, plan_for_product, PlanId, PlanPricing};
pub use checkout::{CheckoutRequest, CheckoutSession, CreemClient};
pub use error::{PaymentError, Result};
pub use webhook::{WebhookEvent, WebhookProcessor, WebhookVerifier};
