//! # studio-ledger
//!
//! Credit ledger and subscription records for pixel-studio.
//!
//! Every paid feature in the studio costs credits. This crate owns the
//! bookkeeping: per-user balances, an append-only transaction log, and the
//! subscription row that says which plan funded the balance.
//!
//! Storage sits behind the [`LedgerStore`] trait. [`MemoryLedger`] backs
//! development and tests; [`SupabaseLedger`] talks to the managed Postgres
//! over its REST interface in production. Balance mutations are atomic in
//! both: the in-memory store serializes them behind one write lock, and the
//! Supabase store pushes them into SQL functions so the conditional
//! check-and-decrement happens in a single round trip.
//!
//! ```rust,ignore
//! use studio_ledger::{LedgerStore, MemoryLedger, TransactionKind};
//!
//! let ledger = MemoryLedger::new();
//! ledger.grant("user-1", 150, TransactionKind::Purchase, "Basic plan", None).await?;
//! let outcome = ledger.deduct("user-1", 3, TransactionKind::RemoveBg, "Cutout").await?;
//! ```

mod error;
mod model;
mod store;
mod supabase;

pub use error::{LedgerError, Result};
pub use model::{
    BillingInterval, CreditBalance, CreditTransaction, Subscription, SubscriptionStatus,
    TransactionKind,
};
pub use store::{DeductOutcome, GrantOutcome, LedgerStore, MemoryLedger};
pub use supabase::{SupabaseConfig, SupabaseLedger};
