//! Ledger Error Types

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Ledger storage errors
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Transport-level failure talking to Supabase
    #[error("Supabase request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Supabase returned a non-success status
    #[error("Supabase error: status={status} body={body}")]
    Api { status: u16, body: String },

    /// Response body did not match the expected shape
    #[error("Invalid store response: {0}")]
    InvalidResponse(String),
}

impl LedgerError {
    /// User-facing message (no backend detail leaks)
    pub fn user_message(&self) -> &str {
        match self {
            LedgerError::Http(_) | LedgerError::Api { .. } => {
                "The credit service is temporarily unavailable. Please try again."
            }
            _ => "An error occurred processing your request.",
        }
    }
}
