//! Payment Error Types

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, PaymentError>;

/// Payment-related errors
#[derive(Error, Debug)]
pub enum PaymentError {
    /// Transport-level failure talking to Creem
    #[error("Creem request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Creem returned a non-success status
    #[error("Creem error: status={status} body={body}")]
    Api { status: u16, body: String },

    /// Plan id outside the catalog
    #[error("Invalid plan ID: {0}")]
    UnknownPlan(String),

    /// Billing interval outside the catalog
    #[error("Invalid interval: {0}")]
    UnknownInterval(String),

    /// Provider product id with no catalog entry
    #[error("Unknown product ID: {0}")]
    UnknownProduct(String),

    /// Webhook signature verification failed
    #[error("Webhook signature invalid")]
    Signature,

    /// Webhook payload parsing failed
    #[error("Webhook parse error: {0}")]
    WebhookParse(String),

    /// Response body did not match the expected shape
    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),

    /// Ledger mutation failed while applying an event
    #[error("Ledger error: {0}")]
    Ledger(#[from] studio_ledger::LedgerError),
}

impl PaymentError {
    /// Get user-friendly message
    pub fn user_message(&self) -> &str {
        match self {
            PaymentError::Http(_) | PaymentError::Api { .. } | PaymentError::InvalidResponse(_) => {
                "Payment processing failed. Please try again."
            }
            PaymentError::UnknownPlan(_) | PaymentError::UnknownInterval(_) => {
                "Invalid plan or billing interval."
            }
            PaymentError::Signature => "Webhook signature could not be verified.",
            _ => "An error occurred processing your request.",
        }
    }
}
