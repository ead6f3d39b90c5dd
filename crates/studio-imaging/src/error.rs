//! Imaging Error Types

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, ImagingError>;

/// Upstream image service errors
#[derive(Error, Debug)]
pub enum ImagingError {
    /// Transport-level failure talking to an upstream service
    #[error("Upstream request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Upstream returned a non-success status
    #[error("Upstream error: status={status} body={body}")]
    Api { status: u16, body: String },

    /// Client sent an image payload we cannot decode
    #[error("Invalid image data: {0}")]
    InvalidImage(String),

    /// Response body did not match the expected shape
    #[error("Invalid upstream response: {0}")]
    InvalidResponse(String),
}

impl ImagingError {
    /// User-facing message (no backend detail leaks)
    pub fn user_message(&self) -> &str {
        match self {
            ImagingError::Http(_) | ImagingError::Api { .. } => {
                "The image service is temporarily unavailable. Please try again."
            }
            ImagingError::InvalidImage(_) => "The uploaded image could not be read.",
            ImagingError::InvalidResponse(_) => "An error occurred processing your request.",
        }
    }
}
