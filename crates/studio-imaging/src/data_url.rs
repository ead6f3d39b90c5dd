//! Data URL Helpers
//!
//! The SPA ships images as `data:<mime>;base64,<payload>` strings. Upstream
//! services disagree on what they want: remove.bg takes the bare payload,
//! Ark takes the whole URL. These helpers split and rebuild the form.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::error::{ImagingError, Result};

/// Extract the base64 payload from a data URL, or pass a bare payload through
pub fn split(input: &str) -> Result<&str> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ImagingError::InvalidImage("empty image payload".into()));
    }

    if trimmed.starts_with("data:") {
        let Some((_, payload)) = trimmed.split_once(";base64,") else {
            return Err(ImagingError::InvalidImage(
                "data URL is not base64-encoded".into(),
            ));
        };
        if payload.is_empty() {
            return Err(ImagingError::InvalidImage("empty image payload".into()));
        }
        return Ok(payload);
    }

    Ok(trimmed)
}

/// Wrap raw PNG bytes as a data URL
pub fn encode_png(bytes: &[u8]) -> String {
    format!("data:image/png;base64,{}", STANDARD.encode(bytes))
}
