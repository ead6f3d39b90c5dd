//! # studio-imaging
//!
//! Upstream image service clients for pixel-studio: background removal via
//! remove.bg and recognition/generation via Volcengine Ark.
//!
//! These are thin proxies on purpose. The server holds the API keys, the
//! SPA never sees them, and responses come back in SPA-friendly form (data
//! URLs for binary images, plain strings for descriptions and hosted URLs).

mod ark;
pub mod data_url;
mod error;
mod remove_bg;

pub use ark::{ArkClient, ArkConfig};
pub use error::{ImagingError, Result};
pub use remove_bg::RemoveBgClient;
