//! remove.bg Client
//!
//! Background removal via the remove.bg REST API. The upstream answers with
//! raw PNG bytes; callers get a data URL the SPA can drop straight into an
//! `<img>` tag.

use tracing::debug;

use crate::data_url;
use crate::error::{ImagingError, Result};

const DEFAULT_BASE_URL: &str = "https://api.remove.bg";

/// Client for the remove.bg API
pub struct RemoveBgClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl RemoveBgClient {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL.to_string())
    }

    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Remove the background from an image, returning a PNG data URL
    pub async fn remove_background(&self, image: &str) -> Result<String> {
        let payload = data_url::split(image)?;

        let form = reqwest::multipart::Form::new()
            .text("image_file_b64", payload.to_string())
            .text("size", "auto");

        let response = self
            .http
            .post(format!("{}/v1.0/removebg", self.base_url))
            .header("X-Api-Key", &self.api_key)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ImagingError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        debug!(bytes = bytes.len(), "remove.bg returned cutout");
        Ok(data_url::encode_png(&bytes))
    }
}
