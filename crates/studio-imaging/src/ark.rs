//! Ark Vision and Generation Client
//!
//! Volcengine Ark backs two features: image recognition goes through the
//! chat-completions endpoint with a vision model, text-to-image goes through
//! the image-generations endpoint. Both authenticate with the same bearer
//! key; the model ids are per-feature inference endpoints.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ImagingError, Result};

const DEFAULT_BASE_URL: &str = "https://ark.cn-beijing.volces.com";
const DEFAULT_VISION_MODEL: &str = "ep-20251002143225-lp445";
const DEFAULT_IMAGE_MODEL: &str = "ep-20250922151247-nzclw";

/// Fixed analysis prompt sent with every recognition request
const RECOGNITION_PROMPT: &str = "请详细识别并描述这张图片的内容，包括：1. 图片中的主要物体或人物 2. 场景和背景 3. 颜色和氛围 4. 任何可见的文字";

/// Ark API configuration
#[derive(Clone, Debug)]
pub struct ArkConfig {
    /// Bearer API key
    pub api_key: String,

    /// API base URL
    pub base_url: String,

    /// Inference endpoint id for vision chat
    pub vision_model: String,

    /// Inference endpoint id for image generation
    pub image_model: String,
}

impl ArkConfig {
    /// Configuration with the production endpoints
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_BASE_URL.into(),
            vision_model: DEFAULT_VISION_MODEL.into(),
            image_model: DEFAULT_IMAGE_MODEL.into(),
        }
    }
}

/// Ark API client
pub struct ArkClient {
    http: reqwest::Client,
    config: ArkConfig,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: Vec<ContentPart<'a>>,
}

/// Multimodal message parts, tagged the OpenAI-compatible way
#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart<'a> {
    ImageUrl { image_url: ImageUrl<'a> },
    Text { text: &'a str },
}

#[derive(Serialize)]
struct ImageUrl<'a> {
    url: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

#[derive(Serialize)]
struct GenerationRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    sequential_image_generation: &'a str,
    response_format: &'a str,
    size: &'a str,
    stream: bool,
    watermark: bool,
}

#[derive(Deserialize)]
struct GenerationResponse {
    data: Vec<GeneratedImage>,
}

#[derive(Deserialize)]
struct GeneratedImage {
    url: String,
}

impl ArkClient {
    /// Create from configuration
    pub fn from_config(mut config: ArkConfig) -> Self {
        config.base_url = config.base_url.trim_end_matches('/').to_string();
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    /// Describe an image. Takes the data URL as-is; Ark decodes it upstream.
    pub async fn recognize(&self, image: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.config.vision_model,
            messages: vec![ChatMessage {
                role: "user",
                content: vec![
                    ContentPart::ImageUrl {
                        image_url: ImageUrl { url: image },
                    },
                    ContentPart::Text {
                        text: RECOGNITION_PROMPT,
                    },
                ],
            }],
        };

        let response = self.post_json("/api/v3/chat/completions", &request).await?;
        let parsed: ChatResponse = response.json().await?;

        let choice = parsed.choices.into_iter().next().ok_or_else(|| {
            ImagingError::InvalidResponse("no choices in chat response".into())
        })?;
        debug!(chars = choice.message.content.len(), "Ark recognition finished");
        Ok(choice.message.content)
    }

    /// Generate an image from a prompt, returning the hosted URL
    pub async fn generate(&self, prompt: &str) -> Result<String> {
        let request = GenerationRequest {
            model: &self.config.image_model,
            prompt,
            sequential_image_generation: "disabled",
            response_format: "url",
            size: "2K",
            stream: false,
            watermark: true,
        };

        let response = self.post_json("/api/v3/images/generations", &request).await?;
        let parsed: GenerationResponse = response.json().await?;

        let image = parsed.data.into_iter().next().ok_or_else(|| {
            ImagingError::InvalidResponse("no images in generation response".into())
        })?;
        debug!(url = %image.url, "Ark generation finished");
        Ok(image.url)
    }

    async fn post_json<T: Serialize>(&self, path: &str, body: &T) -> Result<reqwest::Response> {
        let response = self
            .http
            .post(format!("{}{}", self.config.base_url, path))
            .bearer_auth(&self.config.api_key)
            .json(body)
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
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = ArkConfig::new("key".into());
        assert_eq!(config.base_url, "https://ark.cn-beijing.volces.com");
        assert_eq!(config.vision_model, "ep-20251002143225-lp445");
        assert_eq!(config.image_model, "ep-20250922151247-nzclw");
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let mut config = ArkConfig::new("key".into());
        config.base_url = "https://ark.example.com/".into();
        let client = ArkClient::from_config(config);
        assert_eq!(client.config.base_url, "https://ark.example.com");
    }

    #[test]
    fn test_chat_request_serialization() {
        let request = ChatRequest {
            model: "ep-test",
            messages: vec![ChatMessage {
                role: "user",
                content: vec![
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: "data:image/png;base64,AAAA",
                        },
                    },
                    ContentPart::Text {
                        text: RECOGNITION_PROMPT,
                    },
                ],
            }],
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "ep-test");
        let parts = &json["messages"][0]["content"];
        assert_eq!(parts[0]["type"], "image_url");
        assert_eq!(parts[0]["image_url"]["url"], "data:image/png;base64,AAAA");
        assert_eq!(parts[1]["type"], "text");
        assert_eq!(parts[1]["text"], RECOGNITION_PROMPT);
    }

    #[test]
    fn test_generation_request_serialization() {
        let request = GenerationRequest {
            model: "ep-test",
            prompt: "a lighthouse at dusk",
            sequential_image_generation: "disabled",
            response_format: "url",
            size: "2K",
            stream: false,
            watermark: true,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["prompt"], "a lighthouse at dusk");
        assert_eq!(json["sequential_image_generation"], "disabled");
        assert_eq!(json["response_format"], "url");
        assert_eq!(json["size"], "2K");
        assert_eq!(json["stream"], false);
        assert_eq!(json["watermark"], true);
    }

    #[test]
    fn test_chat_response_decoding() {
        let parsed: ChatResponse = serde_json::from_str(
            r#"{"choices": [{"message": {"role": "assistant", "content": "A red lighthouse."}}]}"#,
        )
        .unwrap();
        assert_eq!(parsed.choices[0].message.content, "A red lighthouse.");

        let empty: ChatResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert!(empty.choices.is_empty());
    }

    #[test]
    fn test_generation_response_decoding() {
        let parsed: GenerationResponse = serde_json::from_str(
            r#"{"data": [{"url": "https://cdn.example.com/img.png", "size": "2K"}]}"#,
        )
        .unwrap();
        assert_eq!(parsed.data[0].url, "https://cdn.example.com/img.png");
    }
}
