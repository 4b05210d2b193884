//! Groq vision provider
//!
//! Posts one chat-completion request per scan to an OpenAI-compatible
//! endpoint: a text instruction part plus the image as a base64 data URI.
//! Output is requested deterministic (temperature 0.1, JSON-object response
//! mode) and the whole request is bounded by a hard timeout.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::Utc;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::ScanConfig;
use crate::vision::prompt::instruction_prompt;
use crate::vision::provider::{VisionError, VisionProvider};

/// Chat-completion request body (OpenAI wire format)
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
    top_p: f32,
    stream: bool,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: Vec<ContentPart>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type")]
enum ContentPart {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image_url")]
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

/// Chat-completion response envelope (only the fields we consume)
#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Option<String>,
}

/// Vision provider backed by the Groq chat-completions API
pub struct GroqVisionProvider {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GroqVisionProvider {
    pub fn new(config: &ScanConfig) -> Result<Self, VisionError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| VisionError::Unavailable(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }

    fn build_request(&self, image: &[u8]) -> ChatRequest<'_> {
        let data_uri = format!("data:image/jpeg;base64,{}", BASE64.encode(image));

        ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: vec![
                    ContentPart::Text {
                        text: instruction_prompt(Utc::now().date_naive()),
                    },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl { url: data_uri },
                    },
                ],
            }],
            temperature: 0.1,
            max_tokens: 2048,
            top_p: 1.0,
            stream: false,
            response_format: ResponseFormat { kind: "json_object" },
        }
    }
}

#[async_trait]
impl VisionProvider for GroqVisionProvider {
    async fn analyze_image(
        &self,
        image: &[u8],
        correlation_id: &str,
    ) -> Result<String, VisionError> {
        let url = format!("{}/chat/completions", self.base_url);
        let request = self.build_request(image);

        log::info!(
            "{} analyzing receipt via {} (model: {})",
            correlation_id,
            url,
            self.model
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| VisionError::Unavailable(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            // Hard failure: surfaced immediately with status and body for audit
            let body = response.text().await.unwrap_or_default();
            return Err(VisionError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let completion: ChatCompletion = response
            .json()
            .await
            .map_err(|e| VisionError::BadPayload(format!("Invalid completion envelope: {}", e)))?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                VisionError::BadPayload("Completion has no message content".to_string())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> GroqVisionProvider {
        let config = ScanConfig {
            api_key: "test-key".to_string(),
            ..ScanConfig::default()
        };
        GroqVisionProvider::new(&config).unwrap()
    }

    #[test]
    fn test_request_carries_image_as_data_uri() {
        let provider = provider();
        let request = provider.build_request(&[0xFF, 0xD8, 0xFF]);

        assert_eq!(request.messages.len(), 1);
        assert_eq!(request.messages[0].role, "user");
        match &request.messages[0].content[1] {
            ContentPart::ImageUrl { image_url } => {
                assert!(image_url.url.starts_with("data:image/jpeg;base64,"));
            }
            other => panic!("expected image part, got {:?}", other),
        }
    }

    #[test]
    fn test_request_asks_for_deterministic_json() {
        let provider = provider();
        let request = provider.build_request(b"img");

        assert!(request.temperature <= 0.1);
        assert!(!request.stream);
        assert_eq!(request.response_format.kind, "json_object");

        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["response_format"]["type"], "json_object");
        assert_eq!(body["messages"][0]["content"][0]["type"], "text");
        assert_eq!(body["messages"][0]["content"][1]["type"], "image_url");
    }
}
