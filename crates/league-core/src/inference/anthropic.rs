//! Anthropic Messages API client.

use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{InferenceError, InferenceProvider, InferenceRequest, InferenceResponse};
use crate::config::LeagueConfig;

const API_VERSION: &str = "2023-06-01";

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    model: String,
    content: Vec<ContentBlock>,
    usage: Usage,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: u64,
    output_tokens: u64,
}

/// Concatenate the text blocks of a response, one per line.
fn join_text(blocks: Vec<ContentBlock>) -> String {
    blocks
        .into_iter()
        .filter_map(|block| match block {
            ContentBlock::Text { text } => Some(text),
            ContentBlock::Other => None,
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Inference provider backed by `POST {api_base}/v1/messages`.
pub struct AnthropicProvider {
    http_client: reqwest::Client,
    api_base: String,
    api_key: Option<String>,
    default_model: String,
    default_max_tokens: u32,
}

impl AnthropicProvider {
    pub fn new(
        api_base: impl Into<String>,
        api_key: Option<String>,
        default_model: impl Into<String>,
        default_max_tokens: u32,
    ) -> Result<Self, InferenceError> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("league-core/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http_client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            default_model: default_model.into(),
            default_max_tokens,
        })
    }

    /// Build from config; requests without explicit limits use the rent
    /// token budget.
    pub fn from_config(config: &LeagueConfig) -> Result<Self, InferenceError> {
        Self::new(
            config.api_base.clone(),
            config.api_key.clone(),
            config.model.clone(),
            config.rent_max_tokens,
        )
    }
}

#[async_trait]
impl InferenceProvider for AnthropicProvider {
    async fn infer(&self, request: InferenceRequest) -> Result<InferenceResponse, InferenceError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(InferenceError::MissingCredentials)?;

        let model = request.model.as_deref().unwrap_or(&self.default_model);
        let body = MessagesRequest {
            model,
            max_tokens: request.max_tokens.unwrap_or(self.default_max_tokens),
            system: &request.system_prompt,
            messages: vec![Message {
                role: "user",
                content: &request.user_prompt,
            }],
        };

        let start = Instant::now();
        let response = self
            .http_client
            .post(format!("{}/v1/messages", self.api_base))
            .header("x-api-key", api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(InferenceError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(InferenceError::Provider {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| InferenceError::Decode(e.to_string()))?;
        let latency_ms = start.elapsed().as_millis() as u64;

        debug!(
            model = %parsed.model,
            tokens_in = parsed.usage.input_tokens,
            tokens_out = parsed.usage.output_tokens,
            latency_ms,
            "inference completed"
        );

        Ok(InferenceResponse {
            response: join_text(parsed.content),
            model: parsed.model,
            tokens_in: parsed.usage.input_tokens,
            tokens_out: parsed.usage.output_tokens,
            latency_ms,
        })
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_blocks_are_joined_and_others_skipped() {
        let parsed: MessagesResponse = serde_json::from_value(serde_json::json!({
            "model": "claude-sonnet-4-6",
            "content": [
                {"type": "text", "text": "first"},
                {"type": "tool_use", "id": "t1", "name": "x", "input": {}},
                {"type": "text", "text": "second"}
            ],
            "usage": {"input_tokens": 10, "output_tokens": 4}
        }))
        .unwrap();

        assert_eq!(join_text(parsed.content), "first\nsecond");
        assert_eq!(parsed.usage.input_tokens, 10);
    }

    #[test]
    fn blank_key_counts_as_unconfigured() {
        let provider =
            AnthropicProvider::new("https://example.test/", Some("  ".to_string()), "m", 64)
                .unwrap();
        assert!(!provider.is_configured());
        assert_eq!(provider.api_base, "https://example.test");
    }

    #[tokio::test]
    async fn missing_key_fails_without_network() {
        let provider = AnthropicProvider::new("https://example.test", None, "m", 64).unwrap();
        let err = provider
            .infer(InferenceRequest::new("sys", "hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, InferenceError::MissingCredentials));
    }
}
