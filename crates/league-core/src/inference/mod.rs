//! Inference provider seam.
//!
//! Everything that talks to a model goes through [`InferenceProvider`]: the
//! validation runner, the judge scorer and blind (rent) inference. Inject a
//! scripted provider in tests; use [`AnthropicProvider`] in production.

pub mod anthropic;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use anthropic::AnthropicProvider;

/// A single system + user prompt call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    /// Provider default when `None`.
    pub model: Option<String>,
    /// Provider default when `None`.
    pub max_tokens: Option<u32>,
}

impl InferenceRequest {
    pub fn new(system_prompt: impl Into<String>, user_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            user_prompt: user_prompt.into(),
            model: None,
            max_tokens: None,
        }
    }

    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Model output plus usage accounting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceResponse {
    pub response: String,
    pub model: String,
    pub tokens_in: u64,
    pub tokens_out: u64,
    pub latency_ms: u64,
}

impl InferenceResponse {
    pub fn total_tokens(&self) -> u64 {
        self.tokens_in + self.tokens_out
    }
}

/// Errors raised by an inference provider.
#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("inference credentials are not configured")]
    MissingCredentials,

    #[error("provider rate limit exceeded")]
    RateLimited,

    #[error("provider returned status {status}: {body}")]
    Provider { status: u16, body: String },

    #[error("inference timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("http error: {0}")]
    Http(String),

    #[error("could not decode provider response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for InferenceError {
    fn from(err: reqwest::Error) -> Self {
        InferenceError::Http(err.to_string())
    }
}

/// A model backend.
#[async_trait]
pub trait InferenceProvider: Send + Sync {
    /// Run one completion.
    async fn infer(&self, request: InferenceRequest) -> Result<InferenceResponse, InferenceError>;

    /// Whether the provider has what it needs (e.g. credentials) to serve
    /// calls. Settlement defers evaluation while this is false.
    fn is_configured(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_builder_sets_optionals() {
        let req = InferenceRequest::new("sys", "user")
            .with_model(Some("judge".to_string()))
            .with_max_tokens(200);
        assert_eq!(req.model.as_deref(), Some("judge"));
        assert_eq!(req.max_tokens, Some(200));
    }

    #[test]
    fn total_tokens_sums_in_and_out() {
        let resp = InferenceResponse {
            response: "ok".to_string(),
            model: "m".to_string(),
            tokens_in: 120,
            tokens_out: 30,
            latency_ms: 5,
        };
        assert_eq!(resp.total_tokens(), 150);
    }
}
