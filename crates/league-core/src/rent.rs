//! Blind inference: run a hidden skill prompt without exposing it.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use league_state::ContentDigest;

use crate::config::LeagueConfig;
use crate::domain::{LeagueError, Result};
use crate::inference::{InferenceProvider, InferenceRequest};
use crate::leak_guard::{self, DEFAULT_LEAK_WINDOW, REFUSAL_MESSAGE};
use crate::metrics::METRICS;
use crate::obs;

/// What the caller of a rent request gets back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RentOutcome {
    pub response: String,
    /// `None` when the request was blocked before inference.
    pub model: Option<String>,
    pub tokens_used: u64,
    pub latency_ms: u64,
    /// Answered with the canned refusal; no model call was made.
    pub blocked: bool,
    /// Part of the model's answer was redacted.
    pub redacted: bool,
}

impl RentOutcome {
    fn refusal() -> Self {
        Self {
            response: REFUSAL_MESSAGE.to_string(),
            model: None,
            tokens_used: 0,
            latency_ms: 0,
            blocked: true,
            redacted: false,
        }
    }
}

pub struct BlindInference {
    provider: Arc<dyn InferenceProvider>,
    model: Option<String>,
    max_tokens: u32,
    leak_window: usize,
}

impl BlindInference {
    pub fn new(provider: Arc<dyn InferenceProvider>) -> Self {
        Self {
            provider,
            model: None,
            max_tokens: 2048,
            leak_window: DEFAULT_LEAK_WINDOW,
        }
    }

    pub fn from_config(provider: Arc<dyn InferenceProvider>, config: &LeagueConfig) -> Self {
        Self {
            provider,
            model: Some(config.model.clone()),
            max_tokens: config.rent_max_tokens,
            leak_window: config.leak_window,
        }
    }

    pub fn with_leak_window(mut self, window: usize) -> Self {
        self.leak_window = window;
        self
    }

    /// Answer `user_prompt` with `skill_content` as the hidden system prompt.
    ///
    /// Extraction attempts are refused up front. Any verbatim run of prompt
    /// words in the answer is redacted before it is returned.
    #[instrument(skip_all)]
    pub async fn rent(&self, skill_content: &str, user_prompt: &str) -> Result<RentOutcome> {
        if user_prompt.trim().is_empty() {
            return Err(LeagueError::InvalidRequest("prompt must not be empty".to_string()));
        }

        let digest = ContentDigest::from_bytes(skill_content.as_bytes());
        if leak_guard::is_meta_query(user_prompt) {
            obs::emit_meta_query_blocked(digest.short());
            METRICS.inc_meta_queries_blocked();
            return Ok(RentOutcome::refusal());
        }

        let request = InferenceRequest::new(leak_guard::wrap_system_prompt(skill_content), user_prompt)
            .with_model(self.model.clone())
            .with_max_tokens(self.max_tokens);
        let reply = self.provider.infer(request).await?;

        let sanitized =
            leak_guard::sanitize_response_with_window(skill_content, &reply.response, self.leak_window);
        if sanitized.redacted() {
            obs::emit_leak_redacted(digest.short(), sanitized.fragments_detected, sanitized.replacements);
            METRICS.inc_leaks_redacted();
        } else {
            debug!(skill_digest = %digest.short(), "rent response clean");
        }

        Ok(RentOutcome {
            redacted: sanitized.redacted(),
            response: sanitized.text,
            tokens_used: reply.total_tokens(),
            latency_ms: reply.latency_ms,
            model: Some(reply.model),
            blocked: false,
        })
    }
}
