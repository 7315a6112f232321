//! Shared test doubles for league-core integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use league_core::{InferenceError, InferenceProvider, InferenceRequest, InferenceResponse};
use league_state::fakes::MemoryValidationSets;
use league_state::{MatchType, ValidationQuestion, ValidationSet};

/// What the scripted provider does for one request.
pub enum Step {
    Reply {
        text: String,
        tokens_in: u64,
        tokens_out: u64,
    },
    /// Reply after sleeping (use with paused tokio time).
    Delayed { after: Duration, text: String },
    Fail(InferenceError),
    /// Never answers.
    Hang,
}

pub fn reply(text: &str, tokens_in: u64, tokens_out: u64) -> Step {
    Step::Reply {
        text: text.to_string(),
        tokens_in,
        tokens_out,
    }
}

type Script = dyn Fn(&InferenceRequest) -> Step + Send + Sync;

/// Inference provider answering from a closure and recording every call.
pub struct ScriptedProvider {
    script: Box<Script>,
    calls: Mutex<Vec<InferenceRequest>>,
    configured: bool,
}

impl ScriptedProvider {
    pub fn new(script: impl Fn(&InferenceRequest) -> Step + Send + Sync + 'static) -> Self {
        Self {
            script: Box::new(script),
            calls: Mutex::new(Vec::new()),
            configured: true,
        }
    }

    pub fn unconfigured() -> Self {
        Self {
            configured: false,
            ..Self::new(|_| Step::Fail(InferenceError::MissingCredentials))
        }
    }

    pub fn calls(&self) -> Vec<InferenceRequest> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl InferenceProvider for ScriptedProvider {
    async fn infer(&self, request: InferenceRequest) -> Result<InferenceResponse, InferenceError> {
        self.calls.lock().unwrap().push(request.clone());
        let step = (self.script)(&request);
        let (text, tokens_in, tokens_out) = match step {
            Step::Reply {
                text,
                tokens_in,
                tokens_out,
            } => (text, tokens_in, tokens_out),
            Step::Delayed { after, text } => {
                tokio::time::sleep(after).await;
                (text, 10, 10)
            }
            Step::Fail(err) => return Err(err),
            Step::Hang => {
                tokio::time::sleep(Duration::from_secs(24 * 60 * 60)).await;
                return Err(InferenceError::Http("hung provider woke up".to_string()));
            }
        };
        Ok(InferenceResponse {
            response: text,
            model: request.model.unwrap_or_else(|| "scripted".to_string()),
            tokens_in,
            tokens_out,
            latency_ms: 1,
        })
    }

    fn is_configured(&self) -> bool {
        self.configured
    }
}

pub fn question(input: &str, expected: &str, match_type: MatchType, weight: f64) -> ValidationQuestion {
    ValidationQuestion {
        input: input.to_string(),
        expected_output: expected.to_string(),
        match_type,
        weight,
    }
}

/// Three `contains` questions weighted 14/3/3 (max score 20), answered
/// by "alpha", "beta" and "gamma".
pub fn sql_tutor_set() -> ValidationSet {
    ValidationSet {
        skill: "sql-tutor".to_string(),
        version: "1.0".to_string(),
        questions: vec![
            question("q1", "alpha", MatchType::Contains, 14.0),
            question("q2", "beta", MatchType::Contains, 3.0),
            question("q3", "gamma", MatchType::Contains, 3.0),
        ],
    }
}

pub fn loader_with(set: ValidationSet) -> Arc<MemoryValidationSets> {
    Arc::new(MemoryValidationSets::new().with_set(set))
}
