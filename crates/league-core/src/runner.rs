//! Validation runner: one prompt version against one validation set.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};
use tracing::{debug, warn};

use league_state::{ContentDigest, ValidationQuestion, ValidationSet};

use crate::config::{LeagueConfig, RUN_MAX_TOKENS};
use crate::domain::{QuestionResult, SkillRunResult};
use crate::inference::{InferenceError, InferenceProvider, InferenceRequest};
use crate::metrics::METRICS;
use crate::obs;
use crate::scorer::Scorer;

/// Per-run knobs.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSettings {
    /// Provider default when `None`.
    pub model: Option<String>,
    pub max_tokens: u32,
    /// Applied to each inference call separately.
    pub timeout: Duration,
    /// Questions in flight at once. 1 means strictly sequential.
    pub max_concurrent_questions: usize,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            model: None,
            max_tokens: RUN_MAX_TOKENS,
            timeout: Duration::from_secs(60),
            max_concurrent_questions: 1,
        }
    }
}

impl RunSettings {
    pub fn from_config(config: &LeagueConfig) -> Self {
        Self {
            model: Some(config.model.clone()),
            max_tokens: config.run_max_tokens,
            timeout: config.inference_timeout(),
            max_concurrent_questions: config.max_concurrent_questions,
        }
    }
}

/// Weight used for aggregation. Negative or non-finite weights count as 0.
fn effective_weight(question: &ValidationQuestion, index: usize) -> f64 {
    if question.weight.is_finite() && question.weight >= 0.0 {
        question.weight
    } else {
        warn!(index, weight = question.weight, "invalid question weight, treating as 0");
        0.0
    }
}

/// Drives a prompt version through a validation set.
///
/// Never fails as a whole: a question whose inference errors or times out
/// becomes a zero-score [`QuestionResult::failed`] and the run continues.
#[derive(Clone)]
pub struct ValidationRunner {
    provider: Arc<dyn InferenceProvider>,
    scorer: Scorer,
    settings: RunSettings,
}

impl ValidationRunner {
    pub fn new(provider: Arc<dyn InferenceProvider>, scorer: Scorer) -> Self {
        Self {
            provider,
            scorer,
            settings: RunSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: RunSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Runner and judge sharing one provider, configured from `config`.
    pub fn from_config(provider: Arc<dyn InferenceProvider>, config: &LeagueConfig) -> Self {
        let scorer = Scorer::new(provider.clone(), Some(config.judge_model.clone()))
            .with_max_tokens(config.judge_max_tokens)
            .with_timeout(config.inference_timeout());
        Self::new(provider, scorer).with_settings(RunSettings::from_config(config))
    }

    pub fn settings(&self) -> &RunSettings {
        &self.settings
    }

    pub fn provider(&self) -> &Arc<dyn InferenceProvider> {
        &self.provider
    }

    /// Score `content` (used as the system prompt) against every question
    /// of `set`. Results keep question order.
    pub async fn run(&self, set: &ValidationSet, content: &str) -> SkillRunResult {
        let digest = ContentDigest::from_bytes(content.as_bytes());
        obs::emit_run_started(&set.skill, digest.short(), set.questions.len());
        let start = Instant::now();

        let in_flight = self.settings.max_concurrent_questions.max(1);
        let question_results: Vec<QuestionResult> = stream::iter(set.questions.iter().enumerate())
            .map(|(index, question)| self.run_question(index, content, question))
            .buffered(in_flight)
            .collect()
            .await;

        let result = SkillRunResult::from_questions(question_results);
        obs::emit_run_finished(
            &set.skill,
            digest.short(),
            result.accuracy_pct,
            result.total_tokens,
            result.failed_questions(),
            start.elapsed().as_millis() as u64,
        );
        result
    }

    async fn run_question(
        &self,
        index: usize,
        content: &str,
        question: &ValidationQuestion,
    ) -> QuestionResult {
        let weight = effective_weight(question, index);
        let request = InferenceRequest::new(content, question.input.clone())
            .with_model(self.settings.model.clone())
            .with_max_tokens(self.settings.max_tokens);

        let outcome = match tokio::time::timeout(self.settings.timeout, self.provider.infer(request)).await {
            Ok(result) => result,
            Err(_) => Err(InferenceError::Timeout {
                secs: self.settings.timeout.as_secs(),
            }),
        };

        match outcome {
            Ok(reply) => {
                let score = self.scorer.score(question, &reply.response).await;
                debug!(index, match_score = score.value, tokens = reply.total_tokens(), "question scored");
                METRICS.inc_questions_scored();
                QuestionResult::scored(
                    question,
                    weight,
                    score.value,
                    reply.total_tokens(),
                    score.judge_fallback,
                )
            }
            Err(err) => {
                let reason = err.to_string();
                obs::emit_question_failed(index, &reason);
                METRICS.inc_question_failures();
                QuestionResult::failed(question, weight, reason)
            }
        }
    }
}
