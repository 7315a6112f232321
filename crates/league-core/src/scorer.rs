//! Response scorers, one per [`MatchType`].
//!
//! The three textual scorers are pure functions returning a score in 0..1.
//! The judge scorer calls a model and degrades to keyword scoring whenever
//! the call or its JSON reply fails, so a flaky judge never stalls a run.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use league_state::{MatchType, ValidationQuestion};

use crate::inference::{InferenceProvider, InferenceRequest};
use crate::metrics::METRICS;
use crate::obs::emit_judge_fallback;

/// System prompt for the judge model.
pub const JUDGE_SYSTEM_PROMPT: &str =
    "You are a precise evaluation judge. Always respond with valid JSON.";

fn strip_contains_marker(expected: &str) -> &str {
    const MARKER: &str = "contains:";
    match expected.get(..MARKER.len()) {
        Some(head) if head.eq_ignore_ascii_case(MARKER) => expected[MARKER.len()..].trim_start(),
        _ => expected,
    }
}

/// Fraction of comma-separated keywords found (case-insensitive) in the
/// response. An optional leading `contains:` marker is ignored. Returns 0
/// when there are no non-empty keywords.
pub fn score_keyword(response: &str, expected: &str) -> f64 {
    let keywords: Vec<String> = strip_contains_marker(expected)
        .split(',')
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect();
    if keywords.is_empty() {
        return 0.0;
    }

    let response = response.to_lowercase();
    let matched = keywords.iter().filter(|k| response.contains(k.as_str())).count();
    matched as f64 / keywords.len() as f64
}

/// 1.0 when trimmed, case-folded strings are equal.
pub fn score_exact(response: &str, expected: &str) -> f64 {
    if response.trim().to_lowercase() == expected.trim().to_lowercase() {
        1.0
    } else {
        0.0
    }
}

/// 1.0 when `expected` occurs in the response, ignoring case.
pub fn score_contains(response: &str, expected: &str) -> f64 {
    if response.to_lowercase().contains(&expected.to_lowercase()) {
        1.0
    } else {
        0.0
    }
}

/// Judge reply shape: `{"score": 0-10, "reason": "..."}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct JudgeVerdict {
    pub score: f64,
    #[serde(default)]
    pub reason: String,
}

/// Parse a strict JSON judge reply.
pub fn parse_judge_verdict(raw: &str) -> Option<JudgeVerdict> {
    serde_json::from_str::<JudgeVerdict>(raw.trim())
        .ok()
        .filter(|v| v.score.is_finite())
}

/// User prompt sent to the judge.
pub fn judge_prompt(input: &str, expected: &str, response: &str) -> String {
    format!(
        "You are a strict evaluator. Score the following response on a scale of 0 to 10.\n\n\
         QUESTION: {input}\n\n\
         EXPECTED CRITERIA: {expected}\n\n\
         ACTUAL RESPONSE: {response}\n\n\
         Reply with ONLY a JSON object: {{\"score\": <number 0-10>, \"reason\": \"<brief reason>\"}}"
    )
}

/// Unweighted score for one response.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchScore {
    /// In 0..1.
    pub value: f64,
    /// The judge failed and keyword scoring stood in.
    pub judge_fallback: bool,
}

impl MatchScore {
    fn direct(value: f64) -> Self {
        Self {
            value,
            judge_fallback: false,
        }
    }
}

/// Routes a response to the scorer for its question's match type.
#[derive(Clone)]
pub struct Scorer {
    judge: Arc<dyn InferenceProvider>,
    judge_model: Option<String>,
    judge_max_tokens: u32,
    timeout: Duration,
}

impl Scorer {
    pub fn new(judge: Arc<dyn InferenceProvider>, judge_model: Option<String>) -> Self {
        Self {
            judge,
            judge_model,
            judge_max_tokens: 200,
            timeout: Duration::from_secs(60),
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.judge_max_tokens = max_tokens;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Score `response` against `question.expected_output`.
    pub async fn score(&self, question: &ValidationQuestion, response: &str) -> MatchScore {
        let expected = &question.expected_output;
        match question.match_type {
            MatchType::Keyword => MatchScore::direct(score_keyword(response, expected)),
            MatchType::Exact => MatchScore::direct(score_exact(response, expected)),
            MatchType::Contains => MatchScore::direct(score_contains(response, expected)),
            MatchType::LlmJudge => self.score_llm_judge(&question.input, response, expected).await,
        }
    }

    async fn score_llm_judge(&self, input: &str, response: &str, expected: &str) -> MatchScore {
        let request = InferenceRequest::new(JUDGE_SYSTEM_PROMPT, judge_prompt(input, expected, response))
            .with_model(self.judge_model.clone())
            .with_max_tokens(self.judge_max_tokens);

        let reason = match tokio::time::timeout(self.timeout, self.judge.infer(request)).await {
            Ok(Ok(reply)) => match parse_judge_verdict(&reply.response) {
                Some(verdict) => {
                    return MatchScore::direct(verdict.score.clamp(0.0, 10.0) / 10.0);
                }
                None => "judge reply was not valid score JSON".to_string(),
            },
            Ok(Err(e)) => e.to_string(),
            Err(_) => format!("judge timed out after {}s", self.timeout.as_secs()),
        };

        warn!(reason = %reason, "llm judge unavailable, falling back to keyword scoring");
        emit_judge_fallback(input, &reason);
        METRICS.inc_judge_fallbacks();

        MatchScore {
            value: score_keyword(response, expected),
            judge_fallback: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_partial_match() {
        let score = score_keyword("alpha and gamma only", "alpha, beta, gamma");
        assert!((score - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn keyword_strips_contains_marker() {
        assert_eq!(score_keyword("Use an INDEX", "Contains: index, scan"), 0.5);
        assert_eq!(score_keyword("index scan", "contains:index,scan"), 1.0);
    }

    #[test]
    fn keyword_without_keywords_scores_zero() {
        assert_eq!(score_keyword("anything", ""), 0.0);
        assert_eq!(score_keyword("anything", " , ,"), 0.0);
        assert_eq!(score_keyword("anything", "contains:"), 0.0);
    }

    #[test]
    fn exact_ignores_case_and_outer_whitespace() {
        assert_eq!(score_exact("  Paris \n", "paris"), 1.0);
        assert_eq!(score_exact("Paris.", "paris"), 0.0);
        assert_eq!(score_exact("Pa ris", "paris"), 0.0);
    }

    #[test]
    fn contains_is_case_insensitive_substring() {
        assert_eq!(score_contains("The answer is FORTY-TWO.", "forty-two"), 1.0);
        assert_eq!(score_contains("The answer is 41.", "forty-two"), 0.0);
    }

    #[test]
    fn judge_verdict_parsing() {
        let v = parse_judge_verdict(r#" {"score": 7, "reason": "mostly right"} "#).unwrap();
        assert_eq!(v.score, 7.0);
        assert_eq!(v.reason, "mostly right");

        assert!(parse_judge_verdict(r#"{"score": 8.5}"#).is_some());
        assert!(parse_judge_verdict("Score: 7/10").is_none());
        assert!(parse_judge_verdict(r#"{"reason": "no score"}"#).is_none());
    }

    #[test]
    fn judge_prompt_embeds_all_parts() {
        let p = judge_prompt("Q?", "criteria", "answer");
        assert!(p.contains("QUESTION: Q?"));
        assert!(p.contains("EXPECTED CRITERIA: criteria"));
        assert!(p.contains("ACTUAL RESPONSE: answer"));
        assert!(p.contains(r#"{"score": <number 0-10>"#));
    }
}
