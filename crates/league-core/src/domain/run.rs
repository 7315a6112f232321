//! Per-question and per-run scoring results.

use serde::{Deserialize, Serialize};

use league_state::{MatchType, ValidationQuestion};

/// Round to two decimal places (reporting precision only).
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// How a single question ended.
///
/// Keeps "scored zero" and "could not be scored" apart even though both
/// contribute nothing to the run total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum QuestionOutcome {
    /// The response was scored; `match_score` is the unweighted 0..1 score.
    Scored {
        match_score: f64,
        /// The judge model failed and keyword scoring was used instead.
        #[serde(default)]
        judge_fallback: bool,
    },
    /// Inference failed or timed out.
    Failed { reason: String },
}

/// Outcome of one validation question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionResult {
    pub input: String,
    pub match_type: MatchType,
    /// Weighted score, `0..=max_score`.
    pub score: f64,
    /// The question's weight.
    pub max_score: f64,
    pub tokens_used: u64,
    pub outcome: QuestionOutcome,
}

impl QuestionResult {
    /// A scored question. `match_score` is clamped to 0..1 before weighting.
    pub fn scored(
        question: &ValidationQuestion,
        weight: f64,
        match_score: f64,
        tokens_used: u64,
        judge_fallback: bool,
    ) -> Self {
        let match_score = match_score.clamp(0.0, 1.0);
        Self {
            input: question.input.clone(),
            match_type: question.match_type,
            score: match_score * weight,
            max_score: weight,
            tokens_used,
            outcome: QuestionOutcome::Scored {
                match_score,
                judge_fallback,
            },
        }
    }

    /// A question whose inference failed: zero score, zero tokens.
    pub fn failed(question: &ValidationQuestion, weight: f64, reason: impl Into<String>) -> Self {
        Self {
            input: question.input.clone(),
            match_type: question.match_type,
            score: 0.0,
            max_score: weight,
            tokens_used: 0,
            outcome: QuestionOutcome::Failed {
                reason: reason.into(),
            },
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.outcome, QuestionOutcome::Failed { .. })
    }
}

/// Aggregate result of one prompt version against one validation set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillRunResult {
    /// Sum of weighted scores, rounded to 2 decimals.
    pub total_score: f64,
    /// Sum of weights.
    pub max_score: f64,
    /// `100 * total_score / max_score`, rounded to 2 decimals; 0 when
    /// `max_score` is 0.
    pub accuracy_pct: f64,
    pub total_tokens: u64,
    /// One entry per question, in validation-set order.
    pub question_results: Vec<QuestionResult>,
}

impl SkillRunResult {
    /// Aggregate question results. Accumulation is full precision; only the
    /// reported totals are rounded.
    pub fn from_questions(question_results: Vec<QuestionResult>) -> Self {
        let total_score: f64 = question_results.iter().map(|r| r.score).sum();
        let max_score: f64 = question_results.iter().map(|r| r.max_score).sum();
        let total_tokens: u64 = question_results.iter().map(|r| r.tokens_used).sum();

        let accuracy_pct = if max_score > 0.0 {
            round2(total_score / max_score * 100.0)
        } else {
            0.0
        };

        Self {
            total_score: round2(total_score),
            max_score,
            accuracy_pct,
            total_tokens,
            question_results,
        }
    }

    /// Number of questions that could not be scored.
    pub fn failed_questions(&self) -> usize {
        self.question_results
            .iter()
            .filter(|r| r.is_failure())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(weight: f64) -> ValidationQuestion {
        ValidationQuestion {
            input: "q".to_string(),
            expected_output: "a".to_string(),
            match_type: MatchType::Contains,
            weight,
        }
    }

    #[test]
    fn empty_run_has_zero_accuracy() {
        let run = SkillRunResult::from_questions(vec![]);
        assert_eq!(run.max_score, 0.0);
        assert_eq!(run.accuracy_pct, 0.0);
        assert_eq!(run.total_tokens, 0);
    }

    #[test]
    fn weighted_score_never_exceeds_weight() {
        for w in [0.0, 0.5, 1.0, 3.0] {
            for s in [0.0, 0.25, 1.0, 1.5] {
                let r = QuestionResult::scored(&question(w), w, s, 10, false);
                assert!(r.score <= r.max_score);
                assert_eq!(r.max_score, w);
            }
        }
    }

    #[test]
    fn accuracy_is_weighted_and_rounded() {
        let results = vec![
            QuestionResult::scored(&question(1.0), 1.0, 1.0, 100, false),
            QuestionResult::scored(&question(2.0), 2.0, 0.0, 100, false),
        ];
        let run = SkillRunResult::from_questions(results);
        assert_eq!(run.total_score, 1.0);
        assert_eq!(run.max_score, 3.0);
        assert_eq!(run.accuracy_pct, 33.33);
        assert_eq!(run.total_tokens, 200);
    }

    #[test]
    fn failures_count_toward_max_score() {
        let results = vec![
            QuestionResult::scored(&question(1.0), 1.0, 1.0, 50, false),
            QuestionResult::failed(&question(1.0), 1.0, "timeout"),
        ];
        let run = SkillRunResult::from_questions(results);
        assert_eq!(run.accuracy_pct, 50.0);
        assert_eq!(run.failed_questions(), 1);
        assert_eq!(run.question_results[1].tokens_used, 0);
    }

    #[test]
    fn outcome_serializes_with_status_tag() {
        let r = QuestionResult::failed(&question(1.0), 1.0, "rate limited");
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["outcome"]["status"], "failed");
        assert_eq!(json["match_type"], "contains");
    }
}
