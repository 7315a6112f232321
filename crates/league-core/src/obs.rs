//! Structured lifecycle events.
//!
//! Every event carries an `event` field so log pipelines can filter on it.
//! Verbosity follows `RUST_LOG`; see [`crate::telemetry::init_tracing`].

use tracing::{info, warn};

/// `referee.started`
pub fn emit_referee_started(skill: &str, questions: usize) {
    info!(event = "referee.started", skill = %skill, questions);
}

/// `run.started`: one prompt version begins its pass over the question set.
pub fn emit_run_started(skill: &str, digest: &str, questions: usize) {
    info!(event = "run.started", skill = %skill, digest = %digest, questions);
}

/// `run.finished`
pub fn emit_run_finished(
    skill: &str,
    digest: &str,
    accuracy_pct: f64,
    total_tokens: u64,
    failed: usize,
    duration_ms: u64,
) {
    info!(
        event = "run.finished",
        skill = %skill,
        digest = %digest,
        accuracy_pct,
        total_tokens,
        failed,
        duration_ms,
    );
}

/// `question.failed`: the question scored zero because inference failed.
pub fn emit_question_failed(index: usize, reason: &str) {
    warn!(event = "question.failed", index, reason = %reason);
}

pub fn emit_judge_fallback(input: &str, reason: &str) {
    let preview: String = input.chars().take(60).collect();
    warn!(event = "judge.fallback", question = %preview, reason = %reason);
}

/// `referee.verdict`
pub fn emit_verdict(skill: &str, accuracy_delta: f64, token_delta: i64, improved: bool) {
    info!(
        event = "referee.verdict",
        skill = %skill,
        accuracy_delta,
        token_delta,
        improved,
    );
}

pub fn emit_meta_query_blocked(skill_digest: &str) {
    warn!(event = "rent.meta_query_blocked", skill_digest = %skill_digest);
}

pub fn emit_leak_redacted(skill_digest: &str, fragments: usize, replacements: usize) {
    warn!(
        event = "rent.leak_redacted",
        skill_digest = %skill_digest,
        fragments,
        replacements,
    );
}

/// `submission.settled`
pub fn emit_submission_settled(submission_id: &str, bounty_id: &str, status: &str, payout: f64) {
    info!(
        event = "submission.settled",
        submission_id = %submission_id,
        bounty_id = %bounty_id,
        status = %status,
        payout,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emitters_do_not_panic_without_subscriber() {
        emit_referee_started("sql-tutor", 3);
        emit_run_started("sql-tutor", "abc", 3);
        emit_run_finished("sql-tutor", "abc", 66.67, 1500, 1, 42);
        emit_question_failed(2, "timed out");
        emit_judge_fallback("a question that is longer than sixty characters for preview truncation", "bad json");
        emit_verdict("sql-tutor", 15.0, 0, true);
        emit_meta_query_blocked("abc");
        emit_leak_redacted("abc", 2, 3);
        emit_submission_settled("sub-1", "bounty-1", "accepted", 12.5);
    }
}
