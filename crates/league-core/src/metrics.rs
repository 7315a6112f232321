//! Process-wide counters for scoring and rent activity.
//!
//! Counters are lock-free and reported through `tracing` on [`Metrics::flush`].

use std::sync::atomic::{AtomicU64, Ordering};

/// Global counters.
pub static METRICS: Metrics = Metrics::new();

#[derive(Debug)]
pub struct Metrics {
    questions_scored: AtomicU64,
    question_failures: AtomicU64,
    judge_fallbacks: AtomicU64,
    meta_queries_blocked: AtomicU64,
    leaks_redacted: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

fn bump(counter: &AtomicU64, name: &'static str) {
    counter.fetch_add(1, Ordering::Relaxed);
    tracing::trace!(metric = name, "counter incremented");
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            questions_scored: AtomicU64::new(0),
            question_failures: AtomicU64::new(0),
            judge_fallbacks: AtomicU64::new(0),
            meta_queries_blocked: AtomicU64::new(0),
            leaks_redacted: AtomicU64::new(0),
        }
    }

    pub fn inc_questions_scored(&self) {
        bump(&self.questions_scored, "questions_scored");
    }

    pub fn inc_question_failures(&self) {
        bump(&self.question_failures, "question_failures");
    }

    pub fn inc_judge_fallbacks(&self) {
        bump(&self.judge_fallbacks, "judge_fallbacks");
    }

    pub fn inc_meta_queries_blocked(&self) {
        bump(&self.meta_queries_blocked, "meta_queries_blocked");
    }

    pub fn inc_leaks_redacted(&self) {
        bump(&self.leaks_redacted, "leaks_redacted");
    }

    /// Log every counter in one `info!` event. Call at the end of a command.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            questions_scored = self.questions_scored(),
            question_failures = self.question_failures(),
            judge_fallbacks = self.judge_fallbacks(),
            meta_queries_blocked = self.meta_queries_blocked(),
            leaks_redacted = self.leaks_redacted(),
        );
    }

    pub fn questions_scored(&self) -> u64 {
        self.questions_scored.load(Ordering::Relaxed)
    }

    pub fn question_failures(&self) -> u64 {
        self.question_failures.load(Ordering::Relaxed)
    }

    pub fn judge_fallbacks(&self) -> u64 {
        self.judge_fallbacks.load(Ordering::Relaxed)
    }

    pub fn meta_queries_blocked(&self) -> u64 {
        self.meta_queries_blocked.load(Ordering::Relaxed)
    }

    pub fn leaks_redacted(&self) -> u64 {
        self.leaks_redacted.load(Ordering::Relaxed)
    }
}
