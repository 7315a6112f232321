//! Incumbent vs challenger comparison.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use league_state::ContentDigest;

use super::run::{round2, SkillRunResult};

/// Whether a challenger beats the incumbent.
///
/// Higher accuracy always wins; equal accuracy wins only with fewer tokens.
pub fn is_improvement(accuracy_delta: f64, token_delta: i64) -> bool {
    accuracy_delta > 0.0 || (accuracy_delta == 0.0 && token_delta > 0)
}

/// Result of refereeing v1 (incumbent) against v2 (challenger).
///
/// Handed to the settlement layer as-is; the pipeline never mutates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefereeVerdict {
    pub skill_slug: String,
    /// SHA-256 of the incumbent prompt text.
    pub v1_digest: ContentDigest,
    /// SHA-256 of the challenger prompt text.
    pub v2_digest: ContentDigest,
    pub v1_score: SkillRunResult,
    pub v2_score: SkillRunResult,
    /// `v2.accuracy_pct - v1.accuracy_pct`, rounded to 2 decimals.
    pub accuracy_delta: f64,
    /// `v1.total_tokens - v2.total_tokens`; positive means v2 is cheaper.
    pub token_delta: i64,
    pub improved: bool,
    pub timestamp: DateTime<Utc>,
}

impl RefereeVerdict {
    pub fn compare(
        skill_slug: impl Into<String>,
        v1_content: &str,
        v2_content: &str,
        v1_score: SkillRunResult,
        v2_score: SkillRunResult,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let accuracy_delta = round2(v2_score.accuracy_pct - v1_score.accuracy_pct);
        let token_delta = v1_score.total_tokens as i64 - v2_score.total_tokens as i64;

        Self {
            skill_slug: skill_slug.into(),
            v1_digest: ContentDigest::from_bytes(v1_content.as_bytes()),
            v2_digest: ContentDigest::from_bytes(v2_content.as_bytes()),
            v1_score,
            v2_score,
            accuracy_delta,
            token_delta,
            improved: is_improvement(accuracy_delta, token_delta),
            timestamp,
        }
    }
}
