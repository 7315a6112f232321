//! Storage trait definitions for Prompt League
//!
//! These traits define the storage abstractions the referee pipeline consumes:
//! - `ValidationSetLoader`: Per-skill validation sets (read-only)
//! - `BountyRegistry`: Bounty pools and their remaining budget
//! - `SubmissionLedger`: Challenger submissions and verdict outcomes
//!
//! All traits are async and backend-agnostic. In-memory fakes are provided
//! for testing via the `fakes` module.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::error::StorageError;

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

// ---------------------------------------------------------------------------
// ContentDigest — prompt fingerprints
// ---------------------------------------------------------------------------

/// Content digest (SHA-256 hex string).
///
/// Only constructed through `from_bytes`, so the inner string is always
/// lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentDigest(String);

impl ContentDigest {
    /// Compute the SHA-256 digest of the given bytes.
    pub fn from_bytes(data: &[u8]) -> Self {
        use sha2::Digest;
        let mut hasher = Sha256::new();
        hasher.update(data);
        ContentDigest(hex::encode(hasher.finalize()))
    }

    /// Return the full hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short form (first 12 hex chars).
    pub fn short(&self) -> &str {
        &self.0[..12.min(self.0.len())]
    }
}

impl std::fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Validation sets
// ---------------------------------------------------------------------------

/// How a response is compared against `expected_output`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    /// Fraction of comma-separated keywords present in the response.
    Keyword,
    /// Case-insensitive, trimmed equality.
    Exact,
    /// Case-insensitive substring.
    Contains,
    /// Scored 0-10 by a judge model.
    LlmJudge,
}

impl MatchType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Keyword => "keyword",
            Self::Exact => "exact",
            Self::Contains => "contains",
            Self::LlmJudge => "llm_judge",
        }
    }
}

impl std::fmt::Display for MatchType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_weight() -> f64 {
    1.0
}

/// A single question/expected-answer pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationQuestion {
    /// User prompt sent to the skill under test.
    pub input: String,
    /// Expected output specification, interpreted per `match_type`.
    pub expected_output: String,
    pub match_type: MatchType,
    /// Relative weight of this question; 1.0 when absent.
    #[serde(default = "default_weight")]
    pub weight: f64,
}

/// The fixed battery of questions a skill is scored against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationSet {
    /// Skill identifier (slug).
    pub skill: String,
    pub version: String,
    /// Questions in evaluation order.
    pub questions: Vec<ValidationQuestion>,
}

/// Source of validation sets.
///
/// Implementations must not cache across calls unless they invalidate on
/// change: each referee invocation may see updated criteria.
#[async_trait]
pub trait ValidationSetLoader: Send + Sync {
    /// Load the set registered for `skill`. `Ok(None)` when none exists.
    async fn load(&self, skill: &str) -> StorageResult<Option<ValidationSet>>;
}

// ---------------------------------------------------------------------------
// BountyRegistry — bounty pools
// ---------------------------------------------------------------------------

/// Lifecycle state of a bounty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BountyStatus {
    Active,
    Expired,
    Depleted,
}

impl std::fmt::Display for BountyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Active => "active",
            Self::Expired => "expired",
            Self::Depleted => "depleted",
        };
        f.write_str(s)
    }
}

/// Parameters for creating a bounty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBounty {
    pub skill_slug: String,
    pub creator_wallet: String,
    /// Reward per percentage point of accuracy gained.
    pub reward_per_accuracy_pct: f64,
    /// Reward per percentage point of token usage removed.
    pub reward_per_token_reduction_pct: f64,
    pub max_pool: f64,
    pub expires_in_days: i64,
}

/// A funded offer to pay for improved versions of one skill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bounty {
    pub id: String,
    pub skill_slug: String,
    pub creator_wallet: String,
    pub reward_per_accuracy_pct: f64,
    pub reward_per_token_reduction_pct: f64,
    pub max_pool: f64,
    pub pool_remaining: f64,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub status: BountyStatus,
}

impl Bounty {
    /// Build a fresh, fully funded bounty.
    pub fn from_new(id: String, params: NewBounty, now: DateTime<Utc>) -> Self {
        Self {
            id,
            skill_slug: params.skill_slug,
            creator_wallet: params.creator_wallet,
            reward_per_accuracy_pct: params.reward_per_accuracy_pct,
            reward_per_token_reduction_pct: params.reward_per_token_reduction_pct,
            max_pool: params.max_pool,
            pool_remaining: params.max_pool,
            expires_at: now + Duration::days(params.expires_in_days),
            created_at: now,
            status: BountyStatus::Active,
        }
    }

    /// Status as of `now`: an empty pool wins over expiry, expiry wins over
    /// the stored status.
    pub fn effective_status(&self, now: DateTime<Utc>) -> BountyStatus {
        if self.pool_remaining <= 0.0 {
            BountyStatus::Depleted
        } else if self.expires_at < now {
            BountyStatus::Expired
        } else {
            self.status
        }
    }

    /// Copy of this bounty with `status` replaced by its effective status.
    pub fn with_effective_status(mut self, now: DateTime<Utc>) -> Self {
        self.status = self.effective_status(now);
        self
    }

    /// Remove up to `amount` from the pool and return what was actually
    /// taken. The pool never goes below zero.
    pub fn deduct(&mut self, amount: f64) -> f64 {
        let taken = amount.max(0.0).min(self.pool_remaining.max(0.0));
        self.pool_remaining = (self.pool_remaining - taken).max(0.0);
        if self.pool_remaining <= 0.0 {
            self.status = BountyStatus::Depleted;
        }
        taken
    }
}

/// Outcome of charging a payout against a bounty pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolDeduction {
    /// Bounty as stored after the deduction.
    pub bounty: Bounty,
    /// Amount actually removed; less than requested when the pool ran short.
    pub deducted: f64,
}

/// Bounty pool registry.
///
/// Semantics:
/// - `get` and `list` report the effective status (expiry and depletion are
///   derived at read time).
/// - `deduct_pool` reads and writes the pool atomically with respect to
///   other deductions, and never drives `pool_remaining` below zero.
#[async_trait]
pub trait BountyRegistry: Send + Sync {
    /// Create and persist a new active bounty.
    async fn create_bounty(&self, params: NewBounty) -> StorageResult<Bounty>;

    /// Fetch a bounty. Returns `StorageError::BountyNotFound` if absent.
    async fn get_bounty(&self, id: &str) -> StorageResult<Bounty>;

    /// List all bounties in creation order.
    async fn list_bounties(&self) -> StorageResult<Vec<Bounty>>;

    /// Charge up to `amount` against a bounty pool. The returned
    /// `deducted` is capped at the pool remaining at the time of the call.
    async fn deduct_pool(&self, id: &str, amount: f64) -> StorageResult<PoolDeduction>;
}

// ---------------------------------------------------------------------------
// SubmissionLedger — challenger submissions
// ---------------------------------------------------------------------------

/// Evaluation state of a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Pending,
    Evaluating,
    Accepted,
    Rejected,
}

/// Parameters for recording a submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSubmission {
    pub bounty_id: String,
    pub skill_slug: String,
    pub optimizer_wallet: String,
    pub v2_content: String,
}

/// A challenger prompt version submitted against a bounty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub id: String,
    pub bounty_id: String,
    pub skill_slug: String,
    pub optimizer_wallet: String,
    pub submitted_at: DateTime<Utc>,
    pub v2_content: String,
    pub status: SubmissionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy_delta: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_delta: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payout: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verdict_timestamp: Option<DateTime<Utc>>,
}

impl Submission {
    /// Build a pending submission.
    pub fn from_new(id: String, params: NewSubmission, now: DateTime<Utc>) -> Self {
        Self {
            id,
            bounty_id: params.bounty_id,
            skill_slug: params.skill_slug,
            optimizer_wallet: params.optimizer_wallet,
            submitted_at: now,
            v2_content: params.v2_content,
            status: SubmissionStatus::Pending,
            accuracy_delta: None,
            token_delta: None,
            payout: None,
            verdict_timestamp: None,
        }
    }
}

/// Partial update of a submission; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubmissionUpdate {
    pub status: Option<SubmissionStatus>,
    pub accuracy_delta: Option<f64>,
    pub token_delta: Option<i64>,
    pub payout: Option<f64>,
    pub verdict_timestamp: Option<DateTime<Utc>>,
}

impl SubmissionUpdate {
    /// Update that only moves the status.
    pub fn status(status: SubmissionStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn apply(&self, submission: &mut Submission) {
        if let Some(status) = self.status {
            submission.status = status;
        }
        if let Some(delta) = self.accuracy_delta {
            submission.accuracy_delta = Some(delta);
        }
        if let Some(delta) = self.token_delta {
            submission.token_delta = Some(delta);
        }
        if let Some(payout) = self.payout {
            submission.payout = Some(payout);
        }
        if let Some(ts) = self.verdict_timestamp {
            submission.verdict_timestamp = Some(ts);
        }
    }
}

/// Submission ledger.
///
/// Guarantees:
/// - Submissions are listed in creation order.
/// - `update` applies only the fields present in the `SubmissionUpdate`.
#[async_trait]
pub trait SubmissionLedger: Send + Sync {
    /// Record a new pending submission.
    async fn create_submission(&self, params: NewSubmission) -> StorageResult<Submission>;

    /// Fetch a submission. Returns `StorageError::SubmissionNotFound` if absent.
    async fn get_submission(&self, id: &str) -> StorageResult<Submission>;

    /// List every submission.
    async fn list_submissions(&self) -> StorageResult<Vec<Submission>>;

    /// List submissions made against one bounty.
    async fn list_for_bounty(&self, bounty_id: &str) -> StorageResult<Vec<Submission>>;

    /// Apply a partial update, returning the updated submission.
    async fn update_submission(
        &self,
        id: &str,
        update: SubmissionUpdate,
    ) -> StorageResult<Submission>;
}
