//! Bounty settlement: submissions, payouts and the leaderboard.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use league_state::{
    Bounty, BountyRegistry, BountyStatus, NewSubmission, Submission, SubmissionLedger,
    SubmissionStatus, SubmissionUpdate,
};

use crate::domain::{round2, LeagueError, RefereeVerdict, Result};
use crate::obs;
use crate::referee::Referee;

/// Reward owed for an accepted submission.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Payout {
    pub accuracy_reward: f64,
    pub token_reward: f64,
    /// Capped at the bounty's remaining pool.
    pub total: f64,
}

/// Reward for `verdict` under `bounty`'s schedule. Values are rounded to
/// cents; only gains are paid.
pub fn compute_payout(bounty: &Bounty, verdict: &RefereeVerdict) -> Payout {
    let accuracy_reward = verdict.accuracy_delta.max(0.0) * bounty.reward_per_accuracy_pct;

    let v1_tokens = verdict.v1_score.total_tokens;
    let token_reduction_pct = if v1_tokens > 0 {
        verdict.token_delta as f64 / v1_tokens as f64 * 100.0
    } else {
        0.0
    };
    let token_reward = token_reduction_pct.max(0.0) * bounty.reward_per_token_reduction_pct;

    let total = (accuracy_reward + token_reward).min(bounty.pool_remaining.max(0.0));

    Payout {
        accuracy_reward: round2(accuracy_reward),
        token_reward: round2(token_reward),
        total: round2(total),
    }
}

/// Result of one submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionReceipt {
    pub submission: Submission,
    /// `None` when evaluation was deferred.
    pub verdict: Option<RefereeVerdict>,
    /// Present only for accepted submissions.
    pub payout: Option<Payout>,
}

/// One row of the optimizer leaderboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub wallet: String,
    pub total_earnings: f64,
    pub submissions_accepted: u32,
    pub submissions_total: u32,
    pub best_accuracy_delta: f64,
}

/// Rank wallets by total earnings, highest first. Ties keep first-seen order.
pub fn leaderboard(submissions: &[Submission]) -> Vec<LeaderboardEntry> {
    let mut entries: Vec<LeaderboardEntry> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for sub in submissions {
        let slot = *index.entry(sub.optimizer_wallet.as_str()).or_insert_with(|| {
            entries.push(LeaderboardEntry {
                wallet: sub.optimizer_wallet.clone(),
                total_earnings: 0.0,
                submissions_accepted: 0,
                submissions_total: 0,
                best_accuracy_delta: 0.0,
            });
            entries.len() - 1
        });
        let entry = &mut entries[slot];
        entry.submissions_total += 1;

        let payout = sub.payout.unwrap_or(0.0);
        if sub.status == SubmissionStatus::Accepted && payout > 0.0 {
            entry.submissions_accepted += 1;
            entry.total_earnings += payout;
            if let Some(delta) = sub.accuracy_delta {
                entry.best_accuracy_delta = entry.best_accuracy_delta.max(delta);
            }
        }
    }

    for entry in &mut entries {
        entry.total_earnings = round2(entry.total_earnings);
    }
    entries.sort_by(|a, b| b.total_earnings.total_cmp(&a.total_earnings));
    entries
}

/// Runs challenger submissions against bounties and settles them.
pub struct LeagueSettlement {
    bounties: Arc<dyn BountyRegistry>,
    submissions: Arc<dyn SubmissionLedger>,
    referee: Referee,
}

impl LeagueSettlement {
    pub fn new(
        bounties: Arc<dyn BountyRegistry>,
        submissions: Arc<dyn SubmissionLedger>,
        referee: Referee,
    ) -> Self {
        Self {
            bounties,
            submissions,
            referee,
        }
    }

    /// Referee `v2_content` against `incumbent_content` for the bounty's
    /// skill and record the outcome.
    ///
    /// The submission moves pending -> evaluating -> accepted/rejected. If
    /// the referee or the pool charge fails it is put back to pending and
    /// the error returned. Without inference credentials it stays pending
    /// and no verdict is produced.
    ///
    /// The recorded payout is what the pool actually yielded at charge
    /// time, so concurrent submissions never pay out more than the pool.
    #[instrument(skip(self, v2_content, incumbent_content), fields(bounty = %bounty_id))]
    pub async fn submit(
        &self,
        bounty_id: &str,
        optimizer_wallet: &str,
        v2_content: &str,
        incumbent_content: &str,
    ) -> Result<SubmissionReceipt> {
        if optimizer_wallet.trim().is_empty() || v2_content.trim().is_empty() {
            return Err(LeagueError::InvalidRequest(
                "optimizer wallet and v2 content are required".to_string(),
            ));
        }

        let bounty = self.bounties.get_bounty(bounty_id).await?;
        if bounty.status != BountyStatus::Active {
            return Err(LeagueError::BountyInactive {
                id: bounty.id,
                status: bounty.status,
            });
        }

        let submission = self
            .submissions
            .create_submission(NewSubmission {
                bounty_id: bounty.id.clone(),
                skill_slug: bounty.skill_slug.clone(),
                optimizer_wallet: optimizer_wallet.to_string(),
                v2_content: v2_content.to_string(),
            })
            .await?;

        if !self.referee.is_ready() {
            info!(submission = %submission.id, "inference not configured, evaluation deferred");
            return Ok(SubmissionReceipt {
                submission,
                verdict: None,
                payout: None,
            });
        }

        self.submissions
            .update_submission(&submission.id, SubmissionUpdate::status(SubmissionStatus::Evaluating))
            .await?;

        let verdict = match self
            .referee
            .referee(&bounty.skill_slug, incumbent_content, v2_content)
            .await
        {
            Ok(verdict) => verdict,
            Err(err) => {
                warn!(submission = %submission.id, error = %err, "evaluation failed");
                self.return_to_pending(&submission.id).await?;
                return Err(err);
            }
        };

        let payout = if verdict.improved {
            match self.charge_pool(&bounty, &verdict).await {
                Ok(payout) => Some(payout),
                Err(err) => {
                    warn!(submission = %submission.id, error = %err, "pool charge failed");
                    self.return_to_pending(&submission.id).await?;
                    return Err(err);
                }
            }
        } else {
            None
        };
        let status = if verdict.improved {
            SubmissionStatus::Accepted
        } else {
            SubmissionStatus::Rejected
        };
        let paid = payout.map_or(0.0, |p| p.total);

        let submission = self
            .submissions
            .update_submission(
                &submission.id,
                SubmissionUpdate {
                    status: Some(status),
                    accuracy_delta: Some(verdict.accuracy_delta),
                    token_delta: Some(verdict.token_delta),
                    payout: Some(paid),
                    verdict_timestamp: Some(verdict.timestamp),
                },
            )
            .await?;

        let status_label = if verdict.improved { "accepted" } else { "rejected" };
        obs::emit_submission_settled(&submission.id, &bounty.id, status_label, paid);

        Ok(SubmissionReceipt {
            submission,
            verdict: Some(verdict),
            payout,
        })
    }

    /// Charge the owed reward against the pool as it stands now. `total`
    /// is the amount actually deducted.
    async fn charge_pool(&self, bounty: &Bounty, verdict: &RefereeVerdict) -> Result<Payout> {
        let owed = compute_payout(bounty, verdict);
        if owed.total <= 0.0 {
            return Ok(owed);
        }
        let deduction = self.bounties.deduct_pool(&bounty.id, owed.total).await?;
        if deduction.deducted < owed.total {
            warn!(
                bounty = %bounty.id,
                owed = owed.total,
                deducted = deduction.deducted,
                "pool ran short, payout reduced"
            );
        }
        Ok(Payout {
            total: round2(deduction.deducted),
            ..owed
        })
    }

    async fn return_to_pending(&self, submission_id: &str) -> Result<()> {
        self.submissions
            .update_submission(submission_id, SubmissionUpdate::status(SubmissionStatus::Pending))
            .await?;
        Ok(())
    }

    /// Leaderboard over every recorded submission.
    pub async fn leaderboard(&self) -> Result<Vec<LeaderboardEntry>> {
        let submissions = self.submissions.list_submissions().await?;
        Ok(leaderboard(&submissions))
    }
}
