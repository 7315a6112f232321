//! Bounty submission flow over in-memory stores.

mod common;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use common::{loader_with, reply, sql_tutor_set, ScriptedProvider, Step};
use league_core::{LeagueError, LeagueSettlement, Referee, Scorer, ValidationRunner};
use league_state::fakes::{MemoryBountyRegistry, MemorySubmissionLedger};
use league_state::{
    Bounty, BountyRegistry, BountyStatus, NewBounty, PoolDeduction, StorageError, StorageResult,
    SubmissionLedger, SubmissionStatus,
};

const INCUMBENT: &str = "incumbent prompt";
const GOOD: &str = "better prompt";
const BAD: &str = "worse prompt";

/// Incumbent answers q1 only (70%, 100 tokens per question); the good
/// challenger answers everything with the same spend; the bad one nothing.
fn league_provider() -> ScriptedProvider {
    ScriptedProvider::new(|req| {
        let text = match (req.system_prompt.as_str(), req.user_prompt.as_str()) {
            (GOOD, _) => "alpha beta gamma",
            (INCUMBENT, "q1") => "alpha",
            _ => "nothing useful",
        };
        reply(text, 50, 50)
    })
}

struct Harness {
    settlement: LeagueSettlement,
    bounties: Arc<MemoryBountyRegistry>,
    submissions: Arc<MemorySubmissionLedger>,
}

fn sql_referee(provider: ScriptedProvider) -> Referee {
    let provider = Arc::new(provider);
    let runner = ValidationRunner::new(provider.clone(), Scorer::new(provider.clone(), None));
    Referee::new(loader_with(sql_tutor_set()), runner)
}

fn harness(provider: ScriptedProvider) -> Harness {
    let bounties = Arc::new(MemoryBountyRegistry::new());
    let submissions = Arc::new(MemorySubmissionLedger::new());
    Harness {
        settlement: LeagueSettlement::new(bounties.clone(), submissions.clone(), sql_referee(provider)),
        bounties,
        submissions,
    }
}

/// Same answers as `league_provider`, but every reply takes a second so
/// overlapping submissions are all mid-evaluation together.
fn slow_league_provider() -> ScriptedProvider {
    ScriptedProvider::new(|req| {
        let text = match (req.system_prompt.as_str(), req.user_prompt.as_str()) {
            (GOOD, _) => "alpha beta gamma",
            (INCUMBENT, "q1") => "alpha",
            _ => "nothing useful",
        };
        Step::Delayed {
            after: std::time::Duration::from_secs(1),
            text: text.to_string(),
        }
    })
}

/// Registry whose pool charges always fail.
struct BrokenPool(MemoryBountyRegistry);

#[async_trait]
impl BountyRegistry for BrokenPool {
    async fn create_bounty(&self, params: NewBounty) -> StorageResult<Bounty> {
        self.0.create_bounty(params).await
    }

    async fn get_bounty(&self, id: &str) -> StorageResult<Bounty> {
        self.0.get_bounty(id).await
    }

    async fn list_bounties(&self) -> StorageResult<Vec<Bounty>> {
        self.0.list_bounties().await
    }

    async fn deduct_pool(&self, _id: &str, _amount: f64) -> StorageResult<PoolDeduction> {
        Err(StorageError::Io(std::io::Error::other("disk full")))
    }
}

fn new_bounty(skill: &str, pool: f64) -> NewBounty {
    NewBounty {
        skill_slug: skill.to_string(),
        creator_wallet: "0xcreator".to_string(),
        reward_per_accuracy_pct: 1.5,
        reward_per_token_reduction_pct: 1.0,
        max_pool: pool,
        expires_in_days: 30,
    }
}

#[tokio::test]
async fn improved_submission_is_accepted_and_paid() {
    let h = harness(league_provider());
    let bounty = h.bounties.create_bounty(new_bounty("sql-tutor", 100.0)).await.unwrap();

    let receipt = h
        .settlement
        .submit(&bounty.id, "0xalice", GOOD, INCUMBENT)
        .await
        .unwrap();

    let verdict = receipt.verdict.as_ref().unwrap();
    assert!(verdict.improved);
    assert_eq!(verdict.accuracy_delta, 30.0);
    let payout = receipt.payout.unwrap();
    assert_eq!(payout.accuracy_reward, 45.0);
    assert_eq!(payout.token_reward, 0.0);
    assert_eq!(payout.total, 45.0);

    let stored = h.submissions.get_submission(&receipt.submission.id).await.unwrap();
    assert_eq!(stored.status, SubmissionStatus::Accepted);
    assert_eq!(stored.payout, Some(45.0));
    assert_eq!(stored.accuracy_delta, Some(30.0));
    assert_eq!(stored.token_delta, Some(0));
    assert!(stored.verdict_timestamp.is_some());

    let bounty = h.bounties.get_bounty(&bounty.id).await.unwrap();
    assert_eq!(bounty.pool_remaining, 55.0);
    assert_eq!(bounty.status, BountyStatus::Active);
}

#[tokio::test]
async fn payout_exhausting_the_pool_depletes_the_bounty() {
    let h = harness(league_provider());
    let bounty = h.bounties.create_bounty(new_bounty("sql-tutor", 20.0)).await.unwrap();

    let receipt = h
        .settlement
        .submit(&bounty.id, "0xalice", GOOD, INCUMBENT)
        .await
        .unwrap();
    assert_eq!(receipt.payout.unwrap().total, 20.0);

    let bounty = h.bounties.get_bounty(&bounty.id).await.unwrap();
    assert_eq!(bounty.pool_remaining, 0.0);
    assert_eq!(bounty.status, BountyStatus::Depleted);

    let err = h
        .settlement
        .submit(&bounty.id, "0xbob", GOOD, INCUMBENT)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        LeagueError::BountyInactive {
            status: BountyStatus::Depleted,
            ..
        }
    ));
}

#[tokio::test(start_paused = true)]
async fn concurrent_submissions_share_the_pool() {
    let h = harness(slow_league_provider());
    let bounty = h.bounties.create_bounty(new_bounty("sql-tutor", 50.0)).await.unwrap();

    let (a, b) = tokio::join!(
        h.settlement.submit(&bounty.id, "0xalice", GOOD, INCUMBENT),
        h.settlement.submit(&bounty.id, "0xbob", GOOD, INCUMBENT),
    );
    let (a, b) = (a.unwrap(), b.unwrap());

    let mut paid = vec![a.payout.unwrap().total, b.payout.unwrap().total];
    paid.sort_by(f64::total_cmp);
    assert_eq!(paid, [5.0, 45.0]);

    let mut recorded: Vec<f64> = h
        .submissions
        .list_for_bounty(&bounty.id)
        .await
        .unwrap()
        .iter()
        .map(|s| s.payout.unwrap())
        .collect();
    recorded.sort_by(f64::total_cmp);
    assert_eq!(recorded, paid);

    let bounty = h.bounties.get_bounty(&bounty.id).await.unwrap();
    assert_eq!(bounty.pool_remaining, 0.0);
    assert_eq!(bounty.status, BountyStatus::Depleted);
}

#[tokio::test]
async fn failed_pool_charge_leaves_submission_pending() {
    let bounties = Arc::new(BrokenPool(MemoryBountyRegistry::new()));
    let submissions = Arc::new(MemorySubmissionLedger::new());
    let settlement =
        LeagueSettlement::new(bounties.clone(), submissions.clone(), sql_referee(league_provider()));
    let bounty = bounties.create_bounty(new_bounty("sql-tutor", 100.0)).await.unwrap();

    let err = settlement
        .submit(&bounty.id, "0xalice", GOOD, INCUMBENT)
        .await
        .unwrap_err();
    assert!(matches!(err, LeagueError::Storage(StorageError::Io(_))));

    let subs = submissions.list_for_bounty(&bounty.id).await.unwrap();
    assert_eq!(subs.len(), 1);
    assert_eq!(subs[0].status, SubmissionStatus::Pending);
    assert!(subs[0].payout.is_none());
    assert!(subs[0].accuracy_delta.is_none());
    assert_eq!(bounties.get_bounty(&bounty.id).await.unwrap().pool_remaining, 100.0);
}

#[tokio::test]
async fn regression_is_rejected_without_payout() {
    let h = harness(league_provider());
    let bounty = h.bounties.create_bounty(new_bounty("sql-tutor", 100.0)).await.unwrap();

    let receipt = h
        .settlement
        .submit(&bounty.id, "0xbob", BAD, INCUMBENT)
        .await
        .unwrap();

    assert!(!receipt.verdict.as_ref().unwrap().improved);
    assert!(receipt.payout.is_none());
    assert_eq!(receipt.submission.status, SubmissionStatus::Rejected);
    assert_eq!(receipt.submission.payout, Some(0.0));
    assert_eq!(receipt.submission.accuracy_delta, Some(-70.0));

    let bounty = h.bounties.get_bounty(&bounty.id).await.unwrap();
    assert_eq!(bounty.pool_remaining, 100.0);
}

#[tokio::test]
async fn unknown_bounty_is_not_found() {
    let h = harness(league_provider());

    let err = h
        .settlement
        .submit("bounty-404", "0xalice", GOOD, INCUMBENT)
        .await
        .unwrap_err();

    assert!(err.is_not_found());
    assert!(h.submissions.list_submissions().await.unwrap().is_empty());
}

#[tokio::test]
async fn expired_bounty_refuses_submissions() {
    let h = harness(league_provider());
    let mut expired = Bounty::from_new(
        "bounty-old".to_string(),
        new_bounty("sql-tutor", 100.0),
        Utc::now() - Duration::days(60),
    );
    expired.expires_at = Utc::now() - Duration::days(1);
    h.bounties.insert(expired);

    let err = h
        .settlement
        .submit("bounty-old", "0xalice", GOOD, INCUMBENT)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        LeagueError::BountyInactive {
            status: BountyStatus::Expired,
            ..
        }
    ));
    assert!(h.submissions.list_submissions().await.unwrap().is_empty());
}

#[tokio::test]
async fn missing_inputs_are_invalid() {
    let h = harness(league_provider());
    let bounty = h.bounties.create_bounty(new_bounty("sql-tutor", 100.0)).await.unwrap();

    let err = h.settlement.submit(&bounty.id, "", GOOD, INCUMBENT).await.unwrap_err();
    assert!(matches!(err, LeagueError::InvalidRequest(_)));

    let err = h.settlement.submit(&bounty.id, "0xalice", " ", INCUMBENT).await.unwrap_err();
    assert!(matches!(err, LeagueError::InvalidRequest(_)));
}

#[tokio::test]
async fn unconfigured_inference_defers_evaluation() {
    let h = harness(ScriptedProvider::unconfigured());
    let bounty = h.bounties.create_bounty(new_bounty("sql-tutor", 100.0)).await.unwrap();

    let receipt = h
        .settlement
        .submit(&bounty.id, "0xalice", GOOD, INCUMBENT)
        .await
        .unwrap();

    assert!(receipt.verdict.is_none());
    assert!(receipt.payout.is_none());
    let stored = h.submissions.get_submission(&receipt.submission.id).await.unwrap();
    assert_eq!(stored.status, SubmissionStatus::Pending);
    assert!(stored.accuracy_delta.is_none());
}

#[tokio::test]
async fn referee_error_returns_submission_to_pending() {
    let h = harness(league_provider());
    let bounty = h
        .bounties
        .create_bounty(new_bounty("skill-without-validation", 100.0))
        .await
        .unwrap();

    let err = h
        .settlement
        .submit(&bounty.id, "0xalice", GOOD, INCUMBENT)
        .await
        .unwrap_err();
    assert!(matches!(err, LeagueError::ValidationSetNotFound(_)));

    let subs = h.submissions.list_for_bounty(&bounty.id).await.unwrap();
    assert_eq!(subs.len(), 1);
    assert_eq!(subs[0].status, SubmissionStatus::Pending);
}

#[tokio::test]
async fn leaderboard_ranks_by_earnings() {
    let h = harness(league_provider());
    let bounty = h.bounties.create_bounty(new_bounty("sql-tutor", 1000.0)).await.unwrap();

    h.settlement.submit(&bounty.id, "0xbob", BAD, INCUMBENT).await.unwrap();
    h.settlement.submit(&bounty.id, "0xalice", GOOD, INCUMBENT).await.unwrap();
    h.settlement.submit(&bounty.id, "0xalice", GOOD, INCUMBENT).await.unwrap();

    let board = h.settlement.leaderboard().await.unwrap();
    assert_eq!(board.len(), 2);
    assert_eq!(board[0].wallet, "0xalice");
    assert_eq!(board[0].total_earnings, 90.0);
    assert_eq!(board[0].submissions_accepted, 2);
    assert_eq!(board[0].best_accuracy_delta, 30.0);
    assert_eq!(board[1].wallet, "0xbob");
    assert_eq!(board[1].submissions_total, 1);
    assert_eq!(board[1].total_earnings, 0.0);
}
