//! League Core Library
//!
//! Scoring and referee pipeline for Prompt League: prompt versions (skills)
//! are run against a validation set, compared, and settled against bounty
//! pools. The leak guard protects hidden prompts served through blind
//! inference.

pub mod config;
pub mod domain;
pub mod inference;
pub mod leak_guard;
pub mod league;
pub mod metrics;
pub mod obs;
pub mod referee;
pub mod rent;
pub mod reporting;
pub mod runner;
pub mod scorer;
pub mod telemetry;

pub use config::LeagueConfig;

pub use domain::{
    is_improvement, round2, LeagueError, QuestionOutcome, QuestionResult, RefereeVerdict, Result,
    SkillRunResult,
};

pub use inference::{
    AnthropicProvider, InferenceError, InferenceProvider, InferenceRequest, InferenceResponse,
};

pub use leak_guard::{
    detect_prompt_leakage, is_meta_query, sanitize_response, sanitize_response_with_window,
    wrap_system_prompt, LeakReport, SanitizedResponse,
};

pub use league::{compute_payout, leaderboard, LeaderboardEntry, LeagueSettlement, Payout, SubmissionReceipt};

pub use referee::Referee;
pub use rent::{BlindInference, RentOutcome};
pub use runner::{RunSettings, ValidationRunner};
pub use scorer::{MatchScore, Scorer};
pub use telemetry::init_tracing;

/// League core version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
