//! Domain models for Prompt League.
//!
//! Canonical definitions for the referee's outputs:
//! - `QuestionResult` / `SkillRunResult`: one prompt version scored against a validation set
//! - `RefereeVerdict`: incumbent vs challenger comparison
//! - `LeagueError`: the domain error taxonomy

pub mod error;
pub mod run;
pub mod verdict;

pub use error::{LeagueError, Result};
pub use run::{round2, QuestionOutcome, QuestionResult, SkillRunResult};
pub use verdict::{is_improvement, RefereeVerdict};
