//! League-State: persistence layer for Prompt League
//!
//! This crate owns every record the referee pipeline reads or writes and the
//! storage seams through which it does so.
//!
//! ## Layer 0 - Data/Persistence
//!
//! Focus: record shapes, storage contracts, and durable JSON-file backends.
//!
//! ## Key Components
//!
//! - `ValidationSetLoader`: Per-skill validation sets, loaded fresh per call
//! - `BountyRegistry`: Bounty pools offered for improved prompt versions
//! - `SubmissionLedger`: Challenger submissions and their settled outcome
//! - `IdGenerator`: Injected identifier source for new records

mod error;
pub mod fakes;
pub mod fs_store;
pub mod ids;
pub mod storage_traits;

pub use error::StorageError;
pub use fs_store::{FsValidationSets, JsonFileLeagueStore};
pub use ids::{IdGenerator, SequentialIdGenerator, UuidIdGenerator};
pub use storage_traits::{
    Bounty, BountyRegistry, BountyStatus, ContentDigest, MatchType, NewBounty, NewSubmission,
    PoolDeduction, StorageResult, Submission, SubmissionLedger, SubmissionStatus, SubmissionUpdate,
    ValidationQuestion, ValidationSet, ValidationSetLoader,
};
