//! In-memory fakes for storage traits (testing only)
//!
//! Provides `MemoryValidationSets`, `MemoryBountyRegistry`, and
//! `MemorySubmissionLedger` that satisfy the trait contracts without touching
//! the filesystem.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;

use crate::error::StorageError;
use crate::ids::{IdGenerator, SequentialIdGenerator};
use crate::storage_traits::*;

// ---------------------------------------------------------------------------
// MemoryValidationSets
// ---------------------------------------------------------------------------

/// Validation sets keyed by skill identifier.
#[derive(Debug, Default)]
pub struct MemoryValidationSets {
    sets: Mutex<HashMap<String, ValidationSet>>,
}

impl MemoryValidationSets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the set for `set.skill`.
    pub fn insert(&self, set: ValidationSet) {
        let mut sets = self.sets.lock().unwrap();
        sets.insert(set.skill.clone(), set);
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with_set(self, set: ValidationSet) -> Self {
        self.insert(set);
        self
    }
}

#[async_trait]
impl ValidationSetLoader for MemoryValidationSets {
    async fn load(&self, skill: &str) -> StorageResult<Option<ValidationSet>> {
        let sets = self.sets.lock().unwrap();
        Ok(sets.get(skill).cloned())
    }
}

// ---------------------------------------------------------------------------
// MemoryBountyRegistry
// ---------------------------------------------------------------------------

/// In-memory bounty registry backed by an insertion-ordered `Vec`.
pub struct MemoryBountyRegistry {
    bounties: Mutex<Vec<Bounty>>,
    ids: Arc<dyn IdGenerator>,
}

impl MemoryBountyRegistry {
    pub fn new() -> Self {
        Self::with_ids(Arc::new(SequentialIdGenerator::new()))
    }

    pub fn with_ids(ids: Arc<dyn IdGenerator>) -> Self {
        Self {
            bounties: Mutex::new(Vec::new()),
            ids,
        }
    }

    /// Insert a bounty as-is (used to seed expired or depleted fixtures).
    pub fn insert(&self, bounty: Bounty) {
        self.bounties.lock().unwrap().push(bounty);
    }
}

impl Default for MemoryBountyRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BountyRegistry for MemoryBountyRegistry {
    async fn create_bounty(&self, params: NewBounty) -> StorageResult<Bounty> {
        let bounty = Bounty::from_new(self.ids.next_id("bounty"), params, Utc::now());
        self.bounties.lock().unwrap().push(bounty.clone());
        Ok(bounty)
    }

    async fn get_bounty(&self, id: &str) -> StorageResult<Bounty> {
        let bounties = self.bounties.lock().unwrap();
        bounties
            .iter()
            .find(|b| b.id == id)
            .cloned()
            .map(|b| b.with_effective_status(Utc::now()))
            .ok_or_else(|| StorageError::BountyNotFound { id: id.to_string() })
    }

    async fn list_bounties(&self) -> StorageResult<Vec<Bounty>> {
        let now = Utc::now();
        let bounties = self.bounties.lock().unwrap();
        Ok(bounties
            .iter()
            .cloned()
            .map(|b| b.with_effective_status(now))
            .collect())
    }

    async fn deduct_pool(&self, id: &str, amount: f64) -> StorageResult<PoolDeduction> {
        let mut bounties = self.bounties.lock().unwrap();
        let bounty = bounties
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or_else(|| StorageError::BountyNotFound { id: id.to_string() })?;
        let deducted = bounty.deduct(amount);
        Ok(PoolDeduction {
            bounty: bounty.clone(),
            deducted,
        })
    }
}

// ---------------------------------------------------------------------------
// MemorySubmissionLedger
// ---------------------------------------------------------------------------

/// In-memory submission ledger backed by an insertion-ordered `Vec`.
pub struct MemorySubmissionLedger {
    submissions: Mutex<Vec<Submission>>,
    ids: Arc<dyn IdGenerator>,
}

impl MemorySubmissionLedger {
    pub fn new() -> Self {
        Self::with_ids(Arc::new(SequentialIdGenerator::new()))
    }

    pub fn with_ids(ids: Arc<dyn IdGenerator>) -> Self {
        Self {
            submissions: Mutex::new(Vec::new()),
            ids,
        }
    }
}

impl Default for MemorySubmissionLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SubmissionLedger for MemorySubmissionLedger {
    async fn create_submission(&self, params: NewSubmission) -> StorageResult<Submission> {
        let submission = Submission::from_new(self.ids.next_id("sub"), params, Utc::now());
        self.submissions.lock().unwrap().push(submission.clone());
        Ok(submission)
    }

    async fn get_submission(&self, id: &str) -> StorageResult<Submission> {
        let submissions = self.submissions.lock().unwrap();
        submissions
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or_else(|| StorageError::SubmissionNotFound { id: id.to_string() })
    }

    async fn list_submissions(&self) -> StorageResult<Vec<Submission>> {
        Ok(self.submissions.lock().unwrap().clone())
    }

    async fn list_for_bounty(&self, bounty_id: &str) -> StorageResult<Vec<Submission>> {
        let submissions = self.submissions.lock().unwrap();
        Ok(submissions
            .iter()
            .filter(|s| s.bounty_id == bounty_id)
            .cloned()
            .collect())
    }

    async fn update_submission(
        &self,
        id: &str,
        update: SubmissionUpdate,
    ) -> StorageResult<Submission> {
        let mut submissions = self.submissions.lock().unwrap();
        let submission = submissions
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| StorageError::SubmissionNotFound { id: id.to_string() })?;
        update.apply(submission);
        Ok(submission.clone())
    }
}
