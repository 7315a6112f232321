//! Filesystem-backed stores.
//!
//! - [`FsValidationSets`] reads `<root>/<skill>/validation.json` from an
//!   ordered list of skill roots.
//! - [`JsonFileLeagueStore`] keeps bounties and submissions as pretty JSON
//!   arrays under a data directory (`bounties.json`, `submissions.json`).

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tempfile::NamedTempFile;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::StorageError;
use crate::ids::{IdGenerator, UuidIdGenerator};
use crate::storage_traits::*;

const VALIDATION_FILE: &str = "validation.json";
const BOUNTIES_FILE: &str = "bounties.json";
const SUBMISSIONS_FILE: &str = "submissions.json";

// ---------------------------------------------------------------------------
// FsValidationSets
// ---------------------------------------------------------------------------

/// Loads validation sets from disk on every call.
#[derive(Debug, Clone)]
pub struct FsValidationSets {
    roots: Vec<PathBuf>,
}

impl FsValidationSets {
    /// Search `roots` in order; the first existing `validation.json` wins.
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self { roots }
    }

    /// Search `skills_dir`, then the `skills` directory one level above the
    /// project (`<skills_dir>/../../skills`).
    pub fn from_skills_dir(skills_dir: impl AsRef<Path>) -> Self {
        let dir = skills_dir.as_ref().to_path_buf();
        let sibling = dir.join("..").join("..").join("skills");
        Self::new(vec![dir, sibling])
    }

    fn candidates(&self, skill: &str) -> Vec<PathBuf> {
        self.roots
            .iter()
            .map(|root| root.join(skill).join(VALIDATION_FILE))
            .collect()
    }
}

fn is_safe_slug(skill: &str) -> bool {
    !skill.is_empty()
        && !skill.contains("..")
        && !skill.contains('/')
        && !skill.contains('\\')
}

#[async_trait]
impl ValidationSetLoader for FsValidationSets {
    async fn load(&self, skill: &str) -> StorageResult<Option<ValidationSet>> {
        if !is_safe_slug(skill) {
            warn!(skill = %skill, "rejecting skill identifier with path components");
            return Ok(None);
        }

        for path in self.candidates(skill) {
            let raw = match tokio::fs::read_to_string(&path).await {
                Ok(raw) => raw,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(StorageError::Io(e)),
            };

            let set: ValidationSet =
                serde_json::from_str(&raw).map_err(|e| StorageError::InvalidValidationSet {
                    path: path.display().to_string(),
                    reason: e.to_string(),
                })?;
            debug!(skill = %skill, path = %path.display(), questions = set.questions.len(), "loaded validation set");
            return Ok(Some(set));
        }

        Ok(None)
    }
}

// ---------------------------------------------------------------------------
// JsonFileLeagueStore
// ---------------------------------------------------------------------------

/// Bounty registry and submission ledger persisted as JSON files.
///
/// Every operation re-reads the file, so several processes sharing a data
/// directory see each other's writes. Writes within one process are
/// serialised by an async mutex and land atomically (temp file + rename).
pub struct JsonFileLeagueStore {
    data_dir: PathBuf,
    ids: Arc<dyn IdGenerator>,
    write_lock: Mutex<()>,
}

impl JsonFileLeagueStore {
    /// Open (creating if needed) a store rooted at `data_dir`.
    pub fn open(data_dir: impl AsRef<Path>) -> StorageResult<Self> {
        Self::open_with_ids(data_dir, Arc::new(UuidIdGenerator))
    }

    pub fn open_with_ids(
        data_dir: impl AsRef<Path>,
        ids: Arc<dyn IdGenerator>,
    ) -> StorageResult<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();
        fs::create_dir_all(&data_dir)?;
        Ok(Self {
            data_dir,
            ids,
            write_lock: Mutex::new(()),
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn load_json<T: DeserializeOwned>(&self, file: &str) -> StorageResult<Vec<T>> {
        let path = self.data_dir.join(file);
        match fs::read_to_string(&path) {
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    fn save_json<T: Serialize>(&self, file: &str, records: &[T]) -> StorageResult<()> {
        let content = serde_json::to_string_pretty(records)?;
        let mut tmp = NamedTempFile::new_in(&self.data_dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.persist(self.data_dir.join(file)).map_err(|e| e.error)?;
        Ok(())
    }
}

#[async_trait]
impl BountyRegistry for JsonFileLeagueStore {
    async fn create_bounty(&self, params: NewBounty) -> StorageResult<Bounty> {
        let _guard = self.write_lock.lock().await;
        let mut bounties: Vec<Bounty> = self.load_json(BOUNTIES_FILE)?;
        let bounty = Bounty::from_new(self.ids.next_id("bounty"), params, Utc::now());
        bounties.push(bounty.clone());
        self.save_json(BOUNTIES_FILE, &bounties)?;
        Ok(bounty)
    }

    async fn get_bounty(&self, id: &str) -> StorageResult<Bounty> {
        let bounties: Vec<Bounty> = self.load_json(BOUNTIES_FILE)?;
        bounties
            .into_iter()
            .find(|b| b.id == id)
            .map(|b| b.with_effective_status(Utc::now()))
            .ok_or_else(|| StorageError::BountyNotFound { id: id.to_string() })
    }

    async fn list_bounties(&self) -> StorageResult<Vec<Bounty>> {
        let now = Utc::now();
        let bounties: Vec<Bounty> = self.load_json(BOUNTIES_FILE)?;
        Ok(bounties
            .into_iter()
            .map(|b| b.with_effective_status(now))
            .collect())
    }

    async fn deduct_pool(&self, id: &str, amount: f64) -> StorageResult<PoolDeduction> {
        let _guard = self.write_lock.lock().await;
        let mut bounties: Vec<Bounty> = self.load_json(BOUNTIES_FILE)?;
        let bounty = bounties
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or_else(|| StorageError::BountyNotFound { id: id.to_string() })?;
        let deducted = bounty.deduct(amount);
        let bounty = bounty.clone();
        self.save_json(BOUNTIES_FILE, &bounties)?;
        Ok(PoolDeduction { bounty, deducted })
    }
}

#[async_trait]
impl SubmissionLedger for JsonFileLeagueStore {
    async fn create_submission(&self, params: NewSubmission) -> StorageResult<Submission> {
        let _guard = self.write_lock.lock().await;
        let mut submissions: Vec<Submission> = self.load_json(SUBMISSIONS_FILE)?;
        let submission = Submission::from_new(self.ids.next_id("sub"), params, Utc::now());
        submissions.push(submission.clone());
        self.save_json(SUBMISSIONS_FILE, &submissions)?;
        Ok(submission)
    }

    async fn get_submission(&self, id: &str) -> StorageResult<Submission> {
        let submissions: Vec<Submission> = self.load_json(SUBMISSIONS_FILE)?;
        submissions
            .into_iter()
            .find(|s| s.id == id)
            .ok_or_else(|| StorageError::SubmissionNotFound { id: id.to_string() })
    }

    async fn list_submissions(&self) -> StorageResult<Vec<Submission>> {
        self.load_json(SUBMISSIONS_FILE)
    }

    async fn list_for_bounty(&self, bounty_id: &str) -> StorageResult<Vec<Submission>> {
        let submissions: Vec<Submission> = self.load_json(SUBMISSIONS_FILE)?;
        Ok(submissions
            .into_iter()
            .filter(|s| s.bounty_id == bounty_id)
            .collect())
    }

    async fn update_submission(
        &self,
        id: &str,
        update: SubmissionUpdate,
    ) -> StorageResult<Submission> {
        let _guard = self.write_lock.lock().await;
        let mut submissions: Vec<Submission> = self.load_json(SUBMISSIONS_FILE)?;
        let submission = submissions
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| StorageError::SubmissionNotFound { id: id.to_string() })?;
        update.apply(submission);
        let updated = submission.clone();
        self.save_json(SUBMISSIONS_FILE, &submissions)?;
        Ok(updated)
    }
}
