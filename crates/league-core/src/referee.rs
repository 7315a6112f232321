//! Referee: incumbent vs challenger on the skill's validation set.

use std::sync::Arc;

use chrono::Utc;
use tracing::instrument;

use league_state::{ValidationSet, ValidationSetLoader};

use crate::config::LeagueConfig;
use crate::domain::{LeagueError, RefereeVerdict, Result, SkillRunResult};
use crate::inference::InferenceProvider;
use crate::obs;
use crate::runner::ValidationRunner;

/// Compares prompt versions. Stateless across calls: the validation set is
/// loaded fresh every time.
#[derive(Clone)]
pub struct Referee {
    loader: Arc<dyn ValidationSetLoader>,
    runner: ValidationRunner,
}

impl Referee {
    pub fn new(loader: Arc<dyn ValidationSetLoader>, runner: ValidationRunner) -> Self {
        Self { loader, runner }
    }

    pub fn from_config(
        loader: Arc<dyn ValidationSetLoader>,
        provider: Arc<dyn InferenceProvider>,
        config: &LeagueConfig,
    ) -> Self {
        Self::new(loader, ValidationRunner::from_config(provider, config))
    }

    /// Whether the inference backend can serve calls right now.
    pub fn is_ready(&self) -> bool {
        self.runner.provider().is_configured()
    }

    async fn load_set(&self, skill: &str) -> Result<ValidationSet> {
        self.loader
            .load(skill)
            .await?
            .ok_or_else(|| LeagueError::ValidationSetNotFound(skill.to_string()))
    }

    /// Run v1 and v2 concurrently and compare them.
    ///
    /// Fails only when the skill has no validation set (or it cannot be
    /// loaded); per-question failures end up inside the run results.
    #[instrument(skip(self, v1_content, v2_content), fields(skill = %skill))]
    pub async fn referee(
        &self,
        skill: &str,
        v1_content: &str,
        v2_content: &str,
    ) -> Result<RefereeVerdict> {
        let set = self.load_set(skill).await?;
        obs::emit_referee_started(skill, set.questions.len());

        let (v1_score, v2_score) = tokio::join!(
            self.runner.run(&set, v1_content),
            self.runner.run(&set, v2_content),
        );

        let verdict =
            RefereeVerdict::compare(skill, v1_content, v2_content, v1_score, v2_score, Utc::now());
        obs::emit_verdict(
            skill,
            verdict.accuracy_delta,
            verdict.token_delta,
            verdict.improved,
        );
        Ok(verdict)
    }

    /// Standalone accuracy of a single prompt version.
    #[instrument(skip(self, content), fields(skill = %skill))]
    pub async fn score_skill(&self, skill: &str, content: &str) -> Result<SkillRunResult> {
        let set = self.load_set(skill).await?;
        Ok(self.runner.run(&set, content).await)
    }
}
