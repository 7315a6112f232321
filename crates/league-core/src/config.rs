//! Runtime configuration.
//!
//! Values come from (lowest to highest precedence) built-in defaults, an
//! optional TOML file, and `LEAGUE_*` environment variables. The API key is
//! only ever read from `ANTHROPIC_API_KEY` and never serialised.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::{LeagueError, Result};
use crate::leak_guard::DEFAULT_LEAK_WINDOW;

/// Token budget for each validation question.
pub const RUN_MAX_TOKENS: u32 = 1024;

/// Prompt League settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeagueConfig {
    /// Model used for skill runs and rent inference.
    pub model: String,
    /// Model used by the `llm_judge` scorer.
    pub judge_model: String,
    pub run_max_tokens: u32,
    pub judge_max_tokens: u32,
    pub rent_max_tokens: u32,
    /// Per-call timeout; a timed-out question scores zero.
    pub inference_timeout_secs: u64,
    /// Word window for prompt leak detection.
    pub leak_window: usize,
    /// Questions in flight per run; 1 keeps runs strictly sequential.
    pub max_concurrent_questions: usize,
    pub skills_dir: PathBuf,
    pub data_dir: PathBuf,
    pub api_base: String,
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for LeagueConfig {
    fn default() -> Self {
        Self {
            model: "claude-sonnet-4-6".to_string(),
            judge_model: "claude-haiku-4-5-20251001".to_string(),
            run_max_tokens: RUN_MAX_TOKENS,
            judge_max_tokens: 200,
            rent_max_tokens: 2048,
            inference_timeout_secs: 60,
            leak_window: DEFAULT_LEAK_WINDOW,
            max_concurrent_questions: 1,
            skills_dir: PathBuf::from("skills"),
            data_dir: PathBuf::from(".league-data"),
            api_base: "https://api.anthropic.com".to_string(),
            api_key: None,
        }
    }
}

fn env_override<T: FromStr>(name: &str, target: &mut T) -> Result<()>
where
    T::Err: std::fmt::Display,
{
    if let Ok(raw) = std::env::var(name) {
        *target = raw
            .parse()
            .map_err(|e| LeagueError::InvalidConfig(format!("{name}={raw}: {e}")))?;
    }
    Ok(())
}

impl LeagueConfig {
    /// Defaults plus environment overrides.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Parse a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(raw).map_err(|e| LeagueError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML file, then apply environment overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            LeagueError::InvalidConfig(format!("read {}: {}", path.display(), e))
        })?;
        let mut config = Self::from_toml_str(&raw)?;
        config.apply_env()?;
        Ok(config)
    }

    /// Apply `LEAGUE_*` overrides and pick up `ANTHROPIC_API_KEY`.
    pub fn apply_env(&mut self) -> Result<()> {
        env_override("LEAGUE_MODEL", &mut self.model)?;
        env_override("LEAGUE_JUDGE_MODEL", &mut self.judge_model)?;
        env_override("LEAGUE_RUN_MAX_TOKENS", &mut self.run_max_tokens)?;
        env_override("LEAGUE_JUDGE_MAX_TOKENS", &mut self.judge_max_tokens)?;
        env_override("LEAGUE_RENT_MAX_TOKENS", &mut self.rent_max_tokens)?;
        env_override("LEAGUE_INFERENCE_TIMEOUT_SECS", &mut self.inference_timeout_secs)?;
        env_override("LEAGUE_LEAK_WINDOW", &mut self.leak_window)?;
        env_override(
            "LEAGUE_MAX_CONCURRENT_QUESTIONS",
            &mut self.max_concurrent_questions,
        )?;
        env_override("LEAGUE_SKILLS_DIR", &mut self.skills_dir)?;
        env_override("LEAGUE_DATA_DIR", &mut self.data_dir)?;
        env_override("LEAGUE_API_BASE", &mut self.api_base)?;
        if let Ok(key) = std::env::var("ANTHROPIC_API_KEY") {
            self.api_key = Some(key);
        }
        self.validate()
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.leak_window == 0 {
            return Err(LeagueError::InvalidConfig(
                "leak_window must be at least 1".to_string(),
            ));
        }
        if self.max_concurrent_questions == 0 {
            return Err(LeagueError::InvalidConfig(
                "max_concurrent_questions must be at least 1".to_string(),
            ));
        }
        if self.inference_timeout_secs == 0 {
            return Err(LeagueError::InvalidConfig(
                "inference_timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn inference_timeout(&self) -> Duration {
        Duration::from_secs(self.inference_timeout_secs)
    }
}
