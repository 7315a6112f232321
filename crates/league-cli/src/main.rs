//! Prompt League CLI
//!
//! The `league` command scores prompt versions (skills) against their
//! validation sets and settles bounty submissions.
//!
//! ## Commands
//!
//! - `score`: Standalone accuracy of one prompt version
//! - `referee`: Compare an incumbent and a challenger version
//! - `rent`: Blind inference against a hidden skill prompt
//! - `leak-check`: Scan a response for verbatim prompt fragments
//! - `bounty`: Create or list bounties
//! - `submit`: Referee a challenger against a bounty and settle it
//! - `leaderboard`: Optimizer earnings ranking

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{debug, Level};

use league_core::metrics::METRICS;
use league_core::reporting::{render_verdict_md, write_verdict_json};
use league_core::{
    detect_prompt_leakage, leaderboard, sanitize_response_with_window, AnthropicProvider,
    BlindInference, InferenceProvider, LeagueConfig, LeagueSettlement, Referee, SkillRunResult,
};
use league_state::{
    BountyRegistry, BountyStatus, FsValidationSets, JsonFileLeagueStore, NewBounty,
    SubmissionLedger,
};

#[derive(Parser)]
#[command(name = "league")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Prompt League: referee, rent and settle prompt versions", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// TOML config file (defaults plus LEAGUE_* env vars when omitted)
    #[arg(long, global = true, env = "LEAGUE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score one prompt version against the skill's validation set
    Score {
        /// Skill identifier (directory name under the skills root)
        #[arg(long)]
        skill: String,

        /// Prompt file to score
        #[arg(long)]
        prompt: PathBuf,
    },

    /// Compare incumbent (v1) and challenger (v2) prompt versions
    Referee {
        #[arg(long)]
        skill: String,

        /// Incumbent prompt file
        #[arg(long)]
        v1: PathBuf,

        /// Challenger prompt file
        #[arg(long)]
        v2: PathBuf,

        /// Write the full verdict as JSON to this path
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Print a markdown summary instead of JSON
        #[arg(long)]
        markdown: bool,
    },

    /// Run a hidden skill prompt against a user prompt
    Rent {
        /// File holding the hidden system prompt
        #[arg(long)]
        skill_file: PathBuf,

        /// User prompt
        #[arg(long)]
        prompt: String,
    },

    /// Check a response for verbatim fragments of a system prompt
    LeakCheck {
        /// System prompt file
        #[arg(long)]
        system: PathBuf,

        /// Response file
        #[arg(long)]
        response: PathBuf,

        /// Word window (defaults to config `leak_window`)
        #[arg(long)]
        window: Option<usize>,
    },

    /// Manage bounties
    Bounty {
        #[command(subcommand)]
        action: BountyAction,
    },

    /// Submit a challenger version against a bounty
    Submit {
        #[arg(long)]
        bounty: String,

        /// Optimizer wallet credited with any payout
        #[arg(long)]
        wallet: String,

        /// Challenger prompt file
        #[arg(long)]
        v2: PathBuf,

        /// Currently deployed prompt file for the bounty's skill
        #[arg(long)]
        incumbent: PathBuf,
    },

    /// Rank optimizers by total earnings
    Leaderboard,
}

#[derive(Subcommand)]
enum BountyAction {
    /// Create a bounty for a skill
    Create {
        #[arg(long)]
        skill: String,

        #[arg(long)]
        wallet: String,

        /// Reward per accuracy point gained
        #[arg(long)]
        reward_per_accuracy_pct: f64,

        /// Reward per percent of tokens saved
        #[arg(long, default_value = "0")]
        reward_per_token_reduction_pct: f64,

        #[arg(long)]
        max_pool: f64,

        #[arg(long, default_value = "30")]
        expires_in_days: i64,
    },

    /// List bounties
    List {
        /// Only show active bounties
        #[arg(long)]
        active: bool,
    },
}

fn load_config(path: Option<&Path>) -> Result<LeagueConfig> {
    let config = match path {
        Some(path) => LeagueConfig::load(path)?,
        None => LeagueConfig::from_env()?,
    };
    debug!(model = %config.model, skills_dir = ?config.skills_dir, "config loaded");
    Ok(config)
}

fn read_text(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn provider(config: &LeagueConfig) -> Result<Arc<dyn InferenceProvider>> {
    let provider =
        AnthropicProvider::from_config(config).context("Failed to build inference client")?;
    Ok(Arc::new(provider))
}

fn require_credentials(provider: &dyn InferenceProvider) -> Result<()> {
    if !provider.is_configured() {
        bail!("ANTHROPIC_API_KEY is not set; inference commands need it");
    }
    Ok(())
}

fn referee(config: &LeagueConfig, provider: Arc<dyn InferenceProvider>) -> Referee {
    let loader = Arc::new(FsValidationSets::from_skills_dir(&config.skills_dir));
    Referee::from_config(loader, provider, config)
}

fn store(config: &LeagueConfig) -> Result<Arc<JsonFileLeagueStore>> {
    let store = JsonFileLeagueStore::open(&config.data_dir)
        .with_context(|| format!("open league data dir {}", config.data_dir.display()))?;
    Ok(Arc::new(store))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    league_core::init_tracing(cli.json, level);

    let config = load_config(cli.config.as_deref())?;

    let result = match cli.command {
        Commands::Score { skill, prompt } => cmd_score(&config, &skill, &prompt).await,
        Commands::Referee {
            skill,
            v1,
            v2,
            out,
            markdown,
        } => cmd_referee(&config, &skill, &v1, &v2, out.as_deref(), markdown).await,
        Commands::Rent { skill_file, prompt } => cmd_rent(&config, &skill_file, &prompt).await,
        Commands::LeakCheck {
            system,
            response,
            window,
        } => cmd_leak_check(&system, &response, window.unwrap_or(config.leak_window)),
        Commands::Bounty { action } => cmd_bounty(&config, action).await,
        Commands::Submit {
            bounty,
            wallet,
            v2,
            incumbent,
        } => cmd_submit(&config, &bounty, &wallet, &v2, &incumbent).await,
        Commands::Leaderboard => cmd_leaderboard(&config).await,
    };

    METRICS.flush();
    result
}

fn print_run_summary(skill: &str, run: &SkillRunResult) {
    println!(
        "{}: {:.2}% ({:.2}/{:.2}), {} tokens, {} failed",
        skill,
        run.accuracy_pct,
        run.total_score,
        run.max_score,
        run.total_tokens,
        run.failed_questions()
    );
}

async fn cmd_score(config: &LeagueConfig, skill: &str, prompt: &Path) -> Result<()> {
    let content = read_text(prompt)?;
    let provider = provider(config)?;
    require_credentials(provider.as_ref())?;

    let run = referee(config, provider)
        .score_skill(skill, &content)
        .await
        .with_context(|| format!("score skill '{}'", skill))?;
    print_run_summary(skill, &run);
    Ok(())
}

async fn cmd_referee(
    config: &LeagueConfig,
    skill: &str,
    v1: &Path,
    v2: &Path,
    out: Option<&Path>,
    markdown: bool,
) -> Result<()> {
    let v1_content = read_text(v1)?;
    let v2_content = read_text(v2)?;
    let provider = provider(config)?;
    require_credentials(provider.as_ref())?;

    let verdict = referee(config, provider)
        .referee(skill, &v1_content, &v2_content)
        .await
        .with_context(|| format!("referee skill '{}'", skill))?;

    if let Some(path) = out {
        write_verdict_json(path, &verdict)?;
        println!("Verdict written to {}", path.display());
    }
    if markdown {
        print!("{}", render_verdict_md(&verdict));
    } else if out.is_none() {
        print_json(&verdict)?;
    } else {
        println!(
            "{} (accuracy {:+.2}, tokens {:+})",
            if verdict.improved { "IMPROVED" } else { "NOT IMPROVED" },
            verdict.accuracy_delta,
            verdict.token_delta
        );
    }
    Ok(())
}

async fn cmd_rent(config: &LeagueConfig, skill_file: &Path, prompt: &str) -> Result<()> {
    let skill_content = read_text(skill_file)?;
    let provider = provider(config)?;
    let outcome = BlindInference::from_config(provider, config)
        .rent(&skill_content, prompt)
        .await
        .context("rent inference failed")?;
    print_json(&outcome)
}

#[derive(Serialize)]
struct LeakCheckReport {
    leaked: bool,
    window: usize,
    fragments: Vec<String>,
    replacements: usize,
    sanitized: String,
}

fn cmd_leak_check(system: &Path, response: &Path, window: usize) -> Result<()> {
    if window == 0 {
        bail!("--window must be at least 1");
    }
    let system_prompt = read_text(system)?;
    let response = read_text(response)?;

    let report = detect_prompt_leakage(&system_prompt, &response, window);
    let sanitized = sanitize_response_with_window(&system_prompt, &response, window);
    print_json(&LeakCheckReport {
        leaked: report.leaked,
        window,
        fragments: report.fragments,
        replacements: sanitized.replacements,
        sanitized: sanitized.text,
    })
}

async fn cmd_bounty(config: &LeagueConfig, action: BountyAction) -> Result<()> {
    let store = store(config)?;
    match action {
        BountyAction::Create {
            skill,
            wallet,
            reward_per_accuracy_pct,
            reward_per_token_reduction_pct,
            max_pool,
            expires_in_days,
        } => {
            if max_pool <= 0.0 || expires_in_days <= 0 {
                bail!("max pool and expiry must both be positive");
            }
            let bounty = store
                .create_bounty(NewBounty {
                    skill_slug: skill,
                    creator_wallet: wallet,
                    reward_per_accuracy_pct,
                    reward_per_token_reduction_pct,
                    max_pool,
                    expires_in_days,
                })
                .await
                .context("create bounty")?;
            print_json(&bounty)
        }
        BountyAction::List { active } => {
            let bounties: Vec<_> = store
                .list_bounties()
                .await?
                .into_iter()
                .filter(|b| !active || b.status == BountyStatus::Active)
                .collect();
            if bounties.is_empty() {
                println!("No bounties found.");
                return Ok(());
            }
            for b in &bounties {
                println!(
                    "{}  {:<20} {:>9.2}/{:<9.2} {:<8} expires {}",
                    b.id,
                    b.skill_slug,
                    b.pool_remaining,
                    b.max_pool,
                    b.status.to_string(),
                    b.expires_at.format("%Y-%m-%d")
                );
            }
            Ok(())
        }
    }
}

async fn cmd_submit(
    config: &LeagueConfig,
    bounty_id: &str,
    wallet: &str,
    v2: &Path,
    incumbent: &Path,
) -> Result<()> {
    let v2_content = read_text(v2)?;
    let incumbent_content = read_text(incumbent)?;
    let store = store(config)?;
    let provider = provider(config)?;

    let settlement = LeagueSettlement::new(store.clone(), store, referee(config, provider));
    let receipt = settlement
        .submit(bounty_id, wallet, &v2_content, &incumbent_content)
        .await
        .with_context(|| format!("submit to bounty {}", bounty_id))?;

    if receipt.verdict.is_none() {
        println!(
            "Submission {} recorded as pending; evaluation requires ANTHROPIC_API_KEY.",
            receipt.submission.id
        );
        return Ok(());
    }
    print_json(&receipt)
}

async fn cmd_leaderboard(config: &LeagueConfig) -> Result<()> {
    let submissions = store(config)?.list_submissions().await?;
    let board = leaderboard(&submissions);
    if board.is_empty() {
        println!("No submissions yet.");
        return Ok(());
    }
    println!("{:<4} {:<44} {:>10} {:>9} {:>10}", "#", "wallet", "earnings", "accepted", "best Δacc");
    for (rank, entry) in board.iter().enumerate() {
        println!(
            "{:<4} {:<44} {:>10.2} {:>4}/{:<4} {:>10.2}",
            rank + 1,
            entry.wallet,
            entry.total_earnings,
            entry.submissions_accepted,
            entry.submissions_total,
            entry.best_accuracy_delta
        );
    }
    Ok(())
}
