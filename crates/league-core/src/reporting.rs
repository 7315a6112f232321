use std::path::Path;

use anyhow::{Context, Result};

use crate::domain::{QuestionOutcome, RefereeVerdict, SkillRunResult};

/// Write a verdict as pretty JSON.
pub fn write_verdict_json(path: &Path, verdict: &RefereeVerdict) -> Result<()> {
    let content = serde_json::to_string_pretty(verdict).context("serialize verdict")?;
    std::fs::write(path, content).with_context(|| format!("write {:?}", path))?;
    Ok(())
}

fn push_run_table(out: &mut String, label: &str, run: &SkillRunResult) {
    out.push_str(&format!(
        "## {label}\n- accuracy: {:.2}% ({:.2} / {:.2})\n- tokens: {}\n- failed questions: {}\n\n",
        run.accuracy_pct,
        run.total_score,
        run.max_score,
        run.total_tokens,
        run.failed_questions()
    ));
    if run.question_results.is_empty() {
        return;
    }

    out.push_str("| # | match | score | tokens | note |\n|---|---|---|---|---|\n");
    for (i, q) in run.question_results.iter().enumerate() {
        let note = match &q.outcome {
            QuestionOutcome::Scored {
                judge_fallback: true,
                ..
            } => "judge fallback".to_string(),
            QuestionOutcome::Scored { .. } => String::new(),
            QuestionOutcome::Failed { reason } => format!("failed: {}", reason.replace('|', "/")),
        };
        out.push_str(&format!(
            "| {} | {} | {:.2} / {:.2} | {} | {} |\n",
            i + 1,
            q.match_type,
            q.score,
            q.max_score,
            q.tokens_used,
            note
        ));
    }
    out.push('\n');
}

/// Markdown summary of a verdict for review comments and terminals.
pub fn render_verdict_md(verdict: &RefereeVerdict) -> String {
    let mut out = String::new();
    out.push_str(&format!("# Referee Verdict: {}\n\n", verdict.skill_slug));
    out.push_str(&format!(
        "- result: **{}**\n- accuracy delta: {:+.2} pts\n- token delta: {:+} (positive = challenger cheaper)\n- v1: `{}`\n- v2: `{}`\n- at: {}\n\n",
        if verdict.improved { "IMPROVED" } else { "NOT IMPROVED" },
        verdict.accuracy_delta,
        verdict.token_delta,
        verdict.v1_digest.short(),
        verdict.v2_digest.short(),
        verdict.timestamp.to_rfc3339()
    ));
    push_run_table(&mut out, "Incumbent (v1)", &verdict.v1_score);
    push_run_table(&mut out, "Challenger (v2)", &verdict.v2_score);
    out
}
