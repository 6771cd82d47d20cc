//! `sweep fix` subcommand.

use anyhow::{bail, Context};
use colored::Colorize;
use std::path::Path;
use sweep_pipeline::{
    generate_fix_plan, DuckStore, OpenAiAnalyzer, ReportStore, RunKey, Settings,
};

pub async fn run(
    repo_id: String,
    user_id: String,
    github_id: String,
    json: bool,
) -> anyhow::Result<()> {
    let settings = Settings::from_env();
    let Some(api_key) = settings.openai_api_key.clone() else {
        bail!("OPENAI_API_KEY must be set to generate a fix plan");
    };

    let store = DuckStore::open(Path::new(&settings.db_path))
        .with_context(|| format!("opening report store at {}", settings.db_path))?;

    let key = RunKey {
        repo_id,
        user_id,
        github_id,
    };
    let Some(report) = store.get_report(&key)? else {
        bail!(
            "no report stored for repo '{}' (user '{}', github '{}')",
            key.repo_id,
            key.user_id,
            key.github_id
        );
    };

    let engine = OpenAiAnalyzer::new(api_key, settings.openai_model.clone());
    let Some(plan) = generate_fix_plan(&report, &engine)
        .await
        .context("generating fix plan")?
    else {
        println!("report for '{}' has no vulnerabilities to fix", report.repo_name);
        return Ok(());
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    println!("{} {}", "fix plan for".green().bold(), plan.repo_name.bold());
    println!("{}", plan.vulnerability_summary.dimmed());
    println!();
    println!("{}", plan.plan);
    Ok(())
}
