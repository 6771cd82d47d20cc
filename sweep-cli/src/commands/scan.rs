//! `sweep scan` subcommand.

use anyhow::{bail, Context};
use colored::Colorize;
use std::path::Path;
use std::sync::Arc;
use sweep_pipeline::{
    ChunkAnalyzer, DuckStore, GithubClient, OpenAiAnalyzer, Pipeline, ReportStore, RunKey, Settings,
};
use tracing::{info, warn};

pub async fn run(
    repo: String,
    repo_id: Option<String>,
    user_id: String,
    github_id: String,
    token: Option<String>,
    json: bool,
) -> anyhow::Result<()> {
    let settings = Settings::from_env();
    let repo_id = repo_id.unwrap_or_else(|| repo.clone());

    // A bare numeric argument is a GitHub repository id, not an owner/repo
    // name, and has to be resolved through the API before cloning.
    let repo = if repo.chars().all(|c| c.is_ascii_digit()) && !repo.is_empty() {
        let client = GithubClient::new(settings.github_api_url.clone(), token.clone());
        let info = client
            .get_repo(&repo)
            .await
            .with_context(|| format!("resolving repository id {repo}"))?;
        info!("resolved repository id {} to {}", repo, info.full_name);
        info.full_name
    } else {
        repo
    };

    let analyzer: Option<Arc<dyn ChunkAnalyzer>> = match &settings.openai_api_key {
        Some(key) => Some(Arc::new(OpenAiAnalyzer::new(
            key.clone(),
            settings.openai_model.clone(),
        ))),
        None => {
            warn!("OPENAI_API_KEY not set, scanning without analysis");
            None
        }
    };

    let store = Arc::new(
        DuckStore::open(Path::new(&settings.db_path))
            .with_context(|| format!("opening report store at {}", settings.db_path))?,
    ) as Arc<dyn ReportStore>;

    let key = RunKey {
        repo_id,
        user_id,
        github_id,
    };

    let pipeline = Pipeline::new(settings, store, analyzer);
    let result = pipeline.run(&repo, key, token.as_deref()).await;

    if !result.success {
        bail!("{}", result.message);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&result.report)?);
        return Ok(());
    }

    println!(
        "{} {} ({} chunks)",
        "scanned".green().bold(),
        repo,
        result.total_chunks
    );
    match &result.report {
        Some(report) => super::print_report_summary(report),
        None => println!("no analysis performed"),
    }
    Ok(())
}
