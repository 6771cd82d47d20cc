//! `sweep repos` subcommand.

use anyhow::Context;
use colored::Colorize;
use sweep_pipeline::{GithubClient, Settings};

pub async fn run(token: Option<String>) -> anyhow::Result<()> {
    let settings = Settings::from_env();
    let client = GithubClient::new(settings.github_api_url, token);

    let repos = client.list_repos().await.context("listing repositories")?;

    if repos.is_empty() {
        println!("no repositories found");
        return Ok(());
    }

    for repo in repos {
        let visibility = if repo.private {
            "private".yellow()
        } else {
            "public".green()
        };
        println!(
            "{:>10}  {}  [{}]  {}",
            repo.id,
            repo.full_name.bold(),
            visibility,
            repo.description.as_deref().unwrap_or("").dimmed()
        );
    }
    Ok(())
}
