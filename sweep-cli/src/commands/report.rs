//! `sweep report` subcommand.

use anyhow::{bail, Context};
use std::path::Path;
use sweep_pipeline::{DuckStore, ReportStore, RunKey, Settings};

pub fn run(repo_id: String, user_id: String, github_id: String, json: bool) -> anyhow::Result<()> {
    let settings = Settings::from_env();
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

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        super::print_report_summary(&report);
    }
    Ok(())
}
