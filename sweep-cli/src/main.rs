//! `sweep` command-line entry point.

mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "sweep",
    about = "Scan repositories for security vulnerabilities",
    version
)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Silence all logs
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Clone a repository, analyze it and store the report
    Scan {
        /// Repository in owner/repo form
        repo: String,

        /// Repository identifier used as the report key
        #[arg(long)]
        repo_id: Option<String>,

        /// User the scan is attributed to
        #[arg(long, default_value = "local")]
        user_id: String,

        /// GitHub account identifier
        #[arg(long, default_value = "local")]
        github_id: String,

        /// GitHub access token for private repositories
        #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
        token: Option<String>,

        /// Emit the report as JSON instead of a summary
        #[arg(long)]
        json: bool,
    },

    /// List repositories visible to the configured GitHub token
    Repos {
        #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
        token: Option<String>,
    },

    /// Show a previously stored report
    Report {
        #[arg(long)]
        repo_id: String,

        #[arg(long, default_value = "local")]
        user_id: String,

        #[arg(long, default_value = "local")]
        github_id: String,

        #[arg(long)]
        json: bool,
    },

    /// Generate a remediation plan for a stored report
    Fix {
        #[arg(long)]
        repo_id: String,

        #[arg(long, default_value = "local")]
        user_id: String,

        #[arg(long, default_value = "local")]
        github_id: String,

        #[arg(long)]
        json: bool,
    },
}

fn init_logging(verbose: u8, quiet: bool) {
    let default_level = if quiet {
        "off"
    } else {
        match verbose {
            0 => "warn",
            1 => "debug",
            _ => "trace",
        }
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Scan {
            repo,
            repo_id,
            user_id,
            github_id,
            token,
            json,
        } => commands::scan::run(repo, repo_id, user_id, github_id, token, json).await,
        Commands::Repos { token } => commands::repos::run(token).await,
        Commands::Report {
            repo_id,
            user_id,
            github_id,
            json,
        } => commands::report::run(repo_id, user_id, github_id, json),
        Commands::Fix {
            repo_id,
            user_id,
            github_id,
            json,
        } => commands::fix::run(repo_id, user_id, github_id, json).await,
    }
}
