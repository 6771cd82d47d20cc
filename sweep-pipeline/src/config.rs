//! Environment-driven pipeline settings.

use std::env;
use sweep_core::DEFAULT_CHUNK_BYTES;

const DEFAULT_MODEL: &str = "gpt-4o";
const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";
const DEFAULT_CLONE_DIR: &str = "github_repos";
const DEFAULT_DB_PATH: &str = "sweep.db";
const DEFAULT_MAX_CONCURRENCY: usize = 4;

/// Runtime configuration, resolved once at startup.
#[derive(Clone, Debug)]
pub struct Settings {
    /// API key for the analysis engine. `None` disables analysis; the
    /// pipeline still clones and chunks.
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub github_api_url: String,
    /// Base directory repository clones land under.
    pub clone_base_dir: String,
    pub db_path: String,
    /// Upper bound on concurrent in-flight engine requests.
    pub max_concurrency: usize,
    pub chunk_bytes: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            openai_model: DEFAULT_MODEL.to_string(),
            github_api_url: DEFAULT_GITHUB_API_URL.to_string(),
            clone_base_dir: DEFAULT_CLONE_DIR.to_string(),
            db_path: DEFAULT_DB_PATH.to_string(),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            chunk_bytes: DEFAULT_CHUNK_BYTES,
        }
    }
}

impl Settings {
    /// Build settings from process environment, falling back to defaults
    /// for anything unset. Unparseable numeric values fall back silently.
    pub fn from_env() -> Self {
        let defaults = Settings::default();
        Self {
            openai_api_key: env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty()),
            openai_model: env_or("OPENAI_MODEL", defaults.openai_model),
            github_api_url: env_or("GITHUB_API_URL", defaults.github_api_url),
            clone_base_dir: env_or("SWEEP_CLONE_DIR", defaults.clone_base_dir),
            db_path: env_or("SWEEP_DB", defaults.db_path),
            max_concurrency: env_parse("SWEEP_MAX_CONCURRENCY", defaults.max_concurrency),
            chunk_bytes: env_parse("SWEEP_CHUNK_BYTES", defaults.chunk_bytes),
        }
    }
}

fn env_or(key: &str, default: String) -> String {
    env::var(key).ok().filter(|v| !v.is_empty()).unwrap_or(default)
}

fn env_parse(key: &str, default: usize) -> usize {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .filter(|&n: &usize| n > 0)
        .unwrap_or(default)
}
