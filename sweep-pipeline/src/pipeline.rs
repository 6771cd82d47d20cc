//! End-to-end scan orchestration.
//!
//! A run clones (or reuses) the repository, extracts and chunks sources,
//! records the run, dispatches chunks to the analyzer and persists the
//! aggregated report. The clone directory is removed when the run finishes,
//! successful or not.

use crate::analyzer::ChunkAnalyzer;
use crate::config::Settings;
use crate::dispatcher::dispatch;
use crate::github;
use crate::report::{aggregate_report, Report, RunKey};
use crate::store::ReportStore;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use sweep_core::{chunk_source, extract_sources, CodeChunk, FilterConfig};
use tracing::{info, warn};

/// Outcome of one pipeline run.
#[derive(Clone, Debug)]
pub struct PipelineRunResult {
    pub success: bool,
    pub message: String,
    pub repo_path: Option<PathBuf>,
    pub total_chunks: usize,
    pub chunks: Vec<CodeChunk>,
    pub report: Option<Report>,
}

impl PipelineRunResult {
    fn failure(message: String) -> Self {
        Self {
            success: false,
            message,
            repo_path: None,
            total_chunks: 0,
            chunks: Vec::new(),
            report: None,
        }
    }
}

/// Removes the clone directory on drop, even when a run errors midway.
struct ScratchDir(PathBuf);

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if let Err(err) = std::fs::remove_dir_all(&self.0) {
            warn!("failed to clean up {}: {}", self.0.display(), err);
        }
    }
}

/// The scan pipeline. Holds the collaborators a run needs; cheap to reuse
/// across runs.
pub struct Pipeline {
    settings: Settings,
    store: Arc<dyn ReportStore>,
    analyzer: Option<Arc<dyn ChunkAnalyzer>>,
    filter: FilterConfig,
}

impl Pipeline {
    pub fn new(
        settings: Settings,
        store: Arc<dyn ReportStore>,
        analyzer: Option<Arc<dyn ChunkAnalyzer>>,
    ) -> Self {
        Self {
            settings,
            store,
            analyzer,
            filter: FilterConfig::default(),
        }
    }

    /// Run the full pipeline for `owner/repo`.
    ///
    /// The clone lands under `clone_base_dir` named after the repository and
    /// is deleted when the run finishes. A directory already at that path is
    /// reused for the scan but deleted with everything else afterwards.
    pub async fn run(
        &self,
        repo_name: &str,
        key: RunKey,
        token: Option<&str>,
    ) -> PipelineRunResult {
        let dir_name = repo_name.rsplit('/').next().unwrap_or(repo_name);
        let dest = Path::new(&self.settings.clone_base_dir).join(dir_name);

        if let Err(err) = github::clone_repository(repo_name, &dest, token).await {
            return PipelineRunResult::failure(format!("clone failed: {err}"));
        }
        let _scratch = ScratchDir(dest.clone());

        self.process(repo_name, key, &dest).await
    }

    async fn process(&self, repo_name: &str, key: RunKey, repo_path: &Path) -> PipelineRunResult {
        let files = match extract_sources(repo_path, &self.filter) {
            Ok(files) => files,
            Err(err) => return PipelineRunResult::failure(format!("extraction failed: {err}")),
        };
        info!("extracted {} source files from {}", files.len(), repo_name);

        let mut chunks = Vec::new();
        for file in &files {
            chunks.extend(chunk_source(
                &file.relative_path,
                &file.content,
                self.settings.chunk_bytes,
            ));
        }
        info!("built {} chunks", chunks.len());

        let repo_path_str = repo_path.to_string_lossy();
        if let Err(err) = self
            .store
            .upsert_run(&key, repo_name, &repo_path_str, &chunks)
        {
            warn!("failed to record run: {}", err);
        }

        let report = match (&self.analyzer, chunks.is_empty()) {
            (Some(analyzer), false) => {
                let results =
                    dispatch(&chunks, analyzer.as_ref(), self.settings.max_concurrency).await;
                let report = aggregate_report(key, repo_name, &results);
                if let Err(err) = self.store.upsert_report(&report) {
                    warn!("failed to persist report: {}", err);
                }
                Some(report)
            }
            (Some(_), true) => {
                info!("no analyzable chunks in {}", repo_name);
                None
            }
            (None, _) => {
                warn!("no analyzer configured, skipping analysis for {}", repo_name);
                None
            }
        };

        PipelineRunResult {
            success: true,
            message: format!("scanned {repo_name}"),
            repo_path: Some(repo_path.to_path_buf()),
            total_chunks: chunks.len(),
            chunks,
            report,
        }
    }
}
