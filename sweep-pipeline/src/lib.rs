//! Scan pipeline for repository vulnerability analysis.
//!
//! Clones a repository, extracts and chunks its sources with `sweep-core`,
//! fans the chunks out to an analysis engine with bounded concurrency,
//! aggregates findings into a report and persists runs and reports in
//! DuckDB. Stored reports can be turned into remediation plans.

pub mod analyzer;
pub mod config;
pub mod dispatcher;
pub mod fix;
pub mod github;
pub mod pipeline;
pub mod report;
pub mod store;

pub use analyzer::{AnalyzeError, ChunkAnalyzer, EngineOutput, OpenAiAnalyzer};
pub use config::Settings;
pub use dispatcher::dispatch;
pub use fix::{build_fix_prompt, generate_fix_plan, FixPlan, PlanEngine};
pub use github::{CloneError, GithubClient, GithubError, RepoInfo};
pub use pipeline::{Pipeline, PipelineRunResult};
pub use report::{
    aggregate_report, Finding, Report, RunKey, ScanResult, ScanStatus, Severity, SeverityCounts,
};
pub use store::{DuckStore, ReportStore, StoreError};
