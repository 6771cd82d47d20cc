//! Findings, scan results and report aggregation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Severity of a single finding, ordered from most to least severe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum Severity {
    #[serde(alias = "critical", alias = "CRITICAL")]
    Critical,
    #[serde(alias = "high", alias = "HIGH")]
    High,
    #[serde(alias = "medium", alias = "MEDIUM")]
    Medium,
    #[serde(alias = "low", alias = "LOW")]
    Low,
    #[serde(alias = "info", alias = "INFO", alias = "informational")]
    Info,
}

impl Severity {
    pub const ALL: [Severity; 5] = [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
        Severity::Info,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "Critical",
            Severity::High => "High",
            Severity::Medium => "Medium",
            Severity::Low => "Low",
            Severity::Info => "Info",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One vulnerability reported by the analysis engine for a chunk.
///
/// Engine output is lenient by design: everything except the severity is
/// optional or defaulted, and common alternative key names are accepted as
/// aliases.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    #[serde(default, alias = "title")]
    pub vulnerability_type: String,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default)]
    pub description: String,
    /// Path of the file the finding belongs to, as cited by the engine.
    #[serde(default)]
    pub file_path: Option<String>,
    #[serde(default, alias = "line_number")]
    pub start_line: Option<u32>,
    #[serde(default)]
    pub end_line: Option<u32>,
    #[serde(default)]
    pub code_snippet: Option<String>,
    #[serde(default)]
    pub cwe_id: Option<String>,
    #[serde(default, alias = "owasp_category")]
    pub category: Option<String>,
    #[serde(default)]
    pub recommendation: Option<String>,
}

impl Default for Severity {
    fn default() -> Self {
        Severity::Info
    }
}

/// Terminal state of one chunk's analysis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    Completed,
    Error,
}

/// Outcome of analyzing a single chunk.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    pub chunk_index: u32,
    pub file_path: String,
    pub findings: Vec<Finding>,
    pub status: ScanStatus,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl ScanResult {
    pub fn completed(chunk_index: u32, file_path: String, findings: Vec<Finding>) -> Self {
        Self {
            chunk_index,
            file_path,
            findings,
            status: ScanStatus::Completed,
            error_message: None,
        }
    }

    pub fn errored(chunk_index: u32, file_path: String, message: String) -> Self {
        Self {
            chunk_index,
            file_path,
            findings: Vec::new(),
            status: ScanStatus::Error,
            error_message: Some(message),
        }
    }
}

/// Identity of a scanned repository for one user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunKey {
    pub repo_id: String,
    pub user_id: String,
    pub github_id: String,
}

/// Finding totals broken down by severity. Always fully populated; a
/// severity with no findings reads zero.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub info: usize,
}

impl SeverityCounts {
    pub fn record(&mut self, severity: Severity) {
        match severity {
            Severity::Critical => self.critical += 1,
            Severity::High => self.high += 1,
            Severity::Medium => self.medium += 1,
            Severity::Low => self.low += 1,
            Severity::Info => self.info += 1,
        }
    }

    pub fn get(&self, severity: Severity) -> usize {
        match severity {
            Severity::Critical => self.critical,
            Severity::High => self.high,
            Severity::Medium => self.medium,
            Severity::Low => self.low,
            Severity::Info => self.info,
        }
    }

    pub fn total(&self) -> usize {
        self.critical + self.high + self.medium + self.low + self.info
    }
}

/// Aggregated report for one repository scan.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Report {
    pub key: RunKey,
    pub repo_name: String,
    pub total_vulnerabilities: usize,
    pub severity_counts: SeverityCounts,
    /// One result per chunk, in chunk order.
    pub scan_results: Vec<ScanResult>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Report {
    /// All findings across chunks, in chunk order.
    pub fn findings(&self) -> impl Iterator<Item = &Finding> {
        self.scan_results.iter().flat_map(|r| r.findings.iter())
    }

    pub fn completed_chunks(&self) -> usize {
        self.scan_results
            .iter()
            .filter(|r| r.status == ScanStatus::Completed)
            .count()
    }

    pub fn error_chunks(&self) -> usize {
        self.scan_results.len() - self.completed_chunks()
    }
}

/// Fold per-chunk scan results into a single report.
///
/// Counts are derived from findings on completed results, so
/// `severity_counts.total() == total_vulnerabilities` always holds. The
/// fold itself is pure; only the timestamps vary between calls, and the
/// store preserves `created_at` across upserts.
pub fn aggregate_report(key: RunKey, repo_name: &str, results: &[ScanResult]) -> Report {
    let mut counts = SeverityCounts::default();
    for result in results {
        if result.status == ScanStatus::Completed {
            for finding in &result.findings {
                counts.record(finding.severity);
            }
        }
    }

    let now = Utc::now();
    Report {
        key,
        repo_name: repo_name.to_string(),
        total_vulnerabilities: counts.total(),
        severity_counts: counts,
        scan_results: results.to_vec(),
        created_at: now,
        updated_at: now,
    }
}
