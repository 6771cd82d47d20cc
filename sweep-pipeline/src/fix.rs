//! Remediation plan generation from a stored report.
//!
//! The report's findings are flattened into one prompt and handed to a
//! `PlanEngine`, which answers with free-form remediation text. A report
//! with nothing to fix produces no prompt and no plan.

use crate::analyzer::{AnalyzeError, OpenAiAnalyzer};
use crate::report::{Report, Severity};
use async_trait::async_trait;
use serde::Serialize;
use std::fmt::Write;

const FIX_SYSTEM_PROMPT: &str = "You are an expert in application security remediation. \
Generate a detailed, actionable fix plan based on the vulnerabilities provided.";

/// Produces a remediation plan from a findings prompt.
#[async_trait]
pub trait PlanEngine: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, AnalyzeError>;
}

#[async_trait]
impl PlanEngine for OpenAiAnalyzer {
    async fn generate(&self, prompt: &str) -> Result<String, AnalyzeError> {
        self.request_completion(FIX_SYSTEM_PROMPT, prompt).await
    }
}

/// Remediation plan for one repository's report.
#[derive(Clone, Debug, Serialize)]
pub struct FixPlan {
    pub repo_name: String,
    pub vulnerability_summary: String,
    pub plan: String,
}

/// Render a report into the remediation prompt.
///
/// Returns `None` when the report holds no vulnerabilities or no scan
/// results, since there is nothing for the engine to plan around.
pub fn build_fix_prompt(report: &Report) -> Option<String> {
    if report.total_vulnerabilities == 0 || report.scan_results.is_empty() {
        return None;
    }

    let mut prompt = String::new();
    let _ = writeln!(prompt, "Repository: {}", report.repo_name);
    let _ = writeln!(
        prompt,
        "Total vulnerabilities: {}",
        report.total_vulnerabilities
    );
    let _ = writeln!(prompt, "Severity breakdown:");
    for severity in Severity::ALL {
        let _ = writeln!(
            prompt,
            "  - {}: {}",
            severity,
            report.severity_counts.get(severity)
        );
    }
    prompt.push('\n');
    let _ = writeln!(prompt, "Detailed findings:");

    for (number, finding) in report.findings().enumerate() {
        let file = finding.file_path.as_deref().unwrap_or("unknown");
        let _ = writeln!(prompt, "{}. File: {}", number + 1, file);
        let _ = writeln!(prompt, "   Type: {}", finding.vulnerability_type);
        let _ = writeln!(prompt, "   Severity: {}", finding.severity);
        if finding.cwe_id.is_some() || finding.category.is_some() {
            let _ = writeln!(
                prompt,
                "   CWE: {} | Category: {}",
                finding.cwe_id.as_deref().unwrap_or("N/A"),
                finding.category.as_deref().unwrap_or("N/A")
            );
        }
        if let Some(start) = finding.start_line {
            let end = finding.end_line.unwrap_or(start);
            let _ = writeln!(prompt, "   Lines: {start} - {end}");
        }
        let _ = writeln!(prompt, "   Description: {}", finding.description);
        if let Some(snippet) = &finding.code_snippet {
            let _ = writeln!(prompt, "   Code Snippet:\n{snippet}");
        }
        if let Some(recommendation) = &finding.recommendation {
            let _ = writeln!(prompt, "   Recommendation: {recommendation}");
        }
        prompt.push('\n');
    }

    prompt.push_str(
        "Please act as a senior application security engineer.\n\
         Produce a prioritized remediation plan for the vulnerabilities above:\n\
         1. Order fixes by severity and exploitability.\n\
         2. Give concrete code-level changes for each finding.\n\
         3. Group findings that share a root cause.\n\
         4. Include tests or validation steps that prove each fix.\n\
         5. Call out any credentials or secrets that must be rotated.\n",
    );

    Some(prompt)
}

/// Generate a remediation plan for the report, if it has anything to fix.
pub async fn generate_fix_plan(
    report: &Report,
    engine: &dyn PlanEngine,
) -> Result<Option<FixPlan>, AnalyzeError> {
    let Some(prompt) = build_fix_prompt(report) else {
        return Ok(None);
    };

    let plan = engine.generate(&prompt).await?;
    let counts = &report.severity_counts;
    let vulnerability_summary = format!(
        "{} vulnerabilities ({} critical, {} high, {} medium, {} low, {} info)",
        report.total_vulnerabilities,
        counts.critical,
        counts.high,
        counts.medium,
        counts.low,
        counts.info
    );

    Ok(Some(FixPlan {
        repo_name: report.repo_name.clone(),
        vulnerability_summary,
        plan,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{aggregate_report, Finding, RunKey, ScanResult};

    fn key() -> RunKey {
        RunKey {
            repo_id: "1".to_string(),
            user_id: "alice".to_string(),
            github_id: "gh".to_string(),
        }
    }

    fn report_with_findings() -> Report {
        let results = vec![ScanResult::completed(
            1,
            "src/db.py".to_string(),
            vec![
                Finding {
                    vulnerability_type: "SQL injection".to_string(),
                    severity: Severity::Critical,
                    description: "unsanitized query".to_string(),
                    file_path: Some("src/db.py".to_string()),
                    start_line: Some(10),
                    end_line: Some(12),
                    code_snippet: Some("cur.execute(q)".to_string()),
                    cwe_id: Some("CWE-89".to_string()),
                    category: Some("A03".to_string()),
                    recommendation: Some("use parameterized queries".to_string()),
                },
                Finding {
                    vulnerability_type: "hardcoded secret".to_string(),
                    severity: Severity::High,
                    description: "api key in source".to_string(),
                    ..Finding::default()
                },
            ],
        )];
        aggregate_report(key(), "acme/demo", &results)
    }

    struct StubEngine;

    #[async_trait]
    impl PlanEngine for StubEngine {
        async fn generate(&self, prompt: &str) -> Result<String, AnalyzeError> {
            assert!(prompt.contains("Detailed findings:"));
            Ok("1. Parameterize the query.".to_string())
        }
    }

    #[test]
    fn test_prompt_lists_findings_and_instructions() {
        let prompt = build_fix_prompt(&report_with_findings()).unwrap();

        assert!(prompt.starts_with("Repository: acme/demo\n"));
        assert!(prompt.contains("Total vulnerabilities: 2"));
        assert!(prompt.contains("  - Critical: 1"));
        assert!(prompt.contains("  - High: 1"));
        assert!(prompt.contains("1. File: src/db.py"));
        assert!(prompt.contains("   CWE: CWE-89 | Category: A03"));
        assert!(prompt.contains("   Lines: 10 - 12"));
        assert!(prompt.contains("   Code Snippet:\ncur.execute(q)"));
        assert!(prompt.contains("   Recommendation: use parameterized queries"));
        assert!(prompt.contains("2. File: unknown"));
        assert!(prompt.contains("senior application security engineer"));
    }

    #[test]
    fn test_no_prompt_for_clean_report() {
        let report = aggregate_report(key(), "acme/demo", &[]);
        assert!(build_fix_prompt(&report).is_none());

        let clean = vec![ScanResult::completed(1, "a.py".to_string(), Vec::new())];
        let report = aggregate_report(key(), "acme/demo", &clean);
        assert!(build_fix_prompt(&report).is_none());
    }

    #[tokio::test]
    async fn test_generate_fix_plan() {
        let plan = generate_fix_plan(&report_with_findings(), &StubEngine)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(plan.repo_name, "acme/demo");
        assert!(plan.vulnerability_summary.starts_with("2 vulnerabilities"));
        assert!(plan.vulnerability_summary.contains("1 critical"));
        assert!(plan.plan.contains("Parameterize"));
    }

    #[tokio::test]
    async fn test_generate_skips_clean_report() {
        let report = aggregate_report(key(), "acme/demo", &[]);
        let plan = generate_fix_plan(&report, &StubEngine).await.unwrap();
        assert!(plan.is_none());
    }
}
