//! Subcommand implementations.

pub mod fix;
pub mod repos;
pub mod report;
pub mod scan;

use colored::Colorize;
use sweep_pipeline::{Report, ScanStatus, Severity};

/// Print the human-readable summary of a report.
pub fn print_report_summary(report: &Report) {
    println!();
    println!("{} {}", "Scan report for".bold(), report.repo_name.bold());
    println!(
        "  chunks: {} completed, {} failed of {}",
        report.completed_chunks(),
        report.error_chunks(),
        report.scan_results.len()
    );
    println!("  findings: {}", report.total_vulnerabilities);
    for severity in Severity::ALL {
        let count = report.severity_counts.get(severity);
        if count == 0 {
            continue;
        }
        let label = match severity {
            Severity::Critical => severity.as_str().red().bold(),
            Severity::High => severity.as_str().red(),
            Severity::Medium => severity.as_str().yellow(),
            Severity::Low => severity.as_str().cyan(),
            Severity::Info => severity.as_str().normal(),
        };
        println!("    {label}: {count}");
    }

    for finding in report.findings() {
        let location = match (&finding.file_path, finding.start_line) {
            (Some(path), Some(line)) => format!("{path}:{line}"),
            (Some(path), None) => path.clone(),
            _ => String::new(),
        };
        println!();
        println!(
            "  [{}] {} {}",
            finding.severity.as_str().bold(),
            finding.vulnerability_type,
            location.dimmed()
        );
        if !finding.description.is_empty() {
            println!("      {}", finding.description);
        }
        if let Some(rec) = &finding.recommendation {
            println!("      {} {}", "fix:".green(), rec);
        }
    }

    let errors: Vec<&sweep_pipeline::ScanResult> = report
        .scan_results
        .iter()
        .filter(|r| r.status == ScanStatus::Error)
        .collect();
    if !errors.is_empty() {
        println!();
        println!("{}", "Chunk errors".yellow());
        for result in errors {
            println!(
                "  {} chunk {}: {}",
                result.file_path,
                result.chunk_index,
                result.error_message.as_deref().unwrap_or("unknown error")
            );
        }
    }
}
