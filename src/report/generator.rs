//! Research report generation.
//!
//! Renders a [`PipelineReport`] either as the JSON response document or as
//! a human-readable Markdown report.

use crate::models::{PerformanceStats, PipelineReport, ResearchRequest, ResearchResult};
use anyhow::{Context, Result};
use std::path::Path;

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &PipelineReport, request: &ResearchRequest) -> String {
    let mut output = String::new();

    // Title
    output.push_str("# SignalScout Research Report\n\n");

    output.push_str(&generate_metadata_section(report, request));
    output.push_str(&generate_table_of_contents(report));
    output.push_str(&generate_performance_section(report));
    output.push_str(&generate_results_section(&report.results));
    output.push_str(&generate_footer());

    output
}

fn generate_metadata_section(report: &PipelineReport, request: &ResearchRequest) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Research ID:** `{}`\n", report.run_id));
    section.push_str(&format!("- **Research Goal:** {}\n", request.research_goal));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        report.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Search Depth:** {:?}\n", request.search_depth));
    section.push_str(&format!(
        "- **Confidence Threshold:** {:.2}\n",
        request.confidence_threshold
    ));
    section.push_str(&format!(
        "- **Organizations:** {}\n",
        report.organization_count
    ));
    section.push_str(&format!(
        "- **Queries Generated:** {}\n",
        report.queries_generated
    ));
    section.push_str(&format!(
        "- **Searches Executed:** {}\n",
        report.findings_attempted
    ));
    section.push_str(&format!(
        "- **Processing Time:** {:.1}s\n",
        report.duration_ms as f64 / 1000.0
    ));
    section.push('\n');

    section
}

fn generate_table_of_contents(report: &PipelineReport) -> String {
    let mut toc = String::new();

    toc.push_str("## Table of Contents\n\n");
    toc.push_str("- [Metadata](#metadata)\n");
    toc.push_str("- [Performance](#performance)\n");
    toc.push_str("- [Results](#results)\n");

    for organization in organizations_in_order(&report.results) {
        toc.push_str(&format!("  - [{}](#{})\n", organization, anchor(organization)));
    }

    toc.push('\n');

    toc
}

fn generate_performance_section(report: &PipelineReport) -> String {
    let PerformanceStats {
        success_rate,
        avg_evidence_per_result,
        queries_per_second,
        cache_hit_rate,
        failed_requests,
        failed_groups,
    } = &report.performance_stats;

    let mut section = String::new();

    section.push_str("## Performance\n\n");
    section.push_str("| Metric | Value |\n");
    section.push_str("|--------|-------|\n");
    section.push_str(&format!("| Success rate | {:.2} |\n", success_rate));
    section.push_str(&format!(
        "| Avg. evidence per result | {:.2} |\n",
        avg_evidence_per_result
    ));
    section.push_str(&format!("| Queries per second | {:.2} |\n", queries_per_second));
    section.push_str(&format!("| Cache hit rate | {:.2} |\n", cache_hit_rate));
    section.push_str(&format!("| Results | {} |\n", report.results.len()));
    section.push_str(&format!("| Failed requests | {} |\n", failed_requests));
    section.push_str(&format!("| Failed source groups | {} |\n", failed_groups));
    section.push('\n');

    if *failed_groups > 0 {
        section.push_str(
            "> ⚠️ At least one source group failed entirely; results are partial.\n\n",
        );
    }

    section
}

fn generate_results_section(results: &[ResearchResult]) -> String {
    let mut section = String::new();

    section.push_str("## Results\n\n");

    if results.is_empty() {
        section.push_str("No findings met the confidence threshold.\n\n");
        return section;
    }

    for organization in organizations_in_order(results) {
        section.push_str(&format!("### {}\n\n", organization));

        for result in results.iter().filter(|r| r.organization == organization) {
            section.push_str(&generate_result_block(result));
        }
    }

    section
}

fn generate_result_block(result: &ResearchResult) -> String {
    let mut block = String::new();

    block.push_str(&format!(
        "- **{} {:.3}** · {} evidence URL(s)\n",
        confidence_emoji(result.confidence_score),
        result.confidence_score,
        result.evidence_count
    ));

    let summary = if result.findings_summary.is_empty() {
        "_(no text)_"
    } else {
        result.findings_summary.as_str()
    };
    block.push_str(&format!("  > {}\n\n", summary.replace('\n', " ")));

    block
}

fn confidence_emoji(confidence: f64) -> &'static str {
    if confidence >= 0.8 {
        "🟢"
    } else if confidence >= 0.5 {
        "🟡"
    } else {
        "🔴"
    }
}

fn organizations_in_order(results: &[ResearchResult]) -> Vec<&str> {
    let mut seen: Vec<&str> = Vec::new();
    for result in results {
        if !seen.contains(&result.organization.as_str()) {
            seen.push(&result.organization);
        }
    }
    seen
}

fn anchor(heading: &str) -> String {
    heading
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '-' || *c == ' ')
        .map(|c| if c == ' ' { '-' } else { c })
        .collect()
}

fn generate_footer() -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str("*Report generated by SignalScout*\n");

    footer
}

/// Generate the JSON response document.
pub fn generate_json_report(report: &PipelineReport) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

/// Write rendered output, creating parent directories as needed.
pub fn write_output(content: &str, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    std::fs::write(path, content)
        .with_context(|| format!("Failed to write report to {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SearchDepth;
    use chrono::Utc;

    fn create_test_request() -> ResearchRequest {
        ResearchRequest {
            research_goal: "AI fraud detection adoption".to_string(),
            organizations: vec!["acme.com".to_string(), "globex.io".to_string()],
            search_depth: SearchDepth::Standard,
            max_parallel_searches: 10,
            confidence_threshold: 0.5,
        }
    }

    fn create_test_report() -> PipelineReport {
        PipelineReport {
            run_id: "research-test".to_string(),
            organization_count: 2,
            queries_generated: 40,
            findings_attempted: 44,
            duration_ms: 1500,
            results: vec![
                ResearchResult {
                    organization: "acme.com".to_string(),
                    confidence_score: 0.912,
                    evidence_count: 3,
                    findings_summary: "Acme is hiring fraud detection engineers".to_string(),
                },
                ResearchResult {
                    organization: "globex.io".to_string(),
                    confidence_score: 0.55,
                    evidence_count: 1,
                    findings_summary: "Globex pilots ML transaction screening".to_string(),
                },
                ResearchResult {
                    organization: "acme.com".to_string(),
                    confidence_score: 0.6,
                    evidence_count: 2,
                    findings_summary: "Acme raised $5M in funding".to_string(),
                },
            ],
            performance_stats: PerformanceStats {
                success_rate: 0.07,
                avg_evidence_per_result: 2.0,
                queries_per_second: 29.33,
                cache_hit_rate: 0.25,
                failed_requests: 4,
                failed_groups: 1,
            },
            generated_at: Utc::now(),
        }
    }

    #[test]
    fn test_generate_markdown_report() {
        let markdown = generate_markdown_report(&create_test_report(), &create_test_request());

        assert!(markdown.contains("# SignalScout Research Report"));
        assert!(markdown.contains("## Metadata"));
        assert!(markdown.contains("## Performance"));
        assert!(markdown.contains("## Results"));
        assert!(markdown.contains("AI fraud detection adoption"));
        assert!(markdown.contains("Acme is hiring fraud detection engineers"));
        assert!(markdown.contains("results are partial"));
        assert!(markdown.contains("| Cache hit rate | 0.25 |"));
    }

    #[test]
    fn test_results_grouped_by_organization_in_first_seen_order() {
        let section = generate_results_section(&create_test_report().results);

        let acme = section.find("### acme.com").unwrap();
        let globex = section.find("### globex.io").unwrap();
        let funding = section.find("Acme raised $5M").unwrap();

        assert!(acme < globex);
        // both acme results sit under the acme heading
        assert!(funding < globex);
        assert_eq!(section.matches("### acme.com").count(), 1);
    }

    #[test]
    fn test_empty_results() {
        let section = generate_results_section(&[]);
        assert!(section.contains("No findings met the confidence threshold."));
    }

    #[test]
    fn test_anchor() {
        assert_eq!(anchor("acme.com"), "acmecom");
        assert_eq!(anchor("Big Corp"), "big-corp");
    }

    #[test]
    fn test_confidence_emoji() {
        assert_eq!(confidence_emoji(0.95), "🟢");
        assert_eq!(confidence_emoji(0.5), "🟡");
        assert_eq!(confidence_emoji(0.1), "🔴");
    }

    #[test]
    fn test_generate_json_report_uses_response_names() {
        let json = generate_json_report(&create_test_report()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["research_id"], "research-test");
        assert_eq!(value["strategies_generated"], 40);
        assert_eq!(value["searches_executed"], 44);
        assert_eq!(value["results"][0]["findings"], "Acme is hiring fraud detection engineers");
        assert_eq!(value["performance"]["failed_groups"], 1);
        assert_eq!(value["performance"]["cache_hit_rate"], 0.25);
    }

    #[test]
    fn test_write_output_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out/report.json");

        write_output("{}", &path).unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}");
    }
}
