//! Batch-normalized confidence scoring.
//!
//! Confidence blends text length and evidence breadth, each normalized
//! against the largest value in the batch. Scores are therefore only
//! comparable within a single run.

use crate::models::{Finding, ScoredFinding};
use crate::pipeline::observer::PipelineObserver;

/// Score every finding in the batch and keep those at or above `threshold`,
/// reporting each score to `observer`.
pub fn score(
    findings: Vec<Finding>,
    threshold: f64,
    observer: &dyn PipelineObserver,
) -> Vec<ScoredFinding> {
    // Floors of 1 keep empty and all-empty batches well defined.
    let max_len = findings.iter().map(Finding::text_len).max().unwrap_or(0).max(1);
    let max_sources = findings.iter().map(|f| f.evidence.len()).max().unwrap_or(0).max(1);

    let mut scored = Vec::new();

    for finding in findings {
        let confidence = confidence(finding.text_len(), finding.evidence.len(), max_len, max_sources);
        let kept = confidence >= threshold;
        observer.finding_scored(&finding.organization, confidence, kept);

        if kept {
            scored.push(ScoredFinding {
                evidence_count: finding.evidence.len(),
                organization: finding.organization,
                source_family: finding.source_family,
                text: finding.text,
                error: finding.error,
                confidence,
            });
        }
    }

    scored
}

fn confidence(text_len: usize, sources: usize, max_len: usize, max_sources: usize) -> f64 {
    let length_score = text_len as f64 / max_len as f64;
    let source_score = sources as f64 / max_sources as f64;
    round3(((length_score + source_score) / 2.0).min(1.0))
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Organization;
    use crate::test_support::NoopObserver;

    fn score_all(findings: Vec<Finding>, threshold: f64) -> Vec<ScoredFinding> {
        score(findings, threshold, &NoopObserver)
    }

    fn finding(org: &str, text_len: usize, sources: usize) -> Finding {
        Finding::new(
            Organization::new(org),
            None,
            "x".repeat(text_len),
            (0..sources).map(|i| format!("https://example.com/{}", i)).collect(),
        )
    }

    #[test]
    fn test_single_finding_scores_one() {
        let scored = score_all(vec![finding("acme.com", 100, 2)], 0.0);

        assert_eq!(scored.len(), 1);
        assert_eq!(scored[0].confidence, 1.0);
        assert_eq!(scored[0].evidence_count, 2);
    }

    #[test]
    fn test_empty_batch() {
        assert!(score_all(Vec::new(), 0.0).is_empty());
    }

    #[test]
    fn test_all_empty_findings_score_zero() {
        let batch = vec![finding("acme.com", 0, 0), finding("globex.io", 0, 0)];

        let scored = score_all(batch, 0.0);

        assert_eq!(scored.len(), 2);
        assert!(scored.iter().all(|s| s.confidence == 0.0));
    }

    #[test]
    fn test_normalizes_against_batch_maximum() {
        let batch = vec![finding("acme.com", 100, 4), finding("acme.com", 50, 1)];

        let scored = score_all(batch, 0.0);

        assert_eq!(scored[0].confidence, 1.0);
        // (0.5 + 0.25) / 2
        assert_eq!(scored[1].confidence, 0.375);
    }

    #[test]
    fn test_rounds_to_three_decimals() {
        let batch = vec![finding("acme.com", 3, 3), finding("acme.com", 1, 0)];

        let scored = score_all(batch, 0.0);

        assert_eq!(scored[1].confidence, 0.167);
    }

    #[test]
    fn test_confidence_always_in_unit_interval() {
        let batch: Vec<Finding> = (0..20)
            .map(|i| finding("acme.com", (i * 7) % 23, (i * 3) % 5))
            .collect();

        for s in score_all(batch, 0.0) {
            assert!((0.0..=1.0).contains(&s.confidence));
        }
    }

    #[test]
    fn test_threshold_is_a_pure_filter() {
        let batch: Vec<Finding> = (0..12)
            .map(|i| finding("acme.com", 10 + i * 9, i % 4))
            .collect();
        let unfiltered = score_all(batch.clone(), 0.0);

        for threshold in [0.1, 0.333, 0.5, 0.75, 0.9, 1.0] {
            let expected: Vec<ScoredFinding> = unfiltered
                .iter()
                .filter(|s| s.confidence >= threshold)
                .cloned()
                .collect();
            assert_eq!(score_all(batch.clone(), threshold), expected);
        }
    }

    #[test]
    fn test_nothing_passes_high_threshold() {
        let batch = vec![finding("acme.com", 100, 0), finding("globex.io", 10, 1)];

        assert!(score_all(batch, 0.9).is_empty());
    }
}
