//! Near-duplicate clustering of findings.
//!
//! Findings are partitioned by organization and clustered greedily: the
//! first finding left in the pool becomes the representative and absorbs
//! every later finding whose text is similar enough. The representative's
//! text is kept verbatim; evidence is merged.
//!
//! Clustering is O(n^2) per organization, which is fine for the tens of
//! findings a single organization produces per run.

use crate::models::{Finding, Organization};
use crate::pipeline::observer::PipelineObserver;
use similar::TextDiff;
use std::collections::{HashMap, HashSet};

/// Default similarity above which two findings are merged.
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.85;

/// Character-level similarity in [0, 1].
///
/// `2 * M / (len_a + len_b)` where `M` is the length of the longest common
/// subsequence. Symmetric; 1.0 for identical strings, including two empty ones.
pub fn similarity(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }
    f64::from(TextDiff::from_chars(a, b).ratio())
}

/// Merge near-duplicate findings within each organization.
///
/// Output order: organizations in first-seen order, clusters in the order
/// their representatives appeared. Each multi-member cluster is reported
/// to `observer`.
pub fn dedupe(
    findings: Vec<Finding>,
    threshold: f64,
    observer: &dyn PipelineObserver,
) -> Vec<Finding> {
    let mut merged = Vec::with_capacity(findings.len());

    for (org, pool) in partition_by_organization(findings) {
        merged.extend(cluster_partition(&org, pool, threshold, observer));
    }

    merged
}

/// Group findings by organization, keeping first-seen organization order
/// and the original order inside each group.
fn partition_by_organization(findings: Vec<Finding>) -> Vec<(Organization, Vec<Finding>)> {
    let mut index: HashMap<Organization, usize> = HashMap::new();
    let mut partitions: Vec<(Organization, Vec<Finding>)> = Vec::new();

    for finding in findings {
        match index.get(&finding.organization) {
            Some(&slot) => partitions[slot].1.push(finding),
            None => {
                index.insert(finding.organization.clone(), partitions.len());
                partitions.push((finding.organization.clone(), vec![finding]));
            }
        }
    }

    partitions
}

fn cluster_partition(
    org: &Organization,
    mut pool: Vec<Finding>,
    threshold: f64,
    observer: &dyn PipelineObserver,
) -> Vec<Finding> {
    let mut clusters = Vec::new();

    while !pool.is_empty() {
        let representative = pool.remove(0);
        let mut absorbed = Vec::new();

        let mut i = 0;
        while i < pool.len() {
            if similarity(&representative.text, &pool[i].text) > threshold {
                absorbed.push(pool.remove(i));
            } else {
                i += 1;
            }
        }

        if !absorbed.is_empty() {
            observer.cluster_merged(org, absorbed.len() + 1);
        }

        clusters.push(merge_cluster(representative, absorbed));
    }

    clusters
}

/// Collapse a cluster into its representative with the union of evidence.
fn merge_cluster(representative: Finding, absorbed: Vec<Finding>) -> Finding {
    let mut seen: HashSet<String> = HashSet::new();
    let mut evidence = Vec::new();

    let all_urls = representative
        .evidence
        .iter()
        .chain(absorbed.iter().flat_map(|m| m.evidence.iter()));
    for url in all_urls {
        if seen.insert(url.clone()) {
            evidence.push(url.clone());
        }
    }

    Finding {
        evidence,
        ..representative
    }
}
