//! Merging near-duplicate clusters.
//!
//! Every cluster gets a fingerprint: the renormalized mean of its representative
//! sample embeddings. Clusters are then grouped greedily by fingerprint cosine
//! similarity. The grouping is a single pass in ascending id order where a seed
//! absorbs any unprocessed cluster that is close enough to the seed or to a cluster
//! the seed already absorbed. Clusters rejected earlier in a scan are not revisited,
//! so groups are not the transitive closure of the similarity relation.


use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::embeddings::store::clean_id;
use crate::embeddings::vector::{dot, mean, normalized};
use crate::summary::{ClusterSummary, TopSample};

pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.98;
pub const MAX_MERGED_SAMPLES: usize = 10;
const LOGGED_PAIRS: usize = 10;

/// One cluster after merging, standalone or the union of several originals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergedCluster {
    pub primary_id: usize,
    pub merged_from_ids: Vec<usize>,
    pub size: usize,
    pub top_samples: Vec<TopSample>,
    pub summary: String,
}

impl MergedCluster {
    #[inline]
    pub fn is_merged(&self) -> bool {
        self.merged_from_ids.len() > 1
    }
}

/// Renormalized mean of the resolvable top-sample vectors, keyed by cluster id.
///
/// Clusters none of whose samples resolve get no fingerprint.
#[inline]
pub fn cluster_fingerprints(
    summaries: &[ClusterSummary],
    lookup: &HashMap<String, Vec<f32>>,
) -> BTreeMap<usize, Vec<f32>> {
    let mut fingerprints = BTreeMap::new();
    for cluster in summaries {
        let vectors: Vec<&[f32]> = cluster
            .top_samples
            .iter()
            .filter_map(|sample| lookup.get(&clean_id(&sample.id)))
            .map(Vec::as_slice)
            .collect();

        match mean(vectors) {
            Some(avg) => {
                fingerprints.insert(cluster.cluster_id, normalized(&avg));
            }
            None => debug!(
                "Cluster {} has no resolvable sample vectors, keeping it standalone",
                cluster.cluster_id
            ),
        }
    }
    fingerprints
}

/// Pairwise cosine similarity of unit fingerprints, with 1.0 on the diagonal.
#[inline]
pub fn similarity_matrix(fingerprints: &[&[f32]]) -> Vec<Vec<f32>> {
    let n = fingerprints.len();
    let mut matrix = vec![vec![0.0; n]; n];
    for i in 0..n {
        matrix[i][i] = 1.0;
        for j in (i + 1)..n {
            let sim = dot(fingerprints[i], fingerprints[j]);
            matrix[i][j] = sim;
            matrix[j][i] = sim;
        }
    }
    matrix
}

/// Single-pass greedy grouping over a similarity matrix.
///
/// Returns groups of matrix indices; each group is ascending and groups are ordered
/// by their smallest index. Every index appears in exactly one group.
#[inline]
pub fn greedy_groups(similarity: &[Vec<f32>], threshold: f32) -> Vec<Vec<usize>> {
    let n = similarity.len();
    let mut processed = vec![false; n];
    let mut groups = Vec::new();

    for seed in 0..n {
        if processed[seed] {
            continue;
        }
        processed[seed] = true;

        let mut group = vec![seed];
        for candidate in 0..n {
            if processed[candidate] {
                continue;
            }
            if group
                .iter()
                .any(|&member| similarity[member][candidate] >= threshold)
            {
                group.push(candidate);
                processed[candidate] = true;
            }
        }

        group.sort_unstable();
        groups.push(group);
    }

    groups
}

/// Index pairs `(i, j)` with `i < j` at or above the threshold, most similar first.
#[inline]
pub fn similar_pairs(similarity: &[Vec<f32>], threshold: f32) -> Vec<(usize, usize, f32)> {
    let mut pairs = Vec::new();
    for (i, row) in similarity.iter().enumerate() {
        for (j, &sim) in row.iter().enumerate().skip(i + 1) {
            if sim >= threshold {
                pairs.push((i, j, sim));
            }
        }
    }
    pairs.sort_by(|a, b| b.2.total_cmp(&a.2));
    pairs
}

/// Combine clusters into one: sizes add up, samples are deduplicated by id in
/// ascending cluster order and capped, and the longest summary wins.
///
/// `group` must be non-empty and sorted by cluster id.
#[inline]
pub fn combine(group: &[&ClusterSummary]) -> MergedCluster {
    let merged_from_ids: Vec<usize> = group.iter().map(|c| c.cluster_id).collect();
    let primary_id = merged_from_ids.first().copied().unwrap_or_default();

    if let [single] = group {
        return MergedCluster {
            primary_id,
            merged_from_ids,
            size: single.size,
            top_samples: single.top_samples.clone(),
            summary: single.summary.clone(),
        };
    }

    let size = group.iter().map(|c| c.size).sum();

    let mut seen = HashSet::new();
    let top_samples: Vec<TopSample> = group
        .iter()
        .flat_map(|c| c.top_samples.iter())
        .filter(|sample| seen.insert(clean_id(&sample.id)))
        .take(MAX_MERGED_SAMPLES)
        .cloned()
        .collect();

    let summary = group
        .iter()
        .map(|c| c.summary.as_str())
        .fold(None, |longest: Option<&str>, s| match longest {
            Some(l) if l.chars().count() >= s.chars().count() => Some(l),
            _ => Some(s),
        })
        .unwrap_or_default()
        .to_string();

    MergedCluster {
        primary_id,
        merged_from_ids,
        size,
        top_samples,
        summary,
    }
}

/// Group clusters by fingerprint similarity and merge each group.
///
/// Output is ordered by ascending primary id.
#[inline]
pub fn merge_clusters(
    summaries: &[ClusterSummary],
    lookup: &HashMap<String, Vec<f32>>,
    threshold: f32,
) -> Vec<MergedCluster> {
    info!("Analyzing cluster similarity (threshold {})", threshold);

    let mut by_id: BTreeMap<usize, &ClusterSummary> = BTreeMap::new();
    for cluster in summaries {
        by_id.entry(cluster.cluster_id).or_insert(cluster);
    }

    let fingerprints = cluster_fingerprints(summaries, lookup);
    let ids: Vec<usize> = fingerprints.keys().copied().collect();
    let vectors: Vec<&[f32]> = fingerprints.values().map(Vec::as_slice).collect();
    let matrix = similarity_matrix(&vectors);

    let pairs = similar_pairs(&matrix, threshold);
    if pairs.is_empty() {
        info!("No cluster pairs with similarity >= {}", threshold);
    } else {
        info!(
            "Found {} similar cluster pairs (similarity >= {})",
            pairs.len(),
            threshold
        );
        for &(i, j, sim) in pairs.iter().take(LOGGED_PAIRS) {
            info!("  cluster {} <-> cluster {}: {:.4}", ids[i], ids[j], sim);
        }
    }

    let mut groups: Vec<Vec<usize>> = greedy_groups(&matrix, threshold)
        .into_iter()
        .map(|group| group.into_iter().map(|i| ids[i]).collect())
        .collect();

    groups.extend(
        by_id
            .keys()
            .filter(|id| !fingerprints.contains_key(id))
            .map(|&id| vec![id]),
    );
    groups.sort_by_key(|group| group[0]);

    let merged: Vec<MergedCluster> = groups
        .iter()
        .map(|group| {
            let members: Vec<&ClusterSummary> = group.iter().map(|id| by_id[id]).collect();
            let cluster = combine(&members);
            if cluster.is_merged() {
                info!(
                    "Merged clusters {:?} -> {} ({} samples)",
                    cluster.merged_from_ids, cluster.primary_id, cluster.size
                );
            }
            cluster
        })
        .collect();

    info!("{} distinct clusters after merging", merged.len());
    merged
}
