//! Statistics over records that already carry a cluster assignment.
//!
//! Rows of the source CSV are grouped by their `cluster_hit` column. Each row's
//! `summary` column is a JSON digest of the session; interests, product attributes,
//! shops, engagement levels and purchase stages are tallied per cluster. A digest
//! that does not parse is recorded against the cluster and otherwise ignored.

#[cfg(test)]
mod tests;

use std::collections::{BTreeMap, HashMap};

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::artifacts::source::SourceRecord;
use crate::embeddings::store::clean_id;
use crate::{IntentError, Result};

pub const TOP_INTERESTS: usize = 10;
pub const TOP_ATTRIBUTES: usize = 10;
pub const TOP_SHOPS: usize = 5;
pub const SAMPLE_SUMMARIES: usize = 3;

/// Tallies for one assigned cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterAnalysis {
    pub cluster_id: String,
    pub size: usize,
    pub top_interests: Vec<(String, usize)>,
    pub top_attributes: Vec<(String, usize)>,
    pub top_shops: Vec<(String, usize)>,
    pub engagement_levels: Vec<String>,
    pub purchase_stages: Vec<String>,
    pub sample_summaries: Vec<Value>,
    /// Ids of records whose summary could not be parsed.
    pub parse_failures: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub total_clusters: usize,
    pub cluster_analyses: BTreeMap<String, ClusterAnalysis>,
}

/// Parse one record's summary column into a JSON object.
#[inline]
pub fn parse_record_summary(record_id: &str, raw: &str) -> Result<Value> {
    let value: Value = serde_json::from_str(raw).map_err(|e| IntentError::Parse {
        record: record_id.to_string(),
        message: format!("invalid summary JSON: {e}"),
    })?;
    if !value.is_object() {
        return Err(IntentError::Parse {
            record: record_id.to_string(),
            message: "summary is not a JSON object".to_string(),
        });
    }
    Ok(value)
}

/// The `n` most frequent items with their counts. Ties keep first-seen order.
#[inline]
pub fn most_common<I>(items: I, n: usize) -> Vec<(String, usize)>
where
    I: IntoIterator<Item = String>,
{
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut counts: Vec<(String, usize)> = Vec::new();

    for item in items {
        match positions.get(&item) {
            Some(&pos) => counts[pos].1 += 1,
            None => {
                positions.insert(item.clone(), counts.len());
                counts.push((item, 1));
            }
        }
    }

    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.truncate(n);
    counts
}

/// Rows with a non-empty `cluster_hit`, grouped by it in file order.
#[inline]
pub fn group_by_cluster(records: &[SourceRecord]) -> BTreeMap<String, Vec<&SourceRecord>> {
    let mut clusters: BTreeMap<String, Vec<&SourceRecord>> = BTreeMap::new();
    for record in records {
        let cluster_id = record.cluster_hit.trim();
        if cluster_id.is_empty() {
            continue;
        }
        clusters.entry(cluster_id.to_string()).or_default().push(record);
    }
    clusters
}

fn strings_at(value: &Value, pointer: &str) -> Vec<String> {
    value
        .pointer(pointer)
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_str).map(str::to_string).collect())
        .unwrap_or_default()
}

fn string_at(value: &Value, pointer: &str) -> Option<String> {
    value.pointer(pointer).and_then(Value::as_str).map(str::to_string)
}

/// Tally the parsed summaries of one cluster's records.
///
/// Rows with an empty summary count toward the size only. Shop ids are taken from
/// rows whose summary parsed.
#[inline]
pub fn analyze_cluster(cluster_id: &str, records: &[&SourceRecord]) -> ClusterAnalysis {
    let mut summaries = Vec::new();
    let mut shops = Vec::new();
    let mut parse_failures = Vec::new();

    for record in records {
        if record.summary.trim().is_empty() {
            continue;
        }
        let id = clean_id(&record.id);
        match parse_record_summary(&id, &record.summary) {
            Ok(summary) => {
                if !record.shop_id.trim().is_empty() {
                    shops.push(record.shop_id.trim().to_string());
                }
                summaries.push(summary);
            }
            Err(e) => {
                warn!("Cluster {}: {}", cluster_id, e);
                parse_failures.push(id);
            }
        }
    }

    let interests = summaries.iter().flat_map(|s| strings_at(s, "/core_interests"));
    let attributes = summaries
        .iter()
        .flat_map(|s| strings_at(s, "/product_focus/key_attributes"));

    let engagement_levels = summaries
        .iter()
        .filter_map(|s| string_at(s, "/behavior_summary/engagement"))
        .unique()
        .collect();
    let purchase_stages = summaries
        .iter()
        .filter_map(|s| string_at(s, "/purchase_signals/stage"))
        .unique()
        .collect();

    debug!(
        "Cluster {}: {} of {} summaries parsed",
        cluster_id,
        summaries.len(),
        records.len()
    );

    ClusterAnalysis {
        cluster_id: cluster_id.to_string(),
        size: records.len(),
        top_interests: most_common(interests, TOP_INTERESTS),
        top_attributes: most_common(attributes, TOP_ATTRIBUTES),
        top_shops: most_common(shops, TOP_SHOPS),
        engagement_levels,
        purchase_stages,
        sample_summaries: summaries.into_iter().take(SAMPLE_SUMMARIES).collect(),
        parse_failures,
    }
}

/// Group the records by assigned cluster and analyze every group.
#[inline]
pub fn analyze_records(records: &[SourceRecord]) -> AnalysisReport {
    let cluster_analyses: BTreeMap<String, ClusterAnalysis> = group_by_cluster(records)
        .into_iter()
        .map(|(cluster_id, members)| {
            let analysis = analyze_cluster(&cluster_id, &members);
            (cluster_id, analysis)
        })
        .collect();

    AnalysisReport {
        total_clusters: cluster_analyses.len(),
        cluster_analyses,
    }
}
