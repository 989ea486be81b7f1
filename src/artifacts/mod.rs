// Artifacts module
// JSON files written between stages; every stage can be resumed from these

pub mod source;


use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::clustering::KSelection;
use crate::prototype::IntentPrototype;
use crate::summary::ClusterSummary;
use crate::{IntentError, Result};

pub const K_SELECTION_FILE: &str = "k_selection.json";
pub const CLUSTER_RESULTS_FILE: &str = "cluster_results.json";
pub const INTENT_PROTOTYPES_FILE: &str = "intent_prototypes.json";
pub const CLUSTER_ANALYSIS_FILE: &str = "cluster_analysis_summary.json";

/// Output of the clustering stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterResults {
    pub optimal_k: usize,
    pub k_selection_results: KSelection,
    pub cluster_summaries: Vec<ClusterSummary>,
    pub total_samples: usize,
}

/// Counters describing one prototype generation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub generation_date: String,
    pub original_cluster_count: usize,
    pub pre_filtered_count: usize,
    pub clusters_after_prefilter: usize,
    pub final_prototype_count: usize,
    pub merged_count: usize,
    pub total_samples: usize,
    pub optimal_k: usize,
    pub similarity_threshold: f32,
}

/// Output of the prototype stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrototypeReport {
    pub metadata: ReportMetadata,
    pub intent_prototypes: Vec<IntentPrototype>,
}

/// Write a value as pretty-printed UTF-8 JSON, creating parent directories.
#[inline]
pub fn write_json<T: Serialize, P: AsRef<Path>>(path: P, value: &T) -> Result<()> {
    let path = path.as_ref();

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut content = serde_json::to_string_pretty(value)
        .map_err(|e| IntentError::data(path, format!("failed to serialize: {e}")))?;
    content.push('\n');
    fs::write(path, content)?;

    info!("Wrote {}", path.display());
    Ok(())
}

#[inline]
pub fn read_json<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .map_err(|e| IntentError::data(path, format!("unreadable file: {e}")))?;
    serde_json::from_str(&content).map_err(|e| IntentError::data(path, format!("malformed JSON: {e}")))
}
