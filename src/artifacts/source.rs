// Reading the seller's exported session CSV

#[cfg(test)]
mod tests;

use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::{IntentError, Result};

/// One row of the source CSV. Columns that are absent deserialize as empty strings.
///
/// `summary` holds a per-record JSON digest and `cluster_hit` an externally assigned
/// cluster; both are only read by the analysis stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SourceRecord {
    pub id: String,
    pub output: String,
    pub summary: String,
    pub metadata: String,
    pub cluster_hit: String,
    pub shop_id: String,
}

#[inline]
pub fn read_source_records<P: AsRef<Path>>(path: P) -> Result<Vec<SourceRecord>> {
    let path = path.as_ref();

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|e| IntentError::data(path, format!("unreadable CSV: {e}")))?;

    let mut records = Vec::new();
    for (line, row) in reader.deserialize::<SourceRecord>().enumerate() {
        let record =
            row.map_err(|e| IntentError::data(path, format!("malformed CSV row {}: {e}", line + 1)))?;
        records.push(record);
    }

    debug!("Read {} rows from {}", records.len(), path.display());
    Ok(records)
}
