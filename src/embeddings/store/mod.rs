#[cfg(test)]
mod tests;

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::artifacts::source::read_source_records;
use crate::embeddings::vector::{l2_norm, normalized};
use crate::{IntentError, Result};

/// Rows inspected by [`ensure_normalized`] before deciding whether to renormalize.
pub const NORMALIZATION_SAMPLE_ROWS: usize = 10;
pub const NORM_TOLERANCE: f32 = 0.01;

/// On-disk shape of one entry in the embeddings JSON array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingEntry {
    pub id: String,
    #[serde(default)]
    pub output: String,
    #[serde(default)]
    pub embedding: Option<Vec<f32>>,
    #[serde(default)]
    pub embedding_dim: usize,
}

/// A loaded record that carries a vector. Records without a vector never get this far.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingRecord {
    pub id: String,
    pub preview_text: String,
    pub vector: Vec<f32>,
}

/// Strip the surrounding quotes some CSV exports leave on ids.
#[inline]
pub fn clean_id(id: &str) -> String {
    id.trim_matches('"').to_string()
}

/// Path of the flat CSV written next to an embeddings JSON file:
/// `dir/name.json` becomes `dir/name_embeddings.csv`.
#[inline]
pub fn embeddings_csv_path<P: AsRef<Path>>(json_path: P) -> PathBuf {
    let json_path = json_path.as_ref();
    let stem = json_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    json_path.with_file_name(format!("{stem}_embeddings.csv"))
}

/// Write entries as CSV rows of id, preview, vector as a JSON array and dimension.
/// Entries without a vector get an empty `embedding_json` cell.
#[inline]
pub fn write_embeddings_csv<P: AsRef<Path>>(path: P, entries: &[EmbeddingEntry]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let csv_error = |e: csv::Error| IntentError::data(path, format!("failed to write CSV: {e}"));
    let mut writer = csv::Writer::from_path(path).map_err(csv_error)?;
    writer
        .write_record(["id", "output_preview", "embedding_json", "embedding_dim"])
        .map_err(csv_error)?;

    for entry in entries {
        let embedding_json = match &entry.embedding {
            Some(vector) => serde_json::to_string(vector)
                .map_err(|e| IntentError::data(path, format!("failed to serialize: {e}")))?,
            None => String::new(),
        };
        let dim = entry.embedding_dim.to_string();
        writer
            .write_record([
                entry.id.as_str(),
                entry.output.as_str(),
                embedding_json.as_str(),
                dim.as_str(),
            ])
            .map_err(csv_error)?;
    }
    writer.flush()?;

    info!("Wrote {}", path.display());
    Ok(())
}

/// Load the embeddings JSON array, dropping entries whose vector is missing.
#[inline]
pub fn load_embeddings<P: AsRef<Path>>(path: P) -> Result<Vec<EmbeddingRecord>> {
    let path = path.as_ref();
    info!("Loading embeddings from {}", path.display());

    let content = fs::read_to_string(path)
        .map_err(|e| IntentError::data(path, format!("unreadable embeddings file: {e}")))?;
    let entries: Vec<EmbeddingEntry> = serde_json::from_str(&content)
        .map_err(|e| IntentError::data(path, format!("malformed embeddings JSON: {e}")))?;

    let total = entries.len();
    let mut records = Vec::with_capacity(total);
    let mut dimension = None;

    for entry in entries {
        let Some(vector) = entry.embedding else {
            continue;
        };

        if vector.iter().any(|x| !x.is_finite()) {
            return Err(IntentError::data(
                path,
                format!("embedding for record {} contains non-finite values", entry.id),
            ));
        }

        match dimension {
            None => dimension = Some(vector.len()),
            Some(dim) if dim != vector.len() => {
                return Err(IntentError::data(
                    path,
                    format!(
                        "embedding for record {} has dimension {}, expected {}",
                        entry.id,
                        vector.len(),
                        dim
                    ),
                ));
            }
            Some(_) => {}
        }

        records.push(EmbeddingRecord {
            id: clean_id(&entry.id),
            preview_text: entry.output,
            vector,
        });
    }

    if total > records.len() {
        debug!(
            "Skipped {} entries without an embedding",
            total - records.len()
        );
    }
    info!(
        "Loaded {} embeddings (dimension {})",
        records.len(),
        dimension.unwrap_or(0)
    );

    Ok(records)
}

/// Load the full `output` text per id from the source CSV.
///
/// The embeddings file only stores a short preview, so when the CSV is available the
/// full text replaces it. A CSV that cannot be read only produces a warning.
#[inline]
pub fn load_full_outputs<P: AsRef<Path>>(csv_path: P) -> HashMap<String, String> {
    let csv_path = csv_path.as_ref();

    match read_source_records(csv_path) {
        Ok(rows) => {
            let outputs: HashMap<String, String> = rows
                .into_iter()
                .filter(|row| !row.id.is_empty() && !row.output.is_empty())
                .map(|row| (clean_id(&row.id), row.output))
                .collect();
            info!("Loaded {} full outputs from {}", outputs.len(), csv_path.display());
            outputs
        }
        Err(e) => {
            warn!(
                "Could not load full outputs from {}: {}. Using embedding previews",
                csv_path.display(),
                e
            );
            HashMap::new()
        }
    }
}

/// Replace preview texts by the full outputs where an id matches.
#[inline]
pub fn apply_full_outputs(
    records: Vec<EmbeddingRecord>,
    full_outputs: &HashMap<String, String>,
) -> Vec<EmbeddingRecord> {
    records
        .into_iter()
        .map(|mut record| {
            if let Some(output) = full_outputs.get(&record.id) {
                record.preview_text.clone_from(output);
            }
            record
        })
        .collect()
}

/// Whether the first rows indicate the matrix is not unit-normalized.
///
/// Only the first [`NORMALIZATION_SAMPLE_ROWS`] rows are inspected. A matrix whose
/// head is normalized but whose tail is not will be reported as normalized; callers
/// that cannot accept that false negative must normalize unconditionally.
#[inline]
pub fn needs_normalization(vectors: &[Vec<f32>]) -> bool {
    vectors
        .iter()
        .take(NORMALIZATION_SAMPLE_ROWS)
        .any(|v| (l2_norm(v) - 1.0).abs() > NORM_TOLERANCE)
}

/// Renormalize every row when the sampled rows are off unit length.
#[inline]
pub fn ensure_normalized(vectors: Vec<Vec<f32>>) -> Vec<Vec<f32>> {
    if needs_normalization(&vectors) {
        info!("Vectors are not normalized, applying L2 normalization");
        vectors.iter().map(|v| normalized(v)).collect()
    } else {
        debug!("Vectors already normalized");
        vectors
    }
}

/// [`ensure_normalized`] applied to the vectors of loaded records.
#[inline]
pub fn normalize_records(records: Vec<EmbeddingRecord>) -> Vec<EmbeddingRecord> {
    let (meta, vectors): (Vec<(String, String)>, Vec<Vec<f32>>) = records
        .into_iter()
        .map(|r| ((r.id, r.preview_text), r.vector))
        .unzip();

    ensure_normalized(vectors)
        .into_iter()
        .zip(meta)
        .map(|(vector, (id, preview_text))| EmbeddingRecord {
            id,
            preview_text,
            vector,
        })
        .collect()
}

/// Id to vector lookup used by the merge stage.
#[inline]
pub fn vector_lookup(records: &[EmbeddingRecord]) -> HashMap<String, Vec<f32>> {
    records
        .iter()
        .map(|r| (r.id.clone(), r.vector.clone()))
        .collect()
}
