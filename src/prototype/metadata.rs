// Per-record shop metadata from the source CSV
// The metadata column is JSON whose tags and shop_info fields are JSON strings themselves


use std::collections::HashMap;
use std::path::Path;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::artifacts::source::{SourceRecord, read_source_records};
use crate::embeddings::store::clean_id;
use crate::{IntentError, Result};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordMetadata {
    pub shop_id: Option<String>,
    pub shop_type: Option<String>,
    pub tags: Vec<String>,
    pub shop_info: Option<Value>,
}

/// Metadata gathered over a set of records. Shop ids and types keep first-seen order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataSummary {
    pub shop_ids: Vec<String>,
    pub shop_types: Vec<String>,
    pub all_tags: Vec<String>,
    pub shop_info_samples: Vec<Value>,
}

impl MetadataSummary {
    /// Up to `n` tags by descending frequency; ties keep first-seen order.
    #[inline]
    pub fn top_tags(&self, n: usize) -> Vec<String> {
        let mut counts: Vec<(&str, usize)> = Vec::new();
        for tag in &self.all_tags {
            match counts.iter_mut().find(|(t, _)| *t == tag.as_str()) {
                Some((_, count)) => *count += 1,
                None => counts.push((tag.as_str(), 1)),
            }
        }
        counts.sort_by(|a, b| b.1.cmp(&a.1));
        counts
            .into_iter()
            .take(n)
            .map(|(tag, _)| tag.to_string())
            .collect()
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn nested_json(object: &Map<String, Value>, key: &str) -> Option<Value> {
    match object.get(key)? {
        Value::String(s) => serde_json::from_str(s).ok(),
        _ => None,
    }
}

/// Parse one record's metadata column.
#[inline]
pub fn parse_metadata(record_id: &str, raw: &str) -> Result<RecordMetadata> {
    let value: Value = serde_json::from_str(raw).map_err(|e| IntentError::Parse {
        record: record_id.to_string(),
        message: format!("invalid metadata JSON: {e}"),
    })?;
    let Value::Object(object) = value else {
        return Err(IntentError::Parse {
            record: record_id.to_string(),
            message: "metadata is not a JSON object".to_string(),
        });
    };

    let tags = match nested_json(&object, "tags") {
        Some(Value::Array(items)) => items.iter().filter_map(scalar_to_string).collect(),
        _ => Vec::new(),
    };

    let shop_info = nested_json(&object, "shop_info").filter(|info| match info {
        Value::Null => false,
        Value::Object(map) => !map.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::String(s) => !s.is_empty(),
        _ => true,
    });

    Ok(RecordMetadata {
        shop_id: object.get("shop_id").and_then(scalar_to_string),
        shop_type: object.get("shop_type").and_then(scalar_to_string),
        tags,
        shop_info,
    })
}

/// Metadata of every source record that has a parseable metadata column, by id.
#[derive(Debug, Clone, Default)]
pub struct MetadataIndex {
    records: HashMap<String, RecordMetadata>,
    skipped: Vec<String>,
}

impl MetadataIndex {
    #[inline]
    pub fn from_records(records: &[SourceRecord]) -> Self {
        let mut index = HashMap::new();
        let mut skipped = Vec::new();
        for record in records {
            if record.metadata.trim().is_empty() {
                continue;
            }
            let id = clean_id(&record.id);
            match parse_metadata(&id, &record.metadata) {
                Ok(metadata) => {
                    index.entry(id).or_insert(metadata);
                }
                Err(e) => {
                    warn!("Skipping metadata: {}", e);
                    skipped.push(id);
                }
            }
        }
        debug!("Indexed metadata for {} records", index.len());
        Self {
            records: index,
            skipped,
        }
    }

    /// Index the source CSV. An unreadable CSV gives an empty index and a warning.
    #[inline]
    pub fn load<P: AsRef<Path>>(csv_path: P) -> Self {
        match read_source_records(csv_path.as_ref()) {
            Ok(records) => Self::from_records(&records),
            Err(e) => {
                warn!("Could not read metadata: {}", e);
                Self::default()
            }
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Ids of records whose metadata column could not be parsed.
    #[inline]
    pub fn skipped(&self) -> &[String] {
        &self.skipped
    }

    #[inline]
    pub fn get(&self, id: &str) -> Option<&RecordMetadata> {
        self.records.get(&clean_id(id))
    }

    /// Gather metadata over the given record ids.
    #[inline]
    pub fn summarize<'a, I>(&self, ids: I) -> MetadataSummary
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut summary = MetadataSummary::default();
        for id in ids {
            let Some(metadata) = self.get(id) else {
                continue;
            };
            if let Some(shop_id) = &metadata.shop_id {
                if !summary.shop_ids.contains(shop_id) {
                    summary.shop_ids.push(shop_id.clone());
                }
            }
            if let Some(shop_type) = &metadata.shop_type {
                if !summary.shop_types.contains(shop_type) {
                    summary.shop_types.push(shop_type.clone());
                }
            }
            summary.all_tags.extend(metadata.tags.iter().cloned());
            if let Some(info) = &metadata.shop_info {
                summary.shop_info_samples.push(info.clone());
            }
        }
        summary
    }
}
