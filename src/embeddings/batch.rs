// Embedding generation for the source CSV
// One request per record; failures leave a null embedding and the batch goes on


use std::thread;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use crate::artifacts::source::SourceRecord;
use crate::embeddings::gemini::Embedder;
use crate::embeddings::store::EmbeddingEntry;
use crate::embeddings::vector::normalized;
use crate::summary::truncate_chars;

pub const MAX_INPUT_CHARS: usize = 8_000;
pub const STORED_PREVIEW_CHARS: usize = 100;
pub const PAUSE_EVERY: usize = 10;

/// Preview stored next to the vector: the first 100 characters plus an ellipsis.
#[inline]
pub fn stored_preview(text: &str) -> String {
    if text.chars().count() > STORED_PREVIEW_CHARS {
        format!("{}...", truncate_chars(text, STORED_PREVIEW_CHARS))
    } else {
        text.to_string()
    }
}

/// Embed every record with a non-empty output.
///
/// Vectors are L2-normalized. After every [`PAUSE_EVERY`] requests the loop sleeps for
/// `pause`.
#[inline]
pub fn embed_records(
    records: &[SourceRecord],
    embedder: &dyn Embedder,
    pause: Duration,
) -> Vec<EmbeddingEntry> {
    let rows: Vec<&SourceRecord> = records.iter().filter(|r| !r.output.is_empty()).collect();
    info!("Found {} records with output text", rows.len());

    let bar = if console::user_attended_stderr() {
        ProgressBar::new(rows.len() as u64).with_style(
            ProgressStyle::with_template("{bar:30} [{pos}/{len}] embedding ({eta})")
                .expect("style template is valid"),
        )
    } else {
        ProgressBar::hidden()
    };

    let mut failures = 0;
    let entries = rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let text = truncate_chars(&row.output, MAX_INPUT_CHARS);
            let embedding = match embedder.embed(&text) {
                Ok(vector) => Some(normalized(&vector)),
                Err(e) => {
                    warn!("Embedding record {} ({}) failed: {}", i + 1, row.id, e);
                    failures += 1;
                    None
                }
            };

            if (i + 1) % PAUSE_EVERY == 0 && !pause.is_zero() {
                thread::sleep(pause);
            }
            bar.inc(1);

            let embedding_dim = embedding.as_ref().map_or(0, Vec::len);
            EmbeddingEntry {
                id: row.id.clone(),
                output: stored_preview(&row.output),
                embedding,
                embedding_dim,
            }
        })
        .collect();
    bar.finish_and_clear();

    if failures > 0 {
        warn!("{} of {} embeddings failed", failures, rows.len());
    }
    entries
}
