//! Narrative summaries of clusters.
//!
//! Each cluster is described to the text-generation service through its most
//! representative samples. Samples that are JSON intent records are condensed to
//! their core interests and search queries; anything else is cut to a prefix. The
//! service is called once per cluster and a failure degrades to a placeholder
//! summary instead of aborting the run.


use std::thread;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::clustering::{ClusterFit, top_similar_samples};
use crate::embeddings::{EmbeddingRecord, TextGenerator};

pub const PREVIEW_CHARS: usize = 200;
pub const SAMPLE_TEXT_CHARS: usize = 300;
pub const MAX_PROMPT_SAMPLES: usize = 10;
pub const DEFAULT_REQUEST_DELAY: Duration = Duration::from_millis(500);
const MAX_HINTS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopSample {
    pub id: String,
    pub output_preview: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterSummary {
    pub cluster_id: usize,
    pub size: usize,
    pub top_samples: Vec<TopSample>,
    pub summary: String,
}

/// Summaries for every cluster of a fit, plus the clusters that fell back to a
/// placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryBatch {
    pub summaries: Vec<ClusterSummary>,
    /// `(cluster_id, error)` for each failed summary request.
    pub failures: Vec<(usize, String)>,
}

/// A distinguishing feature and the keywords that reveal it.
///
/// `exact` keywords are matched case-sensitively; `folded` ones against the
/// lower-cased text.
struct HintRule {
    exact: &'static [&'static str],
    folded: &'static [&'static str],
    hint: &'static str,
}

impl HintRule {
    fn matches(&self, text: &str, lower: &str) -> bool {
        self.exact.iter().any(|k| text.contains(k)) || self.folded.iter().any(|k| lower.contains(k))
    }
}

/// Rules in report order.
const HINT_RULES: &[HintRule] = &[
    HintRule {
        exact: &["订单", "Order"],
        folded: &["tracking"],
        hint: "order management",
    },
    HintRule {
        exact: &["账户", "Account", "Login"],
        folded: &[],
        hint: "account related",
    },
    HintRule {
        exact: &["心跳"],
        folded: &["heartbeat"],
        hint: "interactive features",
    },
    HintRule {
        exact: &["收藏", "Collectible"],
        folded: &[],
        hint: "collectible value",
    },
    HintRule {
        exact: &["配件", "Accessories"],
        folded: &[],
        hint: "accessory needs",
    },
];

/// First `max` characters of `text`.
#[inline]
pub fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// Condense one sample for the prompt.
///
/// JSON objects with an `intent` section contribute up to three core interests and
/// two search queries; everything else is cut to [`SAMPLE_TEXT_CHARS`] characters.
#[inline]
pub fn condense_sample(text: &str) -> String {
    if text.trim_start().starts_with('{') {
        if let Some(condensed) = condense_intent_json(text) {
            return condensed;
        }
    }
    truncate_chars(text, SAMPLE_TEXT_CHARS)
}

fn condense_intent_json(text: &str) -> Option<String> {
    let value: Value = serde_json::from_str(text).ok()?;
    let intent = value.as_object()?.get("intent")?;

    let strings = |key: &str, limit: usize| -> Vec<&str> {
        intent
            .get(key)
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Value::as_str).take(limit).collect())
            .unwrap_or_default()
    };

    let interests = strings("core_interests", 3);
    let queries = strings("search_queries", 2);

    let mut parts = Vec::new();
    if !interests.is_empty() {
        parts.push(format!("Core interests: {}", interests.join(", ")));
    }
    if !queries.is_empty() {
        parts.push(format!("Search queries: {}", queries.join(", ")));
    }

    (!parts.is_empty()).then(|| parts.join(" | "))
}

/// Distinguishing features present in the condensed samples.
///
/// Matches are collected per sample in rule order; the first three are kept and then
/// deduplicated, so repeated matches can leave fewer than three hints.
#[inline]
pub fn hint_features(sample_texts: &[String]) -> Vec<&'static str> {
    sample_texts
        .iter()
        .flat_map(|text| {
            let lower = text.to_lowercase();
            HINT_RULES
                .iter()
                .filter(move |rule| rule.matches(text, &lower))
                .map(|rule| rule.hint)
        })
        .take(MAX_HINTS)
        .unique()
        .collect()
}

/// Build the summary prompt for a cluster's representative sample texts.
#[inline]
pub fn build_prompt<S: AsRef<str>>(samples: &[S]) -> String {
    let condensed: Vec<String> = samples
        .iter()
        .take(MAX_PROMPT_SAMPLES)
        .map(|s| condense_sample(s.as_ref()))
        .collect();

    let hints = hint_features(&condensed);
    let observed = if hints.is_empty() {
        "identify them from the samples".to_string()
    } else {
        hints.join(", ")
    };

    let samples_text = condensed
        .iter()
        .enumerate()
        .map(|(i, text)| format!("Sample {}: {}", i + 1, text))
        .join("\n");

    format!(
        "You are analyzing one cluster of user intents. Write a concise but highly \
distinguishing summary of the cluster in 2-3 sentences.

**Requirements:**
1. **Stress what is unique**: name the core traits that set this cluster apart from the others. \
Avoid generic descriptions that would fit almost every cluster.
2. **Be specific**: use concrete product attributes, user behaviors, usage scenarios and special needs.
3. **No overlap**: do not use broad descriptions other clusters could share.
4. **Highlight differences**: call out any special keywords, behavior patterns or concerns in the samples.

**Observed features of this cluster:** {observed}

**Samples:**
{samples_text}

**Output format:**
**Cluster Summary:**

[your summary, emphasizing what distinguishes this cluster from the others]"
    )
}

/// Summary used when the service cannot produce one.
#[inline]
pub fn placeholder_summary(sample_count: usize) -> String {
    format!("Cluster contains {sample_count} samples")
}

/// Calls the text-generation service for cluster summaries, pacing requests.
pub struct Summarizer<'a> {
    generator: &'a dyn TextGenerator,
    delay: Duration,
}

impl<'a> Summarizer<'a> {
    #[inline]
    pub fn new(generator: &'a dyn TextGenerator) -> Self {
        Self {
            generator,
            delay: DEFAULT_REQUEST_DELAY,
        }
    }

    #[inline]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Request a summary for one cluster's sample texts.
    #[inline]
    pub fn try_summarize<S: AsRef<str>>(&self, samples: &[S]) -> crate::Result<String> {
        let prompt = build_prompt(samples);
        let summary = self.generator.generate(&prompt)?;
        Ok(summary.trim().to_string())
    }

    /// Summarize one cluster from its sample texts. Never fails: errors are logged
    /// and replaced by [`placeholder_summary`].
    #[inline]
    pub fn summarize<S: AsRef<str>>(&self, samples: &[S]) -> String {
        if samples.is_empty() {
            return placeholder_summary(0);
        }

        self.try_summarize(samples).unwrap_or_else(|e| {
            warn!("Summary generation failed: {}", e);
            placeholder_summary(samples.len())
        })
    }

    /// Sample, summarize and describe every cluster of a fit.
    ///
    /// `records` must be index-aligned with the vectors the fit was computed on. A
    /// failed request leaves a placeholder summary and is listed in
    /// [`SummaryBatch::failures`].
    #[inline]
    pub fn summarize_clusters(
        &self,
        records: &[EmbeddingRecord],
        vectors: &[Vec<f32>],
        fit: &ClusterFit,
        top_n: usize,
    ) -> SummaryBatch {
        let bar = if console::user_attended_stderr() {
            ProgressBar::new(fit.k as u64).with_style(
                ProgressStyle::with_template("{bar:30} [{pos}/{len}] summarizing {msg}")
                    .expect("style template is valid"),
            )
        } else {
            ProgressBar::hidden()
        };

        let mut summaries = Vec::with_capacity(fit.k);
        let mut failures = Vec::new();
        let mut requested = false;

        for centroid in &fit.centroids {
            let cluster_id = centroid.cluster_id;
            bar.set_message(format!("cluster {cluster_id}"));

            let members = fit.members(cluster_id);
            let top = top_similar_samples(vectors, &members, &centroid.vector, top_n);
            let texts: Vec<&str> = top
                .iter()
                .map(|&i| records[i].preview_text.as_str())
                .collect();

            let summary = if texts.is_empty() {
                debug!("Cluster {} is empty, skipping summary request", cluster_id);
                placeholder_summary(0)
            } else {
                if requested && !self.delay.is_zero() {
                    thread::sleep(self.delay);
                }
                requested = true;
                self.try_summarize(&texts).unwrap_or_else(|e| {
                    warn!("Summary generation failed for cluster {}: {}", cluster_id, e);
                    failures.push((cluster_id, e.to_string()));
                    placeholder_summary(texts.len())
                })
            };

            info!(
                "Cluster {}: {} members, summary: {}",
                cluster_id,
                members.len(),
                truncate_chars(&summary, 100)
            );

            summaries.push(ClusterSummary {
                cluster_id,
                size: members.len(),
                top_samples: top
                    .iter()
                    .map(|&i| TopSample {
                        id: records[i].id.clone(),
                        output_preview: truncate_chars(&records[i].preview_text, PREVIEW_CHARS),
                    })
                    .collect(),
                summary,
            });
            bar.inc(1);
        }
        bar.finish_and_clear();

        SummaryBatch {
            summaries,
            failures,
        }
    }
}
