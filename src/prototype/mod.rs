//! Intent prototypes.
//!
//! A prototype is the reusable description of one merged cluster: its narrative,
//! the interests and behaviors read off the summary, product alignment derived from
//! shop metadata, and marketing suggestions. Text features come from ordered keyword
//! tables in [`rules`].

pub mod filter;
pub mod metadata;
pub mod rules;


use serde::{Deserialize, Serialize};

use crate::merge::MergedCluster;

pub use filter::{prefilter, should_keep_prototype};
pub use metadata::{MetadataIndex, MetadataSummary, RecordMetadata};

pub const MAX_RELEVANT_TAGS: usize = 20;
const SUMMARY_HEADINGS: &[&str] = &["**聚类摘要：**", "**Cluster Summary:**"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntentStrength {
    High,
    Medium,
    Low,
}

impl IntentStrength {
    #[inline]
    pub fn from_size(size: usize) -> Self {
        if size > 100 {
            Self::High
        } else if size > 50 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentDescription {
    pub summary: String,
    pub full_summary: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIntentCharacteristics {
    pub primary_interests: Vec<String>,
    pub user_behavior_patterns: Vec<String>,
    pub intent_strength: IntentStrength,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductAlignment {
    pub relevant_tags: Vec<String>,
    pub product_categories: Vec<String>,
    pub key_product_attributes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopContext {
    pub shop_ids: Vec<String>,
    pub shop_types: Vec<String>,
    pub shop_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketingInsights {
    pub target_audience: Vec<String>,
    pub content_strategy: Vec<String>,
    pub conversion_opportunities: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LongTermValue {
    pub asset_type: String,
    pub update_frequency: String,
    pub applicable_channels: Vec<String>,
    pub data_sources: Vec<String>,
}

impl Default for LongTermValue {
    #[inline]
    fn default() -> Self {
        let strings =
            |items: &[&str]| -> Vec<String> { items.iter().map(|s| (*s).to_string()).collect() };
        Self {
            asset_type: "user_intent_prototype".to_string(),
            update_frequency: "monthly".to_string(),
            applicable_channels: strings(&[
                "search",
                "recommendation",
                "personalization",
                "content_marketing",
            ]),
            data_sources: strings(&["user_behavior", "search_queries", "product_interactions"]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentPrototype {
    pub intent_cluster_id: usize,
    pub cluster_size: usize,
    pub intent_description: IntentDescription,
    pub user_intent_characteristics: UserIntentCharacteristics,
    pub product_alignment: ProductAlignment,
    pub shop_context: ShopContext,
    pub marketing_insights: MarketingInsights,
    pub long_term_value: LongTermValue,
    pub is_merged: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merged_from_clusters: Option<Vec<usize>>,
}

fn strip_headings(summary: &str) -> String {
    SUMMARY_HEADINGS
        .iter()
        .fold(summary.to_string(), |text, heading| text.replace(heading, ""))
}

/// Summary text without the heading and bold markup.
#[inline]
pub fn clean_summary(summary: &str) -> String {
    strip_headings(summary).replace("**", "").trim().to_string()
}

/// Build the prototype for a merged cluster from its summary and shop metadata.
#[inline]
pub fn assemble_prototype(cluster: &MergedCluster, metadata: &MetadataSummary) -> IntentPrototype {
    let summary = clean_summary(&cluster.summary);
    let main_description = summary.lines().next().unwrap_or_default().to_string();
    let top_tags = metadata.top_tags(MAX_RELEVANT_TAGS);

    IntentPrototype {
        intent_cluster_id: cluster.primary_id,
        cluster_size: cluster.size,
        intent_description: IntentDescription {
            summary: main_description,
            full_summary: summary.clone(),
        },
        user_intent_characteristics: UserIntentCharacteristics {
            primary_interests: rules::key_phrases(&strip_headings(&cluster.summary)),
            user_behavior_patterns: rules::behavior_patterns(&cluster.summary, cluster.size),
            intent_strength: IntentStrength::from_size(cluster.size),
        },
        product_alignment: ProductAlignment {
            product_categories: rules::product_categories(&summary, &top_tags),
            key_product_attributes: rules::product_attributes(&summary),
            relevant_tags: top_tags.clone(),
        },
        shop_context: ShopContext {
            shop_count: metadata.shop_ids.len(),
            shop_ids: metadata.shop_ids.clone(),
            shop_types: metadata.shop_types.clone(),
        },
        marketing_insights: MarketingInsights {
            target_audience: rules::target_audience(&summary),
            content_strategy: rules::content_strategy(&summary, &top_tags),
            conversion_opportunities: rules::conversion_opportunities(
                &cluster.summary,
                cluster.size,
            ),
        },
        long_term_value: LongTermValue::default(),
        is_merged: cluster.is_merged(),
        merged_from_clusters: cluster
            .is_merged()
            .then(|| cluster.merged_from_ids.clone()),
    }
}
