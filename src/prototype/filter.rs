// Pre-filter for clusters about account, order and settings maintenance
// Only browsing-to-purchase intents become prototypes

#[cfg(test)]
mod tests;

use tracing::info;

use crate::summary::{ClusterSummary, truncate_chars};

const CONTEXT_CHARS: usize = 50;

const ACCOUNT_KEYWORDS: &[&str] = &[
    "账户管理",
    "account management",
    "登录/密码",
    "login/password",
    "password reset",
    "密码重置",
    "账户安全",
    "account security",
    "账户访问",
    "account access",
    "账户历史",
    "account history",
];

const ORDER_KEYWORDS: &[&str] = &[
    "订单查询",
    "order query",
    "订单追踪",
    "order tracking",
    "订单管理",
    "order management",
    "查单",
    "查询订单",
    "订单状态",
    "order status",
    "配送状态",
    "delivery status",
    "交易生命周期",
    "transaction lifecycle",
    "订单的生命周期",
    "既有订单",
    "existing order",
    "past purchases",
    "历史购买",
    "购买后跟进",
    "post-purchase",
    "售后",
    "after-sale",
];

const SETTINGS_KEYWORDS: &[&str] = &[
    "个人设置",
    "personal setting",
    "账户设置",
    "account setting",
    "偏好设置",
    "preference setting",
];

/// Phrases marking a keyword as the cluster's main focus.
const FOCUS_PHRASES: &[&str] = &[
    "核心关注点在于",
    "主要关注点",
    "核心驱动力",
    "核心需求",
    "意图明确指向",
    "意图高度聚焦于",
    "专注于",
    "main focus",
    "primary focus",
    "core need",
    "focused on",
];

/// Keyword fragments unambiguous enough to exclude on their own.
const UNAMBIGUOUS_FRAGMENTS: &[&str] = &["管理", "management", "追踪", "tracking", "查询", "query"];

/// Whether a cluster summary describes a browsing or purchasing intent worth keeping.
///
/// A summary is rejected when an exclusion keyword appears within 50 characters of a
/// focus phrase, or when the matched keyword is itself unambiguous (management,
/// tracking, query). Only the first occurrence of each keyword is inspected.
#[inline]
pub fn should_keep_prototype(summary: &str) -> bool {
    let lower = summary.to_lowercase();

    for keyword in ACCOUNT_KEYWORDS
        .iter()
        .chain(ORDER_KEYWORDS)
        .chain(SETTINGS_KEYWORDS)
    {
        let Some(byte_pos) = lower.find(keyword) else {
            continue;
        };

        let context = context_window(&lower, byte_pos, keyword.chars().count());
        if FOCUS_PHRASES.iter().any(|phrase| context.contains(phrase)) {
            return false;
        }

        if UNAMBIGUOUS_FRAGMENTS.iter().any(|f| keyword.contains(f)) {
            return false;
        }
    }

    true
}

fn context_window(text: &str, byte_pos: usize, keyword_chars: usize) -> String {
    let char_pos = text[..byte_pos].chars().count();
    let start = char_pos.saturating_sub(CONTEXT_CHARS);
    let end = char_pos + keyword_chars + CONTEXT_CHARS;
    text.chars().skip(start).take(end - start).collect()
}

/// Split summaries into those kept and the number filtered out, preserving order.
#[inline]
pub fn prefilter(summaries: Vec<ClusterSummary>) -> (Vec<ClusterSummary>, usize) {
    let total = summaries.len();
    let kept: Vec<ClusterSummary> = summaries
        .into_iter()
        .filter(|cluster| {
            let keep = should_keep_prototype(&cluster.summary);
            if !keep {
                info!(
                    "Filtered out cluster {}: {}...",
                    cluster.cluster_id,
                    truncate_chars(&cluster.summary, 80).replace('\n', " ")
                );
            }
            keep
        })
        .collect();

    let dropped = total - kept.len();
    (kept, dropped)
}
