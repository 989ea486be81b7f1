use super::*;

fn summary(cluster_id: usize, text: &str) -> ClusterSummary {
    ClusterSummary {
        cluster_id,
        size: 10,
        top_samples: Vec::new(),
        summary: text.to_string(),
    }
}

#[test]
fn browsing_intent_is_kept() {
    assert!(should_keep_prototype(
        "Shoppers compare realistic silicone dolls by size and hair."
    ));
    assert!(should_keep_prototype(""));
}

#[test]
fn unambiguous_keywords_reject_regardless_of_context() {
    assert!(!should_keep_prototype("Users mostly ask about Order Tracking."));
    assert!(!should_keep_prototype("该聚类与订单查询有关"));
    assert!(!should_keep_prototype("Questions around account management"));
}

#[test]
fn focus_phrase_near_keyword_rejects() {
    assert!(!should_keep_prototype("该群体的核心需求是售后服务"));
    assert!(!should_keep_prototype(
        "The main focus is the delivery status of parcels"
    ));
}

#[test]
fn ambiguous_keyword_without_focus_is_kept() {
    assert!(should_keep_prototype(
        "Buyers browse outfits; some mention after-sale care tips for dolls."
    ));
}

#[test]
fn focus_phrase_outside_window_is_ignored() {
    let padding = "x".repeat(60);
    let text = format!("main focus {padding} after-sale");
    assert!(should_keep_prototype(&text));

    let close = format!("main focus {} after-sale", "x".repeat(30));
    assert!(!should_keep_prototype(&close));
}

#[test]
fn window_is_measured_in_characters() {
    // 45 CJK characters are 135 bytes but still inside the 50 character window
    let text = format!("专注于{}售后", "娃".repeat(45));
    assert!(!should_keep_prototype(&text));
}

#[test]
fn prefilter_counts_dropped_clusters() {
    let summaries = vec![
        summary(0, "dolls with heartbeat"),
        summary(1, "order tracking questions"),
        summary(2, "gift ideas"),
    ];
    let (kept, dropped) = prefilter(summaries);
    assert_eq!(dropped, 1);
    let ids: Vec<usize> = kept.iter().map(|c| c.cluster_id).collect();
    assert_eq!(ids, vec![0, 2]);
}
