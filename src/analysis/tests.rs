use super::*;
use serde_json::json;

fn row(id: &str, cluster_hit: &str, shop_id: &str, summary: &str) -> SourceRecord {
    SourceRecord {
        id: id.to_string(),
        cluster_hit: cluster_hit.to_string(),
        shop_id: shop_id.to_string(),
        summary: summary.to_string(),
        ..SourceRecord::default()
    }
}

fn digest(interests: &[&str], attributes: &[&str], engagement: &str, stage: &str) -> String {
    json!({
        "core_interests": interests,
        "product_focus": {"key_attributes": attributes},
        "behavior_summary": {"engagement": engagement},
        "purchase_signals": {"stage": stage},
    })
    .to_string()
}

#[test]
fn most_common_orders_by_count_then_first_seen() {
    let items = ["b", "a", "c", "a", "b", "d"].map(str::to_string);
    assert_eq!(
        most_common(items, 3),
        vec![("b".to_string(), 2), ("a".to_string(), 2), ("c".to_string(), 1)]
    );
    assert!(most_common(Vec::<String>::new(), 5).is_empty());
}

#[test]
fn summary_must_be_a_json_object() {
    assert!(parse_record_summary("r1", r#"{"core_interests": []}"#).is_ok());
    assert!(matches!(
        parse_record_summary("r2", "{broken"),
        Err(IntentError::Parse { record, .. }) if record == "r2"
    ));
    assert!(matches!(
        parse_record_summary("r3", "[1, 2]"),
        Err(IntentError::Parse { .. })
    ));
}

#[test]
fn rows_without_assignment_are_ignored() {
    let records = vec![
        row("a", "2", "", ""),
        row("b", "", "", ""),
        row("c", " 10 ", "", ""),
        row("d", "2", "", ""),
    ];
    let groups = group_by_cluster(&records);

    assert_eq!(groups.keys().collect::<Vec<_>>(), vec!["10", "2"]);
    let ids: Vec<&str> = groups["2"].iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "d"]);
}

#[test]
fn cluster_tallies_interests_shops_and_stages() {
    let records = vec![
        row(
            "a",
            "1",
            "s1",
            &digest(&["reborn dolls", "silicone"], &["realistic"], "high", "browsing"),
        ),
        row(
            "b",
            "1",
            "s2",
            &digest(&["reborn dolls"], &["realistic", "weighted"], "high", "comparing"),
        ),
        row("c", "1", "s3", "{not json"),
        row("d", "1", "s1", ""),
        row("e", "1", "s1", &digest(&["gifts"], &[], "low", "browsing")),
    ];
    let members: Vec<&SourceRecord> = records.iter().collect();
    let analysis = analyze_cluster("1", &members);

    assert_eq!(analysis.size, 5);
    assert_eq!(analysis.top_interests[0], ("reborn dolls".to_string(), 2));
    assert_eq!(analysis.top_interests.len(), 3);
    assert_eq!(
        analysis.top_attributes,
        vec![("realistic".to_string(), 2), ("weighted".to_string(), 1)]
    );
    // unparsed and empty summaries contribute no shop
    assert_eq!(
        analysis.top_shops,
        vec![("s1".to_string(), 2), ("s2".to_string(), 1)]
    );
    assert_eq!(analysis.engagement_levels, vec!["high", "low"]);
    assert_eq!(analysis.purchase_stages, vec!["browsing", "comparing"]);
    assert_eq!(analysis.sample_summaries.len(), 3);
    assert_eq!(analysis.parse_failures, vec!["c"]);
}

#[test]
fn missing_sections_are_skipped() {
    let records = vec![row("\"a\"", "4", "", r#"{"product_focus": {}}"#)];
    let members: Vec<&SourceRecord> = records.iter().collect();
    let analysis = analyze_cluster("4", &members);

    assert!(analysis.top_interests.is_empty());
    assert!(analysis.top_attributes.is_empty());
    assert!(analysis.engagement_levels.is_empty());
    assert!(analysis.purchase_stages.is_empty());
    assert_eq!(analysis.sample_summaries, vec![json!({"product_focus": {}})]);
}

#[test]
fn report_covers_every_assigned_cluster() {
    let records = vec![
        row("a", "7", "s1", &digest(&["x"], &[], "high", "browsing")),
        row("b", "3", "", ""),
        row("c", "", "", &digest(&["y"], &[], "low", "buying")),
    ];
    let report = analyze_records(&records);

    assert_eq!(report.total_clusters, 2);
    assert_eq!(report.cluster_analyses["7"].size, 1);
    assert_eq!(report.cluster_analyses["3"].sample_summaries.len(), 0);

    let value = serde_json::to_value(&report).expect("report serializes");
    assert_eq!(value["cluster_analyses"]["7"]["top_interests"], json!([["x", 1]]));
}
