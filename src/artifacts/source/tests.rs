use super::*;
use std::fs;
use tempfile::TempDir;

#[test]
fn reads_quoted_json_columns() {
    let dir = TempDir::new().expect("should create TempDir");
    let path = dir.path().join("source.csv");
    fs::write(
        &path,
        "id,output,metadata\n\
         \"\"\"r1\"\"\",\"{\"\"intent\"\": {\"\"core_interests\"\": [\"\"a\"\", \"\"b\"\"]}}\",\"{\"\"shop_id\"\": 7}\"\n\
         r2,plain text,\n",
    )
    .expect("should write csv");

    let rows = read_source_records(&path).expect("csv should parse");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].id, "\"r1\"");
    assert_eq!(rows[0].output, r#"{"intent": {"core_interests": ["a", "b"]}}"#);
    assert_eq!(rows[0].metadata, r#"{"shop_id": 7}"#);
    assert_eq!(rows[0].summary, "");
    assert_eq!(rows[1].output, "plain text");
}

#[test]
fn missing_file_is_data_error() {
    let dir = TempDir::new().expect("should create TempDir");
    let result = read_source_records(dir.path().join("nope.csv"));
    assert!(matches!(result, Err(IntentError::Data { .. })));
}

#[test]
fn analysis_columns_are_read_by_name() {
    let dir = TempDir::new().expect("should create TempDir");
    let path = dir.path().join("source.csv");
    fs::write(
        &path,
        "id,shop_id,cluster_hit,summary,extra\n\
         r1,s9,3,\"{\"\"core_interests\"\": [\"\"dolls\"\"]}\",ignored\n",
    )
    .expect("should write csv");

    let rows = read_source_records(&path).expect("csv should parse");
    assert_eq!(rows[0].cluster_hit, "3");
    assert_eq!(rows[0].shop_id, "s9");
    assert_eq!(rows[0].summary, r#"{"core_interests": ["dolls"]}"#);
    assert_eq!(rows[0].output, "");
}
