use super::*;
use crate::embeddings::vector::l2_norm;
use std::fs;
use tempfile::TempDir;

fn write_file(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).expect("should write test file");
    path
}

#[test]
fn load_skips_missing_vectors() {
    let dir = TempDir::new().expect("should create TempDir");
    let path = write_file(
        &dir,
        "embeddings.json",
        r#"[
            {"id": "\"a\"", "output": "first", "embedding": [1.0, 0.0], "embedding_dim": 2},
            {"id": "b", "output": "second", "embedding": null, "embedding_dim": 0},
            {"id": "c", "output": "third", "embedding_dim": 0},
            {"id": "d", "output": "fourth", "embedding": [0.0, 1.0], "embedding_dim": 2}
        ]"#,
    );

    let records = load_embeddings(&path).expect("embeddings should load");
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].id, "a");
    assert_eq!(records[0].preview_text, "first");
    assert_eq!(records[1].id, "d");
}

#[test]
fn load_rejects_malformed_json() {
    let dir = TempDir::new().expect("should create TempDir");
    let path = write_file(&dir, "broken.json", "[{\"id\": ");

    let err = load_embeddings(&path).expect_err("malformed JSON must fail");
    match err {
        IntentError::Data { path: p, .. } => assert!(p.ends_with("broken.json")),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn load_rejects_missing_file() {
    let dir = TempDir::new().expect("should create TempDir");
    let result = load_embeddings(dir.path().join("absent.json"));
    assert!(matches!(result, Err(IntentError::Data { .. })));
}

#[test]
fn load_rejects_dimension_mismatch() {
    let dir = TempDir::new().expect("should create TempDir");
    let path = write_file(
        &dir,
        "mixed.json",
        r#"[
            {"id": "a", "output": "", "embedding": [1.0, 0.0]},
            {"id": "b", "output": "", "embedding": [1.0, 0.0, 0.0]}
        ]"#,
    );
    assert!(matches!(load_embeddings(&path), Err(IntentError::Data { .. })));
}

#[test]
fn ensure_normalized_produces_unit_rows() {
    let vectors = vec![
        vec![3.0, 4.0],
        vec![0.0, 0.0],
        vec![10.0, 0.0],
        vec![0.5, 0.5],
    ];
    let out = ensure_normalized(vectors);

    for (i, row) in out.iter().enumerate() {
        if i == 1 {
            assert_eq!(row, &vec![0.0, 0.0], "zero rows pass through");
        } else {
            assert!((l2_norm(row) - 1.0).abs() < 1e-2, "row {i} not unit length");
        }
    }
}

#[test]
fn ensure_normalized_leaves_normalized_input_alone() {
    let vectors = vec![vec![1.0, 0.0], vec![0.0, 1.0]];
    let out = ensure_normalized(vectors.clone());
    assert_eq!(out, vectors);
}

#[test]
fn normalization_check_only_samples_leading_rows() {
    // Known limitation: a bad row past the sampled head goes unnoticed.
    let mut vectors = vec![vec![1.0, 0.0]; NORMALIZATION_SAMPLE_ROWS];
    vectors.push(vec![5.0, 0.0]);

    assert!(!needs_normalization(&vectors));
    let out = ensure_normalized(vectors);
    assert_eq!(out[NORMALIZATION_SAMPLE_ROWS], vec![5.0, 0.0]);
}

#[test]
fn full_outputs_replace_previews() {
    let records = vec![
        EmbeddingRecord {
            id: "a".to_string(),
            preview_text: "short...".to_string(),
            vector: vec![1.0],
        },
        EmbeddingRecord {
            id: "b".to_string(),
            preview_text: "kept".to_string(),
            vector: vec![1.0],
        },
    ];
    let mut outputs = HashMap::new();
    outputs.insert("a".to_string(), "short but now complete".to_string());

    let updated = apply_full_outputs(records, &outputs);
    assert_eq!(updated[0].preview_text, "short but now complete");
    assert_eq!(updated[1].preview_text, "kept");
}

#[test]
fn full_outputs_missing_csv_is_not_fatal() {
    let dir = TempDir::new().expect("should create TempDir");
    let outputs = load_full_outputs(dir.path().join("missing.csv"));
    assert!(outputs.is_empty());
}

#[test]
fn normalize_records_keeps_ids_aligned() {
    let records = vec![
        EmbeddingRecord {
            id: "x".to_string(),
            preview_text: "px".to_string(),
            vector: vec![2.0, 0.0],
        },
        EmbeddingRecord {
            id: "y".to_string(),
            preview_text: "py".to_string(),
            vector: vec![0.0, 4.0],
        },
    ];
    let out = normalize_records(records);
    assert_eq!(out[0].id, "x");
    assert_eq!(out[0].vector, vec![1.0, 0.0]);
    assert_eq!(out[1].id, "y");
    assert_eq!(out[1].vector, vec![0.0, 1.0]);
}

#[test]
fn csv_export_sits_next_to_json() {
    assert_eq!(
        embeddings_csv_path("data/output_embeddings.json"),
        std::path::PathBuf::from("data/output_embeddings_embeddings.csv")
    );
    assert_eq!(
        embeddings_csv_path("vectors.json"),
        std::path::PathBuf::from("vectors_embeddings.csv")
    );
}

#[test]
fn csv_export_keeps_failed_rows() {
    let dir = TempDir::new().expect("should create TempDir");
    let path = dir.path().join("out").join("e_embeddings.csv");
    let entries = vec![
        EmbeddingEntry {
            id: "a".to_string(),
            output: "doll, \"reborn\"".to_string(),
            embedding: Some(vec![0.5, -0.25]),
            embedding_dim: 2,
        },
        EmbeddingEntry {
            id: "b".to_string(),
            output: String::new(),
            embedding: None,
            embedding_dim: 0,
        },
    ];
    write_embeddings_csv(&path, &entries).expect("csv should be written");

    let mut reader = csv::Reader::from_path(&path).expect("csv should open");
    let headers = reader.headers().expect("headers").clone();
    assert_eq!(
        headers.iter().collect::<Vec<_>>(),
        vec!["id", "output_preview", "embedding_json", "embedding_dim"]
    );
    let rows: Vec<csv::StringRecord> = reader
        .records()
        .collect::<std::result::Result<_, _>>()
        .expect("rows should parse");
    assert_eq!(rows.len(), 2);
    assert_eq!(&rows[0][1], "doll, \"reborn\"");
    assert_eq!(&rows[0][2], "[0.5,-0.25]");
    assert_eq!(&rows[0][3], "2");
    assert_eq!(&rows[1][2], "");
    assert_eq!(&rows[1][3], "0");
}
