use super::*;
use crate::IntentError;
use std::fs;
use tempfile::TempDir;

fn config_in(dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.paths.input_csv = dir.path().join("source.csv");
    config.paths.embeddings = dir.path().join("embeddings.json");
    config.paths.results_dir = dir.path().join("results");
    config
}

#[test]
fn status_reports_missing_files() {
    let dir = TempDir::new().expect("should create TempDir");
    let path = dir.path().join("cluster_results.json");
    let line = status_line(
        "Cluster results",
        &path,
        read_json::<ClusterResults, _>(&path),
        |_| "loaded".to_string(),
    );
    assert!(line.starts_with("Cluster results: "));
    assert!(line.ends_with("(missing)"));
}

#[test]
fn status_shows_why_a_present_file_failed() {
    let dir = TempDir::new().expect("should create TempDir");
    let path = dir.path().join("cluster_results.json");
    fs::write(&path, "{ not json").expect("should write file");

    let line = status_line(
        "Cluster results",
        &path,
        read_json::<ClusterResults, _>(&path),
        |_| "loaded".to_string(),
    );
    assert!(!line.contains("(missing)"));
    assert!(line.contains("unreadable"));
    assert!(line.contains("malformed JSON"));
}

#[test]
fn status_describes_loaded_artifacts() {
    let path = Path::new("anything.json");
    let line = status_line("Prototypes", path, Ok::<_, IntentError>(3_usize), |n| {
        format!("{n} prototypes")
    });
    assert_eq!(line, "Prototypes: 3 prototypes");
}

#[test]
fn analysis_is_written_to_results_dir() {
    let dir = TempDir::new().expect("should create TempDir");
    let config = config_in(&dir);
    fs::write(
        &config.paths.input_csv,
        "id,shop_id,cluster_hit,summary\n\
         a,s1,0,\"{\"\"core_interests\"\": [\"\"dolls\"\"]}\"\n\
         b,s2,0,{oops\n\
         c,s3,,\n\
         d,s1,1,\"{\"\"core_interests\"\": [\"\"gifts\"\"]}\"\n",
    )
    .expect("should write csv");

    let report = analyze_clusters(&config).expect("analysis should succeed");
    assert_eq!(report.total_clusters, 2);
    assert_eq!(report.cluster_analyses["0"].size, 2);
    assert_eq!(report.cluster_analyses["0"].parse_failures, vec!["b"]);

    let saved: AnalysisReport =
        read_json(config.cluster_analysis_path()).expect("analysis should be on disk");
    assert_eq!(saved, report);
}

#[test]
fn analysis_requires_the_input_csv() {
    let dir = TempDir::new().expect("should create TempDir");
    assert!(analyze_clusters(&config_in(&dir)).is_err());
}
