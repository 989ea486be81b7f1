use super::*;
use tempfile::TempDir;

#[test]
fn default_config() {
    let config = Config::default();
    assert_eq!(config.gemini.generation_model, "models/gemini-flash-lite-latest");
    assert_eq!(config.gemini.embedding_model, "models/text-embedding-004");
    assert_eq!(config.gemini.api_key_env, "GEMINI_API_KEY");
    assert_eq!(config.gemini.request_delay_ms, 500);
    assert_eq!(config.gemini.retry_attempts, 3);
    assert_eq!(config.clustering.k_range(), 2..21);
    assert_eq!(config.clustering.sample_size, 10_000);
    assert_eq!(config.clustering.silhouette_sample_size, 5_000);
    assert_eq!(config.clustering.batch_size, 1000);
    assert_eq!(config.clustering.n_init, 10);
    assert_eq!(config.clustering.seed, 42);
    assert_eq!(config.clustering.top_n, 10);
    assert!((config.merge.similarity_threshold - 0.98).abs() < f32::EPSILON);
}

#[test]
fn defaults_validate() {
    assert!(Config::default().validate().is_ok());
}

#[test]
fn config_validation() {
    let config = Config::default();

    let mut invalid = config.clone();
    invalid.gemini.base_url = "not a url".to_string();
    assert!(matches!(invalid.validate(), Err(ConfigError::InvalidUrl(_))));

    let mut invalid = config.clone();
    invalid.gemini.base_url = "ftp://example.com".to_string();
    assert!(matches!(invalid.validate(), Err(ConfigError::InvalidUrl(_))));

    let mut invalid = config.clone();
    invalid.gemini.generation_model = "gemini-pro".to_string();
    assert!(matches!(invalid.validate(), Err(ConfigError::InvalidModel(_))));

    let mut invalid = config.clone();
    invalid.gemini.api_key_env = "  ".to_string();
    assert!(matches!(
        invalid.validate(),
        Err(ConfigError::InvalidApiKeyEnv(_))
    ));

    let mut invalid = config.clone();
    invalid.gemini.timeout_seconds = 0;
    assert!(matches!(invalid.validate(), Err(ConfigError::InvalidTimeout(0))));

    let mut invalid = config.clone();
    invalid.gemini.retry_attempts = 0;
    assert!(matches!(
        invalid.validate(),
        Err(ConfigError::InvalidRetryAttempts(0))
    ));

    let mut invalid = config.clone();
    invalid.gemini.retry_attempts = 11;
    assert!(matches!(
        invalid.validate(),
        Err(ConfigError::InvalidRetryAttempts(11))
    ));

    let mut invalid = config.clone();
    invalid.clustering.min_k = 1;
    assert!(matches!(
        invalid.validate(),
        Err(ConfigError::InvalidKRange(1, 21))
    ));

    let mut invalid = config.clone();
    invalid.clustering.max_k = 2;
    assert!(matches!(
        invalid.validate(),
        Err(ConfigError::InvalidKRange(2, 2))
    ));

    let mut invalid = config.clone();
    invalid.clustering.n_init = 0;
    assert!(matches!(invalid.validate(), Err(ConfigError::InvalidNInit(0))));

    let mut invalid = config.clone();
    invalid.clustering.top_n = 0;
    assert!(matches!(invalid.validate(), Err(ConfigError::InvalidTopN(0))));

    let mut invalid = config.clone();
    invalid.merge.similarity_threshold = 1.5;
    assert!(matches!(
        invalid.validate(),
        Err(ConfigError::InvalidSimilarityThreshold(_))
    ));

    let mut invalid = config;
    invalid.merge.similarity_threshold = f32::NAN;
    assert!(invalid.validate().is_err());
}

#[test]
fn toml_serialization() {
    let config = Config::default();
    let toml_str = toml::to_string(&config).expect("should serialize toml correctly");
    let mut parsed: Config = toml::from_str(&toml_str).expect("should parse toml correctly");
    parsed.base_dir = config.base_dir.clone();
    assert_eq!(config, parsed);
}

#[test]
fn partial_toml_uses_section_defaults() {
    let partial = r#"
        [clustering]
        min_k = 4
        max_k = 12

        [merge]
        similarity_threshold = 0.9
    "#;

    let config: Config = toml::from_str(partial).expect("should parse partial toml");
    assert_eq!(config.clustering.k_range(), 4..12);
    assert_eq!(config.clustering.seed, 42);
    assert!((config.merge.similarity_threshold - 0.9).abs() < f32::EPSILON);
    assert_eq!(config.gemini, GeminiConfig::default());
    assert_eq!(config.paths, PathsConfig::default());
}

#[test]
fn setter_validation() {
    let mut gemini = GeminiConfig::default();
    assert!(gemini.set_base_url("http://127.0.0.1:8080".to_string()).is_ok());
    assert_eq!(gemini.base_url, "http://127.0.0.1:8080");
    assert!(gemini.set_base_url("nope".to_string()).is_err());
    assert_eq!(gemini.base_url, "http://127.0.0.1:8080");

    assert!(gemini.set_generation_model("models/".to_string()).is_err());
    assert!(
        gemini
            .set_embedding_model("models/gemini-embedding-001".to_string())
            .is_ok()
    );
    assert!(gemini.set_request_delay_ms(60_001).is_err());
    assert!(gemini.set_api_key_env(String::new()).is_err());
    assert!(gemini.set_retry_attempts(5).is_ok());
    assert_eq!(gemini.retry_attempts, 5);
    assert!(gemini.set_retry_attempts(0).is_err());
    assert_eq!(gemini.retry_attempts, 5);

    let mut clustering = ClusteringConfig::default();
    assert!(clustering.set_k_range(3, 10).is_ok());
    assert_eq!(clustering.k_range(), 3..10);
    assert!(clustering.set_k_range(10, 3).is_err());
    assert_eq!(clustering.k_range(), 3..10);

    let mut merge = MergeConfig::default();
    assert!(merge.set_similarity_threshold(0.0).is_err());
    assert!(merge.set_similarity_threshold(1.0).is_ok());
}

#[test]
fn fit_params_follow_config() {
    let clustering = ClusteringConfig {
        batch_size: 64,
        n_init: 3,
        max_iter: 20,
        seed: 7,
        ..ClusteringConfig::default()
    };
    let params = clustering.fit_params();
    assert_eq!(params.batch_size, 64);
    assert_eq!(params.n_init, 3);
    assert_eq!(params.max_iter, 20);
    assert_eq!(params.seed, 7);
}

#[test]
fn load_missing_file_gives_defaults() {
    let temp_dir = TempDir::new().expect("should create TempDir successfully");
    let config = Config::load(temp_dir.path()).expect("should load defaults");
    assert_eq!(config.base_dir, temp_dir.path());
    assert_eq!(config.clustering, ClusteringConfig::default());
}

#[test]
fn save_and_load_round_trip() {
    let temp_dir = TempDir::new().expect("should create TempDir successfully");
    let base_dir = temp_dir.path().join("nested");

    let mut config = Config {
        base_dir: base_dir.clone(),
        ..Config::default()
    };
    config.clustering.set_seed(1234);
    config
        .merge
        .set_similarity_threshold(0.95)
        .expect("threshold is valid");
    config.save().expect("should save config");

    assert!(base_dir.join("config.toml").exists());
    let loaded = Config::load(&base_dir).expect("should load saved config");
    assert_eq!(loaded, config);
}

#[test]
fn load_rejects_invalid_values() {
    let temp_dir = TempDir::new().expect("should create TempDir successfully");
    std::fs::write(
        temp_dir.path().join("config.toml"),
        "[merge]\nsimilarity_threshold = 2.0\n",
    )
    .expect("should write config");

    assert!(Config::load(temp_dir.path()).is_err());
}

#[test]
fn result_paths_live_in_results_dir() {
    let mut config = Config::default();
    config.paths.results_dir = PathBuf::from("/tmp/out");
    assert_eq!(
        config.cluster_results_path(),
        PathBuf::from("/tmp/out/cluster_results.json")
    );
    assert_eq!(
        config.prototypes_path(),
        PathBuf::from("/tmp/out/intent_prototypes.json")
    );
    assert_eq!(
        config.cluster_analysis_path(),
        PathBuf::from("/tmp/out/cluster_analysis_summary.json")
    );
}
