#[cfg(test)]
mod tests;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

use crate::clustering::FitParams;
use crate::clustering::kmeans::{DEFAULT_BATCH_SIZE, DEFAULT_MAX_ITER, DEFAULT_N_INIT, DEFAULT_SEED};
use crate::clustering::sampler::DEFAULT_TOP_N;
use crate::clustering::selection::{DEFAULT_SAMPLE_SIZE, DEFAULT_SILHOUETTE_SAMPLE_SIZE};
use crate::merge::DEFAULT_SIMILARITY_THRESHOLD;

const CONFIG_FILE_NAME: &str = "config.toml";
const BASE_DIR_NAME: &str = ".intent-prototypes";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub gemini: GeminiConfig,
    #[serde(default)]
    pub clustering: ClusteringConfig,
    #[serde(default)]
    pub merge: MergeConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(skip)]
    pub base_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GeminiConfig {
    pub base_url: String,
    pub generation_model: String,
    pub embedding_model: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
    /// Pause between successive summary requests
    pub request_delay_ms: u64,
    pub timeout_seconds: u64,
    /// Attempts per embedding request; summaries are always requested once
    pub retry_attempts: u32,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            generation_model: "models/gemini-flash-lite-latest".to_string(),
            embedding_model: "models/text-embedding-004".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            request_delay_ms: 500,
            timeout_seconds: 60,
            retry_attempts: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ClusteringConfig {
    /// Smallest candidate k (inclusive)
    pub min_k: usize,
    /// Largest candidate k (exclusive)
    pub max_k: usize,
    pub sample_size: usize,
    pub silhouette_sample_size: usize,
    pub batch_size: usize,
    pub n_init: usize,
    pub max_iter: usize,
    pub seed: u64,
    pub top_n: usize,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            min_k: 2,
            max_k: 21,
            sample_size: DEFAULT_SAMPLE_SIZE,
            silhouette_sample_size: DEFAULT_SILHOUETTE_SAMPLE_SIZE,
            batch_size: DEFAULT_BATCH_SIZE,
            n_init: DEFAULT_N_INIT,
            max_iter: DEFAULT_MAX_ITER,
            seed: DEFAULT_SEED,
            top_n: DEFAULT_TOP_N,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MergeConfig {
    pub similarity_threshold: f32,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PathsConfig {
    pub input_csv: PathBuf,
    pub embeddings: PathBuf,
    pub results_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            input_csv: PathBuf::from("data/source.csv"),
            embeddings: PathBuf::from("data/output_embeddings.json"),
            results_dir: PathBuf::from("results"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not found or could not be created")]
    DirectoryError,
    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),
    #[error("Invalid model name: {0} (must start with 'models/')")]
    InvalidModel(String),
    #[error("Invalid API key environment variable: {0:?} (cannot be empty)")]
    InvalidApiKeyEnv(String),
    #[error("Invalid request delay: {0}ms (must be at most 60000)")]
    InvalidRequestDelay(u64),
    #[error("Invalid timeout: {0} (must be between 1 and 600 seconds)")]
    InvalidTimeout(u64),
    #[error("Invalid retry attempts: {0} (must be between 1 and 10)")]
    InvalidRetryAttempts(u32),
    #[error("Invalid k range: {0}..{1} (need 2 <= min_k < max_k <= 200)")]
    InvalidKRange(usize, usize),
    #[error("Invalid sample size: {0} (must be between 100 and 1000000)")]
    InvalidSampleSize(usize),
    #[error("Invalid silhouette sample size: {0} (must be between 100 and 100000)")]
    InvalidSilhouetteSampleSize(usize),
    #[error("Invalid batch size: {0} (must be between 1 and 100000)")]
    InvalidBatchSize(usize),
    #[error("Invalid n_init: {0} (must be between 1 and 100)")]
    InvalidNInit(usize),
    #[error("Invalid max iterations: {0} (must be between 1 and 10000)")]
    InvalidMaxIter(usize),
    #[error("Invalid top-N: {0} (must be between 1 and 100)")]
    InvalidTopN(usize),
    #[error("Invalid similarity threshold: {0} (must be in (0, 1])")]
    InvalidSimilarityThreshold(f32),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Default for Config {
    #[inline]
    fn default() -> Self {
        Self {
            gemini: GeminiConfig::default(),
            clustering: ClusteringConfig::default(),
            merge: MergeConfig::default(),
            paths: PathsConfig::default(),
            base_dir: Self::default_base_dir().unwrap_or_else(|_| PathBuf::from(BASE_DIR_NAME)),
        }
    }
}

impl Config {
    /// `~/.intent-prototypes`
    #[inline]
    pub fn default_base_dir() -> Result<PathBuf, ConfigError> {
        dirs::home_dir()
            .map(|home| home.join(BASE_DIR_NAME))
            .ok_or(ConfigError::DirectoryError)
    }

    /// Load `config.toml` from `config_dir`, falling back to defaults when absent.
    #[inline]
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            return Ok(Self {
                base_dir: config_dir.as_ref().to_path_buf(),
                ..Self::default()
            });
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;
        config.base_dir = config_dir.as_ref().to_path_buf();

        config
            .validate()
            .with_context(|| "Configuration validation failed")?;

        Ok(config)
    }

    #[inline]
    pub fn save(&self) -> Result<()> {
        self.validate()
            .context("Configuration validation failed before saving")?;

        fs::create_dir_all(&self.base_dir).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                self.base_dir.display()
            )
        })?;

        let config_path = self.config_file_path();
        let content = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

        Ok(())
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.gemini.validate()?;
        self.clustering.validate()?;
        self.merge.validate()?;
        Ok(())
    }

    #[inline]
    pub fn config_file_path(&self) -> PathBuf {
        self.base_dir.join(CONFIG_FILE_NAME)
    }

    #[inline]
    pub fn k_selection_path(&self) -> PathBuf {
        self.paths.results_dir.join(crate::artifacts::K_SELECTION_FILE)
    }

    #[inline]
    pub fn cluster_results_path(&self) -> PathBuf {
        self.paths
            .results_dir
            .join(crate::artifacts::CLUSTER_RESULTS_FILE)
    }

    #[inline]
    pub fn prototypes_path(&self) -> PathBuf {
        self.paths
            .results_dir
            .join(crate::artifacts::INTENT_PROTOTYPES_FILE)
    }

    #[inline]
    pub fn cluster_analysis_path(&self) -> PathBuf {
        self.paths
            .results_dir
            .join(crate::artifacts::CLUSTER_ANALYSIS_FILE)
    }
}

impl GeminiConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.endpoint()?;

        for model in [&self.generation_model, &self.embedding_model] {
            validate_model(model)?;
        }

        if self.api_key_env.trim().is_empty() {
            return Err(ConfigError::InvalidApiKeyEnv(self.api_key_env.clone()));
        }

        if self.request_delay_ms > 60_000 {
            return Err(ConfigError::InvalidRequestDelay(self.request_delay_ms));
        }

        if !(1..=600).contains(&self.timeout_seconds) {
            return Err(ConfigError::InvalidTimeout(self.timeout_seconds));
        }

        if !(1..=10).contains(&self.retry_attempts) {
            return Err(ConfigError::InvalidRetryAttempts(self.retry_attempts));
        }

        Ok(())
    }

    pub fn endpoint(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(&self.base_url)
            .map_err(|_| ConfigError::InvalidUrl(self.base_url.clone()))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::InvalidUrl(self.base_url.clone()));
        }
        Ok(url)
    }

    pub fn set_base_url(&mut self, base_url: String) -> Result<(), ConfigError> {
        let candidate = GeminiConfig {
            base_url: base_url.clone(),
            ..self.clone()
        };
        candidate.endpoint()?;
        self.base_url = base_url;
        Ok(())
    }

    pub fn set_generation_model(&mut self, model: String) -> Result<(), ConfigError> {
        validate_model(&model)?;
        self.generation_model = model;
        Ok(())
    }

    pub fn set_embedding_model(&mut self, model: String) -> Result<(), ConfigError> {
        validate_model(&model)?;
        self.embedding_model = model;
        Ok(())
    }

    pub fn set_api_key_env(&mut self, name: String) -> Result<(), ConfigError> {
        if name.trim().is_empty() {
            return Err(ConfigError::InvalidApiKeyEnv(name));
        }
        self.api_key_env = name;
        Ok(())
    }

    pub fn set_request_delay_ms(&mut self, delay: u64) -> Result<(), ConfigError> {
        if delay > 60_000 {
            return Err(ConfigError::InvalidRequestDelay(delay));
        }
        self.request_delay_ms = delay;
        Ok(())
    }

    pub fn set_retry_attempts(&mut self, attempts: u32) -> Result<(), ConfigError> {
        if !(1..=10).contains(&attempts) {
            return Err(ConfigError::InvalidRetryAttempts(attempts));
        }
        self.retry_attempts = attempts;
        Ok(())
    }
}

fn validate_model(model: &str) -> Result<(), ConfigError> {
    match model.strip_prefix("models/") {
        Some(name) if !name.trim().is_empty() => Ok(()),
        _ => Err(ConfigError::InvalidModel(model.to_string())),
    }
}

impl ClusteringConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_k < 2 || self.min_k >= self.max_k || self.max_k > 200 {
            return Err(ConfigError::InvalidKRange(self.min_k, self.max_k));
        }

        if !(100..=1_000_000).contains(&self.sample_size) {
            return Err(ConfigError::InvalidSampleSize(self.sample_size));
        }

        if !(100..=100_000).contains(&self.silhouette_sample_size) {
            return Err(ConfigError::InvalidSilhouetteSampleSize(
                self.silhouette_sample_size,
            ));
        }

        if !(1..=100_000).contains(&self.batch_size) {
            return Err(ConfigError::InvalidBatchSize(self.batch_size));
        }

        if !(1..=100).contains(&self.n_init) {
            return Err(ConfigError::InvalidNInit(self.n_init));
        }

        if !(1..=10_000).contains(&self.max_iter) {
            return Err(ConfigError::InvalidMaxIter(self.max_iter));
        }

        if !(1..=100).contains(&self.top_n) {
            return Err(ConfigError::InvalidTopN(self.top_n));
        }

        Ok(())
    }

    #[inline]
    pub fn k_range(&self) -> Range<usize> {
        self.min_k..self.max_k
    }

    #[inline]
    pub fn fit_params(&self) -> FitParams {
        FitParams {
            batch_size: self.batch_size,
            n_init: self.n_init,
            max_iter: self.max_iter,
            seed: self.seed,
        }
    }

    pub fn set_k_range(&mut self, min_k: usize, max_k: usize) -> Result<(), ConfigError> {
        let candidate = ClusteringConfig {
            min_k,
            max_k,
            ..self.clone()
        };
        candidate.validate()?;
        self.min_k = min_k;
        self.max_k = max_k;
        Ok(())
    }

    pub fn set_seed(&mut self, seed: u64) {
        self.seed = seed;
    }
}

impl MergeConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.similarity_threshold > 0.0 && self.similarity_threshold <= 1.0) {
            return Err(ConfigError::InvalidSimilarityThreshold(
                self.similarity_threshold,
            ));
        }
        Ok(())
    }

    pub fn set_similarity_threshold(&mut self, threshold: f32) -> Result<(), ConfigError> {
        let candidate = MergeConfig {
            similarity_threshold: threshold,
        };
        candidate.validate()?;
        self.similarity_threshold = threshold;
        Ok(())
    }
}
