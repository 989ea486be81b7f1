
use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input, Password};
use std::path::Path;

use super::{ClusteringConfig, Config, ConfigError, GeminiConfig, MergeConfig};
use crate::IntentError;

#[inline]
pub fn run_interactive_config(base_dir: &Path) -> Result<()> {
    eprintln!("{}", style("🔧 Intent Prototypes Configuration Setup").bold().cyan());
    eprintln!();

    let mut config = load_existing_config(base_dir)?;

    eprintln!("{}", style("Gemini API").bold().yellow());
    eprintln!("Models used for cluster summaries and embeddings.");
    eprintln!();
    configure_gemini(&mut config.gemini)?;

    eprintln!();
    eprintln!("{}", style("Clustering").bold().yellow());
    configure_clustering(&mut config.clustering)?;

    eprintln!();
    eprintln!("{}", style("Merging").bold().yellow());
    configure_merge(&mut config.merge)?;

    eprintln!();
    if Confirm::new()
        .with_prompt("Save configuration?")
        .default(true)
        .interact()?
    {
        config.save().context("Failed to save configuration")?;
        eprintln!("{}", style("✓ Configuration saved successfully!").green());
        eprintln!(
            "Configuration saved to: {}",
            style(config.config_file_path().display()).cyan()
        );
    } else {
        eprintln!("Configuration not saved.");
    }

    Ok(())
}

#[inline]
pub fn show_config(base_dir: &Path) -> Result<()> {
    let config = Config::load(base_dir).context("Failed to load configuration")?;

    eprintln!("{}", style("📋 Current Configuration").bold().cyan());
    eprintln!();

    eprintln!("{}", style("Gemini Settings:").bold().yellow());
    match config.gemini.endpoint() {
        Ok(url) => eprintln!("  Endpoint: {}", style(url).cyan()),
        Err(e) => eprintln!("  Endpoint: {} ({})", style("Invalid").red(), e),
    }
    eprintln!(
        "  Generation model: {}",
        style(&config.gemini.generation_model).cyan()
    );
    eprintln!(
        "  Embedding model: {}",
        style(&config.gemini.embedding_model).cyan()
    );
    let key_state = if api_key_from_env(&config.gemini.api_key_env).is_some() {
        style("set").green()
    } else {
        style("not set").red()
    };
    eprintln!(
        "  API key variable: {} ({})",
        style(&config.gemini.api_key_env).cyan(),
        key_state
    );
    eprintln!(
        "  Request delay: {}",
        style(format!("{}ms", config.gemini.request_delay_ms)).cyan()
    );
    eprintln!(
        "  Embedding attempts: {}",
        style(config.gemini.retry_attempts).cyan()
    );

    eprintln!();
    eprintln!("{}", style("Clustering Settings:").bold().yellow());
    let k_range = config.clustering.k_range();
    eprintln!(
        "  Candidate k: {}",
        style(format!("{}..{}", k_range.start, k_range.end)).cyan()
    );
    eprintln!("  Sample size: {}", style(config.clustering.sample_size).cyan());
    eprintln!("  Seed: {}", style(config.clustering.seed).cyan());
    eprintln!("  Top samples: {}", style(config.clustering.top_n).cyan());
    eprintln!(
        "  Merge threshold: {}",
        style(config.merge.similarity_threshold).cyan()
    );

    eprintln!();
    eprintln!("{}", style("Paths:").bold().yellow());
    eprintln!("  Input CSV: {}", style(config.paths.input_csv.display()).cyan());
    eprintln!(
        "  Embeddings: {}",
        style(config.paths.embeddings.display()).cyan()
    );
    eprintln!(
        "  Results: {}",
        style(config.paths.results_dir.display()).cyan()
    );

    eprintln!();
    eprintln!(
        "Config file: {}",
        style(config.config_file_path().display()).dim()
    );

    Ok(())
}

/// API key from the named environment variable. Empty values count as unset.
#[inline]
pub fn api_key_from_env(var: &str) -> Option<String> {
    std::env::var(var)
        .ok()
        .map(|key| key.trim().to_string())
        .filter(|key| !key.is_empty())
}

/// Resolve the API key from the environment, prompting for it when unset.
#[inline]
pub fn resolve_api_key(var: &str) -> crate::Result<String> {
    if let Some(key) = api_key_from_env(var) {
        return Ok(key);
    }

    eprintln!(
        "{}",
        style(format!("{var} is not set in the environment.")).yellow()
    );
    let key = Password::new()
        .with_prompt("Gemini API key")
        .allow_empty_password(true)
        .interact()
        .map_err(|e| IntentError::Configuration(format!("could not read API key: {e}")))?;

    let key = key.trim().to_string();
    if key.is_empty() {
        return Err(IntentError::Configuration(
            "a Gemini API key is required".to_string(),
        ));
    }
    Ok(key)
}

fn load_existing_config(base_dir: &Path) -> Result<Config> {
    Config::load(base_dir).map_or_else(
        |_| {
            eprintln!(
                "{}",
                style("No usable configuration found. Using defaults.").yellow()
            );
            Ok(Config {
                base_dir: base_dir.to_path_buf(),
                ..Config::default()
            })
        },
        |config| {
            eprintln!("{}", style("Found existing configuration.").green());
            Ok(config)
        },
    )
}

fn configure_gemini(gemini: &mut GeminiConfig) -> Result<()> {
    let base_url: String = Input::new()
        .with_prompt("Gemini API base URL")
        .default(gemini.base_url.clone())
        .validate_with(|input: &String| -> Result<(), ConfigError> {
            GeminiConfig {
                base_url: input.clone(),
                ..GeminiConfig::default()
            }
            .endpoint()
            .map(|_| ())
        })
        .interact_text()?;

    let generation_model: String = Input::new()
        .with_prompt("Summary model")
        .default(gemini.generation_model.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.starts_with("models/") && input.len() > "models/".len() {
                Ok(())
            } else {
                Err("Model name must look like models/<name>")
            }
        })
        .interact_text()?;

    let embedding_model: String = Input::new()
        .with_prompt("Embedding model")
        .default(gemini.embedding_model.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.starts_with("models/") && input.len() > "models/".len() {
                Ok(())
            } else {
                Err("Model name must look like models/<name>")
            }
        })
        .interact_text()?;

    let api_key_env: String = Input::new()
        .with_prompt("Environment variable holding the API key")
        .default(gemini.api_key_env.clone())
        .interact_text()?;

    let request_delay_ms: u64 = Input::new()
        .with_prompt("Delay between summary requests (ms)")
        .default(gemini.request_delay_ms)
        .interact_text()?;

    let retry_attempts: u32 = Input::new()
        .with_prompt("Attempts per embedding request")
        .default(gemini.retry_attempts)
        .validate_with(|input: &u32| -> Result<(), &str> {
            if (1..=10).contains(input) {
                Ok(())
            } else {
                Err("Attempts must be between 1 and 10")
            }
        })
        .interact_text()?;

    gemini.set_base_url(base_url)?;
    gemini.set_generation_model(generation_model)?;
    gemini.set_embedding_model(embedding_model)?;
    gemini.set_api_key_env(api_key_env)?;
    gemini.set_request_delay_ms(request_delay_ms)?;
    gemini.set_retry_attempts(retry_attempts)?;

    Ok(())
}

fn configure_clustering(clustering: &mut ClusteringConfig) -> Result<()> {
    let min_k: usize = Input::new()
        .with_prompt("Smallest candidate k")
        .default(clustering.min_k)
        .validate_with(|input: &usize| -> Result<(), &str> {
            if *input < 2 {
                Err("k must be at least 2")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let max_k: usize = Input::new()
        .with_prompt("Largest candidate k (exclusive)")
        .default(clustering.max_k)
        .validate_with(|input: &usize| -> Result<(), String> {
            if *input <= min_k {
                Err(format!("must be greater than {min_k}"))
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let seed: u64 = Input::new()
        .with_prompt("Random seed")
        .default(clustering.seed)
        .interact_text()?;

    clustering.set_k_range(min_k, max_k)?;
    clustering.set_seed(seed);

    Ok(())
}

fn configure_merge(merge: &mut MergeConfig) -> Result<()> {
    let threshold: f32 = Input::new()
        .with_prompt("Similarity threshold for merging clusters")
        .default(merge.similarity_threshold)
        .validate_with(|input: &f32| -> Result<(), &str> {
            if *input > 0.0 && *input <= 1.0 {
                Ok(())
            } else {
                Err("Threshold must be in (0, 1]")
            }
        })
        .interact_text()?;

    merge.set_similarity_threshold(threshold)?;
    Ok(())
}
