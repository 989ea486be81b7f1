// Configuration management module
// TOML settings, interactive setup and API key resolution

pub mod interactive;
pub mod settings;


pub use interactive::{api_key_from_env, resolve_api_key, run_interactive_config, show_config};
pub use settings::{
    ClusteringConfig, Config, ConfigError, GeminiConfig, MergeConfig, PathsConfig,
};

/// Get the default configuration directory path
#[inline]
pub fn get_config_dir() -> Result<std::path::PathBuf, ConfigError> {
    Config::default_base_dir()
}
