use thiserror::Error;

pub type Result<T> = std::result::Result<T, IntentError>;

#[derive(Error, Debug)]
pub enum IntentError {
    #[error("Data error in {path}: {message}")]
    Data { path: String, message: String },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Parse error for record {record}: {message}")]
    Parse { record: String, message: String },

    #[error("External service error: {0}")]
    ExternalService(String),

    #[error("Numerical error: {0}")]
    Numerical(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl IntentError {
    #[inline]
    pub fn data(path: impl AsRef<std::path::Path>, message: impl Into<String>) -> Self {
        Self::Data {
            path: path.as_ref().display().to_string(),
            message: message.into(),
        }
    }
}

pub mod analysis;
pub mod artifacts;
pub mod clustering;
pub mod commands;
pub mod config;
pub mod embeddings;
pub mod merge;
pub mod prototype;
pub mod summary;
