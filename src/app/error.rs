use config::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to load manifest: {0}")]
    Manifest(#[from] ConfigError),
    #[error(transparent)]
    Engine(#[from] crate::engine::Error),
    #[error("{0}")]
    Failed(String),
    #[error("Expected {expected} but got {actual}")]
    NotEqual { expected: String, actual: String },
    #[error("Failed to write report: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
}
