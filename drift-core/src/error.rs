//! Error types for drift operations

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum DriftError {
    #[error("Not a git repository: {}", .0.display())]
    NotARepository(PathBuf),

    #[error("Invalid ref range '{range}': {detail}")]
    InvalidRefRange { range: String, detail: String },

    #[error("git {command} failed: {detail}")]
    GitCommand { command: String, detail: String },

    #[error("Config parse error: {0}")]
    ConfigParse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
