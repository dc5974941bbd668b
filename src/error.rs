//! Error types for loading schemas and running the checker
//!
//! The comparison engine itself never fails; these errors come from the loader,
//! configuration and report plumbing around it.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for loader and front-end operations
pub type Result<T> = std::result::Result<T, CompatError>;

/// Errors raised outside the comparison core
#[derive(Error, Debug)]
pub enum CompatError {
    #[error("Failed to parse {origin}:\n{message}")]
    Parse { origin: String, message: String },

    #[error("Duplicate message `{name}` in {origin}")]
    DuplicateMessage { name: String, origin: String },

    #[error("Duplicate field tag {tag} in message `{message}`")]
    DuplicateTag { message: String, tag: u32 },

    #[error("No schema files found under {0}")]
    NoSchemaFiles(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config_crate::ConfigError),

    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}
