//! Error types for workspace configuration loading.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error reading {path}: {error}")]
    Io { path: PathBuf, error: std::io::Error },

    #[error("TOML parse error in {path}: {error}")]
    Parse { path: PathBuf, error: toml::de::Error },

    #[error("could not determine XDG config directory")]
    NoConfigDir,

    #[error("watch error: {0}")]
    Watch(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
