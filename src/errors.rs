// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SitedagError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Graph encoding error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// A node was registered twice in the same run.
    #[error("Node registered twice: {0}")]
    DuplicateRegistration(String),

    /// The analyzer selected a node that has no registered build unit.
    #[error("No build unit registered for node: {0}")]
    UnknownNode(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, SitedagError>;
