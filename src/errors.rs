// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StackpullError {
    /// Missing or malformed workload, policy or settings definitions.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A digest lookup failed for a single workload.
    #[error("Failed to resolve digest for '{workload}': {reason}")]
    ResolveError { workload: String, reason: String },

    /// The bulk registry refresh (pull) failed; aborts the current cycle.
    #[error("Registry refresh failed: {0}")]
    RefreshError(String),

    /// A stop / pull / start step exited unsuccessfully.
    #[error("Step '{step}' failed with exit code {exit_code}")]
    ExecutionError { step: String, exit_code: i32 },

    /// Webhook signature missing or invalid.
    #[error("Unauthorized: {0}")]
    AuthError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("YAML parsing error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StackpullError {
    /// Re-key a lookup failure onto the workload it was performed for.
    pub fn for_workload(self, workload: &str) -> Self {
        match self {
            StackpullError::ResolveError { reason, .. } => StackpullError::ResolveError {
                workload: workload.to_string(),
                reason,
            },
            other => StackpullError::ResolveError {
                workload: workload.to_string(),
                reason: other.to_string(),
            },
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, StackpullError>;
