//! # Errors
//!
//! Error taxonomy shared by every kubesec component.
//!
//! Resolution and collection fail fast and bubble up to the command wrapper,
//! which prints the message and exits non-zero. Nothing is retried.

use thiserror::Error;

/// Crate-wide result alias
pub type Result<T, E = KubesecError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum KubesecError {
    /// A namespace regex filter failed to compile
    #[error("Invalid namespace filter '{pattern}': {source}")]
    InvalidFilter {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// A namespace or secret that must exist was not reported by the cluster
    #[error("Not found: {0}")]
    NotFound(String),

    /// The cluster tool failed; carries its stderr
    #[error("Cluster command failed: {message}")]
    ClusterCommand { message: String },

    /// A secret payload was not valid base64 or not valid UTF-8
    #[error("Failed to decode key '{key}' of secret '{namespace}/{secret}': {reason}")]
    Decode {
        namespace: String,
        secret: String,
        key: String,
        reason: String,
    },

    /// Input rejected before any cluster mutation
    #[error("{0}")]
    Validation(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Operation cancelled")]
    Cancelled,
}

impl KubesecError {
    pub fn cluster(message: impl Into<String>) -> Self {
        Self::ClusterCommand {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
