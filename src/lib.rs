//! kubesec library
//!
//! Bulk management of Kubernetes Opaque secrets across namespaces: namespace
//! selection, secret collection and decoding, diffing, value search, backups
//! and the backup-before-mutate bulk update.
//!
//! Tests are included in the module files and under `tests/`.

pub mod backup;
pub mod cluster;
pub mod collector;
pub mod commands;
pub mod config;
pub mod constants;
pub mod diff;
pub mod display;
pub mod error;
pub mod namespace;
pub mod prompt;
pub mod search;
pub mod secret;

pub use cluster::{ClusterClient, KubeContext};
pub use config::{Backend, KubesecConfig};
pub use error::{KubesecError, Result};
pub use secret::{Secret, SecretKey, SecretSet};
