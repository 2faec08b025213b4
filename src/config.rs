//! # Configuration
//!
//! Invocation-level settings loaded from environment variables.
//! Command-line flags override whatever is loaded here.

use crate::constants::{
    DEFAULT_COMMAND_TIMEOUT_SECS, DEFAULT_KUBECTL_PATH, DEFAULT_PREVIEW_LINES,
    MIN_COMMAND_TIMEOUT_SECS,
};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Which implementation talks to the cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    /// Shell out to the `kubectl` binary
    #[default]
    Kubectl,
    /// Talk to the API server directly through kubeconfig
    Api,
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "kubectl" => Ok(Self::Kubectl),
            "api" | "kube" => Ok(Self::Api),
            other => Err(format!("unknown backend '{other}' (expected kubectl or api)")),
        }
    }
}

/// kubesec configuration
///
/// All settings have sensible defaults and can be overridden via environment variables.
#[derive(Debug, Clone)]
pub struct KubesecConfig {
    /// Path to the kubectl binary
    pub kubectl_path: String,
    /// Upper bound for one cluster call (seconds)
    pub command_timeout_secs: u64,
    /// Cluster backend
    pub backend: Backend,
    /// Directory under which backup and rollback folders are created
    pub backup_root: PathBuf,
    /// Matching lines shown per key in the `update-value` preview
    pub preview_lines: usize,
    /// Log level used when `RUST_LOG` is not set
    pub log_level: String,
    /// Log format (json, text)
    pub log_format: String,
}

impl Default for KubesecConfig {
    fn default() -> Self {
        Self {
            kubectl_path: DEFAULT_KUBECTL_PATH.to_string(),
            command_timeout_secs: DEFAULT_COMMAND_TIMEOUT_SECS,
            backend: Backend::Kubectl,
            backup_root: PathBuf::from("."),
            preview_lines: DEFAULT_PREVIEW_LINES,
            log_level: "info".to_string(),
            log_format: "text".to_string(),
        }
    }
}

impl KubesecConfig {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            kubectl_path: env_var_or_default_str("KUBESEC_KUBECTL_PATH", &defaults.kubectl_path),
            command_timeout_secs: env_var_or_default(
                "KUBESEC_COMMAND_TIMEOUT_SECS",
                defaults.command_timeout_secs,
            ),
            backend: env_var_or_default("KUBESEC_BACKEND", defaults.backend),
            backup_root: std::env::var("KUBESEC_BACKUP_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.backup_root),
            preview_lines: env_var_or_default("KUBESEC_PREVIEW_LINES", defaults.preview_lines),
            log_level: env_var_or_default_str("KUBESEC_LOG_LEVEL", &defaults.log_level),
            log_format: env_var_or_default_str("KUBESEC_LOG_FORMAT", &defaults.log_format),
        }
    }

    /// Get the per-call timeout, never shorter than one second
    #[must_use]
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs.max(MIN_COMMAND_TIMEOUT_SECS))
    }

    #[must_use]
    pub fn json_logs(&self) -> bool {
        self.log_format.eq_ignore_ascii_case("json")
    }
}

/// Read environment variable or return default value
fn env_var_or_default<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Read environment variable as string or return default
fn env_var_or_default_str(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = KubesecConfig::default();
        assert_eq!(config.kubectl_path, "kubectl");
        assert_eq!(config.command_timeout(), Duration::from_secs(10));
        assert_eq!(config.backend, Backend::Kubectl);
        assert_eq!(config.preview_lines, 5);
        assert!(!config.json_logs());
    }

    #[test]
    fn test_zero_timeout_clamped() {
        let config = KubesecConfig {
            command_timeout_secs: 0,
            ..Default::default()
        };
        assert_eq!(config.command_timeout(), Duration::from_secs(1));
    }

    #[test]
    fn test_backend_from_str() {
        assert_eq!("kubectl".parse::<Backend>(), Ok(Backend::Kubectl));
        assert_eq!("API".parse::<Backend>(), Ok(Backend::Api));
        assert_eq!("kube".parse::<Backend>(), Ok(Backend::Api));
        assert!("helm".parse::<Backend>().is_err());
    }
}
