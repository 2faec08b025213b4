//! # Commands
//!
//! The six kubesec commands. Each takes a [`Session`] (cluster client, target
//! context, configuration and cancellation token), writes its human-readable
//! output to the given writer and returns a [`CommandStatus`].
//!
//! ```bash
//! # Show one secret
//! kubesec pull db -n prod
//!
//! # Snapshot every secret of all namespaces containing "prod"
//! kubesec backup --namespace-contains prod
//!
//! # Find a hostname anywhere in the staging namespaces
//! kubesec find db.internal --namespace-regex '^staging-'
//!
//! # Swap a hostname across namespaces, with preview and rollback folder
//! kubesec update-value old.example.com new.example.com --namespace-contains prod
//! ```

use crate::cluster::manifest::write_manifest;
use crate::cluster::{ClusterClient, KubeContext};
use crate::config::KubesecConfig;
use crate::error::Result;
use crate::namespace::NamespaceSelector;
use crate::secret::{Secret, SecretKey};
use clap::Args;
use std::fmt;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub mod backup;
pub mod find;
pub mod pull;
pub mod push;
pub mod restore;
pub mod update_value;

/// How a command finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandStatus {
    /// Completed, or stopped intentionally (no changes, declined prompt)
    Success,
    /// Completed, but part of the work failed
    Failure,
}

impl CommandStatus {
    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::Failure => 1,
        }
    }
}

impl From<CommandStatus> for ExitCode {
    fn from(status: CommandStatus) -> Self {
        ExitCode::from(status.code())
    }
}

/// Everything a command needs to talk to one cluster
pub struct Session<'a> {
    pub client: &'a dyn ClusterClient,
    pub context: KubeContext,
    pub config: KubesecConfig,
    pub cancel: CancellationToken,
}

impl fmt::Debug for Session<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("context", &self.context)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<'a> Session<'a> {
    pub fn new(client: &'a dyn ClusterClient, context: KubeContext, config: KubesecConfig) -> Self {
        Self {
            client,
            context,
            config,
            cancel: CancellationToken::new(),
        }
    }

    #[must_use]
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Context name for display, `<context>` when using the kubeconfig default
    #[must_use]
    pub fn context_label(&self) -> &str {
        self.context.name().unwrap_or("<context>")
    }

    /// Publish one whole secret through a temporary manifest
    pub async fn apply_secret(&self, key: &SecretKey, secrets: &[Secret]) -> Result<()> {
        let manifest = write_manifest(key, secrets)?;
        debug!("Applying {} key(s) to secret '{}'", secrets.len(), key);
        self.client
            .apply_manifest(&self.context, manifest.path())
            .await
    }
}

/// Namespace selection flags shared by the bulk commands
#[derive(Debug, Clone, Default, Args)]
pub struct NamespaceArgs {
    /// Exact namespace (default: "default")
    #[arg(short, long)]
    pub namespace: Option<String>,

    /// Every namespace whose name contains this text
    #[arg(long, value_name = "TEXT")]
    pub namespace_contains: Option<String>,

    /// Every namespace whose name matches this regular expression
    #[arg(long, value_name = "REGEX")]
    pub namespace_regex: Option<String>,

    /// Namespaces to leave out (repeatable or comma separated)
    #[arg(long = "exclude-namespace", value_name = "NAMESPACE")]
    pub exclude_namespaces: Vec<String>,
}

impl NamespaceArgs {
    pub fn selector(&self) -> Result<NamespaceSelector> {
        NamespaceSelector::new(
            self.namespace.as_deref(),
            self.namespace_contains.as_deref(),
            self.namespace_regex.as_deref(),
            &self.exclude_namespaces,
        )
    }
}

/// `None` for a missing or blank argument
pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::KubesecError;
    use crate::namespace::NamespaceFilter;

    #[test]
    fn test_command_status_codes() {
        assert_eq!(CommandStatus::Success.code(), 0);
        assert_eq!(CommandStatus::Failure.code(), 1);
    }

    #[test]
    fn test_namespace_args_precedence() {
        let args = NamespaceArgs {
            namespace: None,
            namespace_contains: Some("prod".to_string()),
            namespace_regex: Some("^x".to_string()),
            exclude_namespaces: vec!["prod-old,prod-tmp".to_string()],
        };
        let selector = args.selector().unwrap();
        assert!(matches!(selector.filter(), NamespaceFilter::Contains(s) if s == "prod"));
        assert_eq!(selector.exclusions(), ["prod-old", "prod-tmp"]);
    }

    #[test]
    fn test_namespace_args_invalid_regex() {
        let args = NamespaceArgs {
            namespace_regex: Some("([".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            args.selector().unwrap_err(),
            KubesecError::InvalidFilter { .. }
        ));
    }

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank(Some("  prod ")), Some("prod"));
        assert_eq!(non_blank(Some("   ")), None);
        assert_eq!(non_blank(None), None);
    }
}
