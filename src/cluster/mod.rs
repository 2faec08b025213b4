//! # Cluster Access
//!
//! The [`ClusterClient`] trait is the only way kubesec reads from or writes to a
//! cluster. Every call takes the target [`KubeContext`] explicitly; there is no
//! process-wide "current context".
//!
//! Implementations:
//! - [`KubectlClient`] shells out to `kubectl` with a hard per-call timeout
//! - [`KubeApiClient`] talks to the API server through kubeconfig

use crate::config::{Backend, KubesecConfig};
use crate::error::Result;
use crate::secret::RawSecret;
use async_trait::async_trait;
use std::fmt;
use std::path::Path;

pub mod api;
pub mod kubectl;
pub mod manifest;

pub use api::KubeApiClient;
pub use kubectl::KubectlClient;

/// The kubeconfig context commands run against
///
/// `None` means whatever context kubeconfig marks as current.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct KubeContext(Option<String>);

impl KubeContext {
    #[must_use]
    pub fn new(name: Option<String>) -> Self {
        Self(name.filter(|n| !n.trim().is_empty()))
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self::new(Some(name.into()))
    }

    /// The kubeconfig current context
    #[must_use]
    pub fn current() -> Self {
        Self(None)
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

impl fmt::Display for KubeContext {
    /// Empty when no context was given, matching the secrets-file header
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name().unwrap_or_default())
    }
}

/// Control-plane queries and mutations used by kubesec
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Names of all namespaces, in the order the cluster reports them
    async fn list_namespaces(&self, context: &KubeContext) -> Result<Vec<String>>;

    /// Fetch one Secret object
    /// Fails with `NotFound` when it does not exist
    async fn get_secret(
        &self,
        context: &KubeContext,
        name: &str,
        namespace: &str,
    ) -> Result<RawSecret>;

    /// Fetch every Secret object in a namespace, of any type
    async fn list_secrets(&self, context: &KubeContext, namespace: &str)
        -> Result<Vec<RawSecret>>;

    /// Create or update the objects described by a manifest file
    async fn apply_manifest(&self, context: &KubeContext, path: &Path) -> Result<()>;

    /// Create a namespace
    async fn create_namespace(&self, context: &KubeContext, namespace: &str) -> Result<()>;
}

/// Whether the cluster reports the given namespace
pub async fn namespace_exists(
    client: &dyn ClusterClient,
    context: &KubeContext,
    namespace: &str,
) -> Result<bool> {
    let namespaces = client.list_namespaces(context).await?;
    Ok(namespaces.iter().any(|n| n == namespace))
}

/// Build the client selected by configuration
#[must_use]
pub fn client_from_config(config: &KubesecConfig) -> Box<dyn ClusterClient> {
    match config.backend {
        Backend::Kubectl => Box::new(KubectlClient::new(
            config.kubectl_path.clone(),
            config.command_timeout(),
        )),
        Backend::Api => Box::new(KubeApiClient::new(config.command_timeout())),
    }
}
