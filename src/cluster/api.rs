//! # Kubernetes API Backend
//!
//! [`ClusterClient`] talking to the API server directly through kubeconfig,
//! for environments without a `kubectl` binary.
//!
//! One client is built per context on first use and cached.

use super::{ClusterClient, KubeContext};
use crate::constants::{DEFAULT_NAMESPACE, FIELD_MANAGER};
use crate::error::{KubesecError, Result};
use crate::secret::{RawMetadata, RawSecret};
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use k8s_openapi::api::core::v1::{Namespace, Secret as K8sSecret};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{Api, ListParams, PostParams};
use kube::config::{Config, KubeConfigOptions};
use kube::Client;
use std::collections::HashMap;
use std::future::Future;
use std::path::Path;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// [`ClusterClient`] backed by the `kube` crate
pub struct KubeApiClient {
    timeout: Duration,
    clients: RwLock<HashMap<KubeContext, Client>>,
}

impl std::fmt::Debug for KubeApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeApiClient")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl KubeApiClient {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            clients: RwLock::new(HashMap::new()),
        }
    }

    /// Get the cached client for a context, creating it on first use
    async fn client(&self, context: &KubeContext) -> Result<Client> {
        {
            let clients = self.clients.read().await;
            if let Some(client) = clients.get(context) {
                return Ok(client.clone());
            }
        }

        let mut config = match context.name() {
            Some(name) => Config::from_kubeconfig(&KubeConfigOptions {
                context: Some(name.to_string()),
                ..Default::default()
            })
            .await
            .map_err(|e| {
                KubesecError::cluster(format!("Failed to load kubeconfig for context '{name}': {e}"))
            })?,
            None => Config::infer()
                .await
                .map_err(|e| KubesecError::cluster(format!("Failed to infer kubeconfig: {e}")))?,
        };
        config.connect_timeout = Some(self.timeout);
        config.read_timeout = Some(self.timeout);

        let client = Client::try_from(config)
            .map_err(|e| KubesecError::cluster(format!("Failed to create Kubernetes client: {e}")))?;

        debug!("Created Kubernetes client for context '{}'", context);
        self.clients
            .write()
            .await
            .insert(context.clone(), client.clone());
        Ok(client)
    }

    /// Run one API call under the configured timeout
    async fn bounded<T>(
        &self,
        what: &str,
        call: impl Future<Output = std::result::Result<T, kube::Error>>,
    ) -> Result<T> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(kube::Error::Api(api_err))) if api_err.code == 404 => {
                Err(KubesecError::NotFound(format!("{what}: {}", api_err.message)))
            }
            Ok(Err(e)) => Err(KubesecError::cluster(format!("{what}: {e}"))),
            Err(_elapsed) => Err(KubesecError::cluster(format!(
                "{what}: timed out after {}s",
                self.timeout.as_secs()
            ))),
        }
    }
}

/// Re-encode API server data so it goes through the same decode step as kubectl output
fn to_raw_secret(secret: K8sSecret) -> RawSecret {
    RawSecret {
        metadata: RawMetadata {
            name: secret.metadata.name.unwrap_or_default(),
            namespace: secret.metadata.namespace,
        },
        type_: secret.type_,
        data: secret.data.map(|data| {
            data.into_iter()
                .map(|(k, v)| (k, general_purpose::STANDARD.encode(v.0)))
                .collect()
        }),
    }
}

#[async_trait]
impl ClusterClient for KubeApiClient {
    async fn list_namespaces(&self, context: &KubeContext) -> Result<Vec<String>> {
        let api: Api<Namespace> = Api::all(self.client(context).await?);
        let list = self
            .bounded("list namespaces", api.list(&ListParams::default()))
            .await?;
        Ok(list
            .items
            .into_iter()
            .filter_map(|ns| ns.metadata.name)
            .collect())
    }

    async fn get_secret(
        &self,
        context: &KubeContext,
        name: &str,
        namespace: &str,
    ) -> Result<RawSecret> {
        let api: Api<K8sSecret> = Api::namespaced(self.client(context).await?, namespace);
        let what = format!("get secret {namespace}/{name}");
        let secret = self.bounded(&what, api.get(name)).await?;
        Ok(to_raw_secret(secret))
    }

    async fn list_secrets(
        &self,
        context: &KubeContext,
        namespace: &str,
    ) -> Result<Vec<RawSecret>> {
        let api: Api<K8sSecret> = Api::namespaced(self.client(context).await?, namespace);
        let what = format!("list secrets in {namespace}");
        let list = self.bounded(&what, api.list(&ListParams::default())).await?;
        Ok(list.items.into_iter().map(to_raw_secret).collect())
    }

    /// Overlay the manifest's type and data onto the live object (keeping its
    /// labels and annotations), or create it when absent
    async fn apply_manifest(&self, context: &KubeContext, path: &Path) -> Result<()> {
        let contents = tokio::fs::read_to_string(path).await?;
        let desired: K8sSecret = serde_yaml::from_str(&contents)?;

        let name = desired
            .metadata
            .name
            .clone()
            .ok_or_else(|| KubesecError::validation("Manifest has no metadata.name"))?;
        let namespace = desired
            .metadata
            .namespace
            .clone()
            .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());

        let api: Api<K8sSecret> = Api::namespaced(self.client(context).await?, &namespace);
        let what = format!("apply secret {namespace}/{name}");

        match self.bounded(&what, api.get_opt(&name)).await? {
            Some(mut existing) => {
                existing.type_ = desired.type_;
                existing.data = desired.data;
                existing.string_data = None;
                self.bounded(&what, api.replace(&name, &post_params(), &existing))
                    .await?;
                info!("secret/{} configured", name);
            }
            None => {
                let created = K8sSecret {
                    metadata: ObjectMeta {
                        name: Some(name.clone()),
                        namespace: Some(namespace.clone()),
                        ..Default::default()
                    },
                    type_: desired.type_,
                    data: desired.data,
                    ..Default::default()
                };
                self.bounded(&what, api.create(&post_params(), &created))
                    .await?;
                info!("secret/{} created", name);
            }
        }
        Ok(())
    }

    async fn create_namespace(&self, context: &KubeContext, namespace: &str) -> Result<()> {
        let api: Api<Namespace> = Api::all(self.client(context).await?);
        let ns = Namespace {
            metadata: ObjectMeta {
                name: Some(namespace.to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        let what = format!("create namespace {namespace}");
        self.bounded(&what, api.create(&post_params(), &ns))
            .await?;
        Ok(())
    }
}

fn post_params() -> PostParams {
    PostParams {
        field_manager: Some(FIELD_MANAGER.to_string()),
        ..Default::default()
    }
}
