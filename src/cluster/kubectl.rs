//! # kubectl Backend
//!
//! Runs the `kubectl` binary and parses its JSON output.
//!
//! Every invocation is bounded by a timeout. A call that overruns is killed
//! rather than left to hang the whole command, and is reported as failed.

use super::{ClusterClient, KubeContext};
use crate::error::{KubesecError, Result};
use crate::secret::{RawMetadata, RawSecret, RawSecretList};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
struct NamespaceItem {
    #[serde(default)]
    metadata: RawMetadata,
}

#[derive(Debug, Deserialize)]
struct NamespaceList {
    #[serde(default)]
    items: Vec<NamespaceItem>,
}

/// [`ClusterClient`] backed by the `kubectl` binary
#[derive(Debug, Clone)]
pub struct KubectlClient {
    binary: String,
    timeout: Duration,
}

impl KubectlClient {
    pub fn new(binary: impl Into<String>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }

    /// Full argument list for one call, with the context appended when set
    fn command_args(context: &KubeContext, args: &[&str]) -> Vec<String> {
        let mut full: Vec<String> = args.iter().map(|a| (*a).to_string()).collect();
        if let Some(name) = context.name() {
            full.push(format!("--context={name}"));
        }
        full
    }

    /// Run kubectl and return its stdout
    async fn run(&self, context: &KubeContext, args: &[&str]) -> Result<String> {
        let args = Self::command_args(context, args);
        debug!("Running {} {}", self.binary, args.join(" "));

        let child = tokio::process::Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| KubesecError::cluster(format!("Failed to spawn {}: {e}", self.binary)))?;

        // Dropping the wait future on timeout drops the child, which kills it
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result?,
            Err(_elapsed) => {
                warn!(
                    "{} {} did not finish within {}s, killed",
                    self.binary,
                    args.first().map_or("", String::as_str),
                    self.timeout.as_secs()
                );
                return Err(KubesecError::cluster(format!(
                    "{} {} timed out after {}s",
                    self.binary,
                    args.join(" "),
                    self.timeout.as_secs()
                )));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(classify_failure(&stderr, output.status.code()));
        }

        String::from_utf8(output.stdout)
            .map_err(|e| KubesecError::cluster(format!("kubectl output is not valid UTF-8: {e}")))
    }
}

/// Map a failed kubectl call to `NotFound` or `ClusterCommand`
fn classify_failure(stderr: &str, exit_code: Option<i32>) -> KubesecError {
    if stderr.contains("NotFound") {
        return KubesecError::NotFound(stderr.to_string());
    }
    if stderr.is_empty() {
        return KubesecError::cluster(format!("kubectl exited with status {exit_code:?}"));
    }
    KubesecError::cluster(stderr)
}

fn parse_namespaces(json: &str) -> Result<Vec<String>> {
    let list: NamespaceList = serde_json::from_str(json)?;
    Ok(list
        .items
        .into_iter()
        .map(|item| item.metadata.name)
        .filter(|name| !name.is_empty())
        .collect())
}

#[async_trait]
impl ClusterClient for KubectlClient {
    async fn list_namespaces(&self, context: &KubeContext) -> Result<Vec<String>> {
        let output = self.run(context, &["get", "namespaces", "-o", "json"]).await?;
        parse_namespaces(&output)
    }

    async fn get_secret(
        &self,
        context: &KubeContext,
        name: &str,
        namespace: &str,
    ) -> Result<RawSecret> {
        let output = self
            .run(context, &["get", "secret", name, "-n", namespace, "-o", "json"])
            .await?;
        Ok(serde_json::from_str(&output)?)
    }

    async fn list_secrets(
        &self,
        context: &KubeContext,
        namespace: &str,
    ) -> Result<Vec<RawSecret>> {
        let namespace_arg = format!("--namespace={namespace}");
        let output = self
            .run(context, &["get", "secrets", "-o", "json", namespace_arg.as_str()])
            .await?;
        let list: RawSecretList = serde_json::from_str(&output)?;
        Ok(list.items)
    }

    /// Replace the whole object so keys missing from the manifest are removed,
    /// creating it when it does not exist yet
    async fn apply_manifest(&self, context: &KubeContext, path: &Path) -> Result<()> {
        let path = path.to_string_lossy().into_owned();
        match self.run(context, &["replace", "-f", path.as_str()]).await {
            Ok(_) => Ok(()),
            Err(e) if e.is_not_found() => {
                debug!("Secret absent, creating it from {path}");
                self.run(context, &["create", "-f", path.as_str()]).await?;
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn create_namespace(&self, context: &KubeContext, namespace: &str) -> Result<()> {
        self.run(context, &["create", "namespace", namespace]).await?;
        Ok(())
    }
}
