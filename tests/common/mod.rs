//! Common test utilities
//!
//! [`FakeCluster`] is an in-memory [`ClusterClient`]: it serves namespaces and
//! Secret objects from memory, records every call, stores applied manifests
//! and can be told to fail applies for chosen secrets.

#![allow(dead_code, reason = "each test binary uses a different subset")]

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use k8s_openapi::api::core::v1::Secret as K8sSecret;
use kubesec::cluster::{ClusterClient, KubeContext};
use kubesec::commands::Session;
use kubesec::error::{KubesecError, Result};
use kubesec::prompt::Prompter;
use kubesec::secret::{RawMetadata, RawSecret};
use kubesec::{KubesecConfig, Secret, SecretKey};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Default)]
struct State {
    namespaces: Vec<String>,
    /// (namespace, object) in insertion order
    secrets: Vec<(String, RawSecret)>,
    applied: Vec<(SecretKey, Vec<Secret>)>,
    failing_applies: HashSet<SecretKey>,
    calls: Vec<String>,
}

#[derive(Debug, Default)]
pub struct FakeCluster {
    state: Mutex<State>,
}

impl FakeCluster {
    pub fn new(namespaces: &[&str]) -> Self {
        let cluster = Self::default();
        cluster.state().namespaces = namespaces.iter().map(|s| (*s).to_string()).collect();
        cluster
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    /// Add an Opaque secret with plain-text values
    pub fn with_secret(self, namespace: &str, name: &str, pairs: &[(&str, &str)]) -> Self {
        let data = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), general_purpose::STANDARD.encode(v)))
            .collect();
        self.with_raw(namespace, name, Some("Opaque"), Some(data))
    }

    /// Add a Secret object with already encoded data
    pub fn with_raw(
        self,
        namespace: &str,
        name: &str,
        type_: Option<&str>,
        data: Option<std::collections::BTreeMap<String, String>>,
    ) -> Self {
        self.state().secrets.push((
            namespace.to_string(),
            RawSecret {
                metadata: RawMetadata {
                    name: name.to_string(),
                    namespace: Some(namespace.to_string()),
                },
                type_: type_.map(str::to_string),
                data,
            },
        ));
        self
    }

    /// Make applies of this secret fail
    pub fn failing_apply(self, namespace: &str, name: &str) -> Self {
        self.state()
            .failing_applies
            .insert(SecretKey::new(namespace, name));
        self
    }

    /// Every successfully applied secret, in order
    pub fn applied(&self) -> Vec<(SecretKey, Vec<Secret>)> {
        self.state().applied.clone()
    }

    /// Every call made, e.g. `list_namespaces` or `apply prod/db`
    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    pub fn namespaces(&self) -> Vec<String> {
        self.state().namespaces.clone()
    }

    fn record(&self, call: String) {
        self.state().calls.push(call);
    }
}

#[async_trait]
impl ClusterClient for FakeCluster {
    async fn list_namespaces(&self, _context: &KubeContext) -> Result<Vec<String>> {
        self.record("list_namespaces".to_string());
        Ok(self.namespaces())
    }

    async fn get_secret(
        &self,
        _context: &KubeContext,
        name: &str,
        namespace: &str,
    ) -> Result<RawSecret> {
        self.record(format!("get {namespace}/{name}"));
        self.state()
            .secrets
            .iter()
            .find(|(ns, s)| ns == namespace && s.metadata.name == name)
            .map(|(_, s)| s.clone())
            .ok_or_else(|| KubesecError::NotFound(format!("secret '{namespace}/{name}'")))
    }

    async fn list_secrets(&self, _context: &KubeContext, namespace: &str) -> Result<Vec<RawSecret>> {
        self.record(format!("list {namespace}"));
        Ok(self
            .state()
            .secrets
            .iter()
            .filter(|(ns, _)| ns == namespace)
            .map(|(_, s)| s.clone())
            .collect())
    }

    async fn apply_manifest(&self, _context: &KubeContext, path: &Path) -> Result<()> {
        let manifest: K8sSecret = serde_yaml::from_str(&std::fs::read_to_string(path)?)?;
        let namespace = manifest.metadata.namespace.clone().unwrap_or_default();
        let name = manifest.metadata.name.clone().unwrap_or_default();
        let key = SecretKey::new(namespace.as_str(), name.as_str());
        self.record(format!("apply {key}"));

        let mut state = self.state();
        if state.failing_applies.contains(&key) {
            return Err(KubesecError::cluster(format!(
                "admission webhook denied the request for {key}"
            )));
        }

        let data = manifest.data.unwrap_or_default();
        let secrets = data
            .iter()
            .map(|(k, v)| Secret::new(k.clone(), String::from_utf8(v.0.clone()).unwrap()))
            .collect();
        let encoded = data
            .iter()
            .map(|(k, v)| (k.clone(), general_purpose::STANDARD.encode(&v.0)))
            .collect();

        state
            .secrets
            .retain(|(ns, s)| !(ns == &namespace && s.metadata.name == name));
        state.secrets.push((
            namespace.clone(),
            RawSecret {
                metadata: RawMetadata {
                    name,
                    namespace: Some(namespace),
                },
                type_: manifest.type_,
                data: Some(encoded),
            },
        ));
        state.applied.push((key, secrets));
        Ok(())
    }

    async fn create_namespace(&self, _context: &KubeContext, namespace: &str) -> Result<()> {
        self.record(format!("create_namespace {namespace}"));
        self.state().namespaces.push(namespace.to_string());
        Ok(())
    }
}

/// Answers yes, but as if Ctrl-C was pressed while the question was open
#[derive(Debug)]
pub struct InterruptedPrompter {
    pub cancel: CancellationToken,
    pub asked: usize,
}

impl InterruptedPrompter {
    pub fn new(cancel: CancellationToken) -> Self {
        Self { cancel, asked: 0 }
    }
}

impl Prompter for InterruptedPrompter {
    fn confirm(&mut self, _question: &str) -> Result<bool> {
        self.asked += 1;
        self.cancel.cancel();
        Ok(true)
    }
}

/// Session against a fake cluster with backups rooted in `backup_root`
pub fn session<'a>(cluster: &'a FakeCluster, backup_root: &Path) -> Session<'a> {
    let config = KubesecConfig {
        backup_root: backup_root.to_path_buf(),
        ..Default::default()
    };
    Session::new(cluster, KubeContext::named("test-ctx"), config)
}

/// Captured command output as text
pub fn output(buffer: &[u8]) -> String {
    String::from_utf8_lossy(buffer).into_owned()
}

/// Directories directly inside `dir`
pub fn subdirs(dir: &Path) -> Vec<std::path::PathBuf> {
    let mut dirs: Vec<_> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| p.is_dir())
        .collect();
    dirs.sort();
    dirs
}
