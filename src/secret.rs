//! # Secret Model
//!
//! Decoded secret keys, the keyed collection built from them, and the raw
//! cluster representation they are decoded from.
//!
//! Decoding is a typed step: [`RawSecret::decode`] reports a decoded key list,
//! a skip reason, or a failure, and leaves the abort-vs-skip decision to the caller.

use crate::constants::OPAQUE_SECRET_TYPE;
use crate::error::KubesecError;
use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single key of a cluster Secret object with its UTF-8 decoded value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Secret {
    pub name: String,
    pub value: String,
}

impl Secret {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// First key with the given name (cluster data is not deduplicated locally)
#[must_use]
pub fn find_secret<'a>(secrets: &'a [Secret], name: &str) -> Option<&'a Secret> {
    secrets.iter().find(|s| s.name == name)
}

/// Identifies one cluster Secret object
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SecretKey {
    pub namespace: String,
    pub name: String,
}

impl SecretKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// One Secret object and its decoded keys, in cluster order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretEntry {
    pub key: SecretKey,
    pub secrets: Vec<Secret>,
}

/// Decoded secrets keyed by (namespace, secret name)
///
/// Iteration follows insertion order, which the collector keeps aligned with
/// the order the cluster reported namespaces and secrets in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecretSet {
    entries: Vec<SecretEntry>,
}

impl SecretSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the keys of one Secret object
    pub fn insert(&mut self, key: SecretKey, secrets: Vec<Secret>) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.key == key) {
            entry.secrets = secrets;
        } else {
            self.entries.push(SecretEntry { key, secrets });
        }
    }

    #[must_use]
    pub fn get(&self, key: &SecretKey) -> Option<&[Secret]> {
        self.entries
            .iter()
            .find(|e| &e.key == key)
            .map(|e| e.secrets.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = &SecretEntry> {
        self.entries.iter()
    }

    /// Number of Secret objects
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of keys across all Secret objects
    #[must_use]
    pub fn key_count(&self) -> usize {
        self.entries.iter().map(|e| e.secrets.len()).sum()
    }
}

impl<'a> IntoIterator for &'a SecretSet {
    type Item = &'a SecretEntry;
    type IntoIter = std::slice::Iter<'a, SecretEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Metadata subset kubesec reads from a Secret object
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawMetadata {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

/// A Secret object as the cluster returns it, with base64 encoded data
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSecret {
    #[serde(default)]
    pub metadata: RawMetadata,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<BTreeMap<String, String>>,
}

/// `kubectl get secrets -o json` envelope
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSecretList {
    #[serde(default)]
    pub items: Vec<RawSecret>,
}

/// Why a Secret object was left out of a collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Type other than Opaque (service account tokens, TLS, docker config, ...)
    NotOpaque(String),
    /// Opaque but without a data payload
    NoData,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotOpaque(kind) => {
                write!(f, "it is not {OPAQUE_SECRET_TYPE} type, but '{kind}'")
            }
            Self::NoData => write!(f, "it has no data"),
        }
    }
}

/// Result of decoding one [`RawSecret`]
#[derive(Debug)]
pub enum DecodeOutcome {
    Decoded(Vec<Secret>),
    Skipped(SkipReason),
    Failed(KubesecError),
}

impl RawSecret {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    #[must_use]
    pub fn is_opaque(&self) -> bool {
        self.type_.as_deref() == Some(OPAQUE_SECRET_TYPE)
    }

    /// Decode every data key from base64 to UTF-8 text
    ///
    /// `namespace` is only used to label a failure.
    #[must_use]
    pub fn decode(&self, namespace: &str) -> DecodeOutcome {
        if !self.is_opaque() {
            let kind = self.type_.clone().unwrap_or_else(|| "<none>".to_string());
            return DecodeOutcome::Skipped(SkipReason::NotOpaque(kind));
        }

        let Some(data) = &self.data else {
            return DecodeOutcome::Skipped(SkipReason::NoData);
        };

        let mut secrets = Vec::with_capacity(data.len());
        for (key, encoded) in data {
            match decode_value(encoded) {
                Ok(value) => secrets.push(Secret::new(key.clone(), value)),
                Err(reason) => {
                    return DecodeOutcome::Failed(KubesecError::Decode {
                        namespace: namespace.to_string(),
                        secret: self.metadata.name.clone(),
                        key: key.clone(),
                        reason,
                    })
                }
            }
        }

        DecodeOutcome::Decoded(secrets)
    }
}

fn decode_value(encoded: &str) -> Result<String, String> {
    let bytes = general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|e| format!("invalid base64: {e}"))?;
    String::from_utf8(bytes).map_err(|e| format!("invalid UTF-8: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(name: &str, type_: Option<&str>, data: Option<&[(&str, &str)]>) -> RawSecret {
        RawSecret {
            metadata: RawMetadata {
                name: name.to_string(),
                namespace: None,
            },
            type_: type_.map(str::to_string),
            data: data.map(|pairs| {
                pairs
                    .iter()
                    .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                    .collect()
            }),
        }
    }

    #[test]
    fn test_decode_opaque_secret() {
        // "postgres://db" and "line1\nline2"
        let secret = raw(
            "db",
            Some("Opaque"),
            Some(&[("url", "cG9zdGdyZXM6Ly9kYg=="), ("multi", "bGluZTEKbGluZTI=")]),
        );

        match secret.decode("prod") {
            DecodeOutcome::Decoded(secrets) => {
                assert_eq!(
                    secrets,
                    vec![
                        Secret::new("multi", "line1\nline2"),
                        Secret::new("url", "postgres://db"),
                    ]
                );
            }
            other => panic!("expected decoded secret, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_skips_non_opaque() {
        let secret = raw("tls", Some("kubernetes.io/tls"), Some(&[("tls.crt", "YQ==")]));
        match secret.decode("prod") {
            DecodeOutcome::Skipped(SkipReason::NotOpaque(kind)) => {
                assert_eq!(kind, "kubernetes.io/tls");
            }
            other => panic!("expected skip, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_skips_missing_type_and_data() {
        assert!(matches!(
            raw("untyped", None, Some(&[])).decode("ns"),
            DecodeOutcome::Skipped(SkipReason::NotOpaque(_))
        ));
        assert!(matches!(
            raw("empty", Some("Opaque"), None).decode("ns"),
            DecodeOutcome::Skipped(SkipReason::NoData)
        ));
    }

    #[test]
    fn test_decode_invalid_base64_fails() {
        let secret = raw("broken", Some("Opaque"), Some(&[("key", "not base64!")]));
        match secret.decode("prod") {
            DecodeOutcome::Failed(KubesecError::Decode { secret, key, .. }) => {
                assert_eq!(secret, "broken");
                assert_eq!(key, "key");
            }
            other => panic!("expected decode failure, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_invalid_utf8_fails() {
        // 0xff 0xfe is not UTF-8
        let secret = raw("binary", Some("Opaque"), Some(&[("blob", "//4=")]));
        assert!(matches!(
            secret.decode("prod"),
            DecodeOutcome::Failed(KubesecError::Decode { .. })
        ));
    }

    #[test]
    fn test_raw_secret_list_from_kubectl_json() {
        let json = r#"{
            "apiVersion": "v1",
            "kind": "List",
            "items": [
                {"metadata": {"name": "a", "namespace": "prod"}, "type": "Opaque", "data": {"k": "dg=="}},
                {"metadata": {"name": "b"}, "type": "Opaque"}
            ]
        }"#;
        let list: RawSecretList = serde_json::from_str(json).unwrap();
        assert_eq!(list.items.len(), 2);
        assert_eq!(list.items[0].name(), "a");
        assert!(list.items[1].data.is_none());
    }

    #[test]
    fn test_secret_set_insert_and_order() {
        let mut set = SecretSet::new();
        set.insert(SecretKey::new("b", "one"), vec![Secret::new("k", "v")]);
        set.insert(SecretKey::new("a", "two"), vec![]);
        set.insert(
            SecretKey::new("b", "one"),
            vec![Secret::new("k", "v2"), Secret::new("k", "dup")],
        );

        let keys: Vec<String> = set.iter().map(|e| e.key.to_string()).collect();
        assert_eq!(keys, vec!["b/one", "a/two"]);
        assert_eq!(set.key_count(), 2);
        assert_eq!(
            find_secret(set.get(&SecretKey::new("b", "one")).unwrap(), "k"),
            Some(&Secret::new("k", "v2"))
        );
    }
}
