//! # Secret Manifests
//!
//! Builds the Opaque Secret manifest published by `push`, `restore` and
//! `update-value`, and stages it in a temporary file for `apply`.

use crate::constants::OPAQUE_SECRET_TYPE;
use crate::error::Result;
use crate::secret::{Secret, SecretKey};
use k8s_openapi::api::core::v1::Secret as K8sSecret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::ByteString;
use std::collections::BTreeMap;
use std::io::Write;
use tempfile::NamedTempFile;

/// Typed Opaque Secret carrying every given key
///
/// Keys repeated in `secrets` collapse to the last value, as the cluster
/// cannot hold duplicate data keys.
#[must_use]
pub fn build_secret(key: &SecretKey, secrets: &[Secret]) -> K8sSecret {
    let data: BTreeMap<String, ByteString> = secrets
        .iter()
        .map(|s| (s.name.clone(), ByteString(s.value.as_bytes().to_vec())))
        .collect();

    K8sSecret {
        metadata: ObjectMeta {
            name: Some(key.name.clone()),
            namespace: Some(key.namespace.clone()),
            ..Default::default()
        },
        type_: Some(OPAQUE_SECRET_TYPE.to_string()),
        data: Some(data),
        ..Default::default()
    }
}

/// Serialize the manifest as YAML (data values base64 encoded)
pub fn render_manifest(key: &SecretKey, secrets: &[Secret]) -> Result<String> {
    Ok(serde_yaml::to_string(&build_secret(key, secrets))?)
}

/// Write the manifest to a temporary file removed when the handle drops
pub fn write_manifest(key: &SecretKey, secrets: &[Secret]) -> Result<NamedTempFile> {
    let manifest = render_manifest(key, secrets)?;
    let mut file = tempfile::Builder::new()
        .prefix(".secrets-upload-")
        .suffix(".yaml")
        .tempfile()?;
    file.write_all(manifest.as_bytes())?;
    file.flush()?;
    Ok(file)
}
