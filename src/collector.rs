//! # Secret Collection
//!
//! Fetches and decodes Opaque secrets for a set of namespaces.
//!
//! Non-Opaque and data-less secrets are skipped with a logged reason. A key
//! that fails to decode aborts the whole collection: no partial set is returned.

use crate::cluster::{ClusterClient, KubeContext};
use crate::constants::OPAQUE_SECRET_TYPE;
use crate::error::{KubesecError, Result};
use crate::secret::{DecodeOutcome, Secret, SecretKey, SecretSet, SkipReason};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Collect every Opaque secret of the given namespaces
///
/// Namespaces are visited in the given order; cancellation is checked before each one.
pub async fn collect_secrets(
    client: &dyn ClusterClient,
    context: &KubeContext,
    namespaces: &[String],
    cancel: &CancellationToken,
) -> Result<SecretSet> {
    let mut set = SecretSet::new();

    for namespace in namespaces {
        if cancel.is_cancelled() {
            return Err(KubesecError::Cancelled);
        }

        let raw_secrets = client.list_secrets(context, namespace).await?;
        for raw in &raw_secrets {
            match raw.decode(namespace) {
                DecodeOutcome::Decoded(secrets) => {
                    set.insert(SecretKey::new(namespace.clone(), raw.name()), secrets);
                }
                DecodeOutcome::Skipped(reason) => {
                    info!(
                        "Skipping secret '{}/{}', because {}",
                        namespace,
                        raw.name(),
                        reason
                    );
                }
                DecodeOutcome::Failed(err) => return Err(err),
            }
        }
    }

    info!(
        "Collected {} secret(s) with {} key(s) from {} namespace(s)",
        set.len(),
        set.key_count(),
        namespaces.len()
    );
    Ok(set)
}

/// Fetch and decode one named secret
///
/// A non-Opaque secret is rejected; an Opaque secret without data has no keys.
pub async fn collect_secret(
    client: &dyn ClusterClient,
    context: &KubeContext,
    namespace: &str,
    name: &str,
) -> Result<Vec<Secret>> {
    let raw = client.get_secret(context, name, namespace).await?;
    match raw.decode(namespace) {
        DecodeOutcome::Decoded(secrets) => Ok(secrets),
        DecodeOutcome::Skipped(SkipReason::NoData) => Ok(Vec::new()),
        DecodeOutcome::Skipped(SkipReason::NotOpaque(kind)) => Err(KubesecError::validation(
            format!(
                "Secret '{namespace}/{name}' is of type '{kind}', only {OPAQUE_SECRET_TYPE} secrets are supported"
            ),
        )),
        DecodeOutcome::Failed(err) => Err(err),
    }
}

/// Like [`collect_secret`], but a secret that does not exist yet has no keys
pub async fn collect_secret_or_empty(
    client: &dyn ClusterClient,
    context: &KubeContext,
    namespace: &str,
    name: &str,
) -> Result<Vec<Secret>> {
    match collect_secret(client, context, namespace, name).await {
        Err(err) if err.is_not_found() => Ok(Vec::new()),
        other => other,
    }
}
