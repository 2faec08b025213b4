//! # Backups and Secrets Files
//!
//! A secrets file holds one Secret object: a comment header naming the
//! context, secret and namespace, followed by a YAML mapping of key to value.
//!
//! ```text
//! #######################################
//! # Context: prod-cluster
//! # Secret: db
//! # Namespace: prod
//! #######################################
//! url: https://svc.prod.svc.cluster.local
//! config: |-
//!   line one
//!   line two
//! ```
//!
//! Multi-line values are written as YAML block scalars so embedded newlines
//! survive a backup/restore round trip.
//!
//! A backup run is one freshly created directory with one subdirectory per
//! namespace and one secrets file per secret.

use crate::cluster::KubeContext;
use crate::constants::{BACKUP_TIMESTAMP_FORMAT, SECRETS_FILE_RULE};
use crate::error::{KubesecError, Result};
use crate::secret::{Secret, SecretKey, SecretSet};
use chrono::{DateTime, Local};
use regex::Regex;
use serde_yaml::{Mapping, Value};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Contents of a secrets file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecretsFile {
    /// `# Context:` header, `None` when absent or blank
    pub context: Option<String>,
    /// `# Secret:` header
    pub secret_name: Option<String>,
    /// `# Namespace:` header
    pub namespace: Option<String>,
    pub secrets: Vec<Secret>,
}

/// Render a secrets file
pub fn render_secrets_file(
    context: &KubeContext,
    key: &SecretKey,
    secrets: &[Secret],
) -> Result<String> {
    let mut out = String::new();
    // Writing to a String cannot fail
    let _ = writeln!(out, "{SECRETS_FILE_RULE}");
    let _ = writeln!(out, "# Context: {context}");
    let _ = writeln!(out, "# Secret: {}", key.name);
    let _ = writeln!(out, "# Namespace: {}", key.namespace);
    let _ = writeln!(out, "{SECRETS_FILE_RULE}");

    let mut body = Mapping::new();
    for secret in secrets {
        body.insert(
            Value::String(secret.name.clone()),
            Value::String(secret.value.clone()),
        );
    }
    out.push_str(&serde_yaml::to_string(&body)?);
    Ok(out)
}

/// Write a secrets file, replacing any existing file
pub fn write_secrets_file(
    path: &Path,
    context: &KubeContext,
    key: &SecretKey,
    secrets: &[Secret],
) -> Result<()> {
    debug!("Writing file '{}'", path.display());
    fs::write(path, render_secrets_file(context, key, secrets)?)?;
    Ok(())
}

/// Header fields keyed by name, first occurrence wins
#[derive(Debug, Default)]
struct Header {
    context: Option<String>,
    secret_name: Option<String>,
    namespace: Option<String>,
}

fn parse_header(contents: &str) -> Result<Header> {
    let regex = Regex::new(r"(?m)^#[ \t]*(Context|Secret|Namespace):[ \t]*([^\r\n]*)$")
        .map_err(|e| KubesecError::validation(format!("Failed to compile header pattern: {e}")))?;

    let mut header = Header::default();
    for captures in regex.captures_iter(contents) {
        let value = captures[2].trim();
        if value.is_empty() {
            continue;
        }
        let slot = match &captures[1] {
            "Context" => &mut header.context,
            "Secret" => &mut header.secret_name,
            _ => &mut header.namespace,
        };
        if slot.is_none() {
            *slot = Some(value.to_string());
        }
    }
    Ok(header)
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => Some(String::new()),
        _ => None,
    }
}

/// Parse a secrets file
///
/// Headers are optional. Non-string scalars are stringified; nested values
/// are rejected.
pub fn parse_secrets_file(contents: &str) -> Result<SecretsFile> {
    let body: Value = serde_yaml::from_str(contents)?;
    let mapping = match body {
        Value::Null => Mapping::new(),
        Value::Mapping(mapping) => mapping,
        _ => {
            return Err(KubesecError::validation(
                "Secrets file body must be a mapping of key: value",
            ))
        }
    };

    let mut secrets = Vec::with_capacity(mapping.len());
    for (key, value) in &mapping {
        let name = scalar_to_string(key)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| KubesecError::validation(format!("Invalid secret key: {key:?}")))?;
        let value = scalar_to_string(value).ok_or_else(|| {
            KubesecError::validation(format!("Value of '{name}' must be a string"))
        })?;
        secrets.push(Secret::new(name, value));
    }

    let header = parse_header(contents)?;
    Ok(SecretsFile {
        context: header.context,
        secret_name: header.secret_name,
        namespace: header.namespace,
        secrets,
    })
}

/// Read and parse a secrets file
pub fn read_secrets_file(path: &Path) -> Result<SecretsFile> {
    let contents = fs::read_to_string(path)?;
    parse_secrets_file(&contents).map_err(|e| match e {
        KubesecError::Yaml(yaml) => {
            KubesecError::validation(format!("Failed to parse '{}': {yaml}", path.display()))
        }
        other => other,
    })
}

/// Whether a directory entry holds secret data (skips hidden and housekeeping files)
#[must_use]
pub fn is_secrets_file(path: &Path) -> bool {
    let hidden = path
        .file_name()
        .and_then(|n| n.to_str())
        .is_none_or(|n| n.starts_with('.'));
    let yaml = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"));
    !hidden && yaml
}

/// `<prefix>-<timestamp>`
#[must_use]
pub fn backup_folder_name(prefix: &str, now: DateTime<Local>) -> String {
    format!("{prefix}-{}", now.format(BACKUP_TIMESTAMP_FORMAT))
}

/// Make a context name usable inside a folder name
#[must_use]
pub fn sanitize_path_component(s: &str) -> String {
    s.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Persists a [`SecretSet`] to one backup directory
#[derive(Debug)]
pub struct BackupWriter {
    root: PathBuf,
}

impl BackupWriter {
    /// Create a fresh `<base>/<prefix>-<timestamp>` directory
    ///
    /// Fails if the directory already exists.
    pub fn create(base: &Path, prefix: &str) -> Result<Self> {
        fs::create_dir_all(base)?;
        let root = base.join(backup_folder_name(prefix, Local::now()));
        fs::create_dir(&root)?;
        info!("Created backup folder {}", root.display());
        Ok(Self { root })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Path of the file holding one secret
    #[must_use]
    pub fn secret_path(&self, key: &SecretKey) -> PathBuf {
        self.root
            .join(&key.namespace)
            .join(format!("{}.yaml", key.name))
    }

    /// Write every secret of the set; returns the number of files written
    pub fn write(&self, context: &KubeContext, set: &SecretSet) -> Result<usize> {
        let mut written = 0;
        for entry in set {
            let path = self.secret_path(&entry.key);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            write_secrets_file(&path, context, &entry.key, &entry.secrets)?;
            written += 1;
        }
        info!("Backed up {} secret(s) to {}", written, self.root.display());
        Ok(written)
    }

    /// Delete the backup directory and everything in it
    pub fn remove(self) -> Result<()> {
        fs::remove_dir_all(&self.root)?;
        Ok(())
    }
}
