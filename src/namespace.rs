//! # Namespace Resolution
//!
//! Turns namespace selection flags into the concrete list of namespaces a
//! command works on.
//!
//! Exactly one filter kind is applied, by precedence exact > substring > regex,
//! with `default` used when none is given. Results are always a subset of the
//! namespaces the cluster reports, in the cluster's order, and exclusions are
//! subtracted last.

use crate::cluster::{ClusterClient, KubeContext};
use crate::constants::DEFAULT_NAMESPACE;
use crate::error::{KubesecError, Result};
use regex::Regex;
use tracing::{info, warn};

/// The single active namespace filter
#[derive(Debug, Clone)]
pub enum NamespaceFilter {
    Exact(String),
    Contains(String),
    Regex(Regex),
}

impl NamespaceFilter {
    #[must_use]
    pub fn matches(&self, namespace: &str) -> bool {
        match self {
            Self::Exact(name) => namespace == name,
            Self::Contains(fragment) => namespace.contains(fragment.as_str()),
            Self::Regex(regex) => regex.is_match(namespace),
        }
    }
}

/// Namespace selection criteria as given on the command line
#[derive(Debug, Clone)]
pub struct NamespaceSelector {
    filter: NamespaceFilter,
    exclusions: Vec<String>,
}

impl NamespaceSelector {
    /// Pick the highest-precedence non-empty filter
    ///
    /// The regex is compiled here, so a malformed pattern fails before any
    /// cluster call, even though a higher-precedence filter would win.
    pub fn new(
        exact: Option<&str>,
        contains: Option<&str>,
        regex: Option<&str>,
        exclusions: &[String],
    ) -> Result<Self> {
        let regex = non_empty(regex)
            .map(|pattern| {
                Regex::new(pattern).map_err(|source| KubesecError::InvalidFilter {
                    pattern: pattern.to_string(),
                    source,
                })
            })
            .transpose()?;

        let filter = if let Some(name) = non_empty(exact) {
            NamespaceFilter::Exact(name.to_string())
        } else if let Some(fragment) = non_empty(contains) {
            NamespaceFilter::Contains(fragment.to_string())
        } else if let Some(regex) = regex {
            NamespaceFilter::Regex(regex)
        } else {
            NamespaceFilter::Exact(DEFAULT_NAMESPACE.to_string())
        };

        let exclusions = exclusions
            .iter()
            .flat_map(|e| e.split(','))
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .map(str::to_string)
            .collect();

        Ok(Self { filter, exclusions })
    }

    /// Selector for one exact namespace
    pub fn exact(namespace: impl Into<String>) -> Self {
        Self {
            filter: NamespaceFilter::Exact(namespace.into()),
            exclusions: Vec::new(),
        }
    }

    #[must_use]
    pub fn filter(&self) -> &NamespaceFilter {
        &self.filter
    }

    #[must_use]
    pub fn exclusions(&self) -> &[String] {
        &self.exclusions
    }

    /// Apply the filter and exclusions to a namespace list, keeping its order
    #[must_use]
    pub fn select(&self, existing: &[String]) -> Vec<String> {
        existing
            .iter()
            .filter(|ns| self.filter.matches(ns))
            .filter(|ns| !self.exclusions.contains(ns))
            .cloned()
            .collect()
    }

    /// Resolve against the cluster's live namespace list
    ///
    /// An exact name the cluster does not report is `NotFound`; substring and
    /// regex filters matching nothing give an empty list.
    pub async fn resolve(
        &self,
        client: &dyn ClusterClient,
        context: &KubeContext,
    ) -> Result<Vec<String>> {
        let existing = client.list_namespaces(context).await?;

        if let NamespaceFilter::Exact(name) = &self.filter {
            if !existing.contains(name) {
                return Err(KubesecError::NotFound(format!("namespace '{name}'")));
            }
        }

        let selected = self.select(&existing);
        if selected.is_empty() {
            warn!("No namespaces matched the selection");
        } else {
            info!("Selected {} namespace(s): {}", selected.len(), selected.join(", "));
        }
        Ok(selected)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
