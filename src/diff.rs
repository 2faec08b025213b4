//! # Diff
//!
//! Classifies how a desired key set differs from what the cluster holds.
//!
//! Keys are compared by name; values only for names present on both sides.
//! When a name is repeated, its first occurrence is the one compared.

use crate::secret::{find_secret, Secret};
use std::collections::HashSet;
use std::io::Write;

/// A key whose value changes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModifiedKey {
    pub name: String,
    pub from: String,
    pub to: String,
}

/// Differences between the current and desired keys of one secret
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    /// In the cluster but not desired
    pub removed: Vec<String>,
    /// Desired but not in the cluster
    pub added: Vec<String>,
    /// On both sides with different values
    pub modified: Vec<ModifiedKey>,
}

impl ChangeSet {
    /// False for the "no changes" result, which must short-circuit any write
    #[must_use]
    pub fn has_changes(&self) -> bool {
        !(self.removed.is_empty() && self.added.is_empty() && self.modified.is_empty())
    }

    /// Print the change list in `-`/`+`/FROM/TO form
    pub fn render(&self, out: &mut dyn Write) -> std::io::Result<()> {
        writeln!(out, "Changes:")?;
        for name in &self.removed {
            writeln!(out, "- {name}")?;
        }
        for name in &self.added {
            writeln!(out, "+ {name}")?;
        }
        for modified in &self.modified {
            writeln!(out, "{}", modified.name)?;
            writeln!(out, "FROM: {}", modified.from)?;
            writeln!(out, "TO  : {}", modified.to)?;
        }
        Ok(())
    }
}

/// Compare the cluster's keys with the desired keys
#[must_use]
pub fn diff(current: &[Secret], desired: &[Secret]) -> ChangeSet {
    let mut changes = ChangeSet::default();

    let mut seen = HashSet::new();
    for secret in current {
        if seen.insert(secret.name.as_str()) && find_secret(desired, &secret.name).is_none() {
            changes.removed.push(secret.name.clone());
        }
    }

    let mut seen = HashSet::new();
    for secret in desired {
        if !seen.insert(secret.name.as_str()) {
            continue;
        }
        match find_secret(current, &secret.name) {
            None => changes.added.push(secret.name.clone()),
            Some(existing) if existing.value != secret.value => {
                changes.modified.push(ModifiedKey {
                    name: secret.name.clone(),
                    from: existing.value.clone(),
                    to: secret.value.clone(),
                });
            }
            Some(_) => {}
        }
    }

    changes
}
