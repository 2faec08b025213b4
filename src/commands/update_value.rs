//! # Update-Value Command
//!
//! Replaces a literal value in every secret of the selected namespaces.
//!
//! ## Workflow
//!
//! 1. **Validate** the request before touching the cluster
//! 2. **Snapshot** the selected secrets; outside dry-run they are written to a
//!    fresh rollback folder before anything else happens
//! 3. **Locate** every key whose value contains the old value (case-sensitive)
//! 4. **Preview** the affected secrets, then **confirm**
//! 5. **Apply** each affected secret as a whole; a failing secret is recorded
//!    and the rest are still applied
//! 6. **Report** per-secret results and the restore command for the rollback folder
//!
//! A dry run stops after the preview and never creates a rollback folder.
//! When nothing matches, the unused rollback folder is removed.

use super::{CommandStatus, NamespaceArgs, Session};
use crate::backup::BackupWriter;
use crate::collector::collect_secrets;
use crate::constants::{BANNER_VALUE_WIDTH, PREVIEW_LINE_WIDTH, ROLLBACK_FOLDER_PREFIX};
use crate::display::{bold, green, red, rule, truncate_for_display, yellow};
use crate::error::{KubesecError, Result};
use crate::prompt::Prompter;
use crate::secret::{Secret, SecretKey, SecretSet};
use clap::Args;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Clone, Default, Args)]
pub struct UpdateValueArgs {
    /// Value to replace
    #[arg(value_name = "OLD_VALUE")]
    pub old_value: String,

    /// Replacement value
    #[arg(value_name = "NEW_VALUE")]
    pub new_value: String,

    #[command(flatten)]
    pub namespaces: NamespaceArgs,

    /// Apply without asking for confirmation
    #[arg(long)]
    pub skip_prompts: bool,

    /// Show what would change without backing up or applying anything
    #[arg(long)]
    pub dry_run: bool,

    /// Directory the rollback folder is created in (default: KUBESEC_BACKUP_ROOT)
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,
}

/// One key whose value contains the old value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretUpdateInfo {
    pub key: SecretKey,
    pub key_name: String,
    pub old_value: String,
    pub new_value: String,
    pub occurrences: usize,
    /// Every key of the containing secret, as collected
    pub siblings: Vec<Secret>,
}

/// The updates for one secret, which is applied as one unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateGroup {
    pub key: SecretKey,
    pub updates: Vec<SecretUpdateInfo>,
}

impl UpdateGroup {
    /// Full key set to publish: replacements overlaid on the untouched siblings
    #[must_use]
    pub fn desired_secrets(&self) -> Vec<Secret> {
        let Some(first) = self.updates.first() else {
            return Vec::new();
        };
        first
            .siblings
            .iter()
            .map(|sibling| {
                self.updates
                    .iter()
                    .find(|u| u.key_name == sibling.name && u.old_value == sibling.value)
                    .map_or_else(
                        || sibling.clone(),
                        |u| Secret::new(sibling.name.clone(), u.new_value.clone()),
                    )
            })
            .collect()
    }

    #[must_use]
    pub fn occurrences(&self) -> usize {
        self.updates.iter().map(|u| u.occurrences).sum()
    }
}

/// Per-secret results of the apply phase
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateReport {
    pub succeeded: Vec<SecretKey>,
    pub failed: Vec<(SecretKey, String)>,
    pub backup_dir: PathBuf,
}

/// How an update-value run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// No key contains the old value
    NoMatches,
    /// Preview only
    DryRun { groups: usize },
    /// Confirmation declined; the rollback folder is kept
    Cancelled { backup_dir: PathBuf },
    Applied(UpdateReport),
}

impl UpdateOutcome {
    #[must_use]
    pub fn status(&self) -> CommandStatus {
        match self {
            Self::Applied(report) if !report.failed.is_empty() => CommandStatus::Failure,
            _ => CommandStatus::Success,
        }
    }
}

pub async fn update_value_command(
    session: &Session<'_>,
    args: &UpdateValueArgs,
    out: &mut dyn Write,
    prompter: &mut dyn Prompter,
) -> Result<CommandStatus> {
    let outcome = update_value(session, args, out, prompter).await?;
    Ok(outcome.status())
}

/// Run the whole workflow and return how it ended
pub async fn update_value(
    session: &Session<'_>,
    args: &UpdateValueArgs,
    out: &mut dyn Write,
    prompter: &mut dyn Prompter,
) -> Result<UpdateOutcome> {
    validate(&args.old_value, &args.new_value)?;

    let selector = args.namespaces.selector()?;
    let namespaces = selector.resolve(session.client, &session.context).await?;
    let set = collect_secrets(session.client, &session.context, &namespaces, &session.cancel).await?;

    let backup = if args.dry_run {
        None
    } else {
        let base = args
            .output_dir
            .clone()
            .unwrap_or_else(|| session.config.backup_root.clone());
        ensure_not_cancelled(session)?;
        let writer = BackupWriter::create(&base, ROLLBACK_FOLDER_PREFIX)?;
        writer.write(&session.context, &set)?;
        Some(writer)
    };

    let groups = group_by_secret(locate(&set, &args.old_value, &args.new_value));
    if groups.is_empty() {
        writeln!(
            out,
            "No secrets contain '{}'",
            truncate_for_display(&args.old_value, BANNER_VALUE_WIDTH)
        )?;
        if let Some(writer) = backup {
            writer.remove()?;
        }
        return Ok(UpdateOutcome::NoMatches);
    }

    render_preview(
        out,
        &groups,
        &args.old_value,
        &args.new_value,
        session.config.preview_lines,
    )?;

    let Some(backup) = backup else {
        writeln!(out, "{}", yellow("Dry run: no backup was taken and nothing was applied"))?;
        return Ok(UpdateOutcome::DryRun {
            groups: groups.len(),
        });
    };
    writeln!(out, "Backup saved to {}", backup.path().display())?;

    if !prompter.confirm(&format!("Apply changes to {} secret(s)?", groups.len()))? {
        writeln!(
            out,
            "Cancelled, nothing was applied. Backup kept at {}",
            backup.path().display()
        )?;
        return Ok(UpdateOutcome::Cancelled {
            backup_dir: backup.path().to_path_buf(),
        });
    }

    // A Ctrl-C during the prompt wins over the answer
    ensure_not_cancelled(session)?;

    let mut report = UpdateReport {
        backup_dir: backup.path().to_path_buf(),
        ..Default::default()
    };
    for group in &groups {
        match session.apply_secret(&group.key, &group.desired_secrets()).await {
            Ok(()) => {
                info!("Updated {} key(s) in '{}'", group.updates.len(), group.key);
                report.succeeded.push(group.key.clone());
            }
            Err(err) => {
                warn!("Failed to update '{}': {}", group.key, err);
                report.failed.push((group.key.clone(), err.to_string()));
            }
        }
    }

    render_report(out, &report, session.context_label())?;
    Ok(UpdateOutcome::Applied(report))
}

fn ensure_not_cancelled(session: &Session<'_>) -> Result<()> {
    if session.cancel.is_cancelled() {
        return Err(KubesecError::Cancelled);
    }
    Ok(())
}

/// Reject requests that cannot change anything
pub fn validate(old_value: &str, new_value: &str) -> Result<()> {
    if old_value.is_empty() {
        return Err(KubesecError::validation("The old value must not be empty"));
    }
    if old_value == new_value {
        return Err(KubesecError::validation(
            "The old and new values are identical, nothing to update",
        ));
    }
    Ok(())
}

/// Every key containing `old_value`, with its fully substituted value
#[must_use]
pub fn locate(set: &SecretSet, old_value: &str, new_value: &str) -> Vec<SecretUpdateInfo> {
    let mut updates = Vec::new();
    for entry in set {
        for secret in &entry.secrets {
            let occurrences = secret.value.matches(old_value).count();
            if occurrences == 0 {
                continue;
            }
            updates.push(SecretUpdateInfo {
                key: entry.key.clone(),
                key_name: secret.name.clone(),
                old_value: secret.value.clone(),
                new_value: secret.value.replace(old_value, new_value),
                occurrences,
                siblings: entry.secrets.clone(),
            });
        }
    }
    updates
}

/// Group updates by secret, keeping first-seen order
#[must_use]
pub fn group_by_secret(updates: Vec<SecretUpdateInfo>) -> Vec<UpdateGroup> {
    let mut groups: Vec<UpdateGroup> = Vec::new();
    for update in updates {
        match groups.iter_mut().find(|g| g.key == update.key) {
            Some(group) => group.updates.push(update),
            None => groups.push(UpdateGroup {
                key: update.key.clone(),
                updates: vec![update],
            }),
        }
    }
    groups
}

fn render_preview(
    out: &mut dyn Write,
    groups: &[UpdateGroup],
    old_value: &str,
    new_value: &str,
    preview_lines: usize,
) -> std::io::Result<()> {
    let keys: usize = groups.iter().map(|g| g.updates.len()).sum();
    let occurrences: usize = groups.iter().map(UpdateGroup::occurrences).sum();

    writeln!(out, "{}", rule())?;
    writeln!(
        out,
        "Replace: {}",
        truncate_for_display(old_value, BANNER_VALUE_WIDTH)
    )?;
    writeln!(
        out,
        "With   : {}",
        truncate_for_display(new_value, BANNER_VALUE_WIDTH)
    )?;
    writeln!(out, "{}", rule())?;
    writeln!(
        out,
        "Found {occurrences} occurrence(s) in {keys} key(s) across {} secret(s)",
        groups.len()
    )?;

    for group in groups {
        writeln!(out)?;
        writeln!(out, "{}", bold(&group.key.to_string()))?;
        for update in &group.updates {
            writeln!(
                out,
                "  {} ({} occurrence(s))",
                update.key_name, update.occurrences
            )?;
            preview_key(out, update, old_value, new_value, preview_lines)?;
        }
    }
    writeln!(out)
}

/// Matching lines of one key, capped at `preview_lines`
fn preview_key(
    out: &mut dyn Write,
    update: &SecretUpdateInfo,
    old_value: &str,
    new_value: &str,
    preview_lines: usize,
) -> std::io::Result<()> {
    let matching: Vec<&str> = update
        .old_value
        .split('\n')
        .filter(|line| line.contains(old_value))
        .collect();

    for line in matching.iter().take(preview_lines) {
        let replaced = line.replace(old_value, new_value);
        writeln!(
            out,
            "    {}",
            red(&format!("- {}", truncate_for_display(line, PREVIEW_LINE_WIDTH)))
        )?;
        writeln!(
            out,
            "    {}",
            green(&format!(
                "+ {}",
                truncate_for_display(&replaced, PREVIEW_LINE_WIDTH)
            ))
        )?;
    }
    if matching.len() > preview_lines {
        writeln!(
            out,
            "    ... and {} more line(s)",
            matching.len() - preview_lines
        )?;
    }
    Ok(())
}

fn render_report(out: &mut dyn Write, report: &UpdateReport, context: &str) -> std::io::Result<()> {
    writeln!(out, "{}", rule())?;
    for key in &report.succeeded {
        writeln!(out, "{} {key}", green("✓"))?;
    }
    for (key, err) in &report.failed {
        writeln!(out, "{} {key}: {err}", red("✗"))?;
    }
    writeln!(
        out,
        "Updated {} of {} secret(s), {} failed",
        report.succeeded.len(),
        report.succeeded.len() + report.failed.len(),
        report.failed.len()
    )?;
    writeln!(out, "{}", rule())?;
    writeln!(out, "To roll back, run:")?;
    writeln!(out, "  {}", rollback_command(context, &report.backup_dir))
}

/// The restore invocation that reverts an update
#[must_use]
pub fn rollback_command(context: &str, backup_dir: &Path) -> String {
    format!(
        "kubesec restore --context {context} --recursive {}/",
        backup_dir.display()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_set() -> SecretSet {
        let mut set = SecretSet::new();
        set.insert(
            SecretKey::new("prod", "db"),
            vec![
                Secret::new("url", "https://old.host/a\nbackup=https://old.host/b"),
                Secret::new("user", "admin"),
            ],
        );
        set.insert(
            SecretKey::new("prod", "cache"),
            vec![Secret::new("host", "redis")],
        );
        set.insert(
            SecretKey::new("staging", "db"),
            vec![
                Secret::new("url", "old.host"),
                Secret::new("mirror", "old.host:old.host"),
            ],
        );
        set
    }

    #[test]
    fn test_validate() {
        assert!(validate("a", "b").is_ok());
        assert!(matches!(validate("a", "a"), Err(KubesecError::Validation(_))));
        assert!(matches!(validate("", "b"), Err(KubesecError::Validation(_))));
    }

    #[test]
    fn test_locate_counts_and_replaces_all() {
        let updates = locate(&sample_set(), "old.host", "new.host");
        assert_eq!(updates.len(), 3);

        assert_eq!(updates[0].key, SecretKey::new("prod", "db"));
        assert_eq!(updates[0].occurrences, 2);
        assert_eq!(
            updates[0].new_value,
            "https://new.host/a\nbackup=https://new.host/b"
        );
        assert_eq!(updates[0].siblings.len(), 2);

        assert_eq!(updates[2].key_name, "mirror");
        assert_eq!(updates[2].new_value, "new.host:new.host");
    }

    #[test]
    fn test_locate_is_case_sensitive() {
        assert!(locate(&sample_set(), "OLD.HOST", "x").is_empty());
    }

    #[test]
    fn test_group_overlays_untouched_siblings() {
        let groups = group_by_secret(locate(&sample_set(), "old.host", "new.host"));
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].key, SecretKey::new("prod", "db"));
        assert_eq!(
            groups[0].desired_secrets(),
            vec![
                Secret::new("url", "https://new.host/a\nbackup=https://new.host/b"),
                Secret::new("user", "admin"),
            ]
        );
        assert_eq!(groups[1].updates.len(), 2);
        assert_eq!(groups[1].occurrences(), 3);
    }

    #[test]
    fn test_preview_is_capped() {
        let value = (0..8).map(|i| format!("line{i}=old")).collect::<Vec<_>>().join("\n");
        let update = SecretUpdateInfo {
            key: SecretKey::new("ns", "s"),
            key_name: "k".to_string(),
            old_value: value.clone(),
            new_value: value.replace("old", "new"),
            occurrences: 8,
            siblings: Vec::new(),
        };
        let mut out = Vec::new();
        preview_key(&mut out, &update, "old", "new", 5).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("line4=old"));
        assert!(!text.contains("line5=old"));
        assert!(text.contains("... and 3 more line(s)"));
    }

    #[test]
    fn test_rollback_command() {
        assert_eq!(
            rollback_command("aks-prod", Path::new("/tmp/kubesec-rollback-20240101-000000")),
            "kubesec restore --context aks-prod --recursive /tmp/kubesec-rollback-20240101-000000/"
        );
    }

    #[test]
    fn test_outcome_status() {
        assert_eq!(UpdateOutcome::NoMatches.status(), CommandStatus::Success);
        let failed = UpdateOutcome::Applied(UpdateReport {
            failed: vec![(SecretKey::new("a", "b"), "boom".to_string())],
            ..Default::default()
        });
        assert_eq!(failed.status(), CommandStatus::Failure);
    }
}
