//! # Restore Command
//!
//! Pushes every secrets file of a backup folder back to the cluster.
//!
//! Directories are walked with an explicit stack so cancellation can be
//! checked before each directory and each file. Entries are visited in
//! sorted order, files of a directory before its subdirectories. A file that
//! fails is reported and counted; the remaining files are still processed.

use super::push::{push_secrets_file, PushOptions, PushOutcome};
use super::{CommandStatus, Session};
use crate::backup::is_secrets_file;
use crate::display::{bold, red};
use crate::error::{KubesecError, Result};
use crate::prompt::Prompter;
use clap::Args;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default, Args)]
pub struct RestoreArgs {
    /// Backup folder (or a single secrets file)
    #[arg(value_name = "FOLDER")]
    pub folder: PathBuf,

    /// Descend into subdirectories
    #[arg(short, long)]
    pub recursive: bool,

    /// Answer yes to every confirmation
    #[arg(long)]
    pub skip_prompts: bool,

    /// Create namespaces the cluster does not have
    #[arg(long)]
    pub auto_create_missing_namespace: bool,
}

/// Per-file counts of one restore run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreSummary {
    pub applied: usize,
    pub unchanged: usize,
    pub declined: usize,
    pub failed: Vec<PathBuf>,
}

impl RestoreSummary {
    #[must_use]
    pub fn status(&self) -> CommandStatus {
        if self.failed.is_empty() {
            CommandStatus::Success
        } else {
            CommandStatus::Failure
        }
    }
}

pub async fn restore_command(
    session: &Session<'_>,
    args: &RestoreArgs,
    out: &mut dyn Write,
    prompter: &mut dyn Prompter,
) -> Result<CommandStatus> {
    let summary = restore(session, args, out, prompter).await?;

    writeln!(
        out,
        "Restore finished: {} applied, {} unchanged, {} skipped, {} failed",
        summary.applied,
        summary.unchanged,
        summary.declined,
        summary.failed.len()
    )?;
    for path in &summary.failed {
        writeln!(out, "  {} {}", red("✗"), path.display())?;
    }
    Ok(summary.status())
}

/// Walk the folder and push every secrets file in it
pub async fn restore(
    session: &Session<'_>,
    args: &RestoreArgs,
    out: &mut dyn Write,
    prompter: &mut dyn Prompter,
) -> Result<RestoreSummary> {
    let options = PushOptions {
        secret: None,
        namespace: None,
        auto_create_missing_namespace: args.auto_create_missing_namespace,
    };
    let mut summary = RestoreSummary::default();

    if args.folder.is_file() {
        restore_file(session, &args.folder, options, out, prompter, &mut summary).await?;
        return Ok(summary);
    }
    if !args.folder.is_dir() {
        return Err(KubesecError::validation(format!(
            "Folder '{}' does not exist",
            args.folder.display()
        )));
    }

    let mut pending = vec![args.folder.clone()];
    while let Some(dir) = pending.pop() {
        if session.cancel.is_cancelled() {
            return Err(KubesecError::Cancelled);
        }
        debug!("Restoring directory '{}'", dir.display());

        let (files, subdirs) = list_dir(&dir)?;
        for file in files {
            if session.cancel.is_cancelled() {
                return Err(KubesecError::Cancelled);
            }
            restore_file(session, &file, options, out, prompter, &mut summary).await?;
        }

        if args.recursive {
            // Reversed so the stack pops them in sorted order
            pending.extend(subdirs.into_iter().rev());
        }
    }

    info!(
        "Restore of '{}' done: {} applied, {} failed",
        args.folder.display(),
        summary.applied,
        summary.failed.len()
    );
    Ok(summary)
}

async fn restore_file(
    session: &Session<'_>,
    path: &Path,
    options: PushOptions<'_>,
    out: &mut dyn Write,
    prompter: &mut dyn Prompter,
    summary: &mut RestoreSummary,
) -> Result<()> {
    writeln!(out, "{}", bold(&format!("Restoring {}", path.display())))?;
    match push_secrets_file(session, path, options, out, prompter).await {
        Ok(PushOutcome::Applied(_)) => summary.applied += 1,
        Ok(PushOutcome::NoChanges(_)) => summary.unchanged += 1,
        Ok(PushOutcome::Declined) => summary.declined += 1,
        Err(KubesecError::Cancelled) => return Err(KubesecError::Cancelled),
        Err(err) => {
            warn!("Failed to restore '{}': {}", path.display(), err);
            writeln!(out, "{} {}: {err}", red("✗"), path.display())?;
            summary.failed.push(path.to_path_buf());
        }
    }
    Ok(())
}

/// Sorted secrets files and sorted subdirectories of one directory
fn list_dir(dir: &Path) -> Result<(Vec<PathBuf>, Vec<PathBuf>)> {
    let mut files = Vec::new();
    let mut subdirs = Vec::new();

    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            let hidden = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with('.'));
            if !hidden {
                subdirs.push(path);
            }
        } else if is_secrets_file(&path) {
            files.push(path);
        } else {
            debug!("Ignoring '{}'", path.display());
        }
    }

    files.sort();
    subdirs.sort();
    Ok((files, subdirs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_list_dir_sorts_and_filters() {
        let temp = TempDir::new().unwrap();
        for name in ["b.yaml", "a.yml", ".hidden.yaml", "notes.txt"] {
            fs::write(temp.path().join(name), "k: v\n").unwrap();
        }
        for name in ["zeta", "alpha", ".git"] {
            fs::create_dir(temp.path().join(name)).unwrap();
        }

        let (files, subdirs) = list_dir(temp.path()).unwrap();
        let names = |paths: &[PathBuf]| {
            paths
                .iter()
                .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
        };
        assert_eq!(names(&files), vec!["a.yml", "b.yaml"]);
        assert_eq!(names(&subdirs), vec!["alpha", "zeta"]);
    }

    #[test]
    fn test_summary_status() {
        assert_eq!(RestoreSummary::default().status(), CommandStatus::Success);
        let failed = RestoreSummary {
            failed: vec![PathBuf::from("x.yaml")],
            ..Default::default()
        };
        assert_eq!(failed.status(), CommandStatus::Failure);
    }
}
