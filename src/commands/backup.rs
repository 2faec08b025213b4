//! # Backup Command
//!
//! Snapshots every Opaque secret of the selected namespaces into a new
//! `kubesec-backup-<context>-<timestamp>` folder.

use super::{CommandStatus, NamespaceArgs, Session};
use crate::backup::{sanitize_path_component, BackupWriter};
use crate::collector::collect_secrets;
use crate::constants::BACKUP_FOLDER_PREFIX;
use crate::display::green;
use crate::error::Result;
use clap::Args;
use std::io::Write;
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Args)]
pub struct BackupArgs {
    #[command(flatten)]
    pub namespaces: NamespaceArgs,

    /// Directory the backup folder is created in (default: KUBESEC_BACKUP_ROOT)
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,
}

pub async fn backup_command(
    session: &Session<'_>,
    args: &BackupArgs,
    out: &mut dyn Write,
) -> Result<CommandStatus> {
    let selector = args.namespaces.selector()?;
    let namespaces = selector.resolve(session.client, &session.context).await?;
    let set = collect_secrets(session.client, &session.context, &namespaces, &session.cancel).await?;

    if set.is_empty() {
        writeln!(out, "No secrets found, nothing to back up")?;
        return Ok(CommandStatus::Success);
    }

    let base = args
        .output_dir
        .clone()
        .unwrap_or_else(|| session.config.backup_root.clone());
    let prefix = format!(
        "{BACKUP_FOLDER_PREFIX}-{}",
        sanitize_path_component(session.context.name().unwrap_or("current"))
    );
    let writer = BackupWriter::create(&base, &prefix)?;
    let written = writer.write(&session.context, &set)?;

    writeln!(
        out,
        "{} Backed up {} secret(s) from {} namespace(s) to {}",
        green("✓"),
        written,
        namespaces.len(),
        writer.path().display()
    )?;
    Ok(CommandStatus::Success)
}
