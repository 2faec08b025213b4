//! # Pull Command
//!
//! Shows the decoded keys of one secret, or saves them to a secrets file
//! that `push` can publish again.

use super::{non_blank, CommandStatus, Session};
use crate::backup::write_secrets_file;
use crate::collector::collect_secret;
use crate::constants::DEFAULT_NAMESPACE;
use crate::display::bold;
use crate::error::Result;
use crate::secret::{Secret, SecretKey};
use clap::Args;
use std::io::Write;
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Args)]
pub struct PullArgs {
    /// Name of the secret
    #[arg(value_name = "SECRET")]
    pub secret: String,

    /// Namespace of the secret (default: "default")
    #[arg(short, long)]
    pub namespace: Option<String>,

    /// Write a secrets file instead of printing a table
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

pub async fn pull_command(
    session: &Session<'_>,
    args: &PullArgs,
    out: &mut dyn Write,
) -> Result<CommandStatus> {
    let namespace = non_blank(args.namespace.as_deref()).unwrap_or(DEFAULT_NAMESPACE);
    let key = SecretKey::new(namespace, args.secret.as_str());

    let secrets = collect_secret(session.client, &session.context, namespace, &args.secret).await?;

    if let Some(path) = &args.output {
        write_secrets_file(path, &session.context, &key, &secrets)?;
        writeln!(
            out,
            "Saved {} key(s) of '{}' to {}",
            secrets.len(),
            key,
            path.display()
        )?;
        return Ok(CommandStatus::Success);
    }

    if !secrets.is_empty() {
        print_table(out, &secrets)?;
    }
    Ok(CommandStatus::Success)
}

/// NAME/VALUE table; continuation lines of multi-line values stay in the VALUE column
fn print_table(out: &mut dyn Write, secrets: &[Secret]) -> std::io::Result<()> {
    let width = secrets
        .iter()
        .map(|s| s.name.chars().count())
        .max()
        .unwrap_or(0)
        .max("NAME".len());

    writeln!(out, "{} {}", bold(&format!("{:<width$}", "NAME")), bold("VALUE"))?;
    writeln!(out, "{}", "-".repeat(width + 1 + "VALUE".len()))?;
    for secret in secrets {
        let mut lines = secret.value.split('\n');
        writeln!(out, "{:<width$} {}", secret.name, lines.next().unwrap_or_default())?;
        for line in lines {
            writeln!(out, "{:<width$} {}", "", line)?;
        }
    }
    Ok(())
}
