//! # Push Command
//!
//! Publishes a secrets file to the cluster.
//!
//! The file's header supplies the secret name and namespace unless they are
//! given on the command line. The cluster's current keys are diffed against
//! the file; nothing is written when they already agree, otherwise the change
//! list is shown and confirmed before the whole secret is applied.

use super::{non_blank, CommandStatus, Session};
use crate::backup::{read_secrets_file, SecretsFile};
use crate::cluster::namespace_exists;
use crate::collector::collect_secret_or_empty;
use crate::constants::DEFAULT_NAMESPACE;
use crate::diff::diff;
use crate::display::{bold, green};
use crate::error::{KubesecError, Result};
use crate::prompt::Prompter;
use crate::secret::SecretKey;
use clap::Args;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Default, Args)]
pub struct PushArgs {
    /// Secrets file to publish
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Secret name (default: the file's "# Secret:" header)
    #[arg(short, long)]
    pub secret: Option<String>,

    /// Namespace (default: the file's "# Namespace:" header, then "default")
    #[arg(short, long)]
    pub namespace: Option<String>,

    /// Create the namespace when the cluster does not have it
    #[arg(long)]
    pub auto_create_missing_namespace: bool,

    /// Answer yes to every confirmation
    #[arg(long)]
    pub skip_prompts: bool,
}

/// What happened to one secrets file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
    /// The secret was written
    Applied(SecretKey),
    /// The cluster already holds exactly these keys
    NoChanges(SecretKey),
    /// The operator declined a prompt
    Declined,
}

/// Options for publishing one secrets file
#[derive(Debug, Clone, Copy, Default)]
pub struct PushOptions<'a> {
    pub secret: Option<&'a str>,
    pub namespace: Option<&'a str>,
    pub auto_create_missing_namespace: bool,
}

pub async fn push_command(
    session: &Session<'_>,
    args: &PushArgs,
    out: &mut dyn Write,
    prompter: &mut dyn Prompter,
) -> Result<CommandStatus> {
    let options = PushOptions {
        secret: args.secret.as_deref(),
        namespace: args.namespace.as_deref(),
        auto_create_missing_namespace: args.auto_create_missing_namespace,
    };
    push_secrets_file(session, &args.file, options, out, prompter).await?;
    Ok(CommandStatus::Success)
}

/// Diff one secrets file against the cluster and apply it when it differs
pub async fn push_secrets_file(
    session: &Session<'_>,
    path: &Path,
    options: PushOptions<'_>,
    out: &mut dyn Write,
    prompter: &mut dyn Prompter,
) -> Result<PushOutcome> {
    let file = read_secrets_file(path)?;

    if !confirm_context(session, &file, prompter)? {
        return Ok(PushOutcome::Declined);
    }

    let header_secret = non_blank(file.secret_name.as_deref());
    let arg_secret = non_blank(options.secret);
    if let (Some(arg), Some(header)) = (arg_secret, header_secret) {
        if arg != header
            && !prompter.confirm(&format!(
                "The file is for secret '{header}', but '{arg}' was given. Push to '{arg}'?"
            ))?
        {
            return Ok(PushOutcome::Declined);
        }
    }
    let secret_name = arg_secret.or(header_secret).ok_or_else(|| {
        KubesecError::validation(format!(
            "No secret name for '{}': pass --secret or add a '# Secret:' header",
            path.display()
        ))
    })?;

    let namespace = non_blank(options.namespace)
        .or(non_blank(file.namespace.as_deref()))
        .unwrap_or(DEFAULT_NAMESPACE);
    let key = SecretKey::new(namespace, secret_name);

    ensure_namespace(session, namespace, options.auto_create_missing_namespace, out).await?;

    let current = collect_secret_or_empty(session.client, &session.context, namespace, secret_name)
        .await?;
    let changes = diff(&current, &file.secrets);
    if !changes.has_changes() {
        writeln!(out, "No changes detected for '{key}'")?;
        return Ok(PushOutcome::NoChanges(key));
    }

    writeln!(out, "{}", bold(&key.to_string()))?;
    changes.render(out)?;
    if !prompter.confirm(&format!("Apply changes to '{key}'?"))? {
        writeln!(out, "Skipped '{key}'")?;
        return Ok(PushOutcome::Declined);
    }
    if session.cancel.is_cancelled() {
        return Err(KubesecError::Cancelled);
    }

    session.apply_secret(&key, &file.secrets).await?;
    info!("Pushed {} key(s) to '{}'", file.secrets.len(), key);
    writeln!(out, "{} '{key}' updated", green("✓"))?;
    Ok(PushOutcome::Applied(key))
}

/// Ask before pushing a file whose context header is missing or names another cluster
fn confirm_context(
    session: &Session<'_>,
    file: &SecretsFile,
    prompter: &mut dyn Prompter,
) -> Result<bool> {
    let target = session.context_label();
    match (non_blank(file.context.as_deref()), session.context.name()) {
        (Some(header), Some(name)) if header == name => Ok(true),
        (Some(header), _) => prompter.confirm(&format!(
            "The file was pulled from context '{header}', but the target is '{target}'. Continue?"
        )),
        (None, _) => prompter.confirm(&format!(
            "The file has no context header. Push to '{target}'?"
        )),
    }
}

async fn ensure_namespace(
    session: &Session<'_>,
    namespace: &str,
    auto_create: bool,
    out: &mut dyn Write,
) -> Result<()> {
    if namespace_exists(session.client, &session.context, namespace).await? {
        return Ok(());
    }
    if !auto_create {
        return Err(KubesecError::NotFound(format!(
            "namespace '{namespace}' (use --auto-create-missing-namespace to create it)"
        )));
    }

    session
        .client
        .create_namespace(&session.context, namespace)
        .await?;
    writeln!(out, "Created namespace '{namespace}'")?;
    Ok(())
}
