//! # kubesec
//!
//! Command-line companion for bulk-managing Kubernetes Opaque secrets.
//!
//! ```bash
//! kubesec pull db -n prod
//! kubesec push db.yaml --context aks-prod
//! kubesec backup --namespace-contains prod
//! kubesec restore ./kubesec-backup-aks-prod-20240309-140507 --recursive
//! kubesec find db.internal --namespace-regex '^staging-'
//! kubesec update-value old.example.com new.example.com --namespace-contains prod --dry-run
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use kubesec::cluster::client_from_config;
use kubesec::commands::backup::{backup_command, BackupArgs};
use kubesec::commands::find::{find_command, FindArgs};
use kubesec::commands::pull::{pull_command, PullArgs};
use kubesec::commands::push::{push_command, PushArgs};
use kubesec::commands::restore::{restore_command, RestoreArgs};
use kubesec::commands::update_value::{update_value_command, UpdateValueArgs};
use kubesec::commands::{CommandStatus, Session};
use kubesec::prompt::prompter;
use kubesec::{Backend, KubeContext, KubesecConfig};
use std::io;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

/// 128 + SIGINT, as a shell reports a process killed by Ctrl-C
const INTERRUPTED_EXIT_CODE: i32 = 130;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("BUILD_GIT_HASH"),
    ", built ",
    env!("BUILD_DATETIME"),
    ")"
);

/// Bulk management of Kubernetes Opaque secrets
#[derive(Parser)]
#[command(name = "kubesec", version, long_version = LONG_VERSION)]
#[command(
    about = "Pull, push, back up, restore, search and bulk-edit Kubernetes secrets",
    long_about = None,
    after_help = "\
Namespace selection (backup, find, update-value):
  -n/--namespace takes precedence over --namespace-contains, which takes
  precedence over --namespace-regex. Without any, \"default\" is used.

Examples:
  kubesec pull db -n prod -o db.yaml
  kubesec find db.internal --namespace-contains prod
  kubesec update-value old.example.com new.example.com --namespace-contains prod
"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Kubernetes context to use (default: kubeconfig current context)
    #[arg(short, long, global = true)]
    context: Option<String>,

    /// Cluster backend: kubectl or api (default: KUBESEC_BACKEND, then kubectl)
    #[arg(long, global = true)]
    backend: Option<Backend>,

    /// Timeout for each cluster call in seconds (at least 1)
    #[arg(long, global = true, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    timeout: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show one secret, or save it to a secrets file
    Pull(PullArgs),
    /// Publish a secrets file
    Push(PushArgs),
    /// Back up every secret of the selected namespaces
    Backup(BackupArgs),
    /// Push every secrets file of a backup folder
    Restore(RestoreArgs),
    /// Search decoded secret values
    Find(FindArgs),
    /// Replace a value in every secret of the selected namespaces
    #[command(name = "update-value")]
    UpdateValue(UpdateValueArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    // Install before any rustls use; a provider installed earlier is fine
    let provider_installed = rustls::crypto::ring::default_provider()
        .install_default()
        .is_ok();

    let cli = Cli::parse();

    let mut config = KubesecConfig::from_env();
    if let Some(backend) = cli.backend {
        config.backend = backend;
    }
    if let Some(timeout) = cli.timeout {
        config.command_timeout_secs = timeout;
    }

    init_tracing(&config);
    if !provider_installed {
        debug!("rustls crypto provider was already installed");
    }

    match run(cli, config).await {
        Ok(status) => status.into(),
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, config: KubesecConfig) -> Result<CommandStatus> {
    let client = client_from_config(&config);
    let context = KubeContext::new(cli.context);

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        warn!("Interrupted, stopping after the current step (Ctrl-C again to abort)");
        on_ctrl_c.cancel();

        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Aborted");
            std::process::exit(INTERRUPTED_EXIT_CODE);
        }
    });

    let session = Session::new(client.as_ref(), context, config).with_cancel(cancel);
    let mut out = io::stdout();

    let status = match &cli.command {
        Commands::Pull(args) => pull_command(&session, args, &mut out)
            .await
            .with_context(|| format!("Failed to pull secret '{}'", args.secret))?,
        Commands::Push(args) => {
            push_command(&session, args, &mut out, prompter(args.skip_prompts).as_mut())
                .await
                .with_context(|| format!("Failed to push '{}'", args.file.display()))?
        }
        Commands::Backup(args) => backup_command(&session, args, &mut out)
            .await
            .context("Backup failed")?,
        Commands::Restore(args) => {
            restore_command(&session, args, &mut out, prompter(args.skip_prompts).as_mut())
                .await
                .with_context(|| format!("Failed to restore '{}'", args.folder.display()))?
        }
        Commands::Find(args) => find_command(&session, args, &mut out)
            .await
            .context("Search failed")?,
        Commands::UpdateValue(args) => {
            update_value_command(&session, args, &mut out, prompter(args.skip_prompts).as_mut())
                .await
                .context("Update failed")?
        }
    };
    Ok(status)
}

/// Log to stderr so stdout carries only command output
fn init_tracing(config: &KubesecConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("kubesec={}", config.log_level)));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);
    let result = if config.json_logs() {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    if let Err(e) = result {
        eprintln!("Failed to initialize logging: {e}");
    }
}
