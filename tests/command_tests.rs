//! pull, backup and find against an in-memory cluster

mod common;

use common::{output, session, subdirs, FakeCluster};
use kubesec::backup::read_secrets_file;
use kubesec::commands::backup::{backup_command, BackupArgs};
use kubesec::commands::find::{find_command, FindArgs};
use kubesec::commands::pull::{pull_command, PullArgs};
use kubesec::commands::{CommandStatus, NamespaceArgs};
use kubesec::Secret;
use tempfile::TempDir;

fn cluster() -> FakeCluster {
    FakeCluster::new(&["default", "prod", "prod-eu", "staging"])
        .with_secret("default", "app", &[("token", "abc")])
        .with_secret(
            "prod",
            "db",
            &[
                ("config", "host=db.internal\nport=5432\nuser=app"),
                ("url", "postgres://db.internal"),
            ],
        )
        .with_secret("prod-eu", "db", &[("url", "postgres://db-eu.internal")])
        .with_secret("staging", "db", &[("url", "postgres://db.internal")])
}

#[tokio::test]
async fn test_pull_prints_table() {
    let temp = TempDir::new().unwrap();
    let cluster = cluster();
    let session = session(&cluster, temp.path());
    let mut out = Vec::new();

    let args = PullArgs {
        secret: "db".to_string(),
        namespace: Some("prod".to_string()),
        output: None,
    };
    let status = pull_command(&session, &args, &mut out).await.unwrap();

    assert_eq!(status, CommandStatus::Success);
    let text = output(&out);
    assert!(text.contains("config host=db.internal\n"));
    assert!(text.contains("       port=5432\n"));
    assert!(text.contains("url    postgres://db.internal\n"));
}

#[tokio::test]
async fn test_pull_to_file_defaults_to_default_namespace() {
    let temp = TempDir::new().unwrap();
    let cluster = cluster();
    let session = session(&cluster, temp.path());
    let file = temp.path().join("app.yaml");

    let args = PullArgs {
        secret: "app".to_string(),
        namespace: None,
        output: Some(file.clone()),
    };
    pull_command(&session, &args, &mut Vec::new()).await.unwrap();

    let saved = read_secrets_file(&file).unwrap();
    assert_eq!(saved.context.as_deref(), Some("test-ctx"));
    assert_eq!(saved.namespace.as_deref(), Some("default"));
    assert_eq!(saved.secret_name.as_deref(), Some("app"));
    assert_eq!(saved.secrets, vec![Secret::new("token", "abc")]);
}

#[tokio::test]
async fn test_pull_missing_secret_fails() {
    let temp = TempDir::new().unwrap();
    let cluster = cluster();
    let session = session(&cluster, temp.path());

    let args = PullArgs {
        secret: "nope".to_string(),
        ..Default::default()
    };
    let err = pull_command(&session, &args, &mut Vec::new())
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_backup_writes_layout() {
    let temp = TempDir::new().unwrap();
    let cluster = cluster();
    let session = session(&cluster, temp.path());
    let mut out = Vec::new();

    let args = BackupArgs {
        namespaces: NamespaceArgs {
            namespace_contains: Some("prod".to_string()),
            ..Default::default()
        },
        output_dir: None,
    };
    backup_command(&session, &args, &mut out).await.unwrap();

    let folders = subdirs(temp.path());
    assert_eq!(folders.len(), 1);
    let folder = &folders[0];
    let folder_name = folder.file_name().unwrap().to_string_lossy().into_owned();
    assert!(folder_name.starts_with("kubesec-backup-test-ctx-"));

    let db = read_secrets_file(&folder.join("prod").join("db.yaml")).unwrap();
    assert_eq!(db.secrets.len(), 2);
    assert!(folder.join("prod-eu").join("db.yaml").exists());
    assert!(!folder.join("staging").exists());
    assert!(output(&out).contains("Backed up 2 secret(s) from 2 namespace(s)"));
}

#[tokio::test]
async fn test_find_reports_matches_with_context() {
    let temp = TempDir::new().unwrap();
    let cluster = cluster();
    let session = session(&cluster, temp.path());
    let mut out = Vec::new();

    let args = FindArgs {
        term: "PORT".to_string(),
        namespaces: NamespaceArgs {
            namespace_regex: Some("^prod".to_string()),
            ..Default::default()
        },
    };
    let status = find_command(&session, &args, &mut out).await.unwrap();

    assert_eq!(status, CommandStatus::Success);
    let text = output(&out);
    assert!(text.contains("prod/db"));
    assert!(text.contains("config"));
    assert!(text.contains("Line 2:"));
    assert!(text.contains("      host=db.internal\n"));
    assert!(text.contains("      user=app\n"));
    assert!(text.contains("Found 1 match block(s) in 1 key(s)"));
}

#[tokio::test]
async fn test_find_without_matches() {
    let temp = TempDir::new().unwrap();
    let cluster = cluster();
    let session = session(&cluster, temp.path());
    let mut out = Vec::new();

    let args = FindArgs {
        term: "mysql".to_string(),
        namespaces: NamespaceArgs::default(),
    };
    find_command(&session, &args, &mut out).await.unwrap();
    assert!(output(&out).contains("No matches found"));
}

#[tokio::test]
async fn test_find_excluded_namespace_not_searched() {
    let temp = TempDir::new().unwrap();
    let cluster = cluster();
    let session = session(&cluster, temp.path());

    let args = FindArgs {
        term: "db".to_string(),
        namespaces: NamespaceArgs {
            namespace_contains: Some("prod".to_string()),
            exclude_namespaces: vec!["prod-eu".to_string()],
            ..Default::default()
        },
    };
    find_command(&session, &args, &mut Vec::new()).await.unwrap();

    let calls = cluster.calls();
    assert!(calls.contains(&"list prod".to_string()));
    assert!(!calls.contains(&"list prod-eu".to_string()));
}
