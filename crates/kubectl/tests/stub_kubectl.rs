//! 셸 스크립트 kubectl 대역을 사용한 통합 테스트
//!
//! 대역 스크립트는 받은 인자를 그대로 출력하고, 특정 이름에 대해서는
//! 실패나 지연을 흉내냅니다.

#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::time::Duration;

use kubetriage_core::cluster::{ClusterClient, DeleteOptions, LogOptions, OutputFormat};
use kubetriage_core::error::ClusterError;
use kubetriage_kubectl::KubectlClient;

const STUB: &str = r#"#!/bin/sh
case "$*" in
  *"namespace gone"*)
    echo 'Error from server (NotFound): namespaces "gone" not found' >&2
    exit 1 ;;
  *"slow-pod"*)
    sleep 5 ;;
  *"broken"*)
    echo 'Error from server (Forbidden): forbidden' >&2
    exit 1 ;;
  *"metadata.name}"*)
    echo "web-0 web-1"
    exit 0 ;;
  apply*)
    cat
    exit 0 ;;
esac
echo "$@"
"#;

/// 대역 스크립트를 임시 디렉토리에 만들고 (디렉토리, 경로)를 반환합니다.
fn stub_kubectl() -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("kubectl");
    std::fs::write(&path, STUB).expect("write stub");
    let mut perms = std::fs::metadata(&path).expect("metadata").permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).expect("chmod");
    (dir, path)
}

fn client_for(path: &PathBuf) -> KubectlClient {
    KubectlClient::new()
        .with_binary(path.to_string_lossy().into_owned())
        .with_command_timeout(Duration::from_secs(2))
}

#[tokio::test]
#[serial_test::serial]
async fn get_passes_namespace_and_format() {
    let (_dir, path) = stub_kubectl();
    let client = client_for(&path);
    let out = client
        .get("deployment", "vector", Some("demo"), OutputFormat::Yaml)
        .await
        .unwrap();
    assert_eq!(out.trim(), "get deployment vector -n demo -o yaml");
}

#[tokio::test]
#[serial_test::serial]
async fn list_names_splits_whitespace() {
    let (_dir, path) = stub_kubectl();
    let client = client_for(&path);
    let names = client
        .list_names("pod", Some("demo"), Some("app=web"))
        .await
        .unwrap();
    assert_eq!(names, vec!["web-0".to_owned(), "web-1".to_owned()]);
}

#[tokio::test]
#[serial_test::serial]
async fn missing_namespace_reports_false() {
    let (_dir, path) = stub_kubectl();
    let client = client_for(&path);
    assert!(!client.namespace_exists("gone").await.unwrap());
    assert!(client.namespace_exists("present").await.unwrap());
}

#[tokio::test]
#[serial_test::serial]
async fn failed_command_carries_stderr() {
    let (_dir, path) = stub_kubectl();
    let client = client_for(&path);
    let err = client
        .describe("pod", "broken", Some("demo"))
        .await
        .unwrap_err();
    match err {
        ClusterError::CommandFailed { command, stderr } => {
            assert!(command.contains("describe pod broken"));
            assert!(stderr.contains("Forbidden"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
#[serial_test::serial]
async fn slow_command_times_out() {
    let (_dir, path) = stub_kubectl();
    let client = client_for(&path).with_command_timeout(Duration::from_millis(200));
    let err = client
        .logs("demo", "slow-pod", &LogOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ClusterError::Timeout { .. }));
    assert!(err.is_transient());
}

#[tokio::test]
#[serial_test::serial]
async fn forced_delete_flags() {
    let (_dir, path) = stub_kubectl();
    let client = client_for(&path);
    client
        .delete(
            "namespace",
            "demo",
            None,
            &DeleteOptions::forced(Duration::from_secs(10)),
        )
        .await
        .unwrap();
}

#[tokio::test]
#[serial_test::serial]
async fn apply_streams_manifest_on_stdin() {
    let (_dir, path) = stub_kubectl();
    let client = client_for(&path);
    client
        .apply("apiVersion: v1\nkind: Namespace\n", Some("demo"))
        .await
        .unwrap();
}

#[tokio::test]
#[serial_test::serial]
async fn logs_include_tail_and_since() {
    let (_dir, path) = stub_kubectl();
    let client = client_for(&path);
    let since = chrono::DateTime::parse_from_rfc3339("2025-11-14T19:57:40Z")
        .unwrap()
        .with_timezone(&chrono::Utc);
    let out = client
        .logs(
            "demo",
            "web-0",
            &LogOptions {
                tail_lines: Some(500),
                since_time: Some(since),
                all_containers: false,
            },
        )
        .await
        .unwrap();
    assert_eq!(
        out.trim(),
        "logs web-0 -n demo --tail=500 --since-time=2025-11-14T19:57:40Z"
    );
}
