//! Integration tests for `kubetriage collect` and `kubetriage summary`.
//!
//! Writes real run directories with an in-memory cluster, then reads them
//! back the way a report step would.

use std::sync::Arc;

use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use kubetriage_artifacts::RunAnnotations;
use kubetriage_cli::cli::{CollectArgs, OutputFormat, SummaryArgs};
use kubetriage_cli::commands::{collect, summary};
use kubetriage_cli::output::OutputWriter;
use kubetriage_core::FakeCluster;
use kubetriage_core::config::{ArtifactConfig, TimeoutConfig};

fn collect_args(name: &str, failed: bool, run_id: &str) -> CollectArgs {
    CollectArgs {
        namespace: "test-pipeline".to_owned(),
        name: name.to_owned(),
        failed,
        message: failed.then(|| "pods never became ready".to_owned()),
        labels: Vec::new(),
        run_id: Some(run_id.to_owned()),
        reclaim: false,
    }
}

fn cluster() -> Arc<FakeCluster> {
    Arc::new(
        FakeCluster::new()
            .with_namespace("test-pipeline")
            .with_pod("test-pipeline", "agent-0")
            .with_logs("test-pipeline", "agent-0", "booting\nfailed to connect\n"),
    )
}

#[tokio::test]
async fn test_summary_reads_collected_run() {
    // Given: a closed run with one failed test
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = ArtifactConfig {
        base_dir: temp_dir.path().to_path_buf(),
        ..ArtifactConfig::default()
    };
    let annotations = RunAnnotations {
        git_commit: "abc1234".to_owned(),
        description: "nightly".to_owned(),
        ..RunAnnotations::default()
    };
    let collected = collect::run(
        collect_args("Agent should ship logs", true, "nightly-1"),
        cluster(),
        config,
        annotations,
        &TimeoutConfig::default(),
        CancellationToken::new(),
    )
    .await
    .expect("collect should succeed");

    // When: summarizing the run directory
    let report = summary::run(SummaryArgs {
        run_dir: collected.run_dir.clone(),
        failed_only: false,
    })
    .expect("summary should succeed");

    // Then: run and test metadata are both visible
    assert!(report.closed);
    assert_eq!(report.run_id.as_deref(), Some("nightly-1"));
    assert_eq!(report.total_tests, 1);
    assert_eq!(report.failed_tests, 1);
    assert_eq!(report.passed_tests, 0);
    assert_eq!(report.git_commit.as_deref(), Some("abc1234"));
    assert_eq!(report.description.as_deref(), Some("nightly"));
    assert_eq!(report.tests.len(), 1);
    assert_eq!(report.tests[0].sequence, 1);
    assert_eq!(report.tests[0].failure_message, "pods never became ready");
    assert!(report.tests[0].files >= 1);

    let writer = OutputWriter::new(OutputFormat::Json);
    let mut buffer = Vec::new();
    writer
        .render_to(&report, &mut buffer)
        .expect("json rendering should succeed");
    let parsed: serde_json::Value = serde_json::from_slice(&buffer).expect("valid JSON");
    assert_eq!(parsed["tests"][0]["namespace"], "test-pipeline");
}

#[tokio::test]
async fn test_summary_of_unclosed_run_counts_test_dirs() {
    // Given: a test directory with metadata but no run summary
    let temp_dir = TempDir::new().expect("should create temp dir");
    let test_dir = temp_dir.path().join("01-agent");
    std::fs::create_dir_all(&test_dir).expect("should create test dir");
    let record = serde_json::json!({
        "name": "Agent should ship logs",
        "namespace": "test-agent",
        "start_time": "2025-01-01T00:00:00Z",
        "end_time": "2025-01-01T00:00:05Z",
        "duration_ms": 5000,
        "failed": true,
        "labels": [],
        "test_sequence_number": 1,
        "artifacts": {
            "pod_count": 0,
            "log_files": [],
            "resource_files": [],
            "event_files": [],
            "total_size_bytes": 0,
            "collection_time": "10ms"
        }
    });
    std::fs::write(
        test_dir.join("metadata.json"),
        serde_json::to_vec_pretty(&record).expect("should serialize"),
    )
    .expect("should write metadata");

    // When
    let report = summary::run(SummaryArgs {
        run_dir: temp_dir.path().to_path_buf(),
        failed_only: true,
    })
    .expect("summary should succeed");

    // Then
    assert!(!report.closed);
    assert!(report.run_id.is_none());
    assert_eq!(report.total_tests, 1);
    assert_eq!(report.failed_tests, 1);
    assert_eq!(report.tests[0].duration_ms, 5000);
}

#[tokio::test]
async fn test_summary_of_empty_directory_fails() {
    let temp_dir = TempDir::new().expect("should create temp dir");

    let err = summary::run(SummaryArgs {
        run_dir: temp_dir.path().to_path_buf(),
        failed_only: false,
    })
    .err()
    .expect("empty run dir should fail");

    assert_eq!(err.exit_code(), 1);
    assert!(err.to_string().contains("no metadata found"));
}

#[tokio::test]
async fn test_summary_of_missing_directory_is_io_error() {
    let temp_dir = TempDir::new().expect("should create temp dir");

    let err = summary::run(SummaryArgs {
        run_dir: temp_dir.path().join("never-written"),
        failed_only: false,
    })
    .err()
    .expect("missing run dir should fail");

    assert_eq!(err.exit_code(), 10);
}

#[tokio::test]
async fn test_summary_rejects_corrupt_metadata() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    std::fs::write(temp_dir.path().join("metadata.json"), "{ not json")
        .expect("should write metadata");

    let err = summary::run(SummaryArgs {
        run_dir: temp_dir.path().to_path_buf(),
        failed_only: false,
    })
    .err()
    .expect("corrupt metadata should fail");

    assert_eq!(err.exit_code(), 1);
}
