//! 통합 테스트 -- 회수 단계 전체 흐름 검증
//!
//! 멈춘 시계(`start_paused`) 위에서 폴링 루프를 실행하므로 실제로 기다리지 않습니다.

use std::sync::Arc;
use std::time::Duration;

use kubetriage_core::FakeCluster;
use kubetriage_core::error::InputError;
use kubetriage_reclaimer::{NamespaceReclaimer, Outcome, ReclaimError};
use tokio::time::Instant;

const NS: &str = "test-pipeline-1";

fn reclaimer(cluster: FakeCluster) -> (Arc<FakeCluster>, NamespaceReclaimer<FakeCluster>) {
    let cluster = Arc::new(cluster);
    (Arc::clone(&cluster), NamespaceReclaimer::new(cluster))
}

#[tokio::test(start_paused = true)]
async fn free_namespace_is_deleted_gracefully() {
    let (cluster, reclaimer) = reclaimer(FakeCluster::new().with_namespace(NS));

    let outcome = reclaimer.delete_namespace(NS, "2m0s").await.unwrap();

    assert_eq!(outcome, Outcome::Graceful);
    assert!(!cluster.has_namespace(NS));
    assert_eq!(
        cluster.calls(),
        [
            format!("delete namespace/{NS}"),
            format!("namespace_exists {NS}")
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn stuck_namespace_is_forced_after_finalizers_are_cleared() {
    let (cluster, reclaimer) = reclaimer(
        FakeCluster::new()
            .with_stuck_namespace(NS)
            .with_object("vectorpipeline", Some(NS), "logs-to-stdout")
            .with_object("vectoraggregator", Some(NS), "aggregator"),
    );

    let outcome = reclaimer.delete_namespace(NS, "10s").await.unwrap();

    assert_eq!(outcome, Outcome::Forced);
    assert!(!cluster.has_namespace(NS));
    assert_eq!(cluster.call_count("patch_merge vectorpipeline/logs-to-stdout"), 1);
    assert_eq!(cluster.call_count("delete vectorpipeline/logs-to-stdout grace=0"), 1);
    assert_eq!(cluster.call_count("patch_merge vectoraggregator/aggregator"), 1);
    assert_eq!(cluster.call_count(&format!("patch_merge namespace/{NS}")), 1);
    assert_eq!(cluster.call_count(&format!("delete namespace/{NS} grace=0")), 1);
}

#[tokio::test(start_paused = true)]
async fn never_disappearing_namespace_still_returns_ok() {
    let (cluster, reclaimer) = reclaimer(
        FakeCluster::new()
            .with_stuck_namespace(NS)
            .failing("patch_merge"),
    );

    let started = Instant::now();
    let outcome = reclaimer.delete_namespace(NS, "10s").await.unwrap();

    assert_eq!(outcome, Outcome::Abandoned);
    assert!(cluster.has_namespace(NS));
    // 호출자 timeout + 강제 삭제 이후 폴링 예산 안에서 끝남
    assert!(started.elapsed() <= Duration::from_secs(10 + 30 + 1));
}

#[tokio::test(start_paused = true)]
async fn delete_failure_escalates_without_confirmation() {
    let (cluster, reclaimer) = reclaimer(
        FakeCluster::new()
            .with_namespace(NS)
            .failing("delete:namespace"),
    );

    let outcome = reclaimer.delete_namespace(NS, "1m").await.unwrap();

    // 강제 삭제도 실패하므로 네임스페이스가 남음
    assert_eq!(outcome, Outcome::Abandoned);
    let calls = cluster.calls();
    assert_eq!(calls[0], format!("delete namespace/{NS}"));
    assert!(calls[1].starts_with("list_names vectorpipeline"));
    assert_eq!(cluster.call_count(&format!("delete namespace/{NS} grace=0")), 1);
}

#[tokio::test(start_paused = true)]
async fn intermediate_failures_do_not_stop_the_ladder() {
    let (cluster, reclaimer) = reclaimer(
        FakeCluster::new()
            .with_stuck_namespace(NS)
            .failing("list_names"),
    );

    let outcome = reclaimer.delete_namespace(NS, "4s").await.unwrap();

    assert_eq!(outcome, Outcome::Forced);
    assert_eq!(cluster.call_count("list_names"), 5);
    assert_eq!(cluster.call_count(&format!("delete namespace/{NS} grace=0")), 1);
}

#[tokio::test(start_paused = true)]
async fn confirmation_polls_until_timeout() {
    let (cluster, reclaimer) = reclaimer(
        FakeCluster::new()
            .with_stuck_namespace(NS)
            .failing("patch_merge:namespace"),
    );

    reclaimer.delete_namespace(NS, "10s").await.unwrap();

    // 2초 간격: 10초 예산 6회 + 30초 예산 16회
    assert_eq!(cluster.call_count("namespace_exists"), 6 + 16);
}

#[tokio::test]
async fn malformed_timeout_is_rejected_before_any_call() {
    let (cluster, reclaimer) = reclaimer(FakeCluster::new().with_namespace(NS));

    let err = reclaimer.delete_namespace(NS, "two minutes").await.unwrap_err();

    assert!(matches!(
        err,
        ReclaimError::Input(InputError::InvalidTimeout { .. })
    ));
    assert!(cluster.calls().is_empty());
    assert!(cluster.has_namespace(NS));
}

#[tokio::test]
async fn invalid_namespace_is_rejected_before_any_call() {
    let (cluster, reclaimer) = reclaimer(FakeCluster::new());

    let err = reclaimer
        .delete_namespace("--all-namespaces", "1m")
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ReclaimError::Input(InputError::InvalidNamespace { .. })
    ));
    assert!(cluster.calls().is_empty());
}
