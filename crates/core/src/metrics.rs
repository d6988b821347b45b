//! 메트릭 상수 및 설명 등록
//!
//! 모든 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 각 크레이트는 이 상수를 사용하여 `metrics::counter!()`,
//! `metrics::histogram!()` 매크로를 호출합니다.
//! exporter는 설치하지 않으므로 recorder가 없으면 no-op입니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `kubetriage_`
//! - 모듈명: `artifacts_`, `reclaim_`
//! - 접미어: `_total` (counter), `_seconds` (histogram), `_bytes` (크기)
//!
//! # 사용 예시
//!
//! ```ignore
//! use kubetriage_core::metrics as m;
//! use metrics::counter;
//!
//! counter!(m::ARTIFACTS_WRITTEN_TOTAL).increment(1);
//! counter!(m::ARTIFACTS_STEP_FAILURES_TOTAL, m::LABEL_STEP => "pod_logs").increment(1);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 수집 단계 레이블 키 (pods, controller_logs, controller_health, ...)
pub const LABEL_STEP: &str = "step";

/// 회수 결과 레이블 키 (graceful, forced, abandoned)
pub const LABEL_OUTCOME: &str = "outcome";

// ─── Artifacts 메트릭 ──────────────────────────────────────────────

/// Artifacts: 기록된 아티팩트 파일 수 (counter)
pub const ARTIFACTS_WRITTEN_TOTAL: &str = "kubetriage_artifacts_written_total";

/// Artifacts: 기록된 바이트 수 (counter)
pub const ARTIFACTS_BYTES_WRITTEN_TOTAL: &str = "kubetriage_artifacts_bytes_written_total";

/// Artifacts: 바이트 예산 초과로 건너뛴 아티팩트 수 (counter)
pub const ARTIFACTS_SKIPPED_TOTAL: &str = "kubetriage_artifacts_skipped_total";

/// Artifacts: 실패한 수집 단계 수 (counter, label: step)
pub const ARTIFACTS_STEP_FAILURES_TOTAL: &str = "kubetriage_artifacts_step_failures_total";

/// Artifacts: 테스트당 수집 소요 시간 (histogram, 초)
pub const ARTIFACTS_COLLECTION_DURATION_SECONDS: &str =
    "kubetriage_artifacts_collection_duration_seconds";

/// Artifacts: 수집 타임아웃 발생 수 (counter)
pub const ARTIFACTS_COLLECTION_TIMEOUTS_TOTAL: &str =
    "kubetriage_artifacts_collection_timeouts_total";

// ─── Reclaim 메트릭 ────────────────────────────────────────────────

/// Reclaim: 네임스페이스 회수 결과 (counter, label: outcome)
pub const RECLAIM_OUTCOMES_TOTAL: &str = "kubetriage_reclaim_outcomes_total";

/// Reclaim: 회수 소요 시간 (histogram, 초)
pub const RECLAIM_DURATION_SECONDS: &str = "kubetriage_reclaim_duration_seconds";

/// 모든 메트릭의 설명을 등록합니다.
///
/// recorder 설치 이후 한 번 호출합니다. recorder가 없어도 안전합니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_histogram};

    describe_counter!(
        ARTIFACTS_WRITTEN_TOTAL,
        "Total number of artifact files written"
    );
    describe_counter!(
        ARTIFACTS_BYTES_WRITTEN_TOTAL,
        "Total bytes of artifact content written"
    );
    describe_counter!(
        ARTIFACTS_SKIPPED_TOTAL,
        "Artifacts skipped because the per-test byte budget was exhausted"
    );
    describe_counter!(
        ARTIFACTS_STEP_FAILURES_TOTAL,
        "Failed capture steps per step name"
    );
    describe_histogram!(
        ARTIFACTS_COLLECTION_DURATION_SECONDS,
        "Per-test artifact collection duration in seconds"
    );
    describe_counter!(
        ARTIFACTS_COLLECTION_TIMEOUTS_TOTAL,
        "Collections cut short by the per-test timeout"
    );
    describe_counter!(
        RECLAIM_OUTCOMES_TOTAL,
        "Namespace reclaim results per outcome"
    );
    describe_histogram!(
        RECLAIM_DURATION_SECONDS,
        "Namespace reclaim duration in seconds"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_NAMES: [&str; 8] = [
        ARTIFACTS_WRITTEN_TOTAL,
        ARTIFACTS_BYTES_WRITTEN_TOTAL,
        ARTIFACTS_SKIPPED_TOTAL,
        ARTIFACTS_STEP_FAILURES_TOTAL,
        ARTIFACTS_COLLECTION_DURATION_SECONDS,
        ARTIFACTS_COLLECTION_TIMEOUTS_TOTAL,
        RECLAIM_OUTCOMES_TOTAL,
        RECLAIM_DURATION_SECONDS,
    ];

    #[test]
    fn describe_all_does_not_panic() {
        // recorder가 없어도 패닉하지 않아야 함
        describe_all();
    }

    #[test]
    fn names_share_prefix() {
        for name in &ALL_NAMES {
            assert!(name.starts_with("kubetriage_"), "bad prefix: {name}");
        }
    }

    #[test]
    fn counters_end_with_total() {
        for name in &ALL_NAMES {
            assert!(
                name.ends_with("_total") || name.ends_with("_seconds"),
                "unexpected suffix: {name}"
            );
        }
    }

    #[test]
    fn label_keys_are_lowercase() {
        for label in [LABEL_STEP, LABEL_OUTCOME] {
            assert_eq!(label, label.to_lowercase());
        }
    }
}
