//! 설정 관리 — 환경변수 기반 아티팩트 수집/타임아웃 설정
//!
//! 설정은 프로세스당 한 번 로드되며 이후 변경되지 않습니다.
//!
//! # 설정 로딩 우선순위
//! 1. 환경변수 (`E2E_ARTIFACTS_MAX_LOG_LINES=1000` 형식)
//! 2. 기본값 (`Default` 구현)
//!
//! 환경변수 값을 파싱할 수 없으면 조용히 기본값을 유지합니다 (`debug` 레벨 로그만 남김).
//! 테스트 실행을 설정 오타 때문에 중단시키지 않기 위함입니다.
//!
//! # 사용 예시
//! ```no_run
//! use kubetriage_core::config::{ArtifactConfig, TimeoutConfig};
//!
//! let artifacts = ArtifactConfig::from_env();
//! let timeouts = TimeoutConfig::from_env();
//! assert!(artifacts.max_log_lines > 0 || !artifacts.enabled);
//! # let _ = timeouts;
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::duration::{compact, parse_timeout};
use crate::error::ConfigError;

// ─── 환경변수 이름 ────────────────────────────────────────────────

pub const ENV_ENABLED: &str = "E2E_ARTIFACTS_ENABLED";
pub const ENV_ON_FAILURE_ONLY: &str = "E2E_ARTIFACTS_ON_FAILURE_ONLY";
pub const ENV_MINIMAL_ONLY: &str = "E2E_ARTIFACTS_MINIMAL_ONLY";
pub const ENV_BASE_DIR: &str = "E2E_ARTIFACTS_DIR";
pub const ENV_MAX_LOG_LINES: &str = "E2E_ARTIFACTS_MAX_LOG_LINES";
pub const ENV_MAX_RESOURCE_SIZE: &str = "E2E_ARTIFACTS_MAX_RESOURCE_SIZE";
pub const ENV_MAX_TOTAL_SIZE: &str = "E2E_ARTIFACTS_MAX_TOTAL_SIZE";
pub const ENV_TIMEOUT: &str = "E2E_ARTIFACTS_TIMEOUT";
pub const ENV_PROFILING: &str = "E2E_ARTIFACTS_PROFILING";
pub const ENV_STATUS_KINDS: &str = "E2E_ARTIFACTS_STATUS_KINDS";
pub const ENV_CONTROLLER_NAMESPACE: &str = "E2E_CONTROLLER_NAMESPACE";
pub const ENV_CONTROLLER_SELECTOR: &str = "E2E_CONTROLLER_SELECTOR";
pub const ENV_CONTROLLER_DEPLOYMENT: &str = "E2E_CONTROLLER_DEPLOYMENT";
pub const ENV_NAMESPACE_DELETE_TIMEOUT: &str = "E2E_NAMESPACE_DELETE_TIMEOUT";
pub const ENV_DEFAULT_POLL_INTERVAL: &str = "E2E_DEFAULT_POLL_INTERVAL";
pub const ENV_FAST_POLL_INTERVAL: &str = "E2E_FAST_POLL_INTERVAL";
pub const ENV_SLOW_POLL_INTERVAL: &str = "E2E_SLOW_POLL_INTERVAL";

// ─── 기본값 ───────────────────────────────────────────────────────

const DEFAULT_BASE_DIR: &str = "test/e2e/artifacts";
const DEFAULT_MAX_LOG_LINES: i64 = 500;
const DEFAULT_MAX_RESOURCE_SIZE: u64 = 10 * 1024 * 1024;
const DEFAULT_MAX_TOTAL_SIZE: u64 = 100 * 1024 * 1024;
const DEFAULT_COLLECTION_TIMEOUT: Duration = Duration::from_secs(30);

/// 아티팩트 수집 설정
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactConfig {
    /// 수집 전체 활성화 여부
    pub enabled: bool,
    /// 실패한 테스트만 수집
    pub collect_on_failure_only: bool,
    /// P0 아티팩트만 수집 (빠른 경로)
    pub collect_minimal_only: bool,
    /// 아티팩트 저장 기본 디렉토리
    pub base_dir: PathBuf,
    /// 아티팩트당 최대 로그 줄 수 (0 이하이면 자르지 않음)
    pub max_log_lines: i64,
    /// 단일 아티팩트 최대 크기 (바이트)
    pub max_resource_size: u64,
    /// 테스트당 최대 총 크기 (바이트)
    pub max_total_size: u64,
    /// 테스트당 수집 타임아웃
    #[serde(with = "compact")]
    pub collection_timeout: Duration,
    /// 컨트롤러 프로파일링 스냅샷 수집 여부
    pub profiling_enabled: bool,
    /// 상태를 덤프할 커스텀 리소스 종류
    pub status_kinds: Vec<String>,
    /// 메타데이터를 덤프할 표준 워크로드 종류
    pub workload_kinds: Vec<String>,
    /// 테스트 대상 컨트롤러 위치
    pub controller: ControllerTarget,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            collect_on_failure_only: true,
            collect_minimal_only: false,
            base_dir: PathBuf::from(DEFAULT_BASE_DIR),
            max_log_lines: DEFAULT_MAX_LOG_LINES,
            max_resource_size: DEFAULT_MAX_RESOURCE_SIZE,
            max_total_size: DEFAULT_MAX_TOTAL_SIZE,
            collection_timeout: DEFAULT_COLLECTION_TIMEOUT,
            profiling_enabled: true,
            status_kinds: vec!["vectorpipeline".to_owned()],
            workload_kinds: vec![
                "deployment".to_owned(),
                "daemonset".to_owned(),
                "service".to_owned(),
            ],
            controller: ControllerTarget::default(),
        }
    }
}

impl ArtifactConfig {
    /// 기본값에 프로세스 환경변수 오버라이드를 적용한 설정을 반환합니다.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    /// 프로세스 환경변수로 설정값을 오버라이드합니다.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// 임의의 조회 함수로 설정값을 오버라이드합니다.
    ///
    /// 빈 문자열은 설정되지 않은 것으로 취급합니다.
    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let env = |key: &str| lookup(key).filter(|v| !v.is_empty());

        override_bool(&mut self.enabled, ENV_ENABLED, env(ENV_ENABLED));
        override_bool(
            &mut self.collect_on_failure_only,
            ENV_ON_FAILURE_ONLY,
            env(ENV_ON_FAILURE_ONLY),
        );
        override_bool(
            &mut self.collect_minimal_only,
            ENV_MINIMAL_ONLY,
            env(ENV_MINIMAL_ONLY),
        );
        if let Some(dir) = env(ENV_BASE_DIR) {
            self.base_dir = PathBuf::from(dir);
        }
        override_parsed(
            &mut self.max_log_lines,
            ENV_MAX_LOG_LINES,
            env(ENV_MAX_LOG_LINES),
        );
        override_parsed(
            &mut self.max_resource_size,
            ENV_MAX_RESOURCE_SIZE,
            env(ENV_MAX_RESOURCE_SIZE),
        );
        override_parsed(
            &mut self.max_total_size,
            ENV_MAX_TOTAL_SIZE,
            env(ENV_MAX_TOTAL_SIZE),
        );
        override_duration(&mut self.collection_timeout, ENV_TIMEOUT, env(ENV_TIMEOUT));
        override_bool(&mut self.profiling_enabled, ENV_PROFILING, env(ENV_PROFILING));
        override_csv(&mut self.status_kinds, env(ENV_STATUS_KINDS));

        if let Some(ns) = env(ENV_CONTROLLER_NAMESPACE) {
            self.controller.namespace = ns;
        }
        if let Some(selector) = env(ENV_CONTROLLER_SELECTOR) {
            self.controller.pod_selector = selector;
        }
        if let Some(deployment) = env(ENV_CONTROLLER_DEPLOYMENT) {
            self.controller.deployment = deployment;
        }
    }

    /// 설정값의 유효성을 검증합니다.
    ///
    /// 환경변수 로더는 이 검증을 호출하지 않습니다. CLI처럼 설정을 명시적으로
    /// 다루는 호출자가 사용합니다.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_resource_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_resource_size".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }
        if self.max_total_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_total_size".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }
        if self.collection_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "collection_timeout".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }
        if self.enabled && self.base_dir.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "base_dir".to_owned(),
                reason: "must not be empty when collection is enabled".to_owned(),
            });
        }
        Ok(())
    }
}

/// 테스트 대상 시스템의 장기 실행 컨트롤러 위치
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerTarget {
    /// 컨트롤러 네임스페이스
    pub namespace: String,
    /// 컨트롤러 파드 라벨 셀렉터
    pub pod_selector: String,
    /// 컨트롤러 Deployment 이름
    pub deployment: String,
    /// 파드 내부 프로파일링 포트
    pub profiling_port: u16,
    /// 포트 포워딩에 사용할 로컬 포트
    pub local_profiling_port: u16,
}

impl Default for ControllerTarget {
    fn default() -> Self {
        Self {
            namespace: "vector-operator-system".to_owned(),
            pod_selector: "app.kubernetes.io/name=vector-operator".to_owned(),
            deployment: "vector-operator-controller-manager".to_owned(),
            profiling_port: 6060,
            local_profiling_port: 16060,
        }
    }
}

/// 대기/폴링 타임아웃 설정
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// 네임스페이스 삭제 타임아웃
    #[serde(with = "compact")]
    pub namespace_delete: Duration,
    /// 기본 폴링 간격
    #[serde(with = "compact")]
    pub default_poll_interval: Duration,
    /// 짧은 대기용 폴링 간격
    #[serde(with = "compact")]
    pub fast_poll_interval: Duration,
    /// 긴 대기용 폴링 간격
    #[serde(with = "compact")]
    pub slow_poll_interval: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            namespace_delete: Duration::from_secs(120),
            default_poll_interval: Duration::from_secs(2),
            fast_poll_interval: Duration::from_secs(1),
            slow_poll_interval: Duration::from_secs(2),
        }
    }
}

impl TimeoutConfig {
    /// 기본값에 프로세스 환경변수 오버라이드를 적용한 설정을 반환합니다.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_overrides_from(|key| std::env::var(key).ok());
        config
    }

    /// 임의의 조회 함수로 설정값을 오버라이드합니다.
    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let env = |key: &str| lookup(key).filter(|v| !v.is_empty());
        override_duration(
            &mut self.namespace_delete,
            ENV_NAMESPACE_DELETE_TIMEOUT,
            env(ENV_NAMESPACE_DELETE_TIMEOUT),
        );
        override_duration(
            &mut self.default_poll_interval,
            ENV_DEFAULT_POLL_INTERVAL,
            env(ENV_DEFAULT_POLL_INTERVAL),
        );
        override_duration(
            &mut self.fast_poll_interval,
            ENV_FAST_POLL_INTERVAL,
            env(ENV_FAST_POLL_INTERVAL),
        );
        override_duration(
            &mut self.slow_poll_interval,
            ENV_SLOW_POLL_INTERVAL,
            env(ENV_SLOW_POLL_INTERVAL),
        );
    }

    /// 전체 대기 시간에 맞는 폴링 간격을 반환합니다.
    ///
    /// 30초 미만은 fast, 2분 초과는 slow, 그 사이는 default 간격입니다.
    pub fn poll_interval_for(&self, timeout: Duration) -> Duration {
        if timeout < Duration::from_secs(30) {
            self.fast_poll_interval
        } else if timeout > Duration::from_secs(120) {
            self.slow_poll_interval
        } else {
            self.default_poll_interval
        }
    }
}

// ─── 오버라이드 헬퍼 ──────────────────────────────────────────────

fn override_parsed<T: std::str::FromStr>(target: &mut T, env_key: &str, value: Option<String>) {
    if let Some(val) = value {
        match val.parse::<T>() {
            Ok(parsed) => *target = parsed,
            Err(_) => debug!(
                env_key,
                value = val.as_str(),
                "failed to parse env var, keeping default"
            ),
        }
    }
}

/// 불리언 환경변수 값을 해석합니다.
///
/// `1`/`t`/`true`, `0`/`f`/`false`를 받습니다. `true`/`false`는 `TRUE`,
/// `True`처럼 전부 대문자이거나 첫 글자만 대문자여도 됩니다.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}

fn override_bool(target: &mut bool, env_key: &str, value: Option<String>) {
    if let Some(val) = value {
        match parse_bool(val.trim()) {
            Some(parsed) => *target = parsed,
            None => debug!(
                env_key,
                value = val.as_str(),
                "failed to parse boolean env var, keeping default"
            ),
        }
    }
}

fn override_duration(target: &mut Duration, env_key: &str, value: Option<String>) {
    if let Some(val) = value {
        match parse_timeout(&val) {
            Ok(parsed) => *target = parsed,
            Err(e) => debug!(
                env_key,
                value = val.as_str(),
                error = %e,
                "failed to parse duration from env var, keeping default"
            ),
        }
    }
}

fn override_csv(target: &mut Vec<String>, value: Option<String>) {
    if let Some(val) = value {
        let items: Vec<String> = val
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect();
        if !items.is_empty() {
            *target = items;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = ArtifactConfig::default();
        assert!(config.enabled);
        assert!(config.collect_on_failure_only);
        assert!(!config.collect_minimal_only);
        assert_eq!(config.max_log_lines, 500);
        assert_eq!(config.collection_timeout, Duration::from_secs(30));
        assert_eq!(config.max_resource_size, 10 * 1024 * 1024);
        assert_eq!(config.max_total_size, 100 * 1024 * 1024);
        assert_eq!(config.base_dir, PathBuf::from("test/e2e/artifacts"));
    }

    #[test]
    fn boolean_overrides_accept_numeric_and_capitalized_forms() {
        let mut config = ArtifactConfig::default();
        config.apply_overrides_from(lookup_from(&[
            (ENV_ENABLED, "0"),
            (ENV_ON_FAILURE_ONLY, "F"),
            (ENV_MINIMAL_ONLY, "1"),
            (ENV_PROFILING, "TRUE"),
        ]));
        assert!(!config.enabled);
        assert!(!config.collect_on_failure_only);
        assert!(config.collect_minimal_only);
        assert!(config.profiling_enabled);
    }

    #[test]
    fn unrecognized_boolean_keeps_default() {
        let mut config = ArtifactConfig::default();
        config.apply_overrides_from(lookup_from(&[(ENV_ENABLED, "no"), (ENV_ON_FAILURE_ONLY, "tRuE")]));
        assert!(config.enabled);
        assert!(config.collect_on_failure_only);
        assert_eq!(parse_bool("yes"), None);
        assert_eq!(parse_bool("False"), Some(false));
    }

    #[test]
    fn empty_environment_yields_defaults() {
        let mut config = ArtifactConfig::default();
        config.apply_overrides_from(|_| None);
        assert_eq!(config, ArtifactConfig::default());
    }

    #[test]
    fn overrides_apply_when_parsable() {
        let mut config = ArtifactConfig::default();
        config.apply_overrides_from(lookup_from(&[
            (ENV_ENABLED, "false"),
            (ENV_ON_FAILURE_ONLY, "false"),
            (ENV_MAX_LOG_LINES, "42"),
            (ENV_MAX_RESOURCE_SIZE, "2048"),
            (ENV_TIMEOUT, "1m30s"),
            (ENV_BASE_DIR, "/tmp/artifacts"),
            (ENV_STATUS_KINDS, "vectorpipeline, clustervectorpipeline"),
        ]));
        assert!(!config.enabled);
        assert!(!config.collect_on_failure_only);
        assert_eq!(config.max_log_lines, 42);
        assert_eq!(config.max_resource_size, 2048);
        assert_eq!(config.collection_timeout, Duration::from_secs(90));
        assert_eq!(config.base_dir, PathBuf::from("/tmp/artifacts"));
        assert_eq!(
            config.status_kinds,
            vec!["vectorpipeline".to_owned(), "clustervectorpipeline".to_owned()]
        );
    }

    #[test]
    fn malformed_values_fall_back_silently() {
        let mut config = ArtifactConfig::default();
        config.apply_overrides_from(lookup_from(&[
            (ENV_ENABLED, "yes please"),
            (ENV_MAX_LOG_LINES, "many"),
            (ENV_MAX_RESOURCE_SIZE, "-5"),
            (ENV_TIMEOUT, "thirty seconds"),
        ]));
        assert_eq!(config, ArtifactConfig::default());
    }

    #[test]
    fn empty_string_is_treated_as_unset() {
        let mut config = ArtifactConfig::default();
        config.apply_overrides_from(lookup_from(&[(ENV_BASE_DIR, ""), (ENV_ENABLED, "")]));
        assert_eq!(config, ArtifactConfig::default());
    }

    #[test]
    fn negative_log_lines_are_accepted() {
        let mut config = ArtifactConfig::default();
        config.apply_overrides_from(lookup_from(&[(ENV_MAX_LOG_LINES, "-1")]));
        assert_eq!(config.max_log_lines, -1);
    }

    #[test]
    fn controller_target_overrides() {
        let mut config = ArtifactConfig::default();
        config.apply_overrides_from(lookup_from(&[
            (ENV_CONTROLLER_NAMESPACE, "operators"),
            (ENV_CONTROLLER_SELECTOR, "app=demo"),
        ]));
        assert_eq!(config.controller.namespace, "operators");
        assert_eq!(config.controller.pod_selector, "app=demo");
        assert_eq!(
            config.controller.deployment,
            "vector-operator-controller-manager"
        );
    }

    #[test]
    fn validate_rejects_zero_limits() {
        let config = ArtifactConfig {
            max_resource_size: 0,
            ..ArtifactConfig::default()
        };
        assert!(config.validate().is_err());

        let config = ArtifactConfig {
            collection_timeout: Duration::ZERO,
            ..ArtifactConfig::default()
        };
        assert!(config.validate().is_err());

        assert!(ArtifactConfig::default().validate().is_ok());
    }

    #[test]
    fn timeout_config_overrides() {
        let mut config = TimeoutConfig::default();
        config.apply_overrides_from(lookup_from(&[
            (ENV_NAMESPACE_DELETE_TIMEOUT, "3m"),
            (ENV_FAST_POLL_INTERVAL, "bogus"),
        ]));
        assert_eq!(config.namespace_delete, Duration::from_secs(180));
        assert_eq!(config.fast_poll_interval, Duration::from_secs(1));
    }

    #[test]
    fn poll_interval_scales_with_timeout() {
        let config = TimeoutConfig {
            fast_poll_interval: Duration::from_millis(500),
            default_poll_interval: Duration::from_secs(2),
            slow_poll_interval: Duration::from_secs(5),
            ..TimeoutConfig::default()
        };
        assert_eq!(
            config.poll_interval_for(Duration::from_secs(10)),
            Duration::from_millis(500)
        );
        assert_eq!(
            config.poll_interval_for(Duration::from_secs(60)),
            Duration::from_secs(2)
        );
        assert_eq!(
            config.poll_interval_for(Duration::from_secs(600)),
            Duration::from_secs(5)
        );
    }
}
