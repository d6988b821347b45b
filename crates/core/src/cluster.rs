//! Cluster access abstraction.
//!
//! The [`ClusterClient`] trait is the only way the artifact collector and the
//! namespace reclaimer talk to a live cluster. Production code uses the
//! `kubectl`-backed client from `kubetriage-kubectl`; tests use
//! `FakeCluster` (behind the `test-util` feature).
//!
//! # Architecture
//!
//! ```text
//! ┌───────────┐   ┌────────────────────┐
//! │ Collector │   │ NamespaceReclaimer │
//! └─────┬─────┘   └─────────┬──────────┘
//!       │                   │
//!       ▼                   ▼
//!     ┌─────────────────────────┐
//!     │   ClusterClient (trait) │
//!     └─────────────────────────┘
//!          │              │
//!          ▼              ▼
//!   ┌──────────────┐ ┌────────────┐
//!   │KubectlClient │ │FakeCluster │
//!   └──────┬───────┘ └────────────┘
//!          ▼
//!     API server
//! ```

use std::fmt;
use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ClusterError;

/// `get` 출력 형식
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Yaml,
}

impl OutputFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Yaml => "yaml",
        }
    }
}

/// 로그 조회 옵션
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogOptions {
    /// 마지막 N줄만 요청 (`None`이면 전체)
    pub tail_lines: Option<u64>,
    /// 이 시각 이후의 로그만 요청
    pub since_time: Option<DateTime<Utc>>,
    /// 모든 컨테이너의 로그를 포함
    pub all_containers: bool,
}

/// 삭제 옵션
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteOptions {
    /// 명령 전체 타임아웃 (`None`이면 클라이언트 기본값)
    pub timeout: Option<Duration>,
    /// 유예 시간 (초). `Some(0)`은 즉시 삭제
    pub grace_period: Option<u32>,
    /// 강제 삭제
    pub force: bool,
    /// 대상이 없으면 성공으로 취급
    pub ignore_not_found: bool,
}

impl DeleteOptions {
    /// 일반 삭제 (호출자 타임아웃 적용)
    pub fn graceful(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
            ignore_not_found: true,
            ..Self::default()
        }
    }

    /// 유예 시간 0의 강제 삭제
    pub fn forced(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
            grace_period: Some(0),
            force: true,
            ignore_not_found: true,
        }
    }
}

/// 이벤트 조회 필터
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFilter {
    /// `type=Warning` 이벤트만
    pub warnings_only: bool,
    /// 이 시각 이후의 이벤트만
    pub since: Option<DateTime<Utc>>,
}

/// 컨트롤러 런타임 프로파일 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileKind {
    Goroutine,
    Heap,
}

impl ProfileKind {
    pub const ALL: [ProfileKind; 2] = [ProfileKind::Goroutine, ProfileKind::Heap];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Goroutine => "goroutine",
            Self::Heap => "heap",
        }
    }
}

impl fmt::Display for ProfileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 프로파일 수집 대상 (포트 포워딩 경로)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileTarget {
    pub namespace: String,
    pub pod: String,
    /// 파드 내부 포트
    pub remote_port: u16,
    /// 로컬 바인딩 포트
    pub local_port: u16,
}

/// 수집된 프로파일 스냅샷
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileSnapshot {
    pub kind: ProfileKind,
    pub content: String,
}

/// Trait abstracting cluster read/mutate operations.
///
/// All cluster calls go through this trait, enabling tests without a cluster.
/// The trait is `Send + Sync + 'static`, allowing sharing behind an `Arc`.
///
/// `namespace: None` means a cluster-scoped object (or the client's default
/// namespace for namespaced kinds).
///
/// # Errors
///
/// Implementations report failures as [`ClusterError`]. Callers decide
/// whether an error is ignorable via [`ClusterError::is_ignorable`] and
/// [`ClusterError::is_transient`].
pub trait ClusterClient: Send + Sync + 'static {
    /// Fetches a single object rendered in `format`.
    fn get(
        &self,
        kind: &str,
        name: &str,
        namespace: Option<&str>,
        format: OutputFormat,
    ) -> impl Future<Output = Result<String, ClusterError>> + Send;

    /// Fetches a single field using a JSONPath expression such as `.status`.
    ///
    /// Object-valued fields are returned as JSON text.
    fn get_field(
        &self,
        kind: &str,
        name: &str,
        namespace: Option<&str>,
        json_path: &str,
    ) -> impl Future<Output = Result<String, ClusterError>> + Send;

    /// Lists object names of `kind`, optionally filtered by a label selector.
    ///
    /// An unknown kind (for example a CRD that is not installed) is reported
    /// as a not-found error.
    fn list_names(
        &self,
        kind: &str,
        namespace: Option<&str>,
        selector: Option<&str>,
    ) -> impl Future<Output = Result<Vec<String>, ClusterError>> + Send;

    /// Applies a manifest, optionally forcing the target namespace.
    fn apply(
        &self,
        manifest: &str,
        namespace: Option<&str>,
    ) -> impl Future<Output = Result<(), ClusterError>> + Send;

    /// Deletes an object. Returning `Ok` does not imply the object is gone.
    fn delete(
        &self,
        kind: &str,
        name: &str,
        namespace: Option<&str>,
        options: &DeleteOptions,
    ) -> impl Future<Output = Result<(), ClusterError>> + Send;

    /// Applies a JSON merge patch.
    fn patch_merge(
        &self,
        kind: &str,
        name: &str,
        namespace: Option<&str>,
        patch: &str,
    ) -> impl Future<Output = Result<(), ClusterError>> + Send;

    /// Human-readable description text.
    fn describe(
        &self,
        kind: &str,
        name: &str,
        namespace: Option<&str>,
    ) -> impl Future<Output = Result<String, ClusterError>> + Send;

    /// Container logs of a pod.
    fn logs(
        &self,
        namespace: &str,
        pod: &str,
        options: &LogOptions,
    ) -> impl Future<Output = Result<String, ClusterError>> + Send;

    /// Event list of a namespace as text.
    fn events(
        &self,
        namespace: &str,
        filter: &EventFilter,
    ) -> impl Future<Output = Result<String, ClusterError>> + Send;

    /// Whether a namespace currently exists (terminating counts as existing).
    fn namespace_exists(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<bool, ClusterError>> + Send;

    /// Fetches debug profiles from a pod through a short-lived port-forward.
    ///
    /// Profiles that cannot be fetched are left out of the result; only a
    /// failure to establish the port-forward is an error.
    fn capture_profiles(
        &self,
        target: &ProfileTarget,
        kinds: &[ProfileKind],
    ) -> impl Future<Output = Result<Vec<ProfileSnapshot>, ClusterError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forced_delete_has_zero_grace() {
        let opts = DeleteOptions::forced(Duration::from_secs(10));
        assert_eq!(opts.grace_period, Some(0));
        assert!(opts.force);
        assert_eq!(opts.timeout, Some(Duration::from_secs(10)));
    }

    #[test]
    fn graceful_delete_keeps_default_grace() {
        let opts = DeleteOptions::graceful(Duration::from_secs(120));
        assert_eq!(opts.grace_period, None);
        assert!(!opts.force);
        assert!(opts.ignore_not_found);
    }

    #[test]
    fn profile_kind_names() {
        assert_eq!(ProfileKind::Goroutine.to_string(), "goroutine");
        assert_eq!(ProfileKind::Heap.as_str(), "heap");
        assert_eq!(OutputFormat::Yaml.as_str(), "yaml");
    }
}
