//! kubetriage 공통 크레이트
//!
//! 아티팩트 수집기(`kubetriage-artifacts`)와 네임스페이스 회수기
//! (`kubetriage-reclaimer`)가 공유하는 타입을 정의합니다.
//!
//! - [`cluster::ClusterClient`]: 클러스터 접근 trait
//! - [`error`]: 도메인별 에러 타입
//! - [`config`]: 환경변수 기반 설정
//! - [`duration`]: 타임아웃 문자열 문법
//! - [`classify`]: 에러 텍스트 분류
//! - [`matching`]: 네임스페이스 매칭 휴리스틱
//! - [`metrics`]: 메트릭 이름

pub mod classify;
pub mod cluster;
pub mod config;
pub mod duration;
pub mod error;
#[cfg(any(test, feature = "test-util"))]
pub mod fake;
pub mod matching;
pub mod metrics;

// --- 주요 타입 re-export ---

// 에러
pub use error::{ClusterError, ConfigError, InputError, StorageError, TriageError};

// 설정
pub use config::{ArtifactConfig, ControllerTarget, TimeoutConfig};

// 클러스터 trait
pub use cluster::{
    ClusterClient, DeleteOptions, EventFilter, LogOptions, OutputFormat, ProfileKind,
    ProfileSnapshot, ProfileTarget,
};

#[cfg(any(test, feature = "test-util"))]
pub use fake::FakeCluster;
