//! 에러 타입 — 도메인별 에러 정의
//!
//! 실패 분류:
//! - 설정 에러: 환경변수 값이 잘못된 경우. 로더는 기본값으로 대체하므로 전파되지 않습니다.
//! - 클러스터 에러: `kubectl` 호출 실패. [`crate::classify`]로 일시적/무시 가능 여부를 판별합니다.
//! - 스토리지 에러: 아티팩트 파일 쓰기 실패. 호출자는 로그를 남기고 진행합니다.
//! - 입력 에러: 호출 코드가 직접 넘긴 잘못된 인자. 즉시 반환되는 유일한 치명적 에러입니다.

use std::path::PathBuf;

use crate::classify;

/// kubetriage 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum TriageError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 클러스터 명령 에러
    #[error("cluster error: {0}")]
    Cluster(#[from] ClusterError),

    /// 스토리지 에러
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// 호출자 입력 에러
    #[error("input error: {0}")]
    Input(#[from] InputError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 클러스터 명령 에러
#[derive(Debug, thiserror::Error)]
pub enum ClusterError {
    /// 외부 프로세스 실행 실패
    #[error("failed to spawn '{command}': {reason}")]
    Spawn { command: String, reason: String },

    /// 명령이 0이 아닌 종료 코드로 끝남
    #[error("'{command}' failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    /// 명령 시간 초과
    #[error("'{command}' timed out after {timeout_secs}s")]
    Timeout { command: String, timeout_secs: u64 },

    /// 대상 객체 없음
    #[error("not found: {0}")]
    NotFound(String),

    /// 인자 검증 실패 (명령 주입 방지)
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    /// 명령 출력 파싱 실패
    #[error("failed to parse output: {0}")]
    Parse(String),
}

impl ClusterError {
    /// 객체가 존재하지 않음을 나타내는지 확인합니다.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_)) || classify::is_not_found(self)
    }

    /// 재시도하면 성공할 가능성이 있는 에러인지 확인합니다.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout { .. }) || classify::is_transient(self)
    }

    /// setup/teardown 단계에서 무시해도 되는 에러인지 확인합니다.
    pub fn is_ignorable(&self) -> bool {
        self.is_not_found() || classify::is_already_exists(self)
    }
}

/// 스토리지 에러
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// 디렉토리 생성 실패
    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    /// 임시 파일 쓰기 실패
    #[error("failed to write temp file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    /// 임시 파일을 최종 경로로 옮기지 못함 (임시 파일은 제거됨)
    #[error("failed to rename {from} to {to}: {source}")]
    Rename {
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },

    /// 직렬화 실패
    #[error("failed to serialize {what}: {reason}")]
    Serialize { what: String, reason: String },
}

/// 호출자 입력 에러
///
/// 환경변수가 아닌 코드에서 직접 전달된 인자가 잘못된 경우입니다.
/// 환경 문제가 아닌 프로그래밍 오류이므로 즉시 실패합니다.
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    /// 잘못된 timeout 문자열
    #[error("invalid timeout '{value}': {reason}")]
    InvalidTimeout { value: String, reason: String },

    /// 잘못된 네임스페이스 이름
    #[error("invalid namespace '{value}': {reason}")]
    InvalidNamespace { value: String, reason: String },

    /// 잘못된 크기 인자
    #[error("invalid size for '{field}': {reason}")]
    InvalidSize { field: String, reason: String },
}
