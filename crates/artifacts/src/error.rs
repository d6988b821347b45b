//! 아티팩트 수집 에러 타입
//!
//! [`ArtifactError`]는 수집기 내부에서 발생하는 에러를 표현합니다.
//! 개별 수집 단계의 실패는 로그로만 남고 호출자에게 전파되지 않습니다.
//! 호출자가 받는 에러는 초기화 실패, 테스트 디렉토리 생성 실패, 실행 요약 기록 실패뿐입니다.

use std::path::PathBuf;

use kubetriage_core::error::{
    ClusterError, ConfigError, InputError, StorageError, TriageError,
};

/// 아티팩트 수집 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    /// 파일 기록 실패
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// 클러스터 호출 실패
    #[error("cluster error: {0}")]
    Cluster(#[from] ClusterError),

    /// 호출자가 넘긴 잘못된 인자
    #[error("input error: {0}")]
    Input(#[from] InputError),

    /// `initialize` 없이 수집을 요청함
    #[error("collector is not initialized")]
    NotInitialized,

    /// 테스트 컨텍스트에 필요한 값이 없음
    #[error("missing test input: {0}")]
    MissingInput(String),

    /// 메타데이터 파일 읽기 실패
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// 메타데이터 직렬화/역직렬화 실패
    #[error("metadata error: {0}")]
    Metadata(String),
}

impl From<ArtifactError> for TriageError {
    fn from(err: ArtifactError) -> Self {
        match err {
            ArtifactError::Storage(e) => TriageError::Storage(e),
            ArtifactError::Cluster(e) => TriageError::Cluster(e),
            ArtifactError::Input(e) => TriageError::Input(e),
            ArtifactError::Read { source, .. } => TriageError::Io(source),
            other @ (ArtifactError::NotInitialized | ArtifactError::MissingInput(_)) => {
                TriageError::Config(ConfigError::InvalidValue {
                    field: "collector".to_owned(),
                    reason: other.to_string(),
                })
            }
            ArtifactError::Metadata(reason) => TriageError::Storage(StorageError::Serialize {
                what: "metadata".to_owned(),
                reason,
            }),
        }
    }
}
