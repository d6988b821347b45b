//! 회수기 에러 타입
//!
//! 회수 단계의 클러스터 실패는 에러가 아닙니다. 호출자가 넘긴 인자가
//! 잘못된 경우에만 [`ReclaimError`]를 반환합니다.

use kubetriage_core::error::{InputError, TriageError};

/// 네임스페이스 회수 에러
#[derive(Debug, thiserror::Error)]
pub enum ReclaimError {
    /// 잘못된 timeout 문자열 또는 네임스페이스 이름
    #[error("invalid reclaim input: {0}")]
    Input(#[from] InputError),
}

impl From<ReclaimError> for TriageError {
    fn from(err: ReclaimError) -> Self {
        match err {
            ReclaimError::Input(e) => TriageError::Input(e),
        }
    }
}
