//! 테스트 네임스페이스 회수
//!
//! 커스텀 리소스 finalizer 때문에 종료가 멈춘 네임스페이스도 유한한 시간 안에
//! 정리되도록 단계적으로 강제도를 높입니다.
//!
//! - [`stage`]: 순수 상태 머신 (`Stage`, `next`)
//! - [`reclaimer`]: 클러스터 호출 실행기 (`NamespaceReclaimer`)
//! - [`error`]: 입력 에러 (`ReclaimError`)

pub mod error;
pub mod reclaimer;
pub mod stage;

pub use error::ReclaimError;
pub use reclaimer::{
    CLEAR_FINALIZERS_PATCH, DEFAULT_FINALIZER_KINDS, NamespaceReclaimer, ReclaimerConfig,
};
pub use stage::{Outcome, Stage, StepOutcome, next};
