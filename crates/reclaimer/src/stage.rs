//! 회수 단계 상태 머신
//!
//! 부수 효과가 없는 순수 전이 함수입니다. 클러스터 호출은
//! [`crate::reclaimer`]가 담당합니다.
//!
//! ```text
//! Delete ──ok──> ConfirmDeleted ──ok──> Done(Graceful)
//!   │ fail             │ fail
//!   └───────┬──────────┘
//!           v
//! StripResourceFinalizers ──> StripNamespaceFinalizers ──> ForceDelete ──> ConfirmForced
//!                                                                     ok ──┤── fail
//!                                                            Done(Forced)     Done(Abandoned)
//! ```
//!
//! 중간 단계(finalizer 제거, 강제 삭제)의 실패는 무시하고 다음 단계로 진행합니다.

use std::fmt;

/// 회수 단계
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// 호출자 timeout으로 네임스페이스 삭제 요청
    Delete,
    /// 네임스페이스가 사라질 때까지 폴링
    ConfirmDeleted,
    /// 알려진 커스텀 리소스의 finalizer 제거 + 강제 삭제
    StripResourceFinalizers,
    /// 네임스페이스 객체의 finalizer 제거
    StripNamespaceFinalizers,
    /// 유예 시간 0으로 다시 삭제
    ForceDelete,
    /// 줄어든 예산으로 다시 폴링
    ConfirmForced,
    /// 종료
    Done(Outcome),
}

/// 회수 최종 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// 일반 삭제로 사라짐
    Graceful,
    /// 강제 단계 이후 사라짐
    Forced,
    /// 모든 단계 이후에도 남아 있음 (경고만 남김)
    Abandoned,
}

impl Outcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Graceful => "graceful",
            Self::Forced => "forced",
            Self::Abandoned => "abandoned",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 단계 하나의 실행 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Succeeded,
    Failed,
}

impl Stage {
    pub fn name(self) -> &'static str {
        match self {
            Self::Delete => "delete",
            Self::ConfirmDeleted => "confirm_deleted",
            Self::StripResourceFinalizers => "strip_resource_finalizers",
            Self::StripNamespaceFinalizers => "strip_namespace_finalizers",
            Self::ForceDelete => "force_delete",
            Self::ConfirmForced => "confirm_forced",
            Self::Done(_) => "done",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done(_))
    }
}

/// `(stage, outcome)`에서 다음 단계를 결정합니다.
pub fn next(stage: Stage, outcome: StepOutcome) -> Stage {
    use StepOutcome::{Failed, Succeeded};

    match (stage, outcome) {
        (Stage::Delete, Succeeded) => Stage::ConfirmDeleted,
        (Stage::Delete, Failed) => Stage::StripResourceFinalizers,
        (Stage::ConfirmDeleted, Succeeded) => Stage::Done(Outcome::Graceful),
        (Stage::ConfirmDeleted, Failed) => Stage::StripResourceFinalizers,
        (Stage::StripResourceFinalizers, _) => Stage::StripNamespaceFinalizers,
        (Stage::StripNamespaceFinalizers, _) => Stage::ForceDelete,
        (Stage::ForceDelete, _) => Stage::ConfirmForced,
        (Stage::ConfirmForced, Succeeded) => Stage::Done(Outcome::Forced),
        (Stage::ConfirmForced, Failed) => Stage::Done(Outcome::Abandoned),
        (done @ Stage::Done(_), _) => done,
    }
}
