//! 네임스페이스 회수 실행기
//!
//! [`NamespaceReclaimer`]는 [`crate::stage`]의 상태 머신을 따라 클러스터 호출을
//! 실행합니다. 각 단계의 실패는 경고 로그로만 남기고, 상태 머신이 종료 상태에
//! 도달하면 결과를 반환합니다. 네임스페이스가 끝까지 남아 있어도 에러가 아닙니다.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use kubetriage_core::cluster::{ClusterClient, DeleteOptions};
use kubetriage_core::config::TimeoutConfig;
use kubetriage_core::duration::parse_timeout;
use kubetriage_core::error::InputError;
use kubetriage_core::metrics as m;

use crate::error::ReclaimError;
use crate::stage::{Outcome, Stage, StepOutcome, next};

/// finalizer 목록을 비우는 merge patch
pub const CLEAR_FINALIZERS_PATCH: &str = r#"{"metadata":{"finalizers":[]}}"#;

/// finalizer를 가질 수 있는 커스텀 리소스 종류
pub const DEFAULT_FINALIZER_KINDS: [&str; 5] = [
    "vectorpipeline",
    "vectoraggregator",
    "vector",
    "clustervectorpipeline",
    "clustervectoraggregator",
];

const MAX_NAMESPACE_LEN: usize = 63;

/// 회수기 설정
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReclaimerConfig {
    /// 존재 여부 폴링 간격
    pub poll_interval: Duration,
    /// 강제 삭제 명령 타임아웃 (호출자 timeout과 무관)
    pub force_delete_timeout: Duration,
    /// 강제 삭제 이후 폴링 예산
    pub confirm_forced_timeout: Duration,
    /// finalizer를 제거할 리소스 종류
    pub finalizer_kinds: Vec<String>,
}

impl Default for ReclaimerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            force_delete_timeout: Duration::from_secs(10),
            confirm_forced_timeout: Duration::from_secs(30),
            finalizer_kinds: DEFAULT_FINALIZER_KINDS
                .iter()
                .map(|k| (*k).to_owned())
                .collect(),
        }
    }
}

impl ReclaimerConfig {
    /// 폴링 간격을 타임아웃 설정에서 가져옵니다.
    pub fn from_timeouts(timeouts: &TimeoutConfig) -> Self {
        Self {
            poll_interval: timeouts.default_poll_interval,
            ..Self::default()
        }
    }
}

/// 테스트 네임스페이스 회수기
///
/// # 사용 예시
/// ```ignore
/// let reclaimer = NamespaceReclaimer::new(Arc::new(KubectlClient::new()));
/// // 잘못된 인자만 에러. 클러스터 쪽 실패는 단계적으로 강제 삭제 후 성공으로 반환
/// let outcome = reclaimer.delete_namespace("test-pipeline-1", "2m0s").await?;
/// ```
pub struct NamespaceReclaimer<C: ClusterClient> {
    cluster: Arc<C>,
    config: ReclaimerConfig,
}

impl<C: ClusterClient> NamespaceReclaimer<C> {
    pub fn new(cluster: Arc<C>) -> Self {
        Self::with_config(cluster, ReclaimerConfig::default())
    }

    pub fn with_config(cluster: Arc<C>, config: ReclaimerConfig) -> Self {
        Self { cluster, config }
    }

    pub fn config(&self) -> &ReclaimerConfig {
        &self.config
    }

    /// timeout 문자열(`"2m0s"`, `"1h30m"`)을 받아 네임스페이스를 회수합니다.
    ///
    /// timeout 문자열이나 네임스페이스 이름이 잘못되면 즉시 에러를 반환합니다.
    pub async fn delete_namespace(
        &self,
        namespace: &str,
        timeout: &str,
    ) -> Result<Outcome, ReclaimError> {
        let timeout = parse_timeout(timeout)?;
        self.reclaim(namespace, timeout).await
    }

    /// 네임스페이스를 회수합니다.
    ///
    /// 호출자는 최대 `timeout + force_delete_timeout + confirm_forced_timeout`
    /// 정도만 기다립니다.
    pub async fn reclaim(&self, namespace: &str, timeout: Duration) -> Result<Outcome, ReclaimError> {
        validate_namespace(namespace)?;

        let started = Instant::now();
        let mut stage = Stage::Delete;
        let outcome = loop {
            if let Stage::Done(outcome) = stage {
                break outcome;
            }
            debug!(namespace, stage = stage.name(), "reclaim stage");
            let result = self.execute(stage, namespace, timeout).await;
            stage = next(stage, result);
        };

        let elapsed = started.elapsed();
        metrics::counter!(m::RECLAIM_OUTCOMES_TOTAL, m::LABEL_OUTCOME => outcome.as_str())
            .increment(1);
        metrics::histogram!(m::RECLAIM_DURATION_SECONDS).record(elapsed.as_secs_f64());

        match outcome {
            Outcome::Graceful => {
                debug!(namespace, elapsed_ms = millis(elapsed), "namespace deleted");
            }
            Outcome::Forced => {
                info!(namespace, elapsed_ms = millis(elapsed), "namespace deleted after escalation");
            }
            Outcome::Abandoned => {
                warn!(
                    namespace,
                    elapsed_ms = millis(elapsed),
                    "namespace still present after escalation, continuing"
                );
            }
        }
        Ok(outcome)
    }

    async fn execute(&self, stage: Stage, namespace: &str, timeout: Duration) -> StepOutcome {
        match stage {
            Stage::Delete => {
                self.delete_namespace_object(namespace, &DeleteOptions::graceful(timeout))
                    .await
            }
            Stage::ConfirmDeleted => self.wait_until_gone(namespace, timeout).await,
            Stage::StripResourceFinalizers => self.strip_resource_finalizers(namespace).await,
            Stage::StripNamespaceFinalizers => {
                match self
                    .cluster
                    .patch_merge("namespace", namespace, None, CLEAR_FINALIZERS_PATCH)
                    .await
                {
                    Ok(()) => StepOutcome::Succeeded,
                    Err(e) => {
                        warn!(namespace, error = %e, "failed to clear namespace finalizers");
                        StepOutcome::Failed
                    }
                }
            }
            Stage::ForceDelete => {
                self.delete_namespace_object(
                    namespace,
                    &DeleteOptions::forced(self.config.force_delete_timeout),
                )
                .await
            }
            Stage::ConfirmForced => {
                self.wait_until_gone(namespace, self.config.confirm_forced_timeout)
                    .await
            }
            Stage::Done(_) => StepOutcome::Succeeded,
        }
    }

    async fn delete_namespace_object(&self, namespace: &str, options: &DeleteOptions) -> StepOutcome {
        match self
            .cluster
            .delete("namespace", namespace, None, options)
            .await
        {
            Ok(()) => StepOutcome::Succeeded,
            Err(e) => {
                warn!(
                    namespace,
                    force = options.force,
                    error = %e,
                    "namespace delete failed"
                );
                StepOutcome::Failed
            }
        }
    }

    /// 네임스페이스가 사라질 때까지 `budget` 동안 폴링합니다.
    async fn wait_until_gone(&self, namespace: &str, budget: Duration) -> StepOutcome {
        let deadline = Instant::now() + budget;
        loop {
            match self.cluster.namespace_exists(namespace).await {
                Ok(false) => return StepOutcome::Succeeded,
                Ok(true) => {}
                Err(e) => debug!(namespace, error = %e, "namespace existence check failed"),
            }

            let now = Instant::now();
            if now >= deadline {
                debug!(namespace, budget_ms = millis(budget), "namespace still present");
                return StepOutcome::Failed;
            }
            tokio::time::sleep(self.config.poll_interval.min(deadline - now)).await;
        }
    }

    /// 알려진 종류의 모든 인스턴스에서 finalizer를 제거하고 강제 삭제합니다.
    ///
    /// 실패는 기록만 하고 다음 인스턴스로 진행합니다.
    async fn strip_resource_finalizers(&self, namespace: &str) -> StepOutcome {
        let mut outcome = StepOutcome::Succeeded;
        let forced = DeleteOptions::forced(self.config.force_delete_timeout);

        for kind in &self.config.finalizer_kinds {
            let names = match self.cluster.list_names(kind, Some(namespace), None).await {
                Ok(names) => names,
                Err(e) if e.is_not_found() => {
                    debug!(namespace, kind = %kind, "resource kind not installed");
                    continue;
                }
                Err(e) => {
                    warn!(namespace, kind = %kind, error = %e, "failed to list resources");
                    outcome = StepOutcome::Failed;
                    continue;
                }
            };

            for name in &names {
                if let Err(e) = self
                    .cluster
                    .patch_merge(kind, name, Some(namespace), CLEAR_FINALIZERS_PATCH)
                    .await
                {
                    warn!(namespace, kind = %kind, name = %name, error = %e, "failed to clear finalizers");
                    outcome = StepOutcome::Failed;
                }
                if let Err(e) = self
                    .cluster
                    .delete(kind, name, Some(namespace), &forced)
                    .await
                {
                    warn!(namespace, kind = %kind, name = %name, error = %e, "failed to force delete resource");
                    outcome = StepOutcome::Failed;
                }
            }
        }
        outcome
    }
}

/// 네임스페이스 이름을 검증합니다 (RFC 1123 DNS label).
fn validate_namespace(namespace: &str) -> Result<(), InputError> {
    let invalid = |reason: &str| InputError::InvalidNamespace {
        value: namespace.to_owned(),
        reason: reason.to_owned(),
    };

    if namespace.is_empty() || namespace.len() > MAX_NAMESPACE_LEN {
        return Err(invalid("must be 1-63 characters"));
    }
    if !namespace
        .bytes()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
    {
        return Err(invalid("only lowercase letters, digits and '-' are allowed"));
    }
    if namespace.starts_with('-') || namespace.ends_with('-') {
        return Err(invalid("must start and end with an alphanumeric character"));
    }
    Ok(())
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
