//! 테스트별 진단 아티팩트 수집기
//!
//! [`Collector`]는 테스트 하나가 끝날 때마다 고정된 우선순위로 수집 단계를 실행합니다.
//!
//! # 수집 단계
//! ```text
//! 1. pods               파드 상태 + 로그          (P0)
//! 2. controller_logs    컨트롤러 로그 (시작 1분 전부터)  (P0)
//! 3. controller_health  describe, 경고 이벤트, 프로파일
//! 4. status_dumps       커스텀 리소스 상태
//! 5. namespace_events   네임스페이스 이벤트         (P0)
//! 6. workload_metadata  표준 워크로드 YAML
//! ```
//!
//! 단계 하나의 실패는 경고 로그로만 남고 다음 단계는 계속 실행됩니다.
//! 전체 수집은 `collection_timeout`으로 제한되며, 시간이 다 되면 진행 중인
//! 단계만 버리고 이미 기록된 아티팩트는 유지합니다. 메타데이터는 항상 기록됩니다.
//!
//! 한 프로세스 안에서는 직렬로만 호출해야 합니다 (`&mut self`).

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use kubetriage_core::cluster::{
    ClusterClient, EventFilter, LogOptions, OutputFormat, ProfileKind, ProfileTarget,
};
use kubetriage_core::config::ArtifactConfig;
use kubetriage_core::error::ClusterError;
use kubetriage_core::metrics as m;

use crate::context::TestContext;
use crate::error::ArtifactError;
use crate::metadata::{
    ArtifactInventory, ArtifactKind, MetadataWriter, RunAnnotations, RunRecord, TestRecord,
};
use crate::naming::short_test_name;
use crate::storage::Storage;
use crate::truncate::truncate_log_lines;

/// 컨트롤러 로그를 테스트 시작보다 앞서 가져오는 구간
const CONTROLLER_LOG_LOOKBACK: chrono::Duration = chrono::Duration::minutes(1);

/// 컨트롤러 경고 이벤트를 테스트 시작보다 앞서 가져오는 구간
const WARNING_EVENT_LOOKBACK: chrono::Duration = chrono::Duration::minutes(2);

/// 수집기 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectorState {
    /// 대기 중
    Idle,
    /// 테스트 아티팩트 수집 중
    Collecting,
    /// 마지막 테스트의 메타데이터 기록 완료
    MetadataWritten,
}

impl CollectorState {
    pub fn state_name(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Collecting => "collecting",
            Self::MetadataWritten => "metadata_written",
        }
    }
}

/// 수집 단계
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Pods,
    ControllerLogs,
    ControllerHealth,
    StatusDumps,
    NamespaceEvents,
    WorkloadMetadata,
}

impl Step {
    const ALL: [Step; 6] = [
        Step::Pods,
        Step::ControllerLogs,
        Step::ControllerHealth,
        Step::StatusDumps,
        Step::NamespaceEvents,
        Step::WorkloadMetadata,
    ];

    fn name(self) -> &'static str {
        match self {
            Self::Pods => "pods",
            Self::ControllerLogs => "controller_logs",
            Self::ControllerHealth => "controller_health",
            Self::StatusDumps => "status_dumps",
            Self::NamespaceEvents => "namespace_events",
            Self::WorkloadMetadata => "workload_metadata",
        }
    }

    /// minimal 모드에서도 실행하는 P0 단계인지
    fn is_p0(self) -> bool {
        matches!(
            self,
            Self::Pods | Self::ControllerLogs | Self::NamespaceEvents
        )
    }
}

/// `initialize` 이후 실행 단위로 유지되는 상태
struct ActiveRun {
    storage: Arc<Storage>,
    writer: MetadataWriter,
    record: RunRecord,
    /// 컨트롤러 파드 시작 시각 (초기화 시 한 번 조회)
    controller_started: Option<DateTime<Utc>>,
}

/// 테스트별 아티팩트 수집기
///
/// # 사용 예시
/// ```ignore
/// let mut collector = Collector::new(ArtifactConfig::from_env(), Arc::new(KubectlClient::new()));
/// collector.initialize("20250101-120000").await?;
///
/// let ctx = TestContext::new("Pipeline should deliver logs", "test-pipeline-1").failed("timeout");
/// collector.collect_for_test(&ctx).await?;
///
/// collector.close()?;
/// ```
pub struct Collector<C: ClusterClient> {
    config: ArtifactConfig,
    cluster: Arc<C>,
    state: CollectorState,
    run: Option<ActiveRun>,
    annotations: RunAnnotations,
    /// 디렉토리 이름 카운터 (프로세스 단위)
    dir_counter: u32,
    /// 누적 수집 시간
    collection_time: Duration,
}

impl<C: ClusterClient> Collector<C> {
    /// 새 수집기를 만듭니다. 실행 주석은 프로세스 환경변수에서 읽습니다.
    pub fn new(config: ArtifactConfig, cluster: Arc<C>) -> Self {
        Self {
            config,
            cluster,
            state: CollectorState::Idle,
            run: None,
            annotations: RunAnnotations::from_env(),
            dir_counter: 0,
            collection_time: Duration::ZERO,
        }
    }

    /// 실행 요약에 기록할 git/설명 정보를 지정합니다.
    pub fn with_annotations(mut self, annotations: RunAnnotations) -> Self {
        self.annotations = annotations;
        self
    }

    pub fn config(&self) -> &ArtifactConfig {
        &self.config
    }

    pub fn state(&self) -> CollectorState {
        self.state
    }

    pub fn is_initialized(&self) -> bool {
        self.run.is_some()
    }

    /// 실행 디렉토리의 저장소 (초기화 전이면 없음)
    pub fn storage(&self) -> Option<&Arc<Storage>> {
        self.run.as_ref().map(|run| &run.storage)
    }

    /// 실행 디렉토리를 만들고 메타데이터 기록기를 준비합니다.
    ///
    /// 수집이 비활성화되어 있으면 아무것도 하지 않습니다.
    /// 프로세스당 한 번 호출하며, 두 번째 호출은 무시됩니다.
    pub async fn initialize(&mut self, run_id: &str) -> Result<(), ArtifactError> {
        if !self.config.enabled {
            debug!("artifact collection disabled");
            return Ok(());
        }
        if self.run.is_some() {
            warn!(run_id, "collector already initialized, ignoring");
            return Ok(());
        }
        if run_id.trim().is_empty() {
            return Err(ArtifactError::MissingInput("run id".to_owned()));
        }

        let storage = Arc::new(Storage::new(
            &self.config.base_dir,
            run_id,
            self.config.max_resource_size,
        )?);
        let controller_started = self.controller_start_time().await;
        let record = RunRecord::start(run_id, storage.run_dir(), self.annotations.clone());

        info!(
            run_id,
            run_dir = %storage.run_dir().display(),
            on_failure_only = self.config.collect_on_failure_only,
            minimal_only = self.config.collect_minimal_only,
            "artifact collection initialized"
        );

        self.run = Some(ActiveRun {
            writer: MetadataWriter::new(Arc::clone(&storage)),
            storage,
            record,
            controller_started,
        });
        Ok(())
    }

    /// 컨트롤러 파드의 `.status.startTime`을 읽습니다. 실패하면 `None`.
    async fn controller_start_time(&self) -> Option<DateTime<Utc>> {
        let target = &self.config.controller;
        let pod = match find_controller_pod(self.cluster.as_ref(), &self.config).await {
            Ok(pod) => pod,
            Err(e) => {
                debug!(error = %e, "controller pod not found, age unknown");
                return None;
            }
        };
        let raw = match self
            .cluster
            .get_field("pod", &pod, Some(&target.namespace), ".status.startTime")
            .await
        {
            Ok(raw) => raw,
            Err(e) => {
                debug!(pod = %pod, error = %e, "failed to read controller start time");
                return None;
            }
        };
        match DateTime::parse_from_rfc3339(raw.trim().trim_matches('"')) {
            Ok(ts) => Some(ts.with_timezone(&Utc)),
            Err(e) => {
                debug!(value = %raw, error = %e, "unparsable controller start time");
                None
            }
        }
    }

    /// 테스트 하나의 아티팩트를 수집합니다.
    ///
    /// 기록한 테스트 디렉토리 이름을 반환합니다. 수집이 비활성화되었거나
    /// 통과한 테스트를 건너뛰면 `None`을 반환합니다.
    ///
    /// 개별 단계 실패는 에러로 전파되지 않습니다. 에러는 테스트 디렉토리
    /// 생성 실패 또는 메타데이터 기록 실패일 때만 반환됩니다.
    pub async fn collect_for_test(
        &mut self,
        ctx: &TestContext,
    ) -> Result<Option<String>, ArtifactError> {
        if !self.config.enabled {
            return Ok(None);
        }
        let Some(run) = self.run.as_mut() else {
            return Err(ArtifactError::NotInitialized);
        };

        run.record.count_test(ctx.is_failed());
        let sequence = run.record.total_tests;

        if !ctx.is_failed() && self.config.collect_on_failure_only {
            debug!(test = ctx.name(), "test passed, skipping artifact collection");
            return Ok(None);
        }

        self.dir_counter = self.dir_counter.saturating_add(1);
        let test_dir = run
            .storage
            .create_test_dir(&short_test_name(ctx.name(), self.dir_counter))?;

        self.state = CollectorState::Collecting;
        info!(
            test = ctx.name(),
            namespace = ctx.namespace(),
            test_dir = %test_dir,
            "collecting artifacts"
        );

        let started = Instant::now();
        let mut inventory = ArtifactInventory::default();
        {
            let mut capture = Capture {
                cluster: self.cluster.as_ref(),
                storage: run.storage.as_ref(),
                config: &self.config,
                ctx,
                test_dir: &test_dir,
                controller_pod: None,
                inventory: &mut inventory,
            };
            tokio::select! {
                biased;
                () = ctx.cancellation().cancelled() => {
                    warn!(test_dir = %test_dir, "artifact collection cancelled, keeping partial results");
                }
                result = tokio::time::timeout(self.config.collection_timeout, capture.run_all()) => {
                    if result.is_err() {
                        warn!(
                            test_dir = %test_dir,
                            timeout_ms = u64::try_from(self.config.collection_timeout.as_millis()).unwrap_or(u64::MAX),
                            "artifact collection timed out, keeping partial results"
                        );
                        metrics::counter!(m::ARTIFACTS_COLLECTION_TIMEOUTS_TOTAL).increment(1);
                    }
                }
            }
        }

        let elapsed = started.elapsed();
        inventory.finish(elapsed);
        self.collection_time += elapsed;
        metrics::histogram!(m::ARTIFACTS_COLLECTION_DURATION_SECONDS).record(elapsed.as_secs_f64());

        let end_time = ctx.end_time();
        let record = TestRecord {
            name: ctx.name().to_owned(),
            namespace: ctx.namespace().to_owned(),
            start_time: ctx.start_time(),
            end_time,
            duration_ms: u64::try_from(ctx.duration().as_millis()).unwrap_or(u64::MAX),
            failed: ctx.is_failed(),
            failure_message: ctx.failure_message().unwrap_or_default().to_owned(),
            labels: ctx.labels().to_vec(),
            test_sequence_number: sequence,
            operator_age_seconds: run.controller_started.and_then(|started| {
                u64::try_from((end_time - started).num_seconds()).ok()
            }),
            artifacts: inventory,
        };

        let written = run.writer.write_test_record(&test_dir, &record);
        self.state = CollectorState::MetadataWritten;
        written?;

        info!(
            test_dir = %test_dir,
            files = record.artifacts.file_count(),
            bytes = record.artifacts.total_size_bytes,
            elapsed = %record.artifacts.collection_time,
            "artifacts collected"
        );
        Ok(Some(test_dir))
    }

    /// 실행 요약을 기록하고 실행을 닫습니다.
    ///
    /// 초기화되지 않았거나 이미 닫혔으면 `None`을 반환합니다.
    pub fn close(&mut self) -> Result<Option<RunRecord>, ArtifactError> {
        let Some(mut run) = self.run.take() else {
            return Ok(None);
        };
        self.state = CollectorState::Idle;

        run.record.finalize(&self.config, self.collection_time);
        run.writer.write_run_record(&run.record)?;

        info!(
            run_id = %run.record.run_id,
            total = run.record.total_tests,
            failed = run.record.failed_tests,
            passed = run.record.passed_tests,
            "run summary written"
        );
        Ok(Some(run.record))
    }
}

async fn find_controller_pod<C: ClusterClient>(
    cluster: &C,
    config: &ArtifactConfig,
) -> Result<String, ClusterError> {
    let target = &config.controller;
    cluster
        .list_names("pod", Some(&target.namespace), Some(&target.pod_selector))
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| {
            ClusterError::NotFound(format!(
                "no pod matches '{}' in {}",
                target.pod_selector, target.namespace
            ))
        })
}

/// 테스트 하나의 수집 진행 상태
///
/// `inventory`를 빌려 쓰므로 타임아웃으로 중단되어도 그때까지의 기록이 남습니다.
struct Capture<'a, C: ClusterClient> {
    cluster: &'a C,
    storage: &'a Storage,
    config: &'a ArtifactConfig,
    ctx: &'a TestContext,
    test_dir: &'a str,
    controller_pod: Option<String>,
    inventory: &'a mut ArtifactInventory,
}

impl<C: ClusterClient> Capture<'_, C> {
    async fn run_all(&mut self) {
        for step in Step::ALL {
            if self.config.collect_minimal_only && !step.is_p0() {
                continue;
            }
            if let Err(e) = self.run_step(step).await {
                warn!(
                    step = step.name(),
                    test_dir = self.test_dir,
                    error = %e,
                    "artifact step failed"
                );
                metrics::counter!(m::ARTIFACTS_STEP_FAILURES_TOTAL, m::LABEL_STEP => step.name())
                    .increment(1);
            }
        }
    }

    async fn run_step(&mut self, step: Step) -> Result<(), ArtifactError> {
        match step {
            Step::Pods => self.pods().await,
            Step::ControllerLogs => self.controller_logs().await,
            Step::ControllerHealth => self.controller_health().await,
            Step::StatusDumps => self.status_dumps().await,
            Step::NamespaceEvents => self.namespace_events().await,
            Step::WorkloadMetadata => self.workload_metadata().await,
        }
    }

    fn namespace(&self) -> Result<&'_ str, ArtifactError> {
        let ns = self.ctx.namespace();
        if ns.is_empty() {
            return Err(ArtifactError::MissingInput("test namespace".to_owned()));
        }
        Ok(ns)
    }

    fn tail_lines(&self) -> Option<u64> {
        u64::try_from(self.config.max_log_lines)
            .ok()
            .filter(|n| *n > 0)
    }

    async fn controller_pod(&mut self) -> Result<String, ArtifactError> {
        if let Some(pod) = &self.controller_pod {
            return Ok(pod.clone());
        }
        let pod = find_controller_pod(self.cluster, self.config).await?;
        self.controller_pod = Some(pod.clone());
        Ok(pod)
    }

    /// 바이트 예산 안에서 아티팩트 하나를 기록합니다.
    fn save(
        &mut self,
        category: &str,
        filename: &str,
        content: &[u8],
        kind: ArtifactKind,
    ) -> Result<(), ArtifactError> {
        let projected = self.storage.bounded_len(content.len());
        if self.inventory.total_size_bytes.saturating_add(projected) > self.config.max_total_size {
            warn!(
                test_dir = self.test_dir,
                file = %format!("{category}/{filename}"),
                bytes = projected,
                budget = self.config.max_total_size,
                "per-test artifact budget exhausted, skipping"
            );
            metrics::counter!(m::ARTIFACTS_SKIPPED_TOTAL).increment(1);
            return Ok(());
        }

        let written = self
            .storage
            .write_file(self.test_dir, category, filename, content)?;
        self.inventory
            .record(kind, format!("{category}/{filename}"), written);
        metrics::counter!(m::ARTIFACTS_WRITTEN_TOTAL).increment(1);
        metrics::counter!(m::ARTIFACTS_BYTES_WRITTEN_TOTAL).increment(written);
        Ok(())
    }

    /// 1. 파드 상태 + 로그
    ///
    /// 파드 하나의 기록 실패는 나머지 파드를 막지 않으며 첫 번째 에러만 보고합니다.
    async fn pods(&mut self) -> Result<(), ArtifactError> {
        let ctx = self.ctx;
        let cluster = self.cluster;
        let ns = self.namespace()?.to_owned();

        let pods = cluster.list_names("pod", Some(&ns), None).await?;
        self.inventory.pod_count = pods.len();

        let options = LogOptions {
            tail_lines: self.tail_lines(),
            since_time: None,
            all_containers: true,
        };
        let mut first_err: Option<ArtifactError> = None;
        for pod in &pods {
            match cluster.get_field("pod", pod, Some(&ns), ".status").await {
                Ok(status) => {
                    let result = self.save(
                        "pods",
                        &format!("{pod}-status.json"),
                        status.as_bytes(),
                        ArtifactKind::Resource,
                    );
                    keep_first(&mut first_err, result);
                }
                Err(e) => debug!(pod = %pod, error = %e, "pod status unavailable"),
            }

            match cluster.logs(&ns, pod, &options).await {
                Ok(logs) => {
                    let logs = truncate_log_lines(&logs, self.config.max_log_lines);
                    let result =
                        self.save("logs", &format!("{pod}.log"), logs.as_bytes(), ArtifactKind::Log);
                    keep_first(&mut first_err, result);
                }
                Err(e) => debug!(pod = %pod, test = ctx.name(), error = %e, "pod logs unavailable"),
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    /// 2. 컨트롤러 로그 (테스트 시작 1분 전부터)
    async fn controller_logs(&mut self) -> Result<(), ArtifactError> {
        let pod = self.controller_pod().await?;
        let options = LogOptions {
            tail_lines: self.tail_lines(),
            since_time: Some(self.ctx.start_time() - CONTROLLER_LOG_LOOKBACK),
            all_containers: true,
        };
        let logs = self
            .cluster
            .logs(&self.config.controller.namespace, &pod, &options)
            .await?;
        let logs = truncate_log_lines(&logs, self.config.max_log_lines);
        self.save(
            "logs",
            "operator-controller.log",
            logs.as_bytes(),
            ArtifactKind::Log,
        )
    }

    /// 3. 컨트롤러 상태: describe, 경고 이벤트, 프로파일
    ///
    /// 하위 항목은 서로 독립적이며 첫 번째 에러만 보고합니다.
    async fn controller_health(&mut self) -> Result<(), ArtifactError> {
        let pod = self.controller_pod().await?;
        let cluster = self.cluster;
        let config = self.config;
        let target = &config.controller;
        let ns = target.namespace.as_str();
        let mut first_err: Option<ArtifactError> = None;

        let result = match cluster.describe("pod", &pod, Some(ns)).await {
            Ok(text) => self.save(
                "operator",
                "pod-describe.txt",
                text.as_bytes(),
                ArtifactKind::Resource,
            ),
            Err(e) => Err(e.into()),
        };
        keep_first(&mut first_err, result);

        let filter = EventFilter {
            warnings_only: true,
            since: Some(self.ctx.start_time() - WARNING_EVENT_LOOKBACK),
        };
        let result = match cluster.events(ns, &filter).await {
            Ok(text) if has_events(&text) => self.save(
                "operator",
                "warning-events.txt",
                text.as_bytes(),
                ArtifactKind::Event,
            ),
            Ok(_) => Ok(()),
            Err(e) => Err(e.into()),
        };
        keep_first(&mut first_err, result);

        let result = match cluster
            .describe("deployment", &target.deployment, Some(ns))
            .await
        {
            Ok(text) => self.save(
                "operator",
                "deployment-describe.txt",
                text.as_bytes(),
                ArtifactKind::Resource,
            ),
            Err(e) => Err(e.into()),
        };
        keep_first(&mut first_err, result);

        if config.profiling_enabled {
            let profile_target = ProfileTarget {
                namespace: target.namespace.clone(),
                pod: pod.clone(),
                remote_port: target.profiling_port,
                local_port: target.local_profiling_port,
            };
            match cluster
                .capture_profiles(&profile_target, &ProfileKind::ALL)
                .await
            {
                Ok(snapshots) => {
                    for snapshot in snapshots {
                        let result = self.save(
                            "operator",
                            &format!("pprof-{}.txt", snapshot.kind),
                            snapshot.content.as_bytes(),
                            ArtifactKind::Resource,
                        );
                        keep_first(&mut first_err, result);
                    }
                }
                Err(e) => keep_first(&mut first_err, Err(e.into())),
            }
        }

        first_err.map_or(Ok(()), Err)
    }

    /// 4. 커스텀 리소스 상태
    ///
    /// 종류별, 인스턴스별로 독립적이며 첫 번째 에러만 보고합니다.
    async fn status_dumps(&mut self) -> Result<(), ArtifactError> {
        let cluster = self.cluster;
        let config = self.config;
        let ns = self.namespace()?.to_owned();
        let mut first_err: Option<ArtifactError> = None;

        for kind in &config.status_kinds {
            let names = match cluster.list_names(kind, Some(&ns), None).await {
                Ok(names) => names,
                Err(e) if e.is_not_found() => {
                    debug!(kind = %kind, error = %e, "resource kind not available");
                    continue;
                }
                Err(e) => {
                    keep_first(&mut first_err, Err(e.into()));
                    continue;
                }
            };
            for name in &names {
                let result = match cluster.get_field(kind, name, Some(&ns), ".status").await {
                    Ok(status) => self.save(
                        "resources",
                        &format!("{kind}-{name}-status.json"),
                        status.as_bytes(),
                        ArtifactKind::Resource,
                    ),
                    Err(e) if e.is_not_found() => {
                        debug!(kind = %kind, name = %name, "resource has no status yet");
                        Ok(())
                    }
                    Err(e) => Err(e.into()),
                };
                keep_first(&mut first_err, result);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    /// 5. 네임스페이스 이벤트
    async fn namespace_events(&mut self) -> Result<(), ArtifactError> {
        let ns = self.namespace()?.to_owned();
        let text = self.cluster.events(&ns, &EventFilter::default()).await?;
        self.save(
            "events",
            "namespace-events.txt",
            text.as_bytes(),
            ArtifactKind::Event,
        )
    }

    /// 6. 표준 워크로드 메타데이터
    ///
    /// 종류별, 인스턴스별로 독립적이며 첫 번째 에러만 보고합니다.
    async fn workload_metadata(&mut self) -> Result<(), ArtifactError> {
        let cluster = self.cluster;
        let config = self.config;
        let ns = self.namespace()?.to_owned();
        let mut first_err: Option<ArtifactError> = None;

        for kind in &config.workload_kinds {
            let names = match cluster.list_names(kind, Some(&ns), None).await {
                Ok(names) => names,
                Err(e) => {
                    keep_first(&mut first_err, Err(e.into()));
                    continue;
                }
            };
            for name in &names {
                let result = match cluster.get(kind, name, Some(&ns), OutputFormat::Yaml).await {
                    Ok(yaml) => self.save(
                        "resources",
                        &format!("{kind}-{name}.yaml"),
                        yaml.as_bytes(),
                        ArtifactKind::Resource,
                    ),
                    Err(e) => Err(e.into()),
                };
                keep_first(&mut first_err, result);
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}

fn keep_first(slot: &mut Option<ArtifactError>, result: Result<(), ArtifactError>) {
    if let Err(e) = result {
        debug!(error = %e, "artifact item failed, continuing");
        slot.get_or_insert(e);
    }
}

/// 이벤트 출력에 실제 항목이 있는지
fn has_events(text: &str) -> bool {
    let trimmed = text.trim();
    !trimmed.is_empty() && !trimmed.starts_with("No resources found")
}
