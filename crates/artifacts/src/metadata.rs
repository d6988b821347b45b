//! 실행/테스트 메타데이터 레코드
//!
//! - [`TestRecord`]: 테스트 디렉토리의 `metadata.json`
//! - [`RunRecord`]: 실행 디렉토리의 `metadata.json`
//! - [`ArtifactInventory`]: 수집 중에 채워지고 기록 시점에 고정되는 목록
//!
//! 모든 아티팩트 경로는 소유 테스트 디렉토리 기준 상대 경로입니다.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use kubetriage_core::config::{
    ArtifactConfig, ENV_ENABLED, ENV_MAX_LOG_LINES, ENV_MINIMAL_ONLY, ENV_ON_FAILURE_ONLY,
};
use kubetriage_core::duration::format_duration;
use kubetriage_core::error::StorageError;

use crate::error::ArtifactError;
use crate::storage::Storage;

/// 메타데이터 파일 이름
pub const METADATA_FILE: &str = "metadata.json";

/// 실행 요약 환경 스냅샷의 총 수집 시간 키
pub const ENV_COLLECTION_TIME: &str = "E2E_ARTIFACTS_COLLECTION_TIME";

pub const ENV_RUN_DESCRIPTION: &str = "E2E_RUN_DESCRIPTION";
pub const ENV_GIT_COMMIT: &str = "E2E_GIT_COMMIT";
pub const ENV_GIT_BRANCH: &str = "E2E_GIT_BRANCH";
pub const ENV_GIT_DIRTY: &str = "E2E_GIT_DIRTY";

/// 아티팩트 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// 파드/컨트롤러 로그, 프로파일 스냅샷
    Log,
    /// 상태 JSON, 리소스 YAML, describe 출력
    Resource,
    /// 이벤트 목록
    Event,
}

/// 테스트 하나에서 기록된 아티팩트 목록
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactInventory {
    pub pod_count: usize,
    pub log_files: Vec<String>,
    pub resource_files: Vec<String>,
    pub event_files: Vec<String>,
    pub total_size_bytes: u64,
    /// 수집 소요 시간 (`"1.5s"` 형식)
    pub collection_time: String,
}

impl ArtifactInventory {
    /// 기록된 아티팩트 하나를 추가합니다.
    pub fn record(&mut self, kind: ArtifactKind, relative_path: String, bytes: u64) {
        match kind {
            ArtifactKind::Log => self.log_files.push(relative_path),
            ArtifactKind::Resource => self.resource_files.push(relative_path),
            ArtifactKind::Event => self.event_files.push(relative_path),
        }
        self.total_size_bytes = self.total_size_bytes.saturating_add(bytes);
    }

    /// 기록된 파일 수
    pub fn file_count(&self) -> usize {
        self.log_files.len() + self.resource_files.len() + self.event_files.len()
    }

    /// 수집 소요 시간을 고정합니다.
    pub fn finish(&mut self, elapsed: Duration) {
        self.collection_time = format_duration(elapsed);
    }
}

/// 테스트 하나의 메타데이터
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestRecord {
    pub name: String,
    pub namespace: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_ms: u64,
    pub failed: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub failure_message: String,
    #[serde(default)]
    pub labels: Vec<String>,
    /// 이 프로세스에서 몇 번째 테스트인지 (1부터)
    pub test_sequence_number: u32,
    /// 테스트 시점의 컨트롤러 파드 나이 (초)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator_age_seconds: Option<u64>,
    pub artifacts: ArtifactInventory,
}

/// 실행 전체 요약
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub total_tests: u32,
    pub failed_tests: u32,
    pub passed_tests: u32,
    /// 실행 시점의 유효 설정 스냅샷
    pub environment: BTreeMap<String, String>,
    pub artifacts_dir: PathBuf,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub git_commit: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub git_branch: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub git_dirty: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

impl RunRecord {
    /// 실행 시작 시점의 레코드를 만듭니다.
    pub fn start(run_id: &str, artifacts_dir: &Path, annotations: RunAnnotations) -> Self {
        let now = Utc::now();
        Self {
            run_id: run_id.to_owned(),
            start_time: now,
            end_time: now,
            total_tests: 0,
            failed_tests: 0,
            passed_tests: 0,
            environment: BTreeMap::new(),
            artifacts_dir: artifacts_dir.to_path_buf(),
            git_commit: annotations.git_commit,
            git_branch: annotations.git_branch,
            git_dirty: annotations.git_dirty,
            description: annotations.description,
        }
    }

    /// 테스트 하나를 집계합니다.
    pub fn count_test(&mut self, failed: bool) {
        self.total_tests = self.total_tests.saturating_add(1);
        if failed {
            self.failed_tests = self.failed_tests.saturating_add(1);
        }
    }

    /// 종료 시각, 통과 수, 환경 스냅샷을 확정합니다.
    ///
    /// `failed_tests <= total_tests`는 항상 유지됩니다.
    pub fn finalize(&mut self, config: &ArtifactConfig, collection_time: Duration) {
        self.end_time = Utc::now();
        self.failed_tests = self.failed_tests.min(self.total_tests);
        self.passed_tests = self.total_tests.saturating_sub(self.failed_tests);

        self.environment = BTreeMap::from([
            (ENV_ENABLED.to_owned(), config.enabled.to_string()),
            (
                ENV_ON_FAILURE_ONLY.to_owned(),
                config.collect_on_failure_only.to_string(),
            ),
            (
                ENV_MINIMAL_ONLY.to_owned(),
                config.collect_minimal_only.to_string(),
            ),
            (ENV_MAX_LOG_LINES.to_owned(), config.max_log_lines.to_string()),
            (
                ENV_COLLECTION_TIME.to_owned(),
                format_duration(collection_time),
            ),
        ]);
    }
}

/// 실행 요약에 붙는 버전 관리/설명 정보
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunAnnotations {
    pub git_commit: String,
    pub git_branch: String,
    pub git_dirty: bool,
    pub description: String,
}

impl RunAnnotations {
    /// 프로세스 환경변수에서 읽습니다.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 임의의 조회 함수에서 읽습니다. `E2E_GIT_DIRTY`는 `true`/`1`만 참입니다.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let text = |key: &str| lookup(key).unwrap_or_default().trim().to_owned();
        let dirty = text(ENV_GIT_DIRTY);
        Self {
            git_commit: text(ENV_GIT_COMMIT),
            git_branch: text(ENV_GIT_BRANCH),
            git_dirty: dirty.eq_ignore_ascii_case("true") || dirty == "1",
            description: text(ENV_RUN_DESCRIPTION),
        }
    }
}

/// 레코드를 저장소에 기록합니다.
#[derive(Debug, Clone)]
pub struct MetadataWriter {
    storage: Arc<Storage>,
}

impl MetadataWriter {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }

    /// `<test_dir>/metadata.json`을 기록합니다.
    pub fn write_test_record(&self, test_dir: &str, record: &TestRecord) -> Result<(), ArtifactError> {
        let json = to_pretty_json(record, "test record")?;
        self.storage
            .write_test_file_unbounded(test_dir, METADATA_FILE, json.as_bytes())?;
        debug!(test_dir, files = record.artifacts.file_count(), "test metadata written");
        Ok(())
    }

    /// 실행 디렉토리의 `metadata.json`을 기록합니다.
    pub fn write_run_record(&self, record: &RunRecord) -> Result<(), ArtifactError> {
        let json = to_pretty_json(record, "run record")?;
        self.storage
            .write_file_in_run_dir(METADATA_FILE, json.as_bytes())?;
        debug!(
            run_id = %record.run_id,
            total = record.total_tests,
            failed = record.failed_tests,
            "run metadata written"
        );
        Ok(())
    }
}

fn to_pretty_json<T: Serialize>(value: &T, what: &str) -> Result<String, ArtifactError> {
    serde_json::to_string_pretty(value).map_err(|e| {
        ArtifactError::from(StorageError::Serialize {
            what: what.to_owned(),
            reason: e.to_string(),
        })
    })
}

/// 기록된 실행 디렉토리를 읽은 결과
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// 실행 요약 (`Close` 전이면 없음)
    pub run: Option<RunRecord>,
    /// 테스트 레코드, 디렉토리 이름 순
    pub tests: Vec<TestRecord>,
}

impl RunSummary {
    pub fn failed_tests(&self) -> impl Iterator<Item = &TestRecord> {
        self.tests.iter().filter(|t| t.failed)
    }
}

/// 실행 디렉토리에서 메타데이터 파일을 읽어 들입니다.
///
/// `metadata.json`이 없는 하위 디렉토리는 건너뜁니다.
pub fn load_run(run_dir: &Path) -> Result<RunSummary, ArtifactError> {
    let run = read_json::<RunRecord>(&run_dir.join(METADATA_FILE))?;

    let entries = fs::read_dir(run_dir).map_err(|source| ArtifactError::Read {
        path: run_dir.to_path_buf(),
        source,
    })?;
    let mut dirs: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    dirs.sort();

    let mut tests = Vec::with_capacity(dirs.len());
    for dir in dirs {
        if let Some(record) = read_json::<TestRecord>(&dir.join(METADATA_FILE))? {
            tests.push(record);
        }
    }

    Ok(RunSummary { run, tests })
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<Option<T>, ArtifactError> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(ArtifactError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    serde_json::from_str(&text)
        .map(Some)
        .map_err(|e| ArtifactError::Metadata(format!("{}: {e}", path.display())))
}
