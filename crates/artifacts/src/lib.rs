//! 테스트 실패 진단 아티팩트 수집
//!
//! # Module Structure
//!
//! - [`truncate`]: 로그 줄 수 절단 (`truncate_log_lines`)
//! - [`storage`]: 크기 제한 + 원자적 파일 저장 (`Storage`)
//! - [`metadata`]: 실행/테스트 레코드 (`RunRecord`, `TestRecord`, `MetadataWriter`)
//! - [`naming`]: 테스트 디렉토리 짧은 이름
//! - [`context`]: 테스트별 컨텍스트 (`TestContext`)
//! - [`collector`]: 수집 오케스트레이터 (`Collector`)
//! - [`error`]: 도메인 에러 (`ArtifactError`)
//!
//! # Architecture
//!
//! ```text
//! TestContext ──> Collector.collect_for_test()
//!                     |
//!                 ClusterClient (pods, logs, events, ...)
//!                     |
//!                 truncate_log_lines ──> Storage.write_file (bound + atomic)
//!                     |
//!                 MetadataWriter ──> <run>/<NN-name>/metadata.json
//! ```

pub mod collector;
pub mod context;
pub mod error;
pub mod metadata;
pub mod naming;
pub mod storage;
pub mod truncate;

// --- Public API Re-exports ---

// Collector
pub use collector::{Collector, CollectorState};
pub use context::TestContext;

// Error
pub use error::ArtifactError;

// Metadata
pub use metadata::{
    ArtifactInventory, ArtifactKind, MetadataWriter, RunAnnotations, RunRecord, RunSummary,
    TestRecord, load_run,
};

// Storage
pub use storage::{Storage, bound_size, is_run_scoped, sanitize_filename};

// Truncation
pub use truncate::{truncate_log_lines, truncation_marker};
