//! 아티팩트 파일 저장소
//!
//! 실행(run) 하나의 디렉토리 트리를 관리합니다.
//!
//! ```text
//! <base_dir>/run-<run_id>/
//! ├── metadata.json              (RunRecord)
//! └── 01-artifact-verification/
//!     ├── metadata.json          (TestRecord)
//!     ├── logs/  pods/  resources/  events/  operator/
//! ```
//!
//! 모든 쓰기는 임시 파일에 기록한 뒤 rename으로 옮깁니다. 읽는 쪽은
//! 부분적으로 기록된 파일을 볼 수 없습니다. 여러 워커 프로세스가 같은 실행
//! 디렉토리를 공유하지만 서로 다른 하위 경로에만 쓰므로 잠금은 없습니다.

use std::borrow::Cow;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::debug;

use kubetriage_core::error::{InputError, StorageError};

use crate::error::ArtifactError;

/// 테스트 디렉토리 이름 최대 길이 (바이트)
const MAX_DIR_NAME_LEN: usize = 200;

/// 크기 제한 시 앞부분에서 남기는 최대 바이트
const HEAD_BYTES: usize = 100;

const SKIP_MARKER: &str = "\n... [CONTENT SKIPPED] ...\n";

/// 파일명으로 쓸 수 없는 문자
const UNSAFE_CHARS: [char; 10] = ['/', '\\', ':', '*', '?', '"', '<', '>', '|', ' '];

/// 실행 단위 아티팩트 저장소
#[derive(Debug, Clone)]
pub struct Storage {
    run_dir: PathBuf,
    run_id: String,
    max_size: u64,
}

impl Storage {
    /// 실행 디렉토리를 만들고 저장소를 생성합니다.
    ///
    /// `base_dir`가 이미 실행 범위 디렉토리이면 (이름이 `run-`으로 시작하거나
    /// `run-*` 아래의 `artifacts`) 중첩하지 않고 그대로 사용합니다.
    pub fn new(base_dir: &Path, run_id: &str, max_size: u64) -> Result<Self, ArtifactError> {
        if max_size == 0 {
            return Err(InputError::InvalidSize {
                field: "max_resource_size".to_owned(),
                reason: "must be greater than 0".to_owned(),
            }
            .into());
        }

        let run_dir = if is_run_scoped(base_dir) {
            base_dir.to_path_buf()
        } else {
            base_dir.join(format!("run-{run_id}"))
        };

        fs::create_dir_all(&run_dir).map_err(|source| StorageError::CreateDir {
            path: run_dir.clone(),
            source,
        })?;
        debug!(run_dir = %run_dir.display(), "run directory ready");

        Ok(Self {
            run_dir,
            run_id: run_id.to_owned(),
            max_size,
        })
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// 아티팩트 하나의 최대 크기 (바이트)
    pub fn max_size(&self) -> u64 {
        self.max_size
    }

    /// `len` 바이트 내용을 기록하면 실제로 기록될 크기
    pub fn bounded_len(&self, len: usize) -> u64 {
        (len as u64).min(self.max_size)
    }

    /// 테스트 디렉토리 아래 `category/filename`에 원자적으로 기록합니다.
    ///
    /// 크기 제한을 넘는 내용은 [`bound_size`]로 줄입니다.
    /// `category`가 비어 있으면 테스트 디렉토리에 바로 기록합니다.
    /// 기록한 바이트 수를 반환합니다.
    pub fn write_file(
        &self,
        test_dir: &str,
        category: &str,
        filename: &str,
        content: &[u8],
    ) -> Result<u64, StorageError> {
        let dir = self.ensure_dir(test_dir, category)?;
        let bounded = bound_size(content, self.max_size, "size limit exceeded");
        atomic_write(&dir.join(filename), &bounded)?;
        Ok(bounded.len() as u64)
    }

    /// 테스트 디렉토리 바로 아래에 크기 제한 없이 원자적으로 기록합니다.
    ///
    /// 잘리면 읽을 수 없게 되는 메타데이터 전용입니다.
    pub fn write_test_file_unbounded(
        &self,
        test_dir: &str,
        filename: &str,
        content: &[u8],
    ) -> Result<u64, StorageError> {
        let dir = self.ensure_dir(test_dir, "")?;
        atomic_write(&dir.join(filename), content)?;
        Ok(content.len() as u64)
    }

    fn ensure_dir(&self, test_dir: &str, category: &str) -> Result<PathBuf, StorageError> {
        let mut dir = self.run_dir.join(test_dir);
        if !category.is_empty() {
            dir.push(category);
        }
        fs::create_dir_all(&dir).map_err(|source| StorageError::CreateDir {
            path: dir.clone(),
            source,
        })?;
        Ok(dir)
    }

    /// 실행 디렉토리 바로 아래에 원자적으로 기록합니다 (실행 요약 등).
    pub fn write_file_in_run_dir(&self, filename: &str, content: &[u8]) -> Result<u64, StorageError> {
        atomic_write(&self.run_dir.join(filename), content)?;
        Ok(content.len() as u64)
    }

    /// 테스트 제목으로 디렉토리를 만들고 정리된 이름을 반환합니다.
    ///
    /// 이름의 유일성은 보장하지 않습니다. 수집기가 카운터 접두사로 보장합니다.
    pub fn create_test_dir(&self, title: &str) -> Result<String, StorageError> {
        let sanitized = sanitize_filename(title);
        let dir = self.run_dir.join(&sanitized);
        fs::create_dir_all(&dir).map_err(|source| StorageError::CreateDir { path: dir, source })?;
        Ok(sanitized)
    }
}

/// `path`가 이미 실행 범위 디렉토리인지 확인합니다.
pub fn is_run_scoped(path: &Path) -> bool {
    let name_of = |p: &Path| {
        p.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    };
    let is_run = |name: &str| name.len() > "run-".len() && name.starts_with("run-");

    let name = name_of(path);
    if is_run(&name) {
        return true;
    }
    name == "artifacts" && path.parent().is_some_and(|parent| is_run(&name_of(parent)))
}

/// 크기 제한을 넘는 내용을 앞부분 + 생략 마커 + 뒷부분 + 제한 마커로 줄입니다.
///
/// 결과는 항상 `limit` 바이트 이하입니다. 최근 출력이 더 중요하므로
/// 뒷부분을 더 많이 남깁니다.
pub fn bound_size<'a>(content: &'a [u8], limit: u64, reason: &str) -> Cow<'a, [u8]> {
    if content.len() as u64 <= limit {
        return Cow::Borrowed(content);
    }
    // limit < content.len() 이므로 usize로 변환 가능
    let limit = limit as usize;

    let marker = format!("\n\n... [TRUNCATED: {reason} - max {limit} bytes] ...\n");
    let marker = marker.as_bytes();
    if marker.len() >= limit {
        return Cow::Owned(marker[..limit].to_vec());
    }

    let keep = limit - marker.len();
    let head = HEAD_BYTES.min(keep / 2);

    let mut out = Vec::with_capacity(limit);
    if head > 0 && keep >= head + SKIP_MARKER.len() {
        let tail = keep - head - SKIP_MARKER.len();
        out.extend_from_slice(&content[..head]);
        out.extend_from_slice(SKIP_MARKER.as_bytes());
        out.extend_from_slice(&content[content.len() - tail..]);
    } else {
        out.extend_from_slice(&content[content.len() - keep..]);
    }
    out.extend_from_slice(marker);
    Cow::Owned(out)
}

/// 파일명으로 안전하지 않은 문자를 `-`로 바꾸고 길이를 제한합니다.
///
/// 200바이트를 넘으면 잘라내고 `-<unix 초>` 접미사를 붙입니다.
pub fn sanitize_filename(name: &str) -> String {
    let mut result: String = name
        .chars()
        .map(|c| if UNSAFE_CHARS.contains(&c) { '-' } else { c })
        .collect();

    if result.len() > MAX_DIR_NAME_LEN {
        let suffix = format!("-{}", chrono::Utc::now().timestamp());
        let mut cut = MAX_DIR_NAME_LEN.saturating_sub(suffix.len());
        while !result.is_char_boundary(cut) {
            cut -= 1;
        }
        result.truncate(cut);
        result.push_str(&suffix);
    }

    // "", ".", ".."는 디렉토리 이름으로 쓸 수 없음
    if result.chars().all(|c| c == '.') {
        result = "unnamed".to_owned();
    }
    result
}

/// 같은 디렉토리의 임시 파일에 쓰고 최종 경로로 rename합니다.
///
/// rename이 실패하면 임시 파일을 지우고 에러를 반환합니다.
fn atomic_write(path: &Path, content: &[u8]) -> Result<(), StorageError> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp_path = path.with_file_name(format!(".{file_name}.{}.tmp", uuid::Uuid::new_v4()));

    let write = || -> std::io::Result<()> {
        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(content)?;
        file.sync_all()
    };
    if let Err(source) = write() {
        let _ = fs::remove_file(&tmp_path);
        return Err(StorageError::Write {
            path: tmp_path,
            source,
        });
    }

    if let Err(source) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(StorageError::Rename {
            from: tmp_path,
            to: path.to_path_buf(),
            source,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage(limit: u64) -> (tempfile::TempDir, Storage) {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::new(dir.path(), "20251114-195840", limit).unwrap();
        (dir, storage)
    }

    #[test]
    fn run_dir_is_nested_under_base() {
        let (dir, storage) = storage(1024);
        assert_eq!(storage.run_dir(), dir.path().join("run-20251114-195840"));
        assert!(storage.run_dir().is_dir());
        assert_eq!(storage.run_id(), "20251114-195840");
    }

    #[test]
    fn run_scoped_base_is_reused() {
        let dir = tempfile::tempdir().unwrap();
        let scoped = dir.path().join("run-abc");
        let storage = Storage::new(&scoped, "xyz", 1024).unwrap();
        assert_eq!(storage.run_dir(), scoped);

        let nested = dir.path().join("run-abc").join("artifacts");
        let storage = Storage::new(&nested, "xyz", 1024).unwrap();
        assert_eq!(storage.run_dir(), nested);
    }

    #[test]
    fn run_scope_detection() {
        assert!(is_run_scoped(Path::new("/tmp/run-1")));
        assert!(is_run_scoped(Path::new("/tmp/run-1/artifacts")));
        assert!(!is_run_scoped(Path::new("/tmp/run-")));
        assert!(!is_run_scoped(Path::new("/tmp/artifacts")));
        assert!(!is_run_scoped(Path::new("test/e2e/artifacts")));
    }

    #[test]
    fn zero_limit_is_input_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Storage::new(dir.path(), "r", 0).unwrap_err();
        assert!(matches!(err, ArtifactError::Input(_)));
    }

    #[test]
    fn write_file_creates_category_dir() {
        let (_dir, storage) = storage(1024);
        let written = storage
            .write_file("01-demo", "logs", "web-0.log", b"hello\n")
            .unwrap();
        assert_eq!(written, 6);
        let path = storage.run_dir().join("01-demo/logs/web-0.log");
        assert_eq!(fs::read(path).unwrap(), b"hello\n");
    }

    #[test]
    fn oversized_content_is_bounded_with_marker() {
        let (_dir, storage) = storage(512);
        let content: Vec<u8> = (0..10_000u32).map(|i| b'a' + (i % 26) as u8).collect();
        let written = storage
            .write_file("01-demo", "resources", "big.json", &content)
            .unwrap();
        assert!(written <= 512);

        let on_disk = fs::read(storage.run_dir().join("01-demo/resources/big.json")).unwrap();
        assert_eq!(on_disk.len() as u64, written);
        let text = String::from_utf8_lossy(&on_disk);
        assert!(text.contains("max 512 bytes"));
        assert!(text.contains("[CONTENT SKIPPED]"));
        assert!(text.starts_with("abcdefghij"));
    }

    #[test]
    fn bound_size_prefers_tail() {
        let content: Vec<u8> = (0..5000).map(|i| if i < 4900 { b'h' } else { b't' }).collect();
        let out = bound_size(&content, 400, "test");
        assert!(out.len() <= 400);

        let marker = b"\n\n... [TRUNCATED: test - max 400 bytes] ...\n";
        assert!(out.ends_with(marker));
        let body = &out[..out.len() - marker.len()];
        assert!(body.ends_with(&[b't'; 100]));
        assert_eq!(body.iter().filter(|b| **b == b't').count(), 100);
        assert!(body.starts_with(&[b'h'; 100]));
    }

    #[test]
    fn bound_size_tiny_limit_returns_marker_prefix() {
        let out = bound_size(&[b'x'; 100], 10, "size limit exceeded");
        assert_eq!(out.len(), 10);
        assert_eq!(&out[..], b"\n\n... [TRU");
    }

    #[test]
    fn bound_size_within_limit_is_borrowed() {
        let out = bound_size(b"small", 10, "r");
        assert!(matches!(out, Cow::Borrowed(_)));
    }

    #[test]
    fn failed_rename_leaves_no_residue() {
        let (_dir, storage) = storage(1024);
        // 최종 경로를 비어 있지 않은 디렉토리로 만들어 rename 실패를 유도
        let target = storage.run_dir().join("01-demo").join("events");
        fs::create_dir_all(target.join("namespace-events.txt")).unwrap();
        fs::write(target.join("namespace-events.txt").join("keep"), b"x").unwrap();

        let err = storage
            .write_file("01-demo", "events", "namespace-events.txt", b"events")
            .unwrap_err();
        assert!(matches!(err, StorageError::Rename { .. }));

        let leftovers: Vec<_> = fs::read_dir(&target)
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
        assert!(!target.join("namespace-events.txt").is_file());
    }

    #[test]
    fn run_dir_write_is_atomic() {
        let (_dir, storage) = storage(1024);
        storage.write_file_in_run_dir("metadata.json", b"{}").unwrap();
        storage.write_file_in_run_dir("metadata.json", b"{\"a\":1}").unwrap();
        assert_eq!(
            fs::read_to_string(storage.run_dir().join("metadata.json")).unwrap(),
            "{\"a\":1}"
        );
    }

    #[test]
    fn sanitize_replaces_unsafe_characters() {
        assert_eq!(
            sanitize_filename("a/b\\c:d*e?f\"g<h>i|j k"),
            "a-b-c-d-e-f-g-h-i-j-k"
        );
    }

    #[test]
    fn sanitize_caps_length_with_suffix() {
        let long = "x".repeat(500);
        let out = sanitize_filename(&long);
        assert!(out.len() <= 200);
        let (_, suffix) = out.rsplit_once('-').unwrap();
        assert!(suffix.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn sanitize_caps_multibyte_on_char_boundary() {
        let long = "테스트".repeat(100);
        let out = sanitize_filename(&long);
        assert!(out.len() <= 200);
        assert!(out.starts_with("테스트"));
    }

    #[test]
    fn sanitize_rejects_dot_names() {
        assert_eq!(sanitize_filename(".."), "unnamed");
        assert_eq!(sanitize_filename(""), "unnamed");
    }

    #[test]
    fn create_test_dir_returns_sanitized_name() {
        let (_dir, storage) = storage(1024);
        let name = storage.create_test_dir("Normal Mode: basic").unwrap();
        assert_eq!(name, "Normal-Mode--basic");
        assert!(storage.run_dir().join(&name).is_dir());
    }
}
