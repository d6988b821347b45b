//! 테스트별 컨텍스트
//!
//! 하니스가 테스트마다 하나씩 만들어 수집기 호출에 넘깁니다.
//! 네임스페이스를 키로 하는 전역 레지스트리는 없습니다.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

/// 테스트 하나의 실행 정보
#[derive(Debug, Clone)]
pub struct TestContext {
    name: String,
    namespace: String,
    labels: Vec<String>,
    start_time: DateTime<Utc>,
    end_time: Option<DateTime<Utc>>,
    failed: bool,
    failure_message: Option<String>,
    cancel: CancellationToken,
}

impl TestContext {
    /// 지금 시작한 테스트의 컨텍스트를 만듭니다.
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            labels: Vec::new(),
            start_time: Utc::now(),
            end_time: None,
            failed: false,
            failure_message: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_labels(mut self, labels: Vec<String>) -> Self {
        self.labels = labels;
        self
    }

    pub fn started_at(mut self, start: DateTime<Utc>) -> Self {
        self.start_time = start;
        self
    }

    pub fn finished_at(mut self, end: DateTime<Utc>) -> Self {
        self.end_time = Some(end);
        self
    }

    /// 테스트를 실패로 표시합니다.
    pub fn failed(mut self, message: impl Into<String>) -> Self {
        self.failed = true;
        let message = message.into();
        self.failure_message = (!message.is_empty()).then_some(message);
        self
    }

    /// 호출자 취소 토큰을 연결합니다.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// 테스트 종료를 기록합니다.
    pub fn finish(&mut self) {
        if self.end_time.is_none() {
            self.end_time = Some(Utc::now());
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    /// 종료 시각. 아직 기록되지 않았으면 현재 시각
    pub fn end_time(&self) -> DateTime<Utc> {
        self.end_time.unwrap_or_else(Utc::now)
    }

    pub fn is_failed(&self) -> bool {
        self.failed
    }

    pub fn failure_message(&self) -> Option<&str> {
        self.failure_message.as_deref()
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// 테스트 실행 시간
    pub fn duration(&self) -> Duration {
        (self.end_time() - self.start_time)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_from_start_and_end() {
        let start = Utc::now();
        let ctx = TestContext::new("Suite works", "test-suite")
            .started_at(start)
            .finished_at(start + chrono::Duration::milliseconds(1500));
        assert_eq!(ctx.duration(), Duration::from_millis(1500));
    }

    #[test]
    fn end_before_start_clamps_to_zero() {
        let start = Utc::now();
        let ctx = TestContext::new("x", "ns")
            .started_at(start)
            .finished_at(start - chrono::Duration::seconds(1));
        assert_eq!(ctx.duration(), Duration::ZERO);
    }

    #[test]
    fn failed_marks_message() {
        let ctx = TestContext::new("x", "ns").failed("expected 3 pods");
        assert!(ctx.is_failed());
        assert_eq!(ctx.failure_message(), Some("expected 3 pods"));

        let ctx = TestContext::new("x", "ns").failed("");
        assert!(ctx.is_failed());
        assert_eq!(ctx.failure_message(), None);
    }

    #[test]
    fn finish_is_idempotent() {
        let end = Utc::now() - chrono::Duration::seconds(10);
        let mut ctx = TestContext::new("x", "ns").finished_at(end);
        ctx.finish();
        assert_eq!(ctx.end_time(), end);
    }
}
