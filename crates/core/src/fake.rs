//! 테스트용 인메모리 클러스터
//!
//! 설정 가능한 응답을 반환하여 클러스터 없이도 수집기와 회수기를 테스트할 수 있습니다.
//! 모든 호출은 `"<op> <kind>/<name>"` 형식으로 기록됩니다.
//!
//! 실패 주입은 연산 이름(`"delete"`) 또는 연산과 종류(`"delete:namespace"`) 단위입니다.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::cluster::{
    ClusterClient, DeleteOptions, EventFilter, LogOptions, OutputFormat, ProfileKind,
    ProfileSnapshot, ProfileTarget,
};
use crate::error::ClusterError;

#[derive(Default)]
struct FakeState {
    /// (kind, namespace) → 이름 목록. 클러스터 범위 객체는 namespace가 빈 문자열
    objects: HashMap<(String, String), Vec<String>>,
    /// (kind, name, json_path) → 값
    fields: HashMap<(String, String, String), String>,
    /// (namespace, pod) → 로그
    logs: HashMap<(String, String), String>,
    /// namespace → 이벤트 텍스트
    events: HashMap<String, String>,
    namespaces: HashSet<String>,
    /// 삭제해도 사라지지 않는 네임스페이스
    stuck: HashSet<String>,
    failing: HashSet<String>,
    delays: HashMap<String, Duration>,
    calls: Vec<String>,
}

/// 스크립트 가능한 인메모리 [`ClusterClient`]
#[derive(Default)]
pub struct FakeCluster {
    state: Mutex<FakeState>,
}

impl FakeCluster {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 존재하는 네임스페이스를 추가합니다.
    pub fn with_namespace(self, name: &str) -> Self {
        self.lock().namespaces.insert(name.to_owned());
        self
    }

    /// 삭제 요청에도 사라지지 않는 네임스페이스를 추가합니다 (finalizer가 막힌 상태).
    ///
    /// 네임스페이스 finalizer를 비우는 패치 이후에는 다시 삭제할 수 있습니다.
    pub fn with_stuck_namespace(self, name: &str) -> Self {
        {
            let mut state = self.lock();
            state.namespaces.insert(name.to_owned());
            state.stuck.insert(name.to_owned());
        }
        self
    }

    /// `namespace`에 파드를 추가합니다.
    pub fn with_pod(self, namespace: &str, pod: &str) -> Self {
        self.with_object("pod", Some(namespace), pod)
    }

    /// 임의 종류의 객체를 추가합니다.
    pub fn with_object(self, kind: &str, namespace: Option<&str>, name: &str) -> Self {
        self.lock()
            .objects
            .entry((kind.to_owned(), namespace.unwrap_or_default().to_owned()))
            .or_default()
            .push(name.to_owned());
        self
    }

    /// `get_field` 응답을 설정합니다.
    pub fn with_field(self, kind: &str, name: &str, json_path: &str, value: &str) -> Self {
        self.lock().fields.insert(
            (kind.to_owned(), name.to_owned(), json_path.to_owned()),
            value.to_owned(),
        );
        self
    }

    /// 파드 로그를 설정합니다.
    pub fn with_logs(self, namespace: &str, pod: &str, content: &str) -> Self {
        self.lock()
            .logs
            .insert((namespace.to_owned(), pod.to_owned()), content.to_owned());
        self
    }

    /// 네임스페이스 이벤트 텍스트를 설정합니다.
    pub fn with_events(self, namespace: &str, content: &str) -> Self {
        self.lock()
            .events
            .insert(namespace.to_owned(), content.to_owned());
        self
    }

    /// 연산(`"logs"`) 또는 연산:종류(`"delete:namespace"`)가 실패하도록 설정합니다.
    pub fn failing(self, key: &str) -> Self {
        self.lock().failing.insert(key.to_owned());
        self
    }

    /// 연산 응답을 지연시킵니다 (`tokio::time::sleep` 사용).
    pub fn with_delay(self, op: &str, delay: Duration) -> Self {
        self.lock().delays.insert(op.to_owned(), delay);
        self
    }

    /// 지금까지 기록된 호출 목록
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    /// `prefix`로 시작하는 호출 수
    pub fn call_count(&self, prefix: &str) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    /// 네임스페이스가 현재 존재하는지 (호출 기록 없이) 확인합니다.
    pub fn has_namespace(&self, name: &str) -> bool {
        self.lock().namespaces.contains(name)
    }

    async fn enter(&self, op: &str, kind: &str, call: String) -> Result<(), ClusterError> {
        let delay = {
            let mut state = self.lock();
            state.calls.push(call.clone());
            state.delays.get(op).copied()
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let state = self.lock();
        if state.failing.contains(op) || state.failing.contains(&format!("{op}:{kind}")) {
            return Err(ClusterError::CommandFailed {
                command: call,
                stderr: "injected failure".to_owned(),
            });
        }
        Ok(())
    }
}

fn object_key(kind: &str, name: &str) -> String {
    format!("{kind}/{name}")
}

impl ClusterClient for FakeCluster {
    async fn get(
        &self,
        kind: &str,
        name: &str,
        namespace: Option<&str>,
        format: OutputFormat,
    ) -> Result<String, ClusterError> {
        self.enter("get", kind, format!("get {}", object_key(kind, name)))
            .await?;
        let ns = namespace.unwrap_or_default();
        Ok(match format {
            OutputFormat::Json => {
                format!("{{\"kind\":\"{kind}\",\"metadata\":{{\"name\":\"{name}\",\"namespace\":\"{ns}\"}}}}")
            }
            OutputFormat::Yaml => {
                format!("kind: {kind}\nmetadata:\n  name: {name}\n  namespace: {ns}\n")
            }
        })
    }

    async fn get_field(
        &self,
        kind: &str,
        name: &str,
        _namespace: Option<&str>,
        json_path: &str,
    ) -> Result<String, ClusterError> {
        self.enter(
            "get_field",
            kind,
            format!("get_field {} {json_path}", object_key(kind, name)),
        )
        .await?;
        self.lock()
            .fields
            .get(&(kind.to_owned(), name.to_owned(), json_path.to_owned()))
            .cloned()
            .ok_or_else(|| ClusterError::NotFound(format!("{kind}/{name} {json_path}")))
    }

    async fn list_names(
        &self,
        kind: &str,
        namespace: Option<&str>,
        _selector: Option<&str>,
    ) -> Result<Vec<String>, ClusterError> {
        let ns = namespace.unwrap_or_default();
        self.enter("list_names", kind, format!("list_names {kind} -n {ns}"))
            .await?;
        Ok(self
            .lock()
            .objects
            .get(&(kind.to_owned(), ns.to_owned()))
            .cloned()
            .unwrap_or_default())
    }

    async fn apply(&self, _manifest: &str, namespace: Option<&str>) -> Result<(), ClusterError> {
        let ns = namespace.unwrap_or_default();
        self.enter("apply", "", format!("apply -n {ns}")).await
    }

    async fn delete(
        &self,
        kind: &str,
        name: &str,
        namespace: Option<&str>,
        options: &DeleteOptions,
    ) -> Result<(), ClusterError> {
        let grace = options
            .grace_period
            .map(|g| format!(" grace={g}"))
            .unwrap_or_default();
        self.enter(
            "delete",
            kind,
            format!("delete {}{grace}", object_key(kind, name)),
        )
        .await?;

        let mut state = self.lock();
        if kind == "namespace" {
            if !state.stuck.contains(name) {
                state.namespaces.remove(name);
            }
        } else if let Some(names) = state
            .objects
            .get_mut(&(kind.to_owned(), namespace.unwrap_or_default().to_owned()))
        {
            names.retain(|n| n != name);
        }
        Ok(())
    }

    async fn patch_merge(
        &self,
        kind: &str,
        name: &str,
        _namespace: Option<&str>,
        patch: &str,
    ) -> Result<(), ClusterError> {
        self.enter(
            "patch_merge",
            kind,
            format!("patch_merge {} {patch}", object_key(kind, name)),
        )
        .await?;
        // 네임스페이스 finalizer를 비우면 종료가 진행될 수 있음
        if kind == "namespace" && patch.contains("\"finalizers\":[]") {
            self.lock().stuck.remove(name);
        }
        Ok(())
    }

    async fn describe(
        &self,
        kind: &str,
        name: &str,
        namespace: Option<&str>,
    ) -> Result<String, ClusterError> {
        self.enter("describe", kind, format!("describe {}", object_key(kind, name)))
            .await?;
        Ok(format!(
            "Name:         {name}\nNamespace:    {}\nKind:         {kind}\n",
            namespace.unwrap_or_default()
        ))
    }

    async fn logs(
        &self,
        namespace: &str,
        pod: &str,
        _options: &LogOptions,
    ) -> Result<String, ClusterError> {
        self.enter("logs", "pod", format!("logs {}", object_key("pod", pod)))
            .await?;
        Ok(self
            .lock()
            .logs
            .get(&(namespace.to_owned(), pod.to_owned()))
            .cloned()
            .unwrap_or_default())
    }

    async fn events(&self, namespace: &str, filter: &EventFilter) -> Result<String, ClusterError> {
        let suffix = if filter.warnings_only { " warnings" } else { "" };
        self.enter("events", "event", format!("events -n {namespace}{suffix}"))
            .await?;
        Ok(self
            .lock()
            .events
            .get(namespace)
            .cloned()
            .unwrap_or_else(|| "No resources found\n".to_owned()))
    }

    async fn namespace_exists(&self, name: &str) -> Result<bool, ClusterError> {
        self.enter(
            "namespace_exists",
            "namespace",
            format!("namespace_exists {name}"),
        )
        .await?;
        Ok(self.lock().namespaces.contains(name))
    }

    async fn capture_profiles(
        &self,
        target: &ProfileTarget,
        kinds: &[ProfileKind],
    ) -> Result<Vec<ProfileSnapshot>, ClusterError> {
        self.enter(
            "capture_profiles",
            "pod",
            format!("capture_profiles {}", object_key("pod", &target.pod)),
        )
        .await?;
        Ok(kinds
            .iter()
            .map(|kind| ProfileSnapshot {
                kind: *kind,
                content: format!("{kind} profile: total 1\n"),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delete_removes_namespace_unless_stuck() {
        let fake = FakeCluster::new()
            .with_namespace("free")
            .with_stuck_namespace("stuck");
        let opts = DeleteOptions::default();
        fake.delete("namespace", "free", None, &opts).await.unwrap();
        fake.delete("namespace", "stuck", None, &opts).await.unwrap();
        assert!(!fake.namespace_exists("free").await.unwrap());
        assert!(fake.namespace_exists("stuck").await.unwrap());
    }

    #[tokio::test]
    async fn failure_injection_by_kind() {
        let fake = FakeCluster::new()
            .with_namespace("demo")
            .failing("delete:namespace");
        let opts = DeleteOptions::default();
        assert!(fake.delete("namespace", "demo", None, &opts).await.is_err());
        assert!(fake.delete("pod", "p", Some("demo"), &opts).await.is_ok());
    }

    #[tokio::test]
    async fn records_calls_in_order() {
        let fake = FakeCluster::new().with_pod("demo", "web-0");
        let names = fake.list_names("pod", Some("demo"), None).await.unwrap();
        assert_eq!(names, vec!["web-0".to_owned()]);
        let _ = fake.logs("demo", "web-0", &LogOptions::default()).await;
        assert_eq!(fake.calls(), vec!["list_names pod -n demo", "logs pod/web-0"]);
    }

    #[tokio::test]
    async fn missing_field_is_not_found() {
        let fake = FakeCluster::new();
        let err = fake
            .get_field("pod", "x", Some("demo"), ".status")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
