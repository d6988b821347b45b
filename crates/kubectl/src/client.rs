//! `kubectl` 프로세스 기반 [`ClusterClient`] 구현
//!
//! 모든 호출은 인자를 검증한 뒤 `kubectl`을 자식 프로세스로 실행합니다.
//! 각 호출은 호출별 타임아웃으로 제한되며, 타임아웃이 나면 자식 프로세스는
//! `kill_on_drop`으로 종료됩니다.

use std::process::Stdio;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use kubetriage_core::cluster::{
    ClusterClient, DeleteOptions, EventFilter, LogOptions, OutputFormat, ProfileKind,
    ProfileSnapshot, ProfileTarget,
};
use kubetriage_core::duration::format_duration;
use kubetriage_core::error::ClusterError;

use crate::validation::{
    validate_json_path, validate_label_selector, validate_name, validate_namespace,
    validate_optional_namespace, validate_resource_type,
};

/// 기본 호출 타임아웃
const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(60);

/// 포트 포워딩이 연결될 때까지 기다리는 시간
const DEFAULT_PORT_FORWARD_SETTLE: Duration = Duration::from_secs(2);

/// `--timeout`이 붙은 명령에 더해 주는 프로세스 타임아웃 여유분
const TIMEOUT_SLACK: Duration = Duration::from_secs(5);

/// 프로파일 HTTP 요청 한 건의 최대 시간 (초)
const PROFILE_FETCH_TIMEOUT_SECS: u64 = 10;

/// `kubectl` 바이너리를 호출하는 클러스터 클라이언트
#[derive(Debug, Clone)]
pub struct KubectlClient {
    binary: String,
    kubeconfig: Option<String>,
    context: Option<String>,
    command_timeout: Duration,
    port_forward_settle: Duration,
}

impl Default for KubectlClient {
    fn default() -> Self {
        Self::new()
    }
}

impl KubectlClient {
    /// `PATH`의 `kubectl`을 사용하는 클라이언트를 생성합니다.
    pub fn new() -> Self {
        Self {
            binary: "kubectl".to_owned(),
            kubeconfig: None,
            context: None,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            port_forward_settle: DEFAULT_PORT_FORWARD_SETTLE,
        }
    }

    /// 다른 실행 파일을 사용합니다.
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    pub fn with_kubeconfig(mut self, path: impl Into<String>) -> Self {
        self.kubeconfig = Some(path.into());
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// 명령별 `--timeout`이 없는 호출의 타임아웃을 설정합니다.
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    pub fn with_port_forward_settle(mut self, settle: Duration) -> Self {
        self.port_forward_settle = settle;
        self
    }

    fn global_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(kubeconfig) = &self.kubeconfig {
            args.push(format!("--kubeconfig={kubeconfig}"));
        }
        if let Some(context) = &self.context {
            args.push(format!("--context={context}"));
        }
        args
    }

    fn command_line(&self, args: &[String]) -> String {
        let mut line = self.binary.clone();
        for arg in self.global_args().iter().chain(args) {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }

    /// `kubectl`을 실행하고 stdout을 반환합니다.
    async fn run(
        &self,
        args: Vec<String>,
        stdin: Option<&str>,
        timeout: Duration,
    ) -> Result<String, ClusterError> {
        let command = self.command_line(&args);
        debug!(command = %command, timeout = %format_duration(timeout), "running kubectl");

        let mut child = Command::new(&self.binary)
            .args(self.global_args())
            .args(&args)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ClusterError::Spawn {
                command: command.clone(),
                reason: e.to_string(),
            })?;

        let run = async {
            if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
                pipe.write_all(input.as_bytes()).await?;
                // stdin을 닫아야 kubectl이 입력 끝을 인식함
                drop(pipe);
            }
            child.wait_with_output().await
        };

        let output = match tokio::time::timeout(timeout, run).await {
            Ok(result) => result.map_err(|e| ClusterError::Spawn {
                command: command.clone(),
                reason: e.to_string(),
            })?,
            Err(_) => {
                return Err(ClusterError::Timeout {
                    command,
                    timeout_secs: timeout.as_secs(),
                });
            }
        };

        if !output.status.success() {
            return Err(ClusterError::CommandFailed {
                command,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn run_default(&self, args: Vec<String>) -> Result<String, ClusterError> {
        self.run(args, None, self.command_timeout).await
    }

    async fn fetch_profile(&self, local_port: u16, kind: ProfileKind) -> Result<String, ClusterError> {
        let url = format!("http://localhost:{local_port}/debug/pprof/{kind}?debug=1");
        let command = format!("curl -s {url}");
        debug!(command = %command, "fetching profile");

        let mut curl = Command::new("curl");
        curl.arg("-s")
            .arg("--fail")
            .arg("--max-time")
            .arg(PROFILE_FETCH_TIMEOUT_SECS.to_string())
            .arg(&url)
            .stdin(Stdio::null())
            .kill_on_drop(true);
        let output = tokio::time::timeout(
            Duration::from_secs(PROFILE_FETCH_TIMEOUT_SECS) + TIMEOUT_SLACK,
            curl.output(),
        )
        .await
        .map_err(|_| ClusterError::Timeout {
            command: command.clone(),
            timeout_secs: PROFILE_FETCH_TIMEOUT_SECS,
        })?
        .map_err(|e| ClusterError::Spawn {
            command: command.clone(),
            reason: e.to_string(),
        })?;

        if !output.status.success() || output.stdout.is_empty() {
            return Err(ClusterError::CommandFailed {
                command,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

fn push_namespace(args: &mut Vec<String>, namespace: Option<&str>) {
    if let Some(ns) = namespace {
        args.push("-n".to_owned());
        args.push(ns.to_owned());
    }
}

fn rfc3339(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// 이벤트 객체의 대표 시각 (last → eventTime → first → 생성 시각)
fn event_time(event: &serde_json::Value) -> Option<DateTime<Utc>> {
    ["/lastTimestamp", "/eventTime", "/firstTimestamp", "/metadata/creationTimestamp"]
        .iter()
        .filter_map(|ptr| event.pointer(ptr).and_then(|v| v.as_str()))
        .find_map(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|t| t.with_timezone(&Utc))
}

/// `kubectl get events -o json` 출력을 `since` 이후 이벤트의 텍스트 표로 변환합니다.
pub fn render_events_since(json: &str, since: DateTime<Utc>) -> Result<String, ClusterError> {
    let list: serde_json::Value =
        serde_json::from_str(json).map_err(|e| ClusterError::Parse(e.to_string()))?;
    let items = list
        .get("items")
        .and_then(|v| v.as_array())
        .ok_or_else(|| ClusterError::Parse("event list has no items array".to_owned()))?;

    let mut rows: Vec<(DateTime<Utc>, String)> = items
        .iter()
        .filter_map(|event| {
            let at = event_time(event)?;
            if at < since {
                return None;
            }
            let field = |ptr: &str| {
                event
                    .pointer(ptr)
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_owned()
            };
            let object = format!(
                "{}/{}",
                field("/involvedObject/kind").to_lowercase(),
                field("/involvedObject/name")
            );
            let row = format!(
                "{}\t{}\t{}\t{}\t{}",
                rfc3339(&at),
                field("/type"),
                field("/reason"),
                object,
                field("/message").replace('\n', " ")
            );
            Some((at, row))
        })
        .collect();

    if rows.is_empty() {
        return Ok(String::new());
    }
    rows.sort_by_key(|(at, _)| *at);

    let mut out = String::from("LAST SEEN\tTYPE\tREASON\tOBJECT\tMESSAGE\n");
    for (_, row) in rows {
        out.push_str(&row);
        out.push('\n');
    }
    Ok(out)
}

impl ClusterClient for KubectlClient {
    async fn get(
        &self,
        kind: &str,
        name: &str,
        namespace: Option<&str>,
        format: OutputFormat,
    ) -> Result<String, ClusterError> {
        validate_resource_type(kind)?;
        validate_name(name)?;
        validate_optional_namespace(namespace)?;

        let mut args = vec!["get".to_owned(), kind.to_owned(), name.to_owned()];
        push_namespace(&mut args, namespace);
        args.push("-o".to_owned());
        args.push(format.as_str().to_owned());
        self.run_default(args).await
    }

    async fn get_field(
        &self,
        kind: &str,
        name: &str,
        namespace: Option<&str>,
        json_path: &str,
    ) -> Result<String, ClusterError> {
        validate_resource_type(kind)?;
        validate_name(name)?;
        validate_optional_namespace(namespace)?;
        validate_json_path(json_path)?;

        let mut args = vec!["get".to_owned(), kind.to_owned(), name.to_owned()];
        push_namespace(&mut args, namespace);
        args.push("-o".to_owned());
        args.push(format!("jsonpath={{{json_path}}}"));
        self.run_default(args).await
    }

    async fn list_names(
        &self,
        kind: &str,
        namespace: Option<&str>,
        selector: Option<&str>,
    ) -> Result<Vec<String>, ClusterError> {
        validate_resource_type(kind)?;
        validate_optional_namespace(namespace)?;

        let mut args = vec!["get".to_owned(), kind.to_owned()];
        push_namespace(&mut args, namespace);
        if let Some(selector) = selector.filter(|s| !s.is_empty()) {
            validate_label_selector(selector)?;
            args.push("-l".to_owned());
            args.push(selector.to_owned());
        }
        args.push("-o".to_owned());
        args.push("jsonpath={.items[*].metadata.name}".to_owned());

        let output = self.run_default(args).await?;
        Ok(output.split_whitespace().map(str::to_owned).collect())
    }

    async fn apply(&self, manifest: &str, namespace: Option<&str>) -> Result<(), ClusterError> {
        validate_optional_namespace(namespace)?;

        let mut args = vec!["apply".to_owned()];
        push_namespace(&mut args, namespace);
        args.push("-f".to_owned());
        args.push("-".to_owned());
        self.run(args, Some(manifest), self.command_timeout)
            .await
            .map(|_| ())
    }

    async fn delete(
        &self,
        kind: &str,
        name: &str,
        namespace: Option<&str>,
        options: &DeleteOptions,
    ) -> Result<(), ClusterError> {
        validate_resource_type(kind)?;
        validate_name(name)?;
        validate_optional_namespace(namespace)?;

        let mut args = vec!["delete".to_owned(), kind.to_owned(), name.to_owned()];
        push_namespace(&mut args, namespace);
        if let Some(grace) = options.grace_period {
            args.push(format!("--grace-period={grace}"));
        }
        if options.force {
            args.push("--force".to_owned());
        }
        if options.ignore_not_found {
            args.push("--ignore-not-found".to_owned());
        }

        let process_timeout = match options.timeout {
            Some(timeout) => {
                args.push(format!("--timeout={}", format_duration(timeout)));
                timeout + TIMEOUT_SLACK
            }
            None => self.command_timeout,
        };
        self.run(args, None, process_timeout).await.map(|_| ())
    }

    async fn patch_merge(
        &self,
        kind: &str,
        name: &str,
        namespace: Option<&str>,
        patch: &str,
    ) -> Result<(), ClusterError> {
        validate_resource_type(kind)?;
        validate_name(name)?;
        validate_optional_namespace(namespace)?;
        serde_json::from_str::<serde_json::Value>(patch)
            .map_err(|e| ClusterError::Validation {
                field: "patch".to_owned(),
                reason: e.to_string(),
            })?;

        let mut args = vec!["patch".to_owned(), kind.to_owned(), name.to_owned()];
        push_namespace(&mut args, namespace);
        args.push("--type=merge".to_owned());
        args.push("-p".to_owned());
        args.push(patch.to_owned());
        self.run_default(args).await.map(|_| ())
    }

    async fn describe(
        &self,
        kind: &str,
        name: &str,
        namespace: Option<&str>,
    ) -> Result<String, ClusterError> {
        validate_resource_type(kind)?;
        validate_name(name)?;
        validate_optional_namespace(namespace)?;

        let mut args = vec!["describe".to_owned(), kind.to_owned(), name.to_owned()];
        push_namespace(&mut args, namespace);
        self.run_default(args).await
    }

    async fn logs(
        &self,
        namespace: &str,
        pod: &str,
        options: &LogOptions,
    ) -> Result<String, ClusterError> {
        validate_namespace(namespace)?;
        validate_name(pod)?;

        let mut args = vec![
            "logs".to_owned(),
            pod.to_owned(),
            "-n".to_owned(),
            namespace.to_owned(),
        ];
        if let Some(tail) = options.tail_lines {
            args.push(format!("--tail={tail}"));
        }
        if let Some(since) = &options.since_time {
            args.push(format!("--since-time={}", rfc3339(since)));
        }
        if options.all_containers {
            args.push("--all-containers=true".to_owned());
        }
        self.run_default(args).await
    }

    async fn events(&self, namespace: &str, filter: &EventFilter) -> Result<String, ClusterError> {
        validate_namespace(namespace)?;

        let mut args = vec![
            "get".to_owned(),
            "events".to_owned(),
            "-n".to_owned(),
            namespace.to_owned(),
        ];
        if filter.warnings_only {
            args.push("--field-selector".to_owned());
            args.push("type=Warning".to_owned());
        }

        match filter.since {
            // kubectl get events에는 시간 필터가 없으므로 JSON으로 받아 직접 거름
            Some(since) => {
                args.push("-o".to_owned());
                args.push("json".to_owned());
                let json = self.run_default(args).await?;
                render_events_since(&json, since)
            }
            None => self.run_default(args).await,
        }
    }

    async fn namespace_exists(&self, name: &str) -> Result<bool, ClusterError> {
        validate_namespace(name)?;

        let args = vec![
            "get".to_owned(),
            "namespace".to_owned(),
            name.to_owned(),
            "-o".to_owned(),
            "name".to_owned(),
        ];
        match self.run_default(args).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn capture_profiles(
        &self,
        target: &ProfileTarget,
        kinds: &[ProfileKind],
    ) -> Result<Vec<ProfileSnapshot>, ClusterError> {
        validate_namespace(&target.namespace)?;
        validate_name(&target.pod)?;

        let args = vec![
            "port-forward".to_owned(),
            "-n".to_owned(),
            target.namespace.clone(),
            format!("pod/{}", target.pod),
            format!("{}:{}", target.local_port, target.remote_port),
        ];
        let command = self.command_line(&args);
        debug!(command = %command, "starting port-forward");

        let mut forward = Command::new(&self.binary)
            .args(self.global_args())
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ClusterError::Spawn {
                command: command.clone(),
                reason: e.to_string(),
            })?;

        tokio::time::sleep(self.port_forward_settle).await;

        if let Ok(Some(status)) = forward.try_wait() {
            return Err(ClusterError::CommandFailed {
                command,
                stderr: format!("port-forward exited early with {status}"),
            });
        }

        let mut snapshots = Vec::with_capacity(kinds.len());
        for kind in kinds {
            match self.fetch_profile(target.local_port, *kind).await {
                Ok(content) => snapshots.push(ProfileSnapshot {
                    kind: *kind,
                    content,
                }),
                Err(e) => warn!(profile = %kind, error = %e, "failed to fetch profile"),
            }
        }

        if let Err(e) = forward.kill().await {
            warn!(error = %e, "failed to stop port-forward");
        }
        Ok(snapshots)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    const EVENTS_JSON: &str = r#"{
      "items": [
        {"type": "Warning", "reason": "BackOff", "message": "Back-off restarting",
         "involvedObject": {"kind": "Pod", "name": "web-0"},
         "lastTimestamp": "2025-11-14T19:58:40Z"},
        {"type": "Normal", "reason": "Scheduled", "message": "assigned",
         "involvedObject": {"kind": "Pod", "name": "web-0"},
         "lastTimestamp": "2025-11-14T19:50:00Z"},
        {"type": "Warning", "reason": "OOMKilling", "message": "out of memory",
         "involvedObject": {"kind": "Node", "name": "kind-worker"},
         "eventTime": "2025-11-14T19:59:00.123456Z"}
      ]
    }"#;

    #[test]
    fn events_filtered_by_time_and_sorted() {
        let since = Utc.with_ymd_and_hms(2025, 11, 14, 19, 55, 0).unwrap();
        let rendered = render_events_since(EVENTS_JSON, since).unwrap();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("LAST SEEN"));
        assert!(lines[1].contains("BackOff"));
        assert!(lines[1].contains("pod/web-0"));
        assert!(lines[2].contains("OOMKilling"));
        assert!(!rendered.contains("Scheduled"));
    }

    #[test]
    fn no_matching_events_renders_empty() {
        let since = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(render_events_since(EVENTS_JSON, since).unwrap(), "");
    }

    #[test]
    fn malformed_event_json_is_parse_error() {
        let err = render_events_since("not json", Utc::now()).unwrap_err();
        assert!(matches!(err, ClusterError::Parse(_)));
    }

    #[test]
    fn command_line_includes_global_flags() {
        let client = KubectlClient::new()
            .with_kubeconfig("/tmp/kubeconfig")
            .with_context("kind-e2e");
        let line = client.command_line(&["get".to_owned(), "pods".to_owned()]);
        assert_eq!(
            line,
            "kubectl --kubeconfig=/tmp/kubeconfig --context=kind-e2e get pods"
        );
    }

    #[tokio::test]
    async fn invalid_arguments_rejected_before_spawn() {
        // 존재하지 않는 바이너리: 검증이 먼저 실패해야 함
        let client = KubectlClient::new().with_binary("/nonexistent/kubectl");
        let err = client
            .get("pod", "--all", Some("demo"), OutputFormat::Json)
            .await
            .unwrap_err();
        assert!(matches!(err, ClusterError::Validation { .. }));

        let err = client
            .patch_merge("namespace", "demo", None, "{not json")
            .await
            .unwrap_err();
        assert!(matches!(err, ClusterError::Validation { .. }));
    }

    #[tokio::test]
    async fn missing_binary_is_spawn_error() {
        let client = KubectlClient::new().with_binary("/nonexistent/kubectl");
        let err = client
            .describe("pod", "web-0", Some("demo"))
            .await
            .unwrap_err();
        assert!(matches!(err, ClusterError::Spawn { .. }));
    }
}
