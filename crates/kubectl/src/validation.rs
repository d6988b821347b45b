//! kubectl 인자 검증 (명령 주입 방지)
//!
//! 사용자 입력이 `kubectl` 인자로 전달되기 전에 형식을 검사합니다.
//! 셸을 거치지 않더라도 `-` 로 시작하는 값이 플래그로 해석되는 것을 막습니다.

use std::sync::LazyLock;

use regex::Regex;

use kubetriage_core::error::ClusterError;

/// RFC 1123 DNS label
static NAMESPACE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?$").expect("namespace regex is valid")
});

/// RFC 1123 DNS subdomain
static NAME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?(\.[a-z0-9]([-a-z0-9]*[a-z0-9])?)*$")
        .expect("resource name regex is valid")
});

/// `deployment`, `vectorpipelines.observability.example.io`
static RESOURCE_TYPE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]([a-z0-9.\-]*[a-z0-9])?$").expect("resource type regex is valid")
});

static LABEL_SELECTOR_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._\-/=,!]+$").expect("label selector regex is valid")
});

static JSON_PATH_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^[\w.\[\]{}'":*\-\s,@?\\]+$"#).expect("json path regex is valid")
});

const MAX_NAMESPACE_LEN: usize = 63;
const MAX_NAME_LEN: usize = 253;

fn invalid(field: &str, reason: impl Into<String>) -> ClusterError {
    ClusterError::Validation {
        field: field.to_owned(),
        reason: reason.into(),
    }
}

/// 네임스페이스 이름을 검증합니다 (1-63자, 소문자/숫자/`-`).
pub fn validate_namespace(namespace: &str) -> Result<(), ClusterError> {
    if namespace.is_empty() || namespace.len() > MAX_NAMESPACE_LEN {
        return Err(invalid(
            "namespace",
            format!("length {} (must be 1-{MAX_NAMESPACE_LEN})", namespace.len()),
        ));
    }
    if !NAMESPACE_REGEX.is_match(namespace) {
        return Err(invalid(
            "namespace",
            format!("'{namespace}' must match RFC 1123 DNS label"),
        ));
    }
    Ok(())
}

/// 리소스 이름을 검증합니다 (1-253자 DNS subdomain).
pub fn validate_name(name: &str) -> Result<(), ClusterError> {
    if name.is_empty() || name.len() > MAX_NAME_LEN {
        return Err(invalid(
            "name",
            format!("length {} (must be 1-{MAX_NAME_LEN})", name.len()),
        ));
    }
    if !NAME_REGEX.is_match(name) {
        return Err(invalid(
            "name",
            format!("'{name}' must match RFC 1123 DNS subdomain"),
        ));
    }
    Ok(())
}

pub fn validate_resource_type(kind: &str) -> Result<(), ClusterError> {
    if !RESOURCE_TYPE_REGEX.is_match(kind) {
        return Err(invalid("resource type", format!("'{kind}' is not a resource type")));
    }
    Ok(())
}

/// 빈 셀렉터는 필터 없음을 뜻하므로 허용합니다.
pub fn validate_label_selector(selector: &str) -> Result<(), ClusterError> {
    if selector.is_empty() {
        return Ok(());
    }
    if !LABEL_SELECTOR_REGEX.is_match(selector) {
        return Err(invalid(
            "label selector",
            format!("'{selector}' contains unsupported characters"),
        ));
    }
    Ok(())
}

pub fn validate_json_path(path: &str) -> Result<(), ClusterError> {
    if path.is_empty() {
        return Err(invalid("json path", "must not be empty"));
    }
    if !JSON_PATH_REGEX.is_match(path) {
        return Err(invalid(
            "json path",
            format!("'{path}' contains unsupported characters"),
        ));
    }
    Ok(())
}

/// 네임스페이스가 주어졌다면 검증합니다.
pub fn validate_optional_namespace(namespace: Option<&str>) -> Result<(), ClusterError> {
    namespace.map_or(Ok(()), validate_namespace)
}
