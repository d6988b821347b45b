//! 로그 줄 수 절단
//!
//! 가장 최근 줄이 진단에 가장 유용하므로 끝에서부터 N줄을 남깁니다.
//! 아티팩트당 한 번만 적용합니다. 이미 마커가 붙은 출력에 다시 적용하면
//! 마커가 중복될 수 있습니다.

use std::borrow::Cow;

/// 절단된 로그 앞에 붙는 마커 줄
pub fn truncation_marker(max_lines: i64) -> String {
    format!("... [Showing last {max_lines} lines] ...\n")
}

/// `content`를 마지막 `max_lines`줄로 줄입니다.
///
/// - `max_lines <= 0`이면 그대로 반환합니다.
/// - 끝에서부터 개행 문자를 세어 `max_lines`번째 개행 바로 뒤에서 자릅니다.
///   개행이 그보다 적으면 자를 것이 없으므로 마커 없이 그대로 반환합니다.
/// - 자른 뒤 공백뿐인 앞쪽 줄을 건너뛰고 첫 줄의 공백만 다듬습니다.
///   이후 줄의 들여쓰기는 유지됩니다.
///
/// # 예시
/// ```
/// use kubetriage_artifacts::truncate::truncate_log_lines;
///
/// let out = truncate_log_lines("line1\nline2\nline3\nline4\nline5", 3);
/// assert_eq!(out, "... [Showing last 3 lines] ...\nline3\nline4\nline5");
/// ```
pub fn truncate_log_lines(content: &str, max_lines: i64) -> Cow<'_, str> {
    if max_lines <= 0 {
        return Cow::Borrowed(content);
    }

    // max_lines가 usize 범위를 넘으면 어차피 개행 수가 부족함
    let Ok(wanted) = usize::try_from(max_lines) else {
        return Cow::Borrowed(content);
    };

    let Some(cut) = content
        .bytes()
        .enumerate()
        .rev()
        .filter(|(_, b)| *b == b'\n')
        .nth(wanted - 1)
        .map(|(idx, _)| idx + 1)
    else {
        return Cow::Borrowed(content);
    };

    let kept = trim_first_line(&content[cut..]);

    let marker = truncation_marker(max_lines);
    let mut out = String::with_capacity(marker.len() + kept.len());
    out.push_str(&marker);
    out.push_str(kept.as_ref());
    Cow::Owned(out)
}

/// 공백뿐인 앞쪽 줄을 건너뛰고 첫 내용 줄의 양끝 공백을 제거합니다.
fn trim_first_line(text: &str) -> Cow<'_, str> {
    let mut start = 0;
    while start < text.len() {
        let end = text[start..]
            .find('\n')
            .map_or(text.len(), |offset| start + offset);
        let line = text[start..end].trim();
        if !line.is_empty() {
            if line.len() == end - start {
                return Cow::Borrowed(&text[start..]);
            }
            let mut owned = String::with_capacity(text.len() - start);
            owned.push_str(line);
            owned.push_str(&text[end..]);
            return Cow::Owned(owned);
        }
        start = end + 1;
    }
    // 전부 공백이면 손대지 않음
    Cow::Borrowed(text)
}
