//! 네임스페이스 매칭 휴리스틱
//!
//! 리포트 단계에서 테스트 경로 텍스트(컨테이너 설명 + 리프 이름)와 네임스페이스를
//! 사후에 짝짓기 위한 best-effort 점수 함수입니다. 전역 상태가 없는 순수 함수입니다.
//!
//! 점수 (대소문자 무시):
//! - 네임스페이스 전체 일치: 1000
//! - 10자리 초과 숫자 접미사를 뗀 기본 이름 일치: 500
//! - `test-` 접두사를 떼고 `-`를 공백으로 바꾼 패턴 일치: 50
//! - 패턴의 4자 이상 단어 하나당: 5

/// 숫자 접미사를 타임스탬프로 간주하는 최소 길이 (초과)
const TIMESTAMP_SUFFIX_MIN_DIGITS: usize = 10;

const EXACT_SCORE: u32 = 1000;
const BASE_SCORE: u32 = 500;
const PATTERN_SCORE: u32 = 50;
const WORD_SCORE: u32 = 5;

/// `test-dataflow-1763129228782243000` → `test-dataflow`
fn strip_timestamp_suffix(namespace: &str) -> &str {
    match namespace.rfind('-') {
        Some(idx) if idx > 0 => {
            let suffix = &namespace[idx + 1..];
            if suffix.len() > TIMESTAMP_SUFFIX_MIN_DIGITS
                && suffix.bytes().all(|b| b.is_ascii_digit())
            {
                &namespace[..idx]
            } else {
                namespace
            }
        }
        _ => namespace,
    }
}

/// 테스트 경로 텍스트에 대한 네임스페이스의 매칭 점수를 계산합니다.
///
/// 0은 매칭되지 않음을 뜻합니다.
pub fn score_namespace(namespace: &str, test_path: &str) -> u32 {
    let haystack = test_path.to_lowercase();
    let namespace_lower = namespace.to_lowercase();
    let base = strip_timestamp_suffix(&namespace_lower);
    let pattern = base.strip_prefix("test-").unwrap_or(base).replace('-', " ");

    let mut score = 0;
    if !namespace_lower.is_empty() && haystack.contains(&namespace_lower) {
        score += EXACT_SCORE;
    }
    if base != namespace_lower && haystack.contains(base) {
        score += BASE_SCORE;
    }
    if !pattern.trim().is_empty() && haystack.contains(&pattern) {
        score += PATTERN_SCORE;
    }
    for word in pattern.split_whitespace() {
        if word.chars().count() > 3 && haystack.contains(word) {
            score += WORD_SCORE;
        }
    }
    score
}

/// 후보 중 가장 높은 점수의 네임스페이스를 반환합니다.
///
/// 동점이면 먼저 나온 후보가 이깁니다. 모든 점수가 0이면 `None`입니다.
pub fn best_match<'a, I>(candidates: I, test_path: &str) -> Option<(&'a str, u32)>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut best: Option<(&'a str, u32)> = None;
    for candidate in candidates {
        let score = score_namespace(candidate, test_path);
        if score == 0 {
            continue;
        }
        match best {
            Some((_, best_score)) if best_score >= score => {}
            _ => best = Some((candidate, score)),
        }
    }
    best
}
