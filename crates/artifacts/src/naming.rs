//! 테스트 디렉토리 짧은 이름
//!
//! `"Artifact Verification should intentionally fail"` → `"01-artifact-verification"`

/// 제목에서 가져오는 최대 단어 수
const MAX_WORDS: usize = 4;

/// 카운터를 뺀 이름 부분의 최대 길이 (바이트)
const MAX_NAME_LEN: usize = 40;

const BRACKETS: [char; 6] = ['(', ')', '[', ']', '{', '}'];

/// 카운터 접두사와 제목의 앞 단어로 짧은 디렉토리 이름을 만듭니다.
///
/// `should` 또는 `[`로 시작하는 라벨 단어에서 멈추고, 최대 4단어를
/// 소문자 `-`로 잇습니다. 같은 제목이라도 카운터가 다르면 이름이 다릅니다.
pub fn short_test_name(title: &str, counter: u32) -> String {
    let words: Vec<&str> = title.split_whitespace().collect();
    let Some(first) = words.first() else {
        return format!("{counter:02}-unknown");
    };

    let mut picked: Vec<&str> = Vec::with_capacity(MAX_WORDS);
    for word in &words {
        if word.eq_ignore_ascii_case("should") || word.starts_with('[') {
            break;
        }
        let clean = word.trim_matches(|c| BRACKETS.contains(&c));
        if !clean.is_empty() {
            picked.push(clean);
        }
        if picked.len() >= MAX_WORDS {
            break;
        }
    }
    if picked.is_empty() {
        picked.push(first);
    }

    let mut name: String = picked
        .join("-")
        .to_lowercase()
        .chars()
        .filter(|c| !BRACKETS.contains(c))
        .collect();

    if name.len() > MAX_NAME_LEN {
        let mut cut = MAX_NAME_LEN;
        while !name.is_char_boundary(cut) {
            cut -= 1;
        }
        name.truncate(cut);
    }
    if name.is_empty() {
        name.push_str("unknown");
    }

    format!("{counter:02}-{name}")
}
