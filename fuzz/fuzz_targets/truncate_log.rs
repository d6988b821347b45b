#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use kubetriage_artifacts::truncate::{truncate_log_lines, truncation_marker};

/// 퍼저용 구조적 입력
#[derive(Arbitrary, Debug)]
struct FuzzInput {
    content: String,
    max_lines: i64,
}

fuzz_target!(|input: FuzzInput| {
    let out = truncate_log_lines(&input.content, input.max_lines);

    if input.max_lines <= 0 {
        assert_eq!(out.as_ref(), input.content);
        return;
    }
    if out.as_ref() != input.content {
        // 잘렸으면 항상 마커로 시작하고 남은 줄 수는 한도 이하
        let marker = truncation_marker(input.max_lines);
        let kept = out
            .strip_prefix(marker.as_str())
            .expect("truncated output starts with the marker");
        let newlines = kept.bytes().filter(|b| *b == b'\n').count() as u64;
        assert!(newlines < input.max_lines as u64);
    }
});
