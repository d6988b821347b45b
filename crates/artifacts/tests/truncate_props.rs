//! 로그 절단과 크기 제한의 속성 기반 테스트

use kubetriage_artifacts::{bound_size, truncate_log_lines, truncation_marker};
use proptest::prelude::*;

/// 양끝이 공백이 아닌 한 줄 (첫 줄 다듬기의 영향을 받지 않음)
fn line() -> impl Strategy<Value = String> {
    "[a-z0-9]([a-z0-9 :=]{0,30}[a-z0-9])?"
}

proptest! {
    #[test]
    fn keeps_exactly_the_last_n_lines(
        lines in prop::collection::vec(line(), 1..200),
        n in 1i64..50,
    ) {
        let content = lines.join("\n");
        let out = truncate_log_lines(&content, n);
        let newlines = lines.len() - 1;

        if (newlines as i64) < n {
            prop_assert_eq!(out.as_ref(), content.as_str());
        } else {
            let marker = truncation_marker(n);
            prop_assert!(out.starts_with(&marker));
            let expected = lines[lines.len() - n as usize..].join("\n");
            prop_assert_eq!(&out[marker.len()..], expected.as_str());
        }
    }

    #[test]
    fn non_positive_limit_is_identity(content in ".{0,200}", n in -100i64..=0) {
        let out = truncate_log_lines(&content, n);
        prop_assert_eq!(out.as_ref(), content.as_str());
    }

    #[test]
    fn bounded_output_never_exceeds_limit(
        content in prop::collection::vec(any::<u8>(), 0..4096),
        limit in 1u64..2048,
    ) {
        let out = bound_size(&content, limit, "size limit exceeded");
        prop_assert!(out.len() as u64 <= limit);
        if content.len() as u64 <= limit {
            prop_assert_eq!(out.as_ref(), content.as_slice());
        }
    }
}
