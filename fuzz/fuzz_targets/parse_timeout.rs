#![no_main]

use libfuzzer_sys::fuzz_target;

use kubetriage_core::duration::{format_duration, parse_timeout};

fuzz_target!(|data: &[u8]| {
    if let Ok(raw) = std::str::from_utf8(data) {
        // 파싱에 성공한 값은 포맷 후 다시 파싱해도 같아야 함
        if let Ok(duration) = parse_timeout(raw) {
            let formatted = format_duration(duration);
            let reparsed = parse_timeout(&formatted).expect("formatted duration parses");
            assert_eq!(reparsed, duration, "{raw:?} -> {formatted:?}");
        }
    }
});
