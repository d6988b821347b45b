#![no_main]

use libfuzzer_sys::fuzz_target;

use kubetriage_artifacts::storage::sanitize_filename;

fuzz_target!(|name: &str| {
    let safe = sanitize_filename(name);

    assert!(!safe.is_empty());
    assert!(safe != "." && safe != "..");
    assert!(!safe.contains('/'));
    assert!(!safe.contains('\\'));
    assert!(!safe.contains(' '));
});
