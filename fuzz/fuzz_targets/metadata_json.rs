#![no_main]

use libfuzzer_sys::fuzz_target;

use kubetriage_artifacts::{RunRecord, TestRecord};

fuzz_target!(|data: &[u8]| {
    // 손상된 metadata.json을 읽어도 패닉 없이 에러로 끝나야 함
    if let Ok(record) = serde_json::from_slice::<TestRecord>(data) {
        let _ = serde_json::to_vec(&record);
    }
    if let Ok(record) = serde_json::from_slice::<RunRecord>(data) {
        let _ = serde_json::to_vec(&record);
    }
});
