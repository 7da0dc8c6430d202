#![no_main]

use libfuzzer_sys::fuzz_target;
use rampart_core::Value;
use rampart_report::{classify, is_auth_error, ErrorLog, Failure};

fuzz_target!(|data: &[u8]| {
    let Ok(value) = serde_json::from_slice::<Value>(data) else {
        return;
    };

    let failure = Failure::from(value);
    let _ = classify(&failure);
    let _ = is_auth_error(&failure);

    let log = ErrorLog::with_capacity(4);
    let record = log.log_error(failure.clone(), Some("fuzz"));
    assert_eq!(record.message(), failure.message());
    assert_eq!(log.len(), 1);
    let _ = log.user_message(&failure);
});
