#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use rampart_core::{
    coerce_array, coerce_date, coerce_id, coerce_number, coerce_object, coerce_string,
    safe_format_number, safe_get, safe_truncate, EntityId, NumberFormat, Value,
};
use rampart_test::properties;

#[derive(Debug, Arbitrary)]
struct Input {
    json: String,
    path: String,
    max_len: u8,
}

fuzz_target!(|input: Input| {
    let Ok(value) = serde_json::from_str::<Value>(&input.json) else {
        return;
    };

    let _ = coerce_string(&value, "");
    let _ = coerce_array(&value, Vec::new());
    let _ = coerce_object(&value, Default::default());
    let _ = coerce_date(&value, Default::default());
    let _ = safe_format_number(&value, &NumberFormat::default());
    let _: f64 = safe_get(&value, &input.path, 0.0);

    assert!(coerce_id(&value, EntityId::MIN).get() >= 1);
    assert!(coerce_number(&value, 0.0).is_finite());
    assert!(properties::sanitized_is_inert(&value));
    assert!(safe_truncate(&value, usize::from(input.max_len), "...").chars().count()
        <= usize::from(input.max_len).max(3));
});
