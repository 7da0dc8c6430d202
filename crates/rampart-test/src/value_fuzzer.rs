//! Value Fuzzer - Hostile dynamic values against the safety layer
//!
//! Tests:
//! - Coercion totality and shape
//! - Display sanitization and truncation bounds
//! - Error log bound and safe-call fallback
//! - Validated state range under arbitrary proposals
//! - Storage round trips

use std::sync::Arc;

use rampart_core::{
    coerce_number, coerce_string, safe_truncate, sanitize_string, Map, Value,
};
use rampart_report::{ErrorLog, Failure};
use rampart_state::{safe_number_state, SafeState};
use rampart_storage::{MemoryStore, SafeStorage};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::Number;

/// Strings that have broken parsers, renderers or classifiers before
const HOSTILE_STRINGS: &[&str] = &[
    "",
    "   ",
    "NaN",
    "Infinity",
    "-Infinity",
    "1e400",
    "  42  ",
    "3.14abc",
    "0x1F",
    "null",
    "undefined",
    "2024-02-30",
    "<script>alert('x')</script>",
    "\"/><img src=x onerror=alert(1)>",
    "../../etc/passwd",
    "\u{0}\u{1b}[31m",
    "😀👍🏽",
    "Network Error",
    "Request failed with status code 404",
    "401 Unauthorized",
];

/// Object keys the classifier looks at, plus noise
const KEYS: &[&str] = &["message", "status", "code", "response", "error", "id", "name", "__proto__"];

/// Fuzzer configuration
#[derive(Clone, Debug)]
pub struct FuzzerConfig {
    /// Number of values to generate
    pub value_count: usize,
    /// Maximum nesting of arrays and objects
    pub max_depth: usize,
    /// Maximum elements per array or object
    pub max_width: usize,
    /// Probability of picking a hostile string for a string slot
    pub hostile_prob: f64,
    /// Capacity of the error log under test
    pub log_capacity: usize,
    /// Random seed
    pub seed: u64,
}

impl Default for FuzzerConfig {
    fn default() -> Self {
        FuzzerConfig {
            value_count: 1000,
            max_depth: 4,
            max_width: 6,
            hostile_prob: 0.3,
            log_capacity: 100,
            seed: 42,
        }
    }
}

impl FuzzerConfig {
    /// Light fuzzing for quick tests
    pub fn light() -> Self {
        FuzzerConfig {
            value_count: 100,
            max_depth: 2,
            max_width: 4,
            hostile_prob: 0.2,
            log_capacity: 16,
            seed: 42,
        }
    }

    /// Heavy fuzzing for thorough testing
    pub fn heavy() -> Self {
        FuzzerConfig {
            value_count: 10_000,
            max_depth: 6,
            max_width: 8,
            hostile_prob: 0.4,
            log_capacity: 100,
            seed: 42,
        }
    }

    /// Mostly hostile strings, deep nesting, tiny log
    pub fn adversarial() -> Self {
        FuzzerConfig {
            value_count: 5000,
            max_depth: 8,
            max_width: 10,
            hostile_prob: 0.9,
            log_capacity: 3,
            seed: 42,
        }
    }
}

/// An invariant that failed for a generated value
#[derive(Clone, Debug, PartialEq)]
pub struct Violation {
    pub invariant: &'static str,
    pub value: Value,
}

/// Fuzzing result
#[derive(Clone, Debug, Default)]
pub struct FuzzReport {
    pub values_checked: usize,
    pub records_logged: u64,
    pub violations: Vec<Violation>,
}

impl FuzzReport {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Value fuzzer
pub struct ValueFuzzer {
    config: FuzzerConfig,
    rng: StdRng,
}

impl ValueFuzzer {
    pub fn new(config: FuzzerConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        ValueFuzzer { config, rng }
    }

    /// Generate one random value
    pub fn generate_value(&mut self) -> Value {
        self.generate_at(0)
    }

    fn generate_at(&mut self, depth: usize) -> Value {
        let leaf_only = depth >= self.config.max_depth;
        let kind = if leaf_only {
            self.rng.gen_range(0..4)
        } else {
            self.rng.gen_range(0..6)
        };

        match kind {
            0 => Value::Null,
            1 => Value::Bool(self.rng.gen()),
            2 => self.generate_number(),
            3 => Value::String(self.generate_string()),
            4 => {
                let len = self.rng.gen_range(0..=self.config.max_width);
                Value::Array((0..len).map(|_| self.generate_at(depth + 1)).collect())
            }
            _ => Value::Object(self.generate_object(depth)),
        }
    }

    /// Numbers that survive a JSON text round trip exactly
    fn generate_number(&mut self) -> Value {
        match self.rng.gen_range(0..4) {
            0 => Value::Number(self.rng.gen::<i64>().into()),
            1 => Value::Number(self.rng.gen::<u64>().into()),
            2 => Value::Number(self.rng.gen_range(0..600u16).into()),
            _ => {
                let quarters = self.rng.gen_range(-4_000_000i32..4_000_000);
                Number::from_f64(f64::from(quarters) / 4.0).map_or(Value::Null, Value::Number)
            }
        }
    }

    fn generate_string(&mut self) -> String {
        if self.rng.gen::<f64>() < self.config.hostile_prob {
            let idx = self.rng.gen_range(0..HOSTILE_STRINGS.len());
            return HOSTILE_STRINGS[idx].to_string();
        }

        let len = self.rng.gen_range(0..40);
        (0..len)
            .map(|_| match self.rng.gen_range(0..10) {
                0 => '<',
                1 => '/',
                2 => self.rng.gen_range('\u{a0}'..='\u{2fff}'),
                _ => self.rng.gen_range('a'..='z'),
            })
            .collect()
    }

    fn generate_object(&mut self, depth: usize) -> Map<String, Value> {
        let len = self.rng.gen_range(0..=self.config.max_width);
        let mut map = Map::new();
        for _ in 0..len {
            let key = if self.rng.gen_bool(0.7) {
                KEYS[self.rng.gen_range(0..KEYS.len())].to_string()
            } else {
                self.generate_string()
            };
            let value = self.generate_at(depth + 1);
            map.insert(key, value);
        }
        map
    }

    /// Run the fuzzer
    pub fn run(&mut self) -> FuzzReport {
        let log = Arc::new(ErrorLog::with_capacity(self.config.log_capacity));
        let storage = SafeStorage::local(MemoryStore::new());
        let state = safe_number_state(50.0, Some(0.0), Some(100.0)).with_log(log.clone());

        let mut report = FuzzReport::default();
        for i in 0..self.config.value_count {
            let value = self.generate_value();
            let key = format!("fuzz-{i}");

            let mut check = |invariant: &'static str, holds: bool| {
                if !holds {
                    report.violations.push(Violation {
                        invariant,
                        value: value.clone(),
                    });
                }
            };

            check("number_finite", properties::number_coercion_is_finite(&value));
            check("string_identity", properties::string_coercion_keeps_strings(&value));
            check("sanitized_inert", properties::sanitized_is_inert(&value));
            check("truncate_bounded", properties::truncate_is_bounded(&value, 20));
            check("safe_call_fallback", properties::safe_call_falls_back(&log, &value));
            check("log_bounded", log.len() <= log.capacity());
            check("state_in_range", properties::state_stays_in_range(&state, &value, 0.0, 100.0));
            check("storage_round_trip", properties::storage_round_trips(&storage, &key, &value));

            report.values_checked += 1;
        }

        report.records_logged = log.total_captured();
        report
    }
}

/// Single-value invariants, usable from property tests
pub mod properties {
    use super::*;

    /// Coerced numbers are finite
    pub fn number_coercion_is_finite(value: &Value) -> bool {
        coerce_number(value, 0.0).is_finite()
    }

    /// Strings pass through string coercion unchanged
    pub fn string_coercion_keeps_strings(value: &Value) -> bool {
        match value {
            Value::String(s) => coerce_string(value, "fallback") == *s,
            _ => true,
        }
    }

    /// Escaped display text carries no markup characters
    pub fn sanitized_is_inert(value: &Value) -> bool {
        let escaped = sanitize_string(&coerce_string(value, ""));
        !escaped.contains(&['<', '>', '"', '\'', '/'][..])
    }

    pub fn truncate_is_bounded(value: &Value, max_len: usize) -> bool {
        safe_truncate(value, max_len, "...").chars().count() <= max_len.max(3)
    }

    /// A failing safe call returns its fallback and logs exactly once
    pub fn safe_call_falls_back(log: &ErrorLog, value: &Value) -> bool {
        let before = log.total_captured();
        let failure = Failure::from(value.clone());
        let result = log.safe_call(|| Err::<u8, _>(failure), 7, Some("fuzz"));
        result == 7 && log.total_captured() == before + 1
    }

    /// A range-checked cell never leaves its range, whatever is proposed
    pub fn state_stays_in_range(state: &SafeState<f64>, value: &Value, min: f64, max: f64) -> bool {
        state.set(coerce_number(value, f64::NAN));
        let current = state.get();
        (min..=max).contains(&current)
    }

    pub fn storage_round_trips(storage: &SafeStorage<MemoryStore>, key: &str, value: &Value) -> bool {
        storage.set(key, value) && storage.get(key, Value::Bool(false)) == *value
    }
}
