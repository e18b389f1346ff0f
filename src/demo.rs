//! src/demo.rs
//!
//! Demo-mode boundary: a process-wide, read-mostly toggle and the redactor
//! contract the engine queries exactly once per result (spec.md §4.I). The
//! distilled spec treats the redactor's exact censorship policy as an
//! external collaborator; this module defines the trait boundary plus one
//! concrete reference implementation grounded on `demo.py`'s usage in
//! `hibp.py` / `leakcheck.py` / `breach_vip.py` (key-aware leaf censorship,
//! a specialised censor for breach-record lists).

use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::Value;

static DEMO_MODE: AtomicBool = AtomicBool::new(false);

/// Returns the current process-wide demo-mode setting. Read-mostly: flipped
/// once at startup (typically from an environment variable) by
/// `set_demo_mode`, read by every scan thereafter.
pub fn is_demo_mode() -> bool {
    DEMO_MODE.load(Ordering::Relaxed)
}

/// Set the process-wide demo-mode flag. Exposed for startup wiring and for
/// tests that need to exercise both branches.
pub fn set_demo_mode(enabled: bool) {
    DEMO_MODE.store(enabled, Ordering::Relaxed);
}

/// The redactor contract: censor a single leaf value (given a hint about
/// which key it came from), or censor a list of structured breach records.
/// Implementations must be idempotent: censoring an already-censored value
/// must return it unchanged (spec.md §8 invariant 9).
pub trait Redactor: Send + Sync {
    fn censor_value(&self, value: &Value, key_hint: &str) -> Value;
    fn censor_breach_data(&self, records: &[Value]) -> Vec<Value>;
}

/// Reference redactor: masks values under keys that look sensitive
/// (password, email, phone, ip, address, dob, ssn) and otherwise passes
/// values through unchanged. Breach records get the same per-key treatment
/// applied field-by-field.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultRedactor;

const SENSITIVE_KEY_FRAGMENTS: &[&str] = &[
    "password", "pass", "email", "phone", "ip", "address", "dob", "ssn", "secret", "token",
];

const REDACTED: &str = "[REDACTED]";

fn key_is_sensitive(key: &str) -> bool {
    let lower = key.to_lowercase();
    SENSITIVE_KEY_FRAGMENTS.iter().any(|frag| lower.contains(frag))
}

impl Redactor for DefaultRedactor {
    fn censor_value(&self, value: &Value, key_hint: &str) -> Value {
        if value.as_str() == Some(REDACTED) {
            // Already censored — idempotent no-op.
            return value.clone();
        }
        if !key_is_sensitive(key_hint) {
            return value.clone();
        }
        match value {
            Value::Null => Value::Null,
            _ => Value::String(REDACTED.to_string()),
        }
    }

    fn censor_breach_data(&self, records: &[Value]) -> Vec<Value> {
        records
            .iter()
            .map(|rec| match rec {
                Value::Object(map) => {
                    let mut out = serde_json::Map::new();
                    for (k, v) in map {
                        out.insert(k.clone(), self.censor_value(v, k));
                    }
                    Value::Object(out)
                }
                other => other.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn non_sensitive_key_passes_through() {
        let r = DefaultRedactor;
        let v = json!("hello");
        assert_eq!(r.censor_value(&v, "breach_count"), v);
    }

    #[test]
    fn sensitive_key_is_masked() {
        let r = DefaultRedactor;
        let v = json!("alice@example.com");
        assert_eq!(r.censor_value(&v, "email"), json!(REDACTED));
    }

    #[test]
    fn censoring_twice_is_idempotent() {
        let r = DefaultRedactor;
        let v = json!("555-1234");
        let once = r.censor_value(&v, "phone");
        let twice = r.censor_value(&once, "phone");
        assert_eq!(once, twice);
    }

    #[test]
    fn censor_breach_data_masks_per_field() {
        let r = DefaultRedactor;
        let records = vec![json!({"email": "a@b.com", "source": "LeakSite"})];
        let censored = r.censor_breach_data(&records);
        assert_eq!(censored[0]["email"], json!(REDACTED));
        assert_eq!(censored[0]["source"], json!("LeakSite"));
    }

    #[test]
    #[serial_test::serial]
    fn demo_mode_flag_round_trips() {
        set_demo_mode(true);
        assert!(is_demo_mode());
        set_demo_mode(false);
        assert!(!is_demo_mode());
    }
}
