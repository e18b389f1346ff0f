//! src/ua.rs
//!
//! Static user-agent profile catalogue and the header-merge helper. Mirrors
//! `ua.py`'s `UA_PROFILES` / `merge_headers` in the original implementation;
//! the exact header values are a lookup-table concern the distilled spec
//! places out of scope, so the values below are a representative, stable
//! set rather than an exhaustive fingerprint database.

use std::collections::HashMap;
use std::sync::OnceLock;

/// A header bag: header name -> value, both owned strings.
pub type HeaderBag = HashMap<String, String>;

static UA_PROFILES: OnceLock<HashMap<&'static str, HeaderBag>> = OnceLock::new();

fn build_profiles() -> HashMap<&'static str, HeaderBag> {
    let mut profiles = HashMap::new();

    let mut desktop_chrome = HeaderBag::new();
    desktop_chrome.insert(
        "user-agent".into(),
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
         Chrome/124.0.0.0 Safari/537.36"
            .into(),
    );
    desktop_chrome.insert(
        "accept".into(),
        "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8".into(),
    );
    desktop_chrome.insert("accept-language".into(), "en-US,en;q=0.9".into());
    profiles.insert("desktop_chrome", desktop_chrome);

    let mut mobile_safari = HeaderBag::new();
    mobile_safari.insert(
        "user-agent".into(),
        "Mozilla/5.0 (iPhone; CPU iPhone OS 17_4 like Mac OS X) AppleWebKit/605.1.15 \
         (KHTML, like Gecko) Version/17.4 Mobile/15E148 Safari/604.1"
            .into(),
    );
    mobile_safari.insert(
        "accept".into(),
        "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8".into(),
    );
    mobile_safari.insert("accept-language".into(), "en-US,en;q=0.9".into());
    profiles.insert("mobile_safari", mobile_safari);

    profiles
}

/// Look up a profile by name. Returns an empty bag for an unknown name
/// rather than erroring — a missing profile just contributes nothing to
/// the merge.
pub fn profile(name: &str) -> HeaderBag {
    UA_PROFILES
        .get_or_init(build_profiles)
        .get(name)
        .cloned()
        .unwrap_or_default()
}

/// Produce a new header bag equal to `base` overlaid by `override_`:
/// override wins per key, neither input is mutated. Associative on
/// disjoint keys; on overlapping keys the rightmost (override) argument
/// wins — see the header-merge law in spec.md §8.
pub fn merge_headers(base: &HeaderBag, override_: &HeaderBag) -> HeaderBag {
    let mut out = base.clone();
    for (k, v) in override_ {
        out.insert(k.clone(), v.clone());
    }
    out
}
