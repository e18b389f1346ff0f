//! src/provider.rs
//!
//! The abstract probe interface every site-specific provider implements
//! (spec.md §4.C). Dispatch is via a trait object (`Arc<dyn Provider>`)
//! rather than an enum, since the registry is built by enumerating a
//! conceptually open set of conforming implementations — mirroring how
//! `ccstatus` defines its async collaborators with `async-trait`.

use async_trait::async_trait;
use reqwest::Client;

use crate::ua::HeaderBag;
use crate::types::ProviderResult;

/// A single site/service-specific checker.
///
/// Implementations must be reentrant — `check` may be called concurrently
/// for distinct identifiers — and must not mutate the `headers` bag they
/// are given. `check` must never raise: any transport or parsing failure is
/// converted into a `ProviderResult` with `status = ERROR` and a populated
/// `error` string.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Probe name (lowercase, unique within a scan).
    fn name(&self) -> &'static str;

    /// Outer timeout budget in seconds; the engine adds a 5-second slack on
    /// top of this for its own enforcement (spec.md §4.G step 6).
    fn timeout_sec(&self) -> u64 {
        15
    }

    /// Catalogue key selecting this provider's preferred header profile.
    fn ua_profile(&self) -> &'static str {
        "desktop_chrome"
    }

    /// Whether this provider opts in to clearnet proxy routing when
    /// `SOCIAL_HUNT_CLEARNET_PROXY` is configured.
    fn use_proxy(&self) -> bool {
        false
    }

    /// Pure, total, no I/O: returns a canonical URL even for malformed
    /// input, falling back to a stable search or root URL.
    fn build_url(&self, identifier: &str) -> String;

    /// Performs I/O using the supplied client and header set; returns a
    /// fully-populated `ProviderResult`.
    async fn check(&self, identifier: &str, client: &Client, headers: &HeaderBag) -> ProviderResult;
}
