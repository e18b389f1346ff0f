//! src/types.rs
//!
//! The normalised result record every probe returns, and the five-valued
//! status it carries. See `providers_base.py` / `types.py` in the original
//! implementation for the shape this mirrors.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The normalised verdict a probe reaches about an identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResultStatus {
    /// Positive identification of the identifier on the target.
    Found,
    /// Authoritative negative, including probe-side format rejection.
    NotFound,
    /// The target refused or rate-limited the probe (403/429/503, captcha).
    Blocked,
    /// Transport failure, malformed response, or 5xx other than 503.
    Error,
    /// Probe ran but the verdict is indeterminate (includes missing-credential skips).
    Unknown,
}

impl Default for ResultStatus {
    fn default() -> Self {
        ResultStatus::Unknown
    }
}

/// An open mapping of probe-specific evidence or extracted profile data.
///
/// `evidence`/`profile` are inherently schema-loose per the source
/// providers (breach counts, source lists, nested data-type histograms,
/// truncated raw result lists). `serde_json::Map<String, Value>` already is
/// the recursive `null | bool | number | string | array | object` type
/// needed to carry that losslessly across the JSON boundary, so it is used
/// directly rather than a hand-rolled tagged enum.
pub type EvidenceMap = Map<String, Value>;

/// The record every probe produces, exactly once per (scan, provider) pair.
/// Immutable after emission; the engine only ever constructs new values,
/// never mutates a `ProviderResult` it has already produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderResult {
    /// Probe name (lowercase identifier, unique within a scan).
    pub provider: String,
    /// Echo of the input identifier.
    pub username: String,
    /// The canonical URL the probe examined or would link to.
    pub url: String,
    /// The normalised verdict.
    pub status: ResultStatus,
    /// HTTP status code of the primary response, absent when none arrived.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
    /// Wall-clock duration of the probe call, from engine dispatch to
    /// record emission.
    pub elapsed_ms: u64,
    /// Open mapping of short keys to primitive or nested values justifying
    /// the status.
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub evidence: EvidenceMap,
    /// Open mapping of extracted semi-structured data.
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub profile: EvidenceMap,
    /// Short human-readable string, present iff status is ERROR, BLOCKED,
    /// UNKNOWN, or (for format-rejection cases) NOT_FOUND.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Emit time in ISO-8601 UTC with timezone designator.
    pub timestamp_iso: String,
}

impl ProviderResult {
    /// Start building a result for `provider`/`username` with the
    /// zero-value defaults the spec mandates: `status = UNKNOWN`, empty
    /// maps, zero elapsed time, no http_status, no error, timestamp set to
    /// now. Every field can be overridden with the builder methods below.
    pub fn new(provider: impl Into<String>, username: impl Into<String>, url: impl Into<String>) -> Self {
        ProviderResult {
            provider: provider.into(),
            username: username.into(),
            url: url.into(),
            status: ResultStatus::Unknown,
            http_status: None,
            elapsed_ms: 0,
            evidence: Map::new(),
            profile: Map::new(),
            error: None,
            timestamp_iso: Utc::now().to_rfc3339(),
        }
    }

    pub fn with_status(mut self, status: ResultStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_http_status(mut self, status: impl Into<Option<u16>>) -> Self {
        self.http_status = status.into();
        self
    }

    pub fn with_elapsed_ms(mut self, ms: u64) -> Self {
        self.elapsed_ms = ms;
        self
    }

    pub fn with_evidence(mut self, evidence: EvidenceMap) -> Self {
        self.evidence = evidence;
        self
    }

    pub fn with_profile(mut self, profile: EvidenceMap) -> Self {
        self.profile = profile;
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

/// Immutable, per-instance probe metadata (spec.md §3 "Probe metadata").
#[derive(Debug, Clone)]
pub struct ProbeMeta {
    pub name: &'static str,
    pub timeout_sec: u64,
    pub ua_profile: &'static str,
    pub use_proxy: bool,
}
