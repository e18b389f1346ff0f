//! src/error.rs
//!
//! Central error type for the engine's own fallible, non-probe operations.
//!
//! Probe failures never surface here: `Provider::check` contracts not to
//! raise, and converts every transport/parsing failure into a `ProbeResult`
//! with `status = ERROR` instead (see `engine.rs`). `HuntError` only covers
//! setup-time and configuration-time failures — building a registry or
//! loading settings.

use thiserror::Error;

/// Top-level error type for the crate.
#[derive(Debug, Error)]
pub enum HuntError {
    /// Two providers were registered under the same name.
    #[error("duplicate provider name in registry: {0}")]
    DuplicateProvider(String),

    /// Two addons were registered under the same name.
    #[error("duplicate addon name in registry: {0}")]
    DuplicateAddon(String),

    /// `data/settings.json` exists but could not be read.
    #[error("settings I/O error: {0}")]
    Settings(#[from] std::io::Error),

    /// `data/settings.json` exists and is readable but failed to parse.
    #[error("settings parse error: {0}")]
    SettingsParse(#[from] serde_json::Error),
}
