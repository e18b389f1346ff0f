//! src/config.rs
//!
//! Read-only persisted configuration: per-provider API keys and other
//! secrets stored in `data/settings.json` relative to an installable root.
//! Mirrors `paths.resolve_path` + `json.load` in the original
//! implementation. A missing file is not an error — it yields
//! `Settings::default()`, and providers that need a key convert its
//! absence into an `UNKNOWN` "Skipped: …" result themselves.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::error::HuntError;

/// Secrets loaded from `data/settings.json`. Unknown top-level keys are
/// preserved in `extra` so forward-compatible settings files don't need a
/// schema change here.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub hibp_api_key: Option<String>,
    #[serde(default)]
    pub leakcheck_api_key: Option<String>,
    #[serde(default)]
    pub snusbase_api_key: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Resolve `data/settings.json` under `root` and load it. Returns
/// `Settings::default()` (no keys configured) if the file does not exist.
pub fn load_settings(root: impl AsRef<Path>) -> Result<Settings, HuntError> {
    let path = settings_path(root);
    if !path.exists() {
        debug!(path = %path.display(), "settings file not found, using defaults");
        return Ok(Settings::default());
    }
    let raw = std::fs::read_to_string(&path)?;
    let settings: Settings = serde_json::from_str(&raw)?;
    Ok(settings)
}

fn settings_path(root: impl AsRef<Path>) -> PathBuf {
    root.as_ref().join("data").join("settings.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_settings_file_yields_defaults() {
        let tmp = std::env::temp_dir().join("social-hunt-test-missing-settings");
        let settings = load_settings(&tmp).unwrap();
        assert!(settings.hibp_api_key.is_none());
    }

    #[test]
    fn loads_known_and_preserves_unknown_keys() {
        let dir = tempdir();
        std::fs::create_dir_all(dir.join("data")).unwrap();
        std::fs::write(
            dir.join("data/settings.json"),
            r#"{"hibp_api_key": "abc", "some_future_key": 42}"#,
        )
        .unwrap();

        let settings = load_settings(&dir).unwrap();
        assert_eq!(settings.hibp_api_key.as_deref(), Some("abc"));
        assert_eq!(settings.extra.get("some_future_key").unwrap(), 42);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    fn tempdir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "social-hunt-test-{}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }
}
