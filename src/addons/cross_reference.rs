//! Summarizes breach coverage across every provider that reported
//! `breach_sources` in its profile, appending one synthetic result rather
//! than mutating the providers' own entries.

use async_trait::async_trait;
use reqwest::Client;
use std::collections::BTreeSet;

use crate::addon::Addon;
use crate::rate_limit::HostRateLimiter;
use crate::types::{ProviderResult, ResultStatus};

#[derive(Debug, Default)]
pub struct CrossReferenceAddon;

#[async_trait]
impl Addon for CrossReferenceAddon {
    fn name(&self) -> &'static str {
        "cross-reference"
    }

    async fn run(
        &self,
        identifier: &str,
        results: &mut Vec<ProviderResult>,
        _client: &Client,
        _limiter: &HostRateLimiter,
    ) -> anyhow::Result<()> {
        let mut sources: BTreeSet<String> = BTreeSet::new();
        let mut contributing = Vec::new();

        for result in results.iter() {
            if result.status != ResultStatus::Found {
                continue;
            }
            if let Some(serde_json::Value::Array(arr)) = result.profile.get("breach_sources") {
                let mut any = false;
                for v in arr {
                    if let Some(s) = v.as_str() {
                        sources.insert(s.to_string());
                        any = true;
                    }
                }
                if any {
                    contributing.push(result.provider.clone());
                }
            }
        }

        if sources.is_empty() {
            return Ok(());
        }

        let mut profile = serde_json::Map::new();
        profile.insert("breach_sources".into(), serde_json::json!(sources.iter().cloned().collect::<Vec<_>>()));
        profile.insert("breach_source_count".into(), serde_json::json!(sources.len()));
        profile.insert("contributing_providers".into(), serde_json::json!(contributing));

        let mut evidence = serde_json::Map::new();
        evidence.insert("note".into(), serde_json::json!("Aggregated across providers reporting breach_sources."));

        results.push(
            ProviderResult::new(self.name(), identifier, "")
                .with_status(ResultStatus::Found)
                .with_evidence(evidence)
                .with_profile(profile),
        );

        Ok(())
    }
}
