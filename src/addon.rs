//! src/addon.rs
//!
//! Second-stage post-processors that observe and may augment the
//! aggregated result list after all probes complete (spec.md §4.F, §4.H).
//! Analogous to `ProviderRegistry`, plus a separate enabled-name list
//! sourced from persisted configuration. Disabled addons remain in the
//! registry but are never invoked.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;

use crate::error::HuntError;
use crate::rate_limit::HostRateLimiter;
use crate::types::ProviderResult;

/// A post-processor with the signature `run(identifier, results, client,
/// limiter)`. Observes and may append to `results` in place — its
/// contracted enrichment channel. Addons must not invoke other addons or
/// the engine recursively, and a failing addon is swallowed by the engine
/// (best-effort enrichment, spec.md §4.G step 2).
#[async_trait]
pub trait Addon: Send + Sync {
    fn name(&self) -> &'static str;

    async fn run(
        &self,
        identifier: &str,
        results: &mut Vec<ProviderResult>,
        client: &Client,
        limiter: &HostRateLimiter,
    ) -> anyhow::Result<()>;
}

/// Name -> addon instance mapping, plus the set of names enabled from
/// persisted configuration. Built once; the enabled set can be changed
/// cheaply since it is a plain `Vec<String>` snapshot.
pub struct AddonRegistry {
    by_name: BTreeMap<String, Arc<dyn Addon>>,
    enabled: Vec<String>,
}

impl AddonRegistry {
    pub fn build(addons: Vec<Arc<dyn Addon>>, enabled: Vec<String>) -> Result<Self, HuntError> {
        let mut by_name = BTreeMap::new();
        for addon in addons {
            let name = addon.name().to_string();
            if by_name.contains_key(&name) {
                return Err(HuntError::DuplicateAddon(name));
            }
            by_name.insert(name, addon);
        }
        Ok(AddonRegistry { by_name, enabled })
    }

    /// The addons to run for one scan: every registered-and-enabled addon,
    /// plus any caller-supplied dynamic addons appended at the end.
    pub fn resolve(&self, dynamic: Vec<Arc<dyn Addon>>) -> Vec<Arc<dyn Addon>> {
        let mut out: Vec<Arc<dyn Addon>> = self
            .enabled
            .iter()
            .filter_map(|name| self.by_name.get(name).cloned())
            .collect();
        out.extend(dynamic);
        out
    }
}
