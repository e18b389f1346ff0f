//! src/registry.rs
//!
//! Name -> probe instance mapping. In the source implementation this is
//! built by scanning a `providers/` directory for every exported
//! `PROVIDERS` list; Rust has no runtime module discovery, so the
//! equivalent here is a constructor that takes the list of provider
//! instances directly (collected, in the demo binary and in
//! `providers::reference_set()`, from each provider module's own
//! constant list — the direct analogue of each Python file's
//! `PROVIDERS = [...]`).

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::HuntError;
use crate::provider::Provider;

/// Name -> probe instance mapping, built once and immutable thereafter.
/// Iteration order follows insertion order of the input list (a
/// `BTreeMap` keyed by name would reorder entries; we preserve the
/// registry's own insertion order in a side vector for the "filter
/// intersect preserving registry order" rule in spec.md §4.G step 1).
pub struct ProviderRegistry {
    order: Vec<String>,
    by_name: BTreeMap<String, Arc<dyn Provider>>,
}

impl ProviderRegistry {
    /// Build a registry from a list of provider instances. Duplicate names
    /// are a configuration error and fail loudly here rather than silently
    /// shadowing one provider with another.
    pub fn build(providers: Vec<Arc<dyn Provider>>) -> Result<Self, HuntError> {
        let mut order = Vec::with_capacity(providers.len());
        let mut by_name = BTreeMap::new();
        for provider in providers {
            let name = provider.name().to_string();
            if by_name.contains_key(&name) {
                return Err(HuntError::DuplicateProvider(name));
            }
            order.push(name.clone());
            by_name.insert(name, provider);
        }
        Ok(ProviderRegistry { order, by_name })
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Provider>> {
        self.by_name.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// All registered probes, in registry (insertion) order.
    pub fn all(&self) -> Vec<Arc<dyn Provider>> {
        self.order.iter().map(|n| self.by_name[n].clone()).collect()
    }

    /// Resolve the working probe set for a scan: if `filter` is given,
    /// intersect it with the registry preserving registry iteration order
    /// and silently dropping unknown names; otherwise the full registry.
    pub fn resolve(&self, filter: Option<&[String]>) -> Vec<Arc<dyn Provider>> {
        match filter {
            None => self.all(),
            Some(names) => {
                let wanted: std::collections::HashSet<&str> =
                    names.iter().map(|s| s.as_str()).collect();
                self.order
                    .iter()
                    .filter(|n| wanted.contains(n.as_str()))
                    .map(|n| self.by_name[n].clone())
                    .collect()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::Provider;
    use crate::types::ProviderResult;
    use crate::ua::HeaderBag;
    use async_trait::async_trait;
    use reqwest::Client;

    struct Stub(&'static str);

    #[async_trait]
    impl Provider for Stub {
        fn name(&self) -> &'static str {
            self.0
        }
        fn build_url(&self, identifier: &str) -> String {
            format!("https://example.com/{identifier}")
        }
        async fn check(&self, identifier: &str, _client: &Client, _headers: &HeaderBag) -> ProviderResult {
            ProviderResult::new(self.0, identifier, self.build_url(identifier))
        }
    }

    #[test]
    fn duplicate_names_fail_at_build() {
        let providers: Vec<Arc<dyn Provider>> = vec![Arc::new(Stub("p1")), Arc::new(Stub("p1"))];
        let err = ProviderRegistry::build(providers).unwrap_err();
        assert!(matches!(err, HuntError::DuplicateProvider(ref n) if n == "p1"));
    }

    #[test]
    fn resolve_preserves_registry_order_and_drops_unknown() {
        let providers: Vec<Arc<dyn Provider>> =
            vec![Arc::new(Stub("p2")), Arc::new(Stub("p1"))];
        let reg = ProviderRegistry::build(providers).unwrap();

        let filtered = reg.resolve(Some(&["p1".to_string(), "ghost".to_string()]));
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].name(), "p1");

        let all = reg.resolve(None);
        assert_eq!(all.iter().map(|p| p.name()).collect::<Vec<_>>(), vec!["p2", "p1"]);
    }
}
