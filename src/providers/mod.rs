//! Reference providers ported from the original Python implementation's
//! `providers/` package. Each submodule's public type corresponds to one
//! Python provider module; `reference_set` aggregates them the way each
//! Python module's trailing `PROVIDERS = [...]` constant did.

pub mod breachvip;
pub mod discord;
pub mod goodreads;
pub mod goyimtv;
pub mod hibp;
pub mod leakcheck;
pub mod snusbase;
pub mod stackoverflow;

use std::sync::Arc;

use crate::config::Settings;
use crate::provider::Provider;

/// Build the full set of reference providers, wiring each API-key-gated one
/// to its key in `settings` (falling back to an unset key, which each such
/// provider turns into an `UNKNOWN` "Skipped: ..." result rather than an
/// error).
pub fn reference_set(settings: &Settings) -> Vec<Arc<dyn Provider>> {
    vec![
        Arc::new(discord::DiscordProvider),
        Arc::new(stackoverflow::StackOverflowProvider),
        Arc::new(goodreads::GoodreadsProvider),
        Arc::new(goyimtv::GoyimTvProvider),
        Arc::new(hibp::HibpProvider::new(settings.hibp_api_key.clone())),
        Arc::new(leakcheck::LeakCheckProvider::new(settings.leakcheck_api_key.clone())),
        Arc::new(snusbase::SnusbaseProvider::new(settings.snusbase_api_key.clone())),
        Arc::new(breachvip::BreachVipProvider),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_set_has_no_duplicate_names() {
        let settings = Settings::default();
        let providers = reference_set(&settings);
        let mut names: Vec<&str> = providers.iter().map(|p| p.name()).collect();
        names.sort();
        let before = names.len();
        names.dedup();
        assert_eq!(names.len(), before);
    }

    #[test]
    fn reference_set_has_eight_providers() {
        let settings = Settings::default();
        assert_eq!(reference_set(&settings).len(), 8);
    }
}
