//! src/lib.rs
//!
//! Core scan engine for a multi-provider OSINT identifier lookup tool.
//! Aggregates independent, site-specific probes behind one bounded-fan-out
//! scan call, plus an addon stage that can enrich the aggregated result set
//! (spec.md §1-§2). This crate is the engine only: no CLI argument surface
//! or output formatting lives here (see `src/bin/social-hunt.rs` for a thin
//! demo front-end).

pub mod addon;
pub mod addons;
pub mod clients;
pub mod config;
pub mod demo;
pub mod engine;
pub mod error;
pub mod provider;
pub mod providers;
pub mod rate_limit;
pub mod registry;
pub mod types;
pub mod ua;

pub use addon::{Addon, AddonRegistry};
pub use clients::ClientSet;
pub use config::{load_settings, Settings};
pub use demo::{is_demo_mode, set_demo_mode, DefaultRedactor, Redactor};
pub use engine::{ScanEngine, ScanOptions};
pub use error::HuntError;
pub use provider::Provider;
pub use rate_limit::HostRateLimiter;
pub use registry::ProviderRegistry;
pub use types::{EvidenceMap, ProbeMeta, ProviderResult, ResultStatus};
