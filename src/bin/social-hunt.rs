//! Minimal demo binary for the engine crate: parses a handful of flags,
//! runs one scan, and prints the results as JSON. The real CLI surface is
//! explicitly out of scope for this crate (SPEC_FULL.md §0).

use clap::Parser;
use std::sync::Arc;

use social_hunt::addon::AddonRegistry;
use social_hunt::{config, providers, registry::ProviderRegistry, set_demo_mode, ScanEngine, ScanOptions};

#[derive(Parser, Debug)]
#[command(author, version, about = "Run a Social-Hunt identifier scan against the reference provider set.")]
struct Cli {
    /// Identifier to scan (username, email, or phone depending on provider).
    identifier: String,

    /// Restrict the scan to these provider names (comma-separated).
    #[arg(long)]
    providers: Option<String>,

    /// Maximum number of in-flight probes.
    #[arg(long, default_value_t = social_hunt::engine::DEFAULT_MAX_CONCURRENCY)]
    concurrency: usize,

    /// Enable demo-mode redaction of sensitive evidence/profile fields.
    #[arg(long, default_value_t = false)]
    demo: bool,

    /// Run the cross-reference addon after the probe fan-out.
    #[arg(long, default_value_t = false)]
    cross_reference: bool,
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    set_demo_mode(cli.demo);

    let settings = config::load_settings(".").unwrap_or_default();
    let registry = ProviderRegistry::build(providers::reference_set(&settings))?;

    let enabled_addons = if cli.cross_reference { vec!["cross-reference".to_string()] } else { vec![] };
    let addon_registry = AddonRegistry::build(social_hunt::addons::reference_set(), enabled_addons)?;

    let engine = ScanEngine::new(registry, addon_registry)
        .with_max_concurrency(cli.concurrency)
        .with_demo_mode(cli.demo);

    let options = ScanOptions {
        providers: cli.providers.map(|s| s.split(',').map(|p| p.trim().to_string()).collect()),
        dynamic_addons: Vec::new(),
        progress: Some(Arc::new(|result| {
            tracing::info!(provider = %result.provider, status = ?result.status, "probe finished");
        })),
    };

    let results = engine.scan(&cli.identifier, options).await;
    println!("{}", serde_json::to_string_pretty(&results)?);

    Ok(())
}
