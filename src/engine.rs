//! src/engine.rs
//!
//! The central algorithm: fan-out, client routing, timeout enforcement,
//! demo redaction, progress reporting, and addon aggregation (spec.md §4.G).
//! Mirrors `SocialHuntEngine.scan_username` in `engine.py`, generalized to
//! an arbitrary identifier rather than a username specifically.

use std::sync::Arc;

use reqwest::Client;
use tokio::sync::Semaphore;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::addon::{Addon, AddonRegistry};
use crate::clients::ClientSet;
use crate::demo::{DefaultRedactor, Redactor};
use crate::provider::Provider;
use crate::rate_limit::HostRateLimiter;
use crate::registry::ProviderRegistry;
use crate::types::{ProviderResult, ResultStatus};
use crate::ua;

/// Default engine-wide concurrency cap (spec.md §5).
pub const DEFAULT_MAX_CONCURRENCY: usize = 6;
/// Default per-host minimum inter-dispatch interval, in seconds (spec.md §5).
pub const DEFAULT_MIN_HOST_INTERVAL_SEC: f64 = 1.2;
/// Slack added on top of a probe's own timeout for the engine's outer
/// enforcement (spec.md §4.G step 6, §5).
pub const TIMEOUT_SLACK_SEC: u64 = 5;

/// Caller-supplied invocation for one scan.
#[derive(Default)]
pub struct ScanOptions {
    /// Restrict the scan to these provider names; unknown names are
    /// silently dropped, no filter means "every registered provider".
    pub providers: Option<Vec<String>>,
    /// Extra addons supplied for this call only, appended after the
    /// registry's enabled set.
    pub dynamic_addons: Vec<Arc<dyn Addon>>,
    /// Invoked once per probe as results become available. May be called
    /// concurrently from multiple workers — it is the caller's
    /// responsibility to keep it fast and non-panicking.
    pub progress: Option<Arc<dyn Fn(&ProviderResult) + Send + Sync>>,
}

/// Fan-out, client routing, timeout enforcement, and result aggregation
/// over one `ProviderRegistry` + `AddonRegistry` pair. One engine instance
/// can run many scans; the host rate limiter's state persists across them,
/// since politeness is a property of the remote host, not of one call.
pub struct ScanEngine {
    registry: ProviderRegistry,
    addon_registry: AddonRegistry,
    limiter: Arc<HostRateLimiter>,
    max_concurrency: usize,
    redactor: Arc<dyn Redactor>,
    demo_mode: bool,
}

impl ScanEngine {
    pub fn new(registry: ProviderRegistry, addon_registry: AddonRegistry) -> Self {
        ScanEngine {
            registry,
            addon_registry,
            limiter: Arc::new(HostRateLimiter::new(DEFAULT_MIN_HOST_INTERVAL_SEC)),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            redactor: Arc::new(DefaultRedactor),
            demo_mode: false,
        }
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    pub fn with_min_host_interval_sec(mut self, secs: f64) -> Self {
        self.limiter = Arc::new(HostRateLimiter::new(secs));
        self
    }

    pub fn with_redactor(mut self, redactor: Arc<dyn Redactor>) -> Self {
        self.redactor = redactor;
        self
    }

    /// Demo mode is threaded through as a plain parameter rather than read
    /// from the global flag on every call, so tests can flip it without
    /// touching process-wide state (spec.md §9 design notes).
    pub fn with_demo_mode(mut self, enabled: bool) -> Self {
        self.demo_mode = enabled;
        self
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Run one scan. Always returns normally — per-probe failures surface
    /// as `ProviderResult`s with `status = ERROR/BLOCKED/UNKNOWN`, never as
    /// a propagated error (spec.md §7 "Recovery").
    pub async fn scan(&self, identifier: &str, options: ScanOptions) -> Vec<ProviderResult> {
        let chosen = self.registry.resolve(options.providers.as_deref());

        let client_set = Arc::new(ClientSet::from_env_or_default());
        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));

        let mut tasks = Vec::with_capacity(chosen.len());
        for provider in chosen {
            let identifier = identifier.to_string();
            let client_set = client_set.clone();
            let semaphore = semaphore.clone();
            let redactor = self.redactor.clone();
            let progress = options.progress.clone();
            let demo_mode = self.demo_mode;
            let limiter = self.limiter.clone();

            tasks.push(async move {
                run_one(
                    provider,
                    &identifier,
                    client_set,
                    limiter,
                    semaphore,
                    redactor,
                    demo_mode,
                    progress,
                )
                .await
            });
        }

        let results: Vec<ProviderResult> = futures_join_all(tasks).await;

        let addons_to_run = self.addon_registry.resolve(options.dynamic_addons);
        let results = if addons_to_run.is_empty() {
            results
        } else {
            self.run_addons(identifier, results, &client_set.direct, addons_to_run).await
        };

        let mut results = results;
        results.sort_by(|a, b| a.provider.to_lowercase().cmp(&b.provider.to_lowercase()));
        results
    }

    /// Runs every addon concurrently rather than serialized behind one held
    /// lock: each addon gets its own clone of the pre-addon result set to
    /// observe, mutate, or append to, and the clones are folded back into
    /// one list once every addon has finished (spec.md §4.G step 2 / §4.H
    /// "all addon tasks run concurrently"). In-place edits to a
    /// pre-existing entry are folded index-wise (last addon to touch a
    /// given index wins); entries an addon appended past the original
    /// length are concatenated. An addon that shrinks its own copy
    /// (filter/truncate) just contributes fewer edits rather than panicking.
    async fn run_addons(
        &self,
        identifier: &str,
        results: Vec<ProviderResult>,
        client_direct: &Client,
        addons: Vec<Arc<dyn Addon>>,
    ) -> Vec<ProviderResult> {
        let base_len = results.len();
        let mut tasks = Vec::with_capacity(addons.len());

        for addon in addons {
            let mut local = results.clone();
            let client = client_direct.clone();
            let identifier = identifier.to_string();
            let limiter = self.limiter.clone();
            tasks.push(async move {
                if let Err(err) = addon.run(&identifier, &mut local, &client, &limiter).await {
                    // Addon failures are swallowed — best-effort enrichment
                    // (spec.md §7 "Addon failure").
                    warn!(addon = addon.name(), error = %err, "addon failed, ignoring");
                }
                local
            });
        }

        let per_addon: Vec<Vec<ProviderResult>> = futures_join_all(tasks).await;

        let mut merged = results;
        for local in &per_addon {
            for (idx, entry) in local.iter().enumerate().take(base_len) {
                merged[idx] = entry.clone();
            }
        }
        for local in per_addon {
            if local.len() > base_len {
                merged.extend(local.into_iter().skip(base_len));
            }
        }
        merged
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_one(
    provider: Arc<dyn Provider>,
    identifier: &str,
    client_set: Arc<ClientSet>,
    limiter: Arc<HostRateLimiter>,
    semaphore: Arc<Semaphore>,
    redactor: Arc<dyn Redactor>,
    demo_mode: bool,
    progress: Option<Arc<dyn Fn(&ProviderResult) + Send + Sync>>,
) -> ProviderResult {
    let url = provider.build_url(identifier);

    let base_headers = ua::profile("desktop_chrome");
    let profile_headers = ua::profile(provider.ua_profile());
    let headers = ua::merge_headers(&base_headers, &profile_headers);

    limiter.wait(&url).await;

    let client = client_set.select(&url, provider.use_proxy()).clone();

    let permit = semaphore
        .acquire_owned()
        .await
        .expect("engine semaphore should never be closed during a scan");

    let outer_timeout_secs = provider.timeout_sec() + TIMEOUT_SLACK_SEC;
    let start = Instant::now();

    debug!(provider = provider.name(), url = %url, "dispatching probe");

    let mut result = match tokio::time::timeout(
        std::time::Duration::from_secs(outer_timeout_secs),
        provider.check(identifier, &client, &headers),
    )
    .await
    {
        Ok(res) => res,
        Err(_) => ProviderResult::new(provider.name(), identifier, provider.build_url(identifier))
            .with_status(ResultStatus::Error)
            .with_elapsed_ms(outer_timeout_secs * 1000)
            .with_error(format!("Timed out after {outer_timeout_secs}s")),
    };
    drop(permit);

    // elapsed_ms reflects engine dispatch-to-emission, overriding whatever
    // the probe itself measured, except on the timeout path above where it
    // is set to the timeout budget directly (matches `engine.py`).
    if result.elapsed_ms == 0 {
        result.elapsed_ms = start.elapsed().as_millis() as u64;
    }

    if demo_mode {
        redact_result(&mut result, redactor.as_ref());
    }

    if let Some(cb) = &progress {
        cb(&result);
    }

    result
}

/// Post-probe redaction over `profile` and `evidence`. `raw_results` lists
/// get the specialised breach-record censor; every other leaf (including
/// nested-mapping leaves) goes through `censor_value`. Redaction never
/// changes `status` (spec.md §4.G step 7).
fn redact_result(result: &mut ProviderResult, redactor: &dyn Redactor) {
    result.profile = censor_map(&result.profile, redactor);
    result.evidence = censor_map(&result.evidence, redactor);
}

fn censor_map(
    map: &serde_json::Map<String, serde_json::Value>,
    redactor: &dyn Redactor,
) -> serde_json::Map<String, serde_json::Value> {
    let mut out = serde_json::Map::new();
    for (key, value) in map {
        let censored = if key == "raw_results" {
            match value.as_array() {
                Some(list) => serde_json::Value::Array(redactor.censor_breach_data(list)),
                None => redactor.censor_value(value, key),
            }
        } else if let Some(nested) = value.as_object() {
            let mut inner = serde_json::Map::new();
            for (ik, iv) in nested {
                inner.insert(ik.clone(), redactor.censor_value(iv, ik));
            }
            serde_json::Value::Object(inner)
        } else {
            redactor.censor_value(value, key)
        };
        out.insert(key.clone(), censored);
    }
    out
}

/// Small local stand-in for `futures::future::join_all` so the crate does
/// not need to pull in the full `futures` crate for one call site; awaits
/// every future concurrently, preserving input order. Each future is handed
/// to its own `tokio::spawn`, so both it and its output must be `Send +
/// 'static` — true of every call site here since tasks only ever capture
/// owned/cloned `Arc`/`String`/`Client` values, never a borrow of `self`.
async fn futures_join_all<F, T>(futures: Vec<F>) -> Vec<T>
where
    F: std::future::Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    let mut handles = Vec::with_capacity(futures.len());
    for fut in futures {
        handles.push(tokio::spawn(async move { fut.await }));
    }
    let mut out = Vec::with_capacity(handles.len());
    for handle in handles {
        out.push(handle.await.expect("spawned task panicked"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::addon::Addon;
    use crate::types::ProviderResult;
    use crate::ua::HeaderBag;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct EchoProvider {
        name: &'static str,
        found: bool,
    }

    #[async_trait]
    impl Provider for EchoProvider {
        fn name(&self) -> &'static str {
            self.name
        }
        fn build_url(&self, identifier: &str) -> String {
            format!("https://example.com/{}/{identifier}", self.name)
        }
        async fn check(&self, identifier: &str, _client: &Client, _headers: &HeaderBag) -> ProviderResult {
            let status = if self.found { ResultStatus::Found } else { ResultStatus::NotFound };
            ProviderResult::new(self.name, identifier, self.build_url(identifier)).with_status(status)
        }
    }

    struct SleepyProvider;

    #[async_trait]
    impl Provider for SleepyProvider {
        fn name(&self) -> &'static str {
            "sleepy"
        }
        fn timeout_sec(&self) -> u64 {
            1
        }
        fn build_url(&self, identifier: &str) -> String {
            format!("https://slow.example/{identifier}")
        }
        async fn check(&self, identifier: &str, _client: &Client, _headers: &HeaderBag) -> ProviderResult {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            ProviderResult::new(self.name(), identifier, self.build_url(identifier))
        }
    }

    fn build_engine(providers: Vec<Arc<dyn Provider>>) -> ScanEngine {
        let registry = ProviderRegistry::build(providers).unwrap();
        let addon_registry = AddonRegistry::build(vec![], vec![]).unwrap();
        ScanEngine::new(registry, addon_registry)
            .with_min_host_interval_sec(0.0)
    }

    #[tokio::test]
    async fn empty_filter_runs_every_provider_sorted_by_name() {
        let providers: Vec<Arc<dyn Provider>> = vec![
            Arc::new(EchoProvider { name: "p2", found: true }),
            Arc::new(EchoProvider { name: "p1", found: false }),
        ];
        let engine = build_engine(providers);
        let results = engine.scan("alice", ScanOptions::default()).await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].provider, "p1");
        assert_eq!(results[0].status, ResultStatus::NotFound);
        assert_eq!(results[1].provider, "p2");
        assert_eq!(results[1].status, ResultStatus::Found);
    }

    #[tokio::test]
    async fn unknown_filter_name_is_dropped_without_error() {
        let providers: Vec<Arc<dyn Provider>> = vec![Arc::new(EchoProvider { name: "p1", found: true })];
        let engine = build_engine(providers);
        let options = ScanOptions {
            providers: Some(vec!["p1".into(), "ghost".into()]),
            ..Default::default()
        };
        let results = engine.scan("alice", options).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].provider, "p1");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn outer_timeout_synthesizes_error_result() {
        let providers: Vec<Arc<dyn Provider>> = vec![Arc::new(SleepyProvider)];
        let engine = build_engine(providers);

        tokio::time::pause();
        let scan_fut = engine.scan("alice", ScanOptions::default());
        tokio::pin!(scan_fut);

        // Advance virtual time past the provider's outer timeout budget
        // (1s + 5s slack) while the scan future is polled.
        let results = tokio::time::timeout(Duration::from_secs(10), async {
            tokio::time::advance(Duration::from_secs(7)).await;
            scan_fut.await
        })
        .await
        .expect("scan should resolve once virtual time passes the timeout");

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].status, ResultStatus::Error);
        assert!(results[0].error.as_deref().unwrap().starts_with("Timed out after"));
        assert_eq!(results[0].elapsed_ms, 6000);
    }

    #[tokio::test]
    async fn progress_callback_invoked_once_per_probe() {
        let providers: Vec<Arc<dyn Provider>> = vec![
            Arc::new(EchoProvider { name: "p1", found: true }),
            Arc::new(EchoProvider { name: "p2", found: false }),
        ];
        let engine = build_engine(providers);
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        let options = ScanOptions {
            progress: Some(Arc::new(move |_res: &ProviderResult| {
                calls_clone.fetch_add(1, Ordering::SeqCst);
            })),
            ..Default::default()
        };
        engine.scan("alice", options).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    struct AppendAddon;

    #[async_trait]
    impl Addon for AppendAddon {
        fn name(&self) -> &'static str {
            "appender"
        }
        async fn run(
            &self,
            identifier: &str,
            results: &mut Vec<ProviderResult>,
            _client: &Client,
            _limiter: &HostRateLimiter,
        ) -> anyhow::Result<()> {
            results.push(ProviderResult::new("zzz-addon", identifier, "https://addon.example/"));
            Ok(())
        }
    }

    #[tokio::test]
    async fn addons_can_append_results_and_run_after_probes() {
        let providers: Vec<Arc<dyn Provider>> = vec![Arc::new(EchoProvider { name: "p1", found: true })];
        let registry = ProviderRegistry::build(providers).unwrap();
        let addon_registry = AddonRegistry::build(vec![Arc::new(AppendAddon)], vec!["appender".into()]).unwrap();
        let engine = ScanEngine::new(registry, addon_registry).with_min_host_interval_sec(0.0);

        let results = engine.scan("alice", ScanOptions::default()).await;
        assert_eq!(results.len(), 2);
        assert_eq!(results.last().unwrap().provider, "zzz-addon");
    }

    struct FailingAddon;

    #[async_trait]
    impl Addon for FailingAddon {
        fn name(&self) -> &'static str {
            "failing"
        }
        async fn run(
            &self,
            _identifier: &str,
            _results: &mut Vec<ProviderResult>,
            _client: &Client,
            _limiter: &HostRateLimiter,
        ) -> anyhow::Result<()> {
            anyhow::bail!("boom")
        }
    }

    #[tokio::test]
    async fn addon_failure_is_swallowed() {
        let providers: Vec<Arc<dyn Provider>> = vec![Arc::new(EchoProvider { name: "p1", found: true })];
        let registry = ProviderRegistry::build(providers).unwrap();
        let addon_registry = AddonRegistry::build(vec![Arc::new(FailingAddon)], vec!["failing".into()]).unwrap();
        let engine = ScanEngine::new(registry, addon_registry).with_min_host_interval_sec(0.0);

        let results = engine.scan("alice", ScanOptions::default()).await;
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn demo_mode_redacts_sensitive_profile_leaves() {
        struct LeakyProvider;
        #[async_trait]
        impl Provider for LeakyProvider {
            fn name(&self) -> &'static str {
                "leaky"
            }
            fn build_url(&self, identifier: &str) -> String {
                format!("https://leaky.example/{identifier}")
            }
            async fn check(&self, identifier: &str, _client: &Client, _headers: &HeaderBag) -> ProviderResult {
                let mut profile = serde_json::Map::new();
                profile.insert("email".into(), serde_json::json!("alice@example.com"));
                profile.insert("breach_count".into(), serde_json::json!(3));
                ProviderResult::new(self.name(), identifier, self.build_url(identifier))
                    .with_status(ResultStatus::Found)
                    .with_profile(profile)
            }
        }

        let providers: Vec<Arc<dyn Provider>> = vec![Arc::new(LeakyProvider)];
        let engine = build_engine(providers).with_demo_mode(true);
        let results = engine.scan("alice", ScanOptions::default()).await;
        assert_eq!(results[0].profile["email"], serde_json::json!("[REDACTED]"));
        assert_eq!(results[0].profile["breach_count"], serde_json::json!(3));
    }

    #[tokio::test]
    async fn demo_redaction_is_idempotent() {
        let redactor = DefaultRedactor;
        let mut profile = serde_json::Map::new();
        profile.insert("email".into(), serde_json::json!("alice@example.com"));
        let once = censor_map(&profile, &redactor);
        let twice = censor_map(&once, &redactor);
        assert_eq!(once, twice);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn concurrency_cap_is_respected() {
        struct TrackedProvider {
            idx: usize,
            in_flight: Arc<AtomicUsize>,
            max_seen: Arc<AtomicUsize>,
        }

        const NAMES: [&str; 12] =
            ["p0", "p1", "p2", "p3", "p4", "p5", "p6", "p7", "p8", "p9", "p10", "p11"];

        #[async_trait]
        impl Provider for TrackedProvider {
            fn name(&self) -> &'static str {
                NAMES[self.idx]
            }
            fn build_url(&self, identifier: &str) -> String {
                format!("https://example.com/{}/{identifier}", self.idx)
            }
            async fn check(&self, identifier: &str, _client: &Client, _headers: &HeaderBag) -> ProviderResult {
                let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                self.max_seen.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(30)).await;
                self.in_flight.fetch_sub(1, Ordering::SeqCst);
                ProviderResult::new(format!("p{}", self.idx), identifier, self.build_url(identifier))
            }
        }

        let in_flight = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));
        let providers: Vec<Arc<dyn Provider>> = (0..12)
            .map(|idx| {
                Arc::new(TrackedProvider { idx, in_flight: in_flight.clone(), max_seen: max_seen.clone() })
                    as Arc<dyn Provider>
            })
            .collect();

        let engine = build_engine(providers).with_max_concurrency(3);
        let results = engine.scan("alice", ScanOptions::default()).await;
        assert_eq!(results.len(), 12);
        assert!(max_seen.load(Ordering::SeqCst) <= 3);
    }

    #[test]
    fn host_politeness_default_matches_spec() {
        assert_eq!(DEFAULT_MIN_HOST_INTERVAL_SEC, 1.2);
        assert_eq!(DEFAULT_MAX_CONCURRENCY, 6);
    }
}
