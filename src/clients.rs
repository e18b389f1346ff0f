//! src/clients.rs
//!
//! The HTTP client set the engine owns for the duration of one scan, and
//! the client-selection rule. `ClientSet` is built once per `scan` call and
//! dropped at the end of it — Rust's ordinary RAII drop gives the same
//! "release on every exit path" guarantee the source's
//! `contextlib.AsyncExitStack` gives explicitly (spec.md §4.G step 3,
//! §9 "Scoped resource release").

use reqwest::Client;
use tracing::debug;

/// Environment variable naming the Tor/darkweb proxy URL. When set, all
/// `.onion` URLs route through it (SOCKS5h expected, for `.onion` DNS).
pub const TOR_PROXY_ENV: &str = "SOCIAL_HUNT_PROXY";

/// Environment variable naming an optional clearnet proxy URL, used only
/// by providers that opt in via `use_proxy = true`.
pub const CLEARNET_PROXY_ENV: &str = "SOCIAL_HUNT_CLEARNET_PROXY";

/// The up-to-three HTTP client handles a scan may dispatch through.
pub struct ClientSet {
    pub direct: Client,
    pub tor: Option<Client>,
    pub clearnet_proxy: Option<Client>,
}

impl ClientSet {
    /// Build the client set from the environment, following redirects by
    /// default per spec.md §6.
    pub fn from_env() -> reqwest::Result<Self> {
        Self::build(
            std::env::var(TOR_PROXY_ENV).ok(),
            std::env::var(CLEARNET_PROXY_ENV).ok(),
        )
    }

    /// Build from the environment, falling back to a direct-only client set
    /// on any builder error (bad proxy URL, TLS backend failure) so the
    /// engine itself never fails to start a scan — the failure is logged
    /// instead (spec.md §7 "Recovery": the engine is total).
    pub fn from_env_or_default() -> Self {
        match Self::from_env() {
            Ok(set) => set,
            Err(err) => {
                tracing::error!(error = %err, "failed to build configured HTTP client set, falling back to direct-only");
                ClientSet { direct: Client::new(), tor: None, clearnet_proxy: None }
            }
        }
    }

    pub fn build(tor_proxy_url: Option<String>, clearnet_proxy_url: Option<String>) -> reqwest::Result<Self> {
        let direct = Client::builder().redirect(reqwest::redirect::Policy::default()).build()?;

        let tor = match tor_proxy_url {
            Some(url) => {
                debug!("building Tor-routed client for .onion dispatch");
                Some(
                    Client::builder()
                        .proxy(reqwest::Proxy::all(url)?)
                        .redirect(reqwest::redirect::Policy::default())
                        .build()?,
                )
            }
            None => None,
        };

        let clearnet_proxy = match clearnet_proxy_url {
            Some(url) => {
                debug!("building clearnet-proxy client for opt-in providers");
                Some(
                    Client::builder()
                        .proxy(reqwest::Proxy::all(url)?)
                        .redirect(reqwest::redirect::Policy::default())
                        .build()?,
                )
            }
            None => None,
        };

        Ok(ClientSet { direct, tor, clearnet_proxy })
    }

    /// Client selection, first match wins (spec.md §4.G step 4):
    ///   1. `.onion` URL + Tor client present -> Tor client.
    ///   2. `use_proxy` + clearnet-proxy client present -> clearnet-proxy client.
    ///   3. otherwise -> direct client.
    pub fn select<'a>(&'a self, url: &str, use_proxy: bool) -> &'a Client {
        if url.contains(".onion") {
            if let Some(tor) = &self.tor {
                return tor;
            }
        }
        if use_proxy {
            if let Some(proxy) = &self.clearnet_proxy {
                return proxy;
            }
        }
        &self.direct
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn onion_routes_to_tor_when_present() {
        let set = ClientSet::build(Some("socks5h://127.0.0.1:9050".to_string()), None).unwrap();
        let selected = set.select("http://abc.onion/", false);
        assert!(std::ptr::eq(selected, set.tor.as_ref().unwrap()));
    }

    #[test]
    fn onion_falls_back_to_direct_without_tor_client() {
        let set = ClientSet::build(None, None).unwrap();
        let selected = set.select("http://abc.onion/", false);
        assert!(std::ptr::eq(selected, &set.direct));
    }

    #[test]
    fn use_proxy_routes_to_clearnet_proxy_when_present() {
        let set = ClientSet::build(None, Some("http://127.0.0.1:8080".to_string())).unwrap();
        let selected = set.select("https://example.com/", true);
        assert!(std::ptr::eq(selected, set.clearnet_proxy.as_ref().unwrap()));
    }

    #[test]
    fn plain_clearnet_without_use_proxy_is_direct() {
        let set = ClientSet::build(None, Some("http://127.0.0.1:8080".to_string())).unwrap();
        let selected = set.select("https://example.com/", false);
        assert!(std::ptr::eq(selected, &set.direct));
    }

    #[test]
    fn onion_beats_use_proxy_when_both_present() {
        let set = ClientSet::build(
            Some("socks5h://127.0.0.1:9050".to_string()),
            Some("http://127.0.0.1:8080".to_string()),
        )
        .unwrap();
        let selected = set.select("http://abc.onion/", true);
        assert!(std::ptr::eq(selected, set.tor.as_ref().unwrap()));
    }
}
