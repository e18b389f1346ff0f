//! Goodreads: no clean username-based profile URL exists, so this provider
//! searches and extracts the first `/user/show/...` profile link from the
//! results page. Grounded on `providers/goodreads.py`.

use async_trait::async_trait;
use reqwest::Client;
use std::sync::OnceLock;

use crate::provider::Provider;
use crate::types::{ProviderResult, ResultStatus};
use crate::ua::HeaderBag;

#[derive(Debug, Default)]
pub struct GoodreadsProvider;

fn profile_link_re() -> &'static regex::Regex {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(|| regex::Regex::new(r#"href="(/user/show/[^"]+)""#).unwrap())
}

#[async_trait]
impl Provider for GoodreadsProvider {
    fn name(&self) -> &'static str {
        "goodreads"
    }

    fn timeout_sec(&self) -> u64 {
        10
    }

    fn build_url(&self, identifier: &str) -> String {
        format!("https://www.goodreads.com/search?q={}", urlencode(identifier))
    }

    async fn check(&self, identifier: &str, client: &Client, headers: &HeaderBag) -> ProviderResult {
        let search_url = self.build_url(identifier);
        let mut req = client.get(&search_url);
        for (k, v) in headers {
            req = req.header(k.as_str(), v.as_str());
        }

        match req.send().await {
            Ok(resp) => {
                let status_code = resp.status().as_u16();
                let text = resp.text().await.unwrap_or_default();
                let lower = text.to_lowercase();

                let mut evidence = serde_json::Map::new();
                evidence.insert("note".into(), serde_json::json!("Found via user search"));

                match profile_link_re().captures(&lower) {
                    Some(cap) => {
                        let profile_url = format!("https://www.goodreads.com{}", &cap[1]);
                        ProviderResult::new(self.name(), identifier, profile_url)
                            .with_status(ResultStatus::Found)
                            .with_http_status(Some(status_code))
                            .with_evidence(evidence)
                    }
                    None => ProviderResult::new(self.name(), identifier, search_url)
                        .with_status(ResultStatus::NotFound)
                        .with_http_status(Some(status_code))
                        .with_evidence(evidence),
                }
            }
            Err(err) => ProviderResult::new(self.name(), identifier, search_url)
                .with_status(ResultStatus::Error)
                .with_error(err.to_string()),
        }
    }
}

fn urlencode(s: &str) -> String {
    url::form_urlencoded::byte_serialize(s.as_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_url_encodes_query() {
        let p = GoodreadsProvider;
        assert_eq!(p.build_url("jane doe"), "https://www.goodreads.com/search?q=jane+doe");
    }

    #[test]
    fn profile_link_regex_extracts_href() {
        let html = r#"<a class="userProfileLink" href="/user/show/12345-jane">Jane</a>"#.to_lowercase();
        let cap = profile_link_re().captures(&html).unwrap();
        assert_eq!(&cap[1], "/user/show/12345-jane");
    }
}
