//! GoyimTV: a video-portal search endpoint protected by a basic anti-bot
//! layer. A single retry after a short sleep is attempted on a soft-block
//! status before giving up. Grounded on `providers/goyimtv.py`.

use async_trait::async_trait;
use reqwest::Client;
use std::sync::OnceLock;
use std::time::Duration;

use crate::provider::Provider;
use crate::types::{ProviderResult, ResultStatus};
use crate::ua::HeaderBag;

#[derive(Debug, Default)]
pub struct GoyimTvProvider;

fn channel_link_re() -> &'static regex::Regex {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(|| regex::Regex::new(r#"<a[^>]+href="([^"]*)"[^>]*>(.*?)</a>"#).unwrap())
}

fn title_re() -> &'static regex::Regex {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(|| regex::Regex::new(r"(?is)<title>(.*?)</title>").unwrap())
}

const NOT_FOUND_INDICATORS: &[&str] = &["no results found", "nothing found", "search returned no results"];

#[async_trait]
impl Provider for GoyimTvProvider {
    fn name(&self) -> &'static str {
        "goyimtv"
    }

    fn timeout_sec(&self) -> u64 {
        25
    }

    fn build_url(&self, identifier: &str) -> String {
        format!("https://goyimtv.st/search?tf=6&q={}", urlencode(identifier))
    }

    async fn check(&self, identifier: &str, client: &Client, headers: &HeaderBag) -> ProviderResult {
        let url = self.build_url(identifier);

        let mut req_headers = headers.clone();
        req_headers.insert(
            "Accept".into(),
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8".into(),
        );
        req_headers.insert("Accept-Language".into(), "en-US,en;q=0.5".into());
        req_headers.insert("Referer".into(), "https://goyimtv.st/".into());
        req_headers.insert("Upgrade-Insecure-Requests".into(), "1".into());
        req_headers.insert("Sec-Fetch-Dest".into(), "document".into());
        req_headers.insert("Sec-Fetch-Mode".into(), "navigate".into());
        req_headers.insert("Sec-Fetch-Site".into(), "same-origin".into());
        req_headers.insert("Sec-Fetch-User".into(), "?1".into());

        match self.fetch(client, &url, &req_headers).await {
            Ok((status_code, text, final_path)) => {
                let is_soft_block = matches!(status_code, 403 | 503 | 429);

                let (status_code, text, final_path) = if is_soft_block {
                    tokio::time::sleep(Duration::from_secs(2)).await;
                    match self.fetch(client, &url, &req_headers).await {
                        Ok(retried) => retried,
                        Err(err) => {
                            return ProviderResult::new(self.name(), identifier, url)
                                .with_status(ResultStatus::Error)
                                .with_error(err.to_string());
                        }
                    }
                } else {
                    (status_code, text, final_path)
                };

                let lower = text.to_lowercase();
                let title = title_re().captures(&text).map(|c| c[1].trim().to_string());

                let mut evidence = serde_json::Map::new();
                evidence.insert("len".into(), serde_json::json!(text.len()));
                evidence.insert("title".into(), serde_json::json!(title));

                let status = classify(&lower, identifier, &final_path);
                let mut profile = serde_json::Map::new();
                if status == ResultStatus::Found {
                    if let Some(t) = title {
                        profile.insert("page_title".into(), serde_json::json!(t));
                    }
                }

                ProviderResult::new(self.name(), identifier, url)
                    .with_status(status)
                    .with_http_status(Some(status_code))
                    .with_evidence(evidence)
                    .with_profile(profile)
            }
            Err(err) => ProviderResult::new(self.name(), identifier, url)
                .with_status(ResultStatus::Error)
                .with_error(err.to_string()),
        }
    }
}

impl GoyimTvProvider {
    async fn fetch(
        &self,
        client: &Client,
        url: &str,
        headers: &HeaderBag,
    ) -> reqwest::Result<(u16, String, String)> {
        let mut req = client.get(url);
        for (k, v) in headers {
            req = req.header(k.as_str(), v.as_str());
        }
        let resp = req.send().await?;
        let status_code = resp.status().as_u16();
        let final_path = resp.url().path().to_string();
        let text = resp.text().await.unwrap_or_default();
        Ok((status_code, text, final_path))
    }
}

fn classify(lower_text: &str, username: &str, final_path: &str) -> ResultStatus {
    if NOT_FOUND_INDICATORS.iter().any(|x| lower_text.contains(x)) {
        return ResultStatus::NotFound;
    }

    let uname_lower = username.to_lowercase();
    let mut found_match = false;

    for cap in channel_link_re().captures_iter(lower_text) {
        let href = &cap[1];
        let link_text = cap[2].trim();

        if href.contains("/channel/") && link_text == uname_lower {
            found_match = true;
            break;
        }
        if href.contains(&format!("/channel/{uname_lower}")) {
            found_match = true;
            break;
        }
    }

    if found_match {
        return ResultStatus::Found;
    }

    if lower_text.contains("welcome to goyimtv") && !final_path.contains("search") {
        return ResultStatus::NotFound;
    }
    ResultStatus::NotFound
}

fn urlencode(s: &str) -> String {
    url::form_urlencoded::byte_serialize(s.as_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_url_quotes_plus() {
        let p = GoyimTvProvider;
        assert_eq!(p.build_url("a b"), "https://goyimtv.st/search?tf=6&q=a+b");
    }

    #[test]
    fn classify_detects_not_found_indicator() {
        let status = classify("sorry, no results found for your query", "bob", "/search");
        assert_eq!(status, ResultStatus::NotFound);
    }

    #[test]
    fn classify_matches_channel_link_by_text() {
        let html = r#"<a href="/channel/239482" class="x">bob</a>"#;
        let status = classify(html, "bob", "/search");
        assert_eq!(status, ResultStatus::Found);
    }

    #[test]
    fn classify_matches_channel_link_by_vanity_href() {
        let html = r#"<a href="/channel/bob">Someone Else</a>"#;
        let status = classify(html, "bob", "/search");
        assert_eq!(status, ResultStatus::Found);
    }

    #[test]
    fn classify_defaults_not_found_without_match() {
        let html = r#"<a href="/about">About</a>"#;
        let status = classify(html, "bob", "/search");
        assert_eq!(status, ResultStatus::NotFound);
    }
}
