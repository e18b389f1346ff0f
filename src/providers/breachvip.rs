//! BreachVIP: field-auto-detected breach search, no API key required.
//! Response shape varies between bare arrays, `{results: [...]}`, and a
//! once-more-nested envelope; normalised before classification. Grounded on
//! `providers/breach_vip.py`.

use async_trait::async_trait;
use reqwest::Client;
use std::collections::BTreeMap;

use crate::demo::{is_demo_mode, DefaultRedactor, Redactor};
use crate::provider::Provider;
use crate::types::{ProviderResult, ResultStatus};
use crate::ua::HeaderBag;

const API_URL: &str = "https://breach.vip/api/search";

#[derive(Debug, Default)]
pub struct BreachVipProvider;

fn determine_search_fields(term: &str) -> Vec<&'static str> {
    let mut fields: Vec<&'static str> = Vec::new();

    if term.contains('@') && term.contains('.') {
        fields.extend(["email", "username", "name"]);
    } else {
        fields.extend(["username", "email", "name"]);
        if term.contains('.') && !term.contains('@') {
            fields.push("domain");
        }
    }

    let clean: String = term.chars().filter(|c| !matches!(c, '+' | '-' | ' ' | '(' | ')')).collect();
    if !clean.is_empty() && clean.chars().all(|c| c.is_ascii_digit()) && (7..=15).contains(&clean.len()) {
        fields.push("phone");
    }

    if !term.is_empty() && term.chars().all(|c| c.is_ascii_digit()) && (17..=20).contains(&term.len()) {
        fields.push("discordid");
    }

    if term.len() == 36 && term.contains('-') {
        fields.push("uuid");
    }

    if term.matches('.').count() == 3 {
        let parts: Vec<&str> = term.split('.').collect();
        if parts.iter().all(|p| p.parse::<u16>().map(|n| n <= 255).unwrap_or(false)) {
            fields.push("ip");
        }
    }

    fields.push("password");

    let mut seen = std::collections::BTreeSet::new();
    let mut out = Vec::new();
    for f in fields {
        if seen.insert(f) {
            out.push(f);
        }
        if out.len() == 10 {
            break;
        }
    }
    out
}

fn normalize_envelope(raw: serde_json::Value) -> Vec<serde_json::Value> {
    let mut data = match raw {
        serde_json::Value::Object(ref map) => {
            if let Some(serde_json::Value::Array(arr)) = map.get("results") {
                arr.clone()
            } else if let Some(serde_json::Value::Array(arr)) = map.get("data") {
                arr.clone()
            } else {
                vec![raw.clone()]
            }
        }
        serde_json::Value::Array(arr) => arr,
        other => vec![other],
    };

    if data.len() == 1 {
        if let serde_json::Value::Object(inner) = &data[0] {
            if let Some(serde_json::Value::Array(arr)) = inner.get("results") {
                data = arr.clone();
            } else if let Some(serde_json::Value::Array(arr)) = inner.get("data") {
                data = arr.clone();
            }
        }
    }

    data
}

#[async_trait]
impl Provider for BreachVipProvider {
    fn name(&self) -> &'static str {
        "breachvip"
    }

    fn timeout_sec(&self) -> u64 {
        15
    }

    fn build_url(&self, _identifier: &str) -> String {
        API_URL.to_string()
    }

    async fn check(&self, identifier: &str, _client: &Client, headers: &HeaderBag) -> ProviderResult {
        let url = self.build_url(identifier);
        let search_term = identifier.trim();

        let mut evidence = serde_json::Map::new();
        evidence.insert("breachvip".into(), serde_json::json!(true));

        if search_term.is_empty() {
            return ProviderResult::new(self.name(), identifier, url)
                .with_status(ResultStatus::Error)
                .with_evidence(evidence)
                .with_error("empty input");
        }

        let mut breachvip_headers = headers.clone();
        for (k, v) in [
            ("Accept", "application/json, text/plain, */*"),
            ("Accept-Encoding", "gzip, deflate, br"),
            ("Accept-Language", "en-US,en;q=0.9"),
            ("Cache-Control", "no-cache"),
            ("Connection", "keep-alive"),
            ("Content-Type", "application/json"),
            ("DNT", "1"),
            ("Host", "breach.vip"),
            ("Origin", "https://breach.vip"),
            ("Pragma", "no-cache"),
            ("Referer", "https://breach.vip/"),
            ("Sec-Ch-Ua", r#""Not_A Brand";v="8", "Chromium";v="120", "Google Chrome";v="120""#),
            ("Sec-Ch-Ua-Mobile", "?0"),
            ("Sec-Ch-Ua-Platform", r#""Windows""#),
            ("Sec-Fetch-Dest", "empty"),
            ("Sec-Fetch-Mode", "cors"),
            ("Sec-Fetch-Site", "same-origin"),
            ("X-Requested-With", "XMLHttpRequest"),
        ] {
            breachvip_headers.insert(k.to_string(), v.to_string());
        }

        let fields_to_search = determine_search_fields(search_term);
        let is_wildcard = search_term.contains('*');

        let mut profile = serde_json::Map::new();
        profile.insert("account".into(), serde_json::json!(search_term));
        profile.insert("fields_searched".into(), serde_json::json!(fields_to_search));

        let direct_client = match Client::builder().no_proxy().build() {
            Ok(c) => c,
            Err(err) => {
                return ProviderResult::new(self.name(), identifier, url)
                    .with_status(ResultStatus::Error)
                    .with_error(err.to_string());
            }
        };

        let request_body = serde_json::json!({
            "term": search_term,
            "fields": fields_to_search,
            "categories": [],
            "wildcard": is_wildcard,
            "case_sensitive": false,
        });

        let mut req = direct_client.post(&url).json(&request_body);
        for (k, v) in &breachvip_headers {
            req = req.header(k.as_str(), v.as_str());
        }

        let resp = match req.send().await {
            Ok(r) => r,
            Err(err) => {
                return ProviderResult::new(self.name(), identifier, url)
                    .with_status(ResultStatus::Error)
                    .with_evidence(evidence)
                    .with_profile(profile)
                    .with_error(err.to_string());
            }
        };

        let status_code = resp.status().as_u16();
        let text = resp.text().await.unwrap_or_default();

        match status_code {
            200 => {
                let raw_json: serde_json::Value = if text.is_empty() {
                    serde_json::json!([])
                } else {
                    serde_json::from_str(&text).unwrap_or(serde_json::json!([]))
                };
                let data = normalize_envelope(raw_json);

                if data.is_empty() {
                    return ProviderResult::new(self.name(), identifier, url)
                        .with_status(ResultStatus::NotFound)
                        .with_http_status(Some(status_code))
                        .with_evidence(evidence)
                        .with_profile(profile);
                }

                let result_count = data.len();
                let mut breach_sources: std::collections::BTreeSet<String> = Default::default();
                for rec in &data {
                    if let serde_json::Value::Object(map) = rec {
                        for field in ["source", "breach", "database", "origin"] {
                            if let Some(v) = map.get(field) {
                                if !v.is_null() {
                                    breach_sources.insert(value_to_string(v));
                                }
                            }
                        }
                    }
                }

                profile.insert("result_count".into(), serde_json::json!(result_count));
                if !breach_sources.is_empty() {
                    profile.insert("breach_sources".into(), serde_json::json!(breach_sources.into_iter().collect::<Vec<_>>()));
                }

                let display_data = if is_demo_mode() {
                    profile.insert("demo_mode".into(), serde_json::json!(true));
                    DefaultRedactor.censor_breach_data(&data)
                } else {
                    data.iter().take(100).cloned().collect()
                };
                profile.insert("raw_results".into(), serde_json::json!(display_data));

                let mut data_types_found: BTreeMap<String, u64> = BTreeMap::new();
                for rec in &data {
                    if let serde_json::Value::Object(map) = rec {
                        for (key, value) in map {
                            if matches!(key.as_str(), "_id" | "id" | "index" | "source" | "breach" | "database" | "origin") {
                                continue;
                            }
                            let present = !matches!(value, serde_json::Value::Null)
                                && !matches!(value, serde_json::Value::Bool(false));
                            if present {
                                *data_types_found.entry(key.clone()).or_insert(0) += 1;
                            }
                        }
                    }
                }
                if !data_types_found.is_empty() {
                    profile.insert("data_types".into(), serde_json::json!(data_types_found));
                }

                if result_count >= 10_000 {
                    profile.insert("note".into(), serde_json::json!("Result limit reached (10,000+)"));
                }

                ProviderResult::new(self.name(), identifier, url)
                    .with_status(ResultStatus::Found)
                    .with_http_status(Some(status_code))
                    .with_evidence(evidence)
                    .with_profile(profile)
            }
            400 => ProviderResult::new(self.name(), identifier, url)
                .with_status(ResultStatus::Error)
                .with_http_status(Some(status_code))
                .with_evidence(evidence)
                .with_profile(profile)
                .with_error("Bad request - check search parameters"),
            403 => ProviderResult::new(self.name(), identifier, url)
                .with_status(ResultStatus::Blocked)
                .with_http_status(Some(status_code))
                .with_evidence(evidence)
                .with_profile(profile)
                .with_error("Access Denied (Cloudflare). Your server IP might be flagged. Try searching manually at breach.vip."),
            405 => ProviderResult::new(self.name(), identifier, url)
                .with_status(ResultStatus::Error)
                .with_http_status(Some(status_code))
                .with_evidence(evidence)
                .with_profile(profile)
                .with_error("Method not allowed"),
            429 => ProviderResult::new(self.name(), identifier, url)
                .with_status(ResultStatus::Blocked)
                .with_http_status(Some(status_code))
                .with_evidence(evidence)
                .with_profile(profile)
                .with_error("Rate limited (15 requests/minute) - wait 1 minute"),
            503 => ProviderResult::new(self.name(), identifier, url)
                .with_status(ResultStatus::Blocked)
                .with_http_status(Some(status_code))
                .with_evidence(evidence)
                .with_profile(profile)
                .with_error("Service unavailable (503) - breach.vip may be down or blocking requests"),
            500 => ProviderResult::new(self.name(), identifier, url)
                .with_status(ResultStatus::Error)
                .with_http_status(Some(status_code))
                .with_evidence(evidence)
                .with_profile(profile)
                .with_error("Internal server error"),
            other => ProviderResult::new(self.name(), identifier, url)
                .with_status(ResultStatus::Unknown)
                .with_http_status(Some(status_code))
                .with_evidence(evidence)
                .with_profile(profile)
                .with_error(format!("Unexpected response ({other})")),
        }
    }
}

fn value_to_string(v: &serde_json::Value) -> String {
    match v {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
