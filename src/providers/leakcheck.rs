//! LeakCheck.io breach/stealer-log search (API v2), gated on an API key.
//! Builds its own short-lived client that bypasses proxy env vars, matching
//! the source's `httpx.AsyncClient(trust_env=False)`. Grounded on
//! `providers/leakcheck.py`.

use async_trait::async_trait;
use reqwest::Client;
use std::collections::BTreeMap;

use crate::demo::{is_demo_mode, DefaultRedactor, Redactor};
use crate::provider::Provider;
use crate::types::{ProviderResult, ResultStatus};
use crate::ua::HeaderBag;

const API_BASE: &str = "https://leakcheck.io/api/v2/query";

#[derive(Debug, Default)]
pub struct LeakCheckProvider {
    api_key: Option<String>,
}

impl LeakCheckProvider {
    pub fn new(api_key: Option<String>) -> Self {
        Self { api_key }
    }
}

fn determine_query_type(term: &str) -> &'static str {
    if term.contains('@') && term.contains('.') {
        return "email";
    }
    let clean: String = term.chars().filter(|c| !matches!(c, '+' | '-' | ' ' | '(' | ')')).collect();
    if !clean.is_empty() && clean.chars().all(|c| c.is_ascii_digit()) && (7..=15).contains(&clean.len()) {
        return "phone";
    }
    "auto"
}

#[async_trait]
impl Provider for LeakCheckProvider {
    fn name(&self) -> &'static str {
        "leakcheck"
    }

    fn timeout_sec(&self) -> u64 {
        15
    }

    fn build_url(&self, identifier: &str) -> String {
        format!("{API_BASE}/{identifier}")
    }

    async fn check(&self, identifier: &str, _client: &Client, _headers: &HeaderBag) -> ProviderResult {
        let search_term = identifier.trim();
        let url = if search_term.is_empty() { API_BASE.to_string() } else { format!("{API_BASE}/{search_term}") };

        let Some(api_key) = self.api_key.as_deref() else {
            return ProviderResult::new(self.name(), identifier, url)
                .with_status(ResultStatus::Unknown)
                .with_error("Skipped: LeakCheck API key not set in Settings (leakcheck_api_key).");
        };

        if search_term.is_empty() {
            return ProviderResult::new(self.name(), identifier, url)
                .with_status(ResultStatus::Error)
                .with_error("Empty input.");
        }

        let query_type = determine_query_type(search_term);
        let mut profile = serde_json::Map::new();
        profile.insert("account".into(), serde_json::json!(search_term));
        profile.insert("query_type".into(), serde_json::json!(query_type));
        let mut evidence = serde_json::Map::new();
        evidence.insert("leakcheck".into(), serde_json::json!(true));

        let direct_client = match Client::builder().no_proxy().build() {
            Ok(c) => c,
            Err(err) => {
                return ProviderResult::new(self.name(), identifier, url)
                    .with_status(ResultStatus::Error)
                    .with_error(err.to_string());
            }
        };

        let request_url = format!("{API_BASE}/{}", urlencode(search_term));
        let mut query: Vec<(&str, String)> = vec![("limit", "100".into())];
        if query_type != "auto" {
            query.push(("type", query_type.into()));
        }

        let resp = direct_client
            .get(&request_url)
            .query(&query)
            .header("X-API-Key", api_key)
            .header("Accept", "application/json")
            .header("User-Agent", "Social-Hunt")
            .send()
            .await;

        let resp = match resp {
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
                let raw: serde_json::Value = if text.is_empty() {
                    serde_json::json!({})
                } else {
                    serde_json::from_str(&text).unwrap_or(serde_json::json!({}))
                };
                let success = raw.get("success").and_then(|v| v.as_bool()).unwrap_or(false);
                let data = raw.get("result").and_then(|v| v.as_array()).cloned().unwrap_or_default();

                if !success {
                    let msg = raw
                        .get("message")
                        .and_then(|v| v.as_str())
                        .unwrap_or("LeakCheck returned success=false.")
                        .to_string();
                    return ProviderResult::new(self.name(), identifier, url)
                        .with_status(ResultStatus::Error)
                        .with_http_status(Some(status_code))
                        .with_evidence(evidence)
                        .with_profile(profile)
                        .with_error(msg);
                }

                if data.is_empty() {
                    return ProviderResult::new(self.name(), identifier, url)
                        .with_status(ResultStatus::NotFound)
                        .with_http_status(Some(status_code))
                        .with_evidence(evidence)
                        .with_profile(profile);
                }

                profile.insert("result_count".into(), serde_json::json!(data.len()));

                let mut breach_sources: std::collections::BTreeSet<String> = Default::default();
                for rec in &data {
                    if let Some(src) = rec.get("sources") {
                        match src {
                            serde_json::Value::Array(arr) => {
                                for s in arr {
                                    let name = match s {
                                        serde_json::Value::Object(o) => {
                                            o.get("name").and_then(|n| n.as_str()).map(|s| s.to_string())
                                        }
                                        other => Some(other.to_string()),
                                    };
                                    if let Some(n) = name {
                                        if !n.is_empty() {
                                            breach_sources.insert(n);
                                        }
                                    }
                                }
                            }
                            serde_json::Value::String(s) if !s.is_empty() => {
                                breach_sources.insert(s.clone());
                            }
                            _ => {}
                        }
                    }
                }
                if !breach_sources.is_empty() {
                    profile.insert("breach_sources".into(), serde_json::json!(breach_sources.into_iter().collect::<Vec<_>>()));
                }

                let display_data: Vec<serde_json::Value> = data.iter().take(100).cloned().collect();
                let display_data = if is_demo_mode() {
                    profile.insert("demo_mode".into(), serde_json::json!(true));
                    DefaultRedactor.censor_breach_data(&display_data)
                } else {
                    display_data
                };
                profile.insert("raw_results".into(), serde_json::json!(display_data));

                let mut data_types_found: BTreeMap<String, u64> = BTreeMap::new();
                for rec in &data {
                    if let serde_json::Value::Object(map) = rec {
                        for (key, value) in map {
                            if key == "sources" || key == "_id" || key == "id" {
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

                ProviderResult::new(self.name(), identifier, url)
                    .with_status(ResultStatus::Found)
                    .with_http_status(Some(status_code))
                    .with_evidence(evidence)
                    .with_profile(profile)
            }
            401 => ProviderResult::new(self.name(), identifier, url)
                .with_status(ResultStatus::Error)
                .with_http_status(Some(status_code))
                .with_evidence(evidence)
                .with_profile(profile)
                .with_error("Invalid API key (401) \u{2014} check leakcheck_api_key in Settings."),
            429 => ProviderResult::new(self.name(), identifier, url)
                .with_status(ResultStatus::Blocked)
                .with_http_status(Some(status_code))
                .with_evidence(evidence)
                .with_profile(profile)
                .with_error("Rate limited (429) \u{2014} LeakCheck limit is 3 req/sec."),
            503 => ProviderResult::new(self.name(), identifier, url)
                .with_status(ResultStatus::Blocked)
                .with_http_status(Some(status_code))
                .with_evidence(evidence)
                .with_profile(profile)
                .with_error("LeakCheck service unavailable (503)."),
            other => ProviderResult::new(self.name(), identifier, url)
                .with_status(ResultStatus::Unknown)
                .with_http_status(Some(status_code))
                .with_evidence(evidence)
                .with_profile(profile)
                .with_error(format!("Unexpected response ({other}).")),
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
    fn query_type_detects_email() {
        assert_eq!(determine_query_type("a@b.com"), "email");
    }

    #[test]
    fn query_type_detects_phone() {
        assert_eq!(determine_query_type("+1 (555) 123-4567"), "phone");
    }

    #[test]
    fn query_type_defaults_auto() {
        assert_eq!(determine_query_type("plain_username"), "auto");
    }

    #[tokio::test]
    async fn missing_api_key_is_skipped_without_network() {
        let p = LeakCheckProvider::new(None);
        let client = Client::new();
        let res = p.check("someone", &client, &HeaderBag::new()).await;
        assert_eq!(res.status, ResultStatus::Unknown);
    }

    #[tokio::test]
    async fn empty_input_is_rejected() {
        let p = LeakCheckProvider::new(Some("key".into()));
        let client = Client::new();
        let res = p.check("   ", &client, &HeaderBag::new()).await;
        assert_eq!(res.status, ResultStatus::Error);
    }
}
