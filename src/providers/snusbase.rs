//! Snusbase breach data search, gated on an API key. Flattens the
//! per-database result map the API returns into one list, tagging each
//! record with its source database. Grounded on `providers/snusbase.py`.

use async_trait::async_trait;
use reqwest::Client;
use std::collections::BTreeMap;

use crate::demo::{is_demo_mode, DefaultRedactor, Redactor};
use crate::provider::Provider;
use crate::types::{ProviderResult, ResultStatus};
use crate::ua::HeaderBag;

const API_URL: &str = "https://api.snusbase.com/data/search";

#[derive(Debug, Default)]
pub struct SnusbaseProvider {
    api_key: Option<String>,
}

impl SnusbaseProvider {
    pub fn new(api_key: Option<String>) -> Self {
        Self { api_key }
    }
}

fn determine_types(term: &str) -> Vec<&'static str> {
    if term.contains('@') && term.contains('.') {
        return vec!["email"];
    }
    let clean: String = term.chars().filter(|c| !matches!(c, '+' | '-' | ' ' | '(' | ')')).collect();
    if !clean.is_empty() && clean.chars().all(|c| c.is_ascii_digit()) && (7..=15).contains(&clean.len()) {
        return vec!["username", "email"];
    }
    if term.matches('.').count() == 3 {
        let parts: Vec<&str> = term.split('.').collect();
        if parts.iter().all(|p| p.parse::<u16>().map(|n| n <= 255).unwrap_or(false)) {
            return vec!["lastip"];
        }
    }
    vec!["email", "username"]
}

#[async_trait]
impl Provider for SnusbaseProvider {
    fn name(&self) -> &'static str {
        "snusbase"
    }

    fn timeout_sec(&self) -> u64 {
        15
    }

    fn build_url(&self, _identifier: &str) -> String {
        API_URL.to_string()
    }

    async fn check(&self, identifier: &str, _client: &Client, _headers: &HeaderBag) -> ProviderResult {
        let url = API_URL.to_string();

        let Some(api_key) = self.api_key.as_deref() else {
            return ProviderResult::new(self.name(), identifier, url)
                .with_status(ResultStatus::Unknown)
                .with_error("Skipped: Snusbase API key not set in Settings (snusbase_api_key).");
        };

        let search_term = identifier.trim();
        if search_term.is_empty() {
            return ProviderResult::new(self.name(), identifier, url)
                .with_status(ResultStatus::Error)
                .with_error("Empty input.");
        }

        let types = determine_types(search_term);
        let mut profile = serde_json::Map::new();
        profile.insert("account".into(), serde_json::json!(search_term));
        profile.insert("types_searched".into(), serde_json::json!(types));
        let mut evidence = serde_json::Map::new();
        evidence.insert("snusbase".into(), serde_json::json!(true));

        let direct_client = match Client::builder().no_proxy().build() {
            Ok(c) => c,
            Err(err) => {
                return ProviderResult::new(self.name(), identifier, url)
                    .with_status(ResultStatus::Error)
                    .with_error(err.to_string());
            }
        };

        let body = serde_json::json!({ "terms": [search_term], "types": types });
        let resp = direct_client
            .post(&url)
            .header("Auth", api_key)
            .header("Content-Type", "application/json")
            .json(&body)
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

                let mut data: Vec<serde_json::Value> = Vec::new();
                if let Some(serde_json::Value::Object(results_by_db)) = raw.get("results") {
                    for (db_name, records) in results_by_db {
                        if let serde_json::Value::Array(arr) = records {
                            for rec in arr {
                                if let serde_json::Value::Object(mut map) = rec.clone() {
                                    map.entry("_db").or_insert_with(|| serde_json::json!(db_name));
                                    data.push(serde_json::Value::Object(map));
                                }
                            }
                        }
                    }
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
                    if let serde_json::Value::Object(map) = rec {
                        let db = map
                            .get("_db")
                            .or_else(|| map.get("source"))
                            .or_else(|| map.get("breach"))
                            .and_then(|v| v.as_str());
                        if let Some(db) = db {
                            breach_sources.insert(db.to_string());
                        }
                    }
                }
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
                            if matches!(key.as_str(), "_id" | "_db" | "id" | "source" | "breach") {
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
                .with_error("Invalid API key (401) - check snusbase_api_key in Settings."),
            429 => ProviderResult::new(self.name(), identifier, url)
                .with_status(ResultStatus::Blocked)
                .with_http_status(Some(status_code))
                .with_evidence(evidence)
                .with_profile(profile)
                .with_error("Rate limited (2048 req/day exceeded)."),
            503 => ProviderResult::new(self.name(), identifier, url)
                .with_status(ResultStatus::Blocked)
                .with_http_status(Some(status_code))
                .with_evidence(evidence)
                .with_profile(profile)
                .with_error("Snusbase service unavailable (503)."),
            other => ProviderResult::new(self.name(), identifier, url)
                .with_status(ResultStatus::Unknown)
                .with_http_status(Some(status_code))
                .with_evidence(evidence)
                .with_profile(profile)
                .with_error(format!("Unexpected response ({other}).")),
        }
    }
}
