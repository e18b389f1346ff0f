//! Have I Been Pwned: email-based breach and paste lookup, gated on an API
//! key from settings. Breach and paste endpoints are queried concurrently.
//! Grounded on `providers/hibp.py`.

use async_trait::async_trait;
use reqwest::Client;
use std::sync::OnceLock;

use crate::provider::Provider;
use crate::types::{ProviderResult, ResultStatus};
use crate::ua::HeaderBag;

#[derive(Debug, Default)]
pub struct HibpProvider {
    api_key: Option<String>,
}

impl HibpProvider {
    pub fn new(api_key: Option<String>) -> Self {
        Self { api_key }
    }
}

fn email_re() -> &'static regex::Regex {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(|| regex::Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap())
}

#[async_trait]
impl Provider for HibpProvider {
    fn name(&self) -> &'static str {
        "hibp"
    }

    fn timeout_sec(&self) -> u64 {
        15
    }

    fn build_url(&self, identifier: &str) -> String {
        format!("https://haveibeenpwned.com/api/v3/breachedaccount/{identifier}")
    }

    async fn check(&self, identifier: &str, client: &Client, headers: &HeaderBag) -> ProviderResult {
        let url = self.build_url(identifier);

        let Some(api_key) = self.api_key.as_deref() else {
            return ProviderResult::new(self.name(), identifier, url)
                .with_status(ResultStatus::Unknown)
                .with_error("Skipped: HIBP API key not set in Settings (hibp_api_key).");
        };

        if identifier.contains('*') {
            return ProviderResult::new(self.name(), identifier, url)
                .with_status(ResultStatus::Error)
                .with_error("HIBP does not support wildcard searches.");
        }

        if !email_re().is_match(identifier) {
            return ProviderResult::new(self.name(), identifier, url)
                .with_status(ResultStatus::NotFound)
                .with_error("Invalid format: HIBP requires an email address.");
        }

        let mut hibp_headers = headers.clone();
        hibp_headers.insert("hibp-api-key".into(), api_key.to_string());
        hibp_headers.insert("user-agent".into(), "Social-Hunt".into());

        let breach_url = format!("https://haveibeenpwned.com/api/v3/breachedaccount/{identifier}");
        let paste_url = format!("https://haveibeenpwned.com/api/v3/pasteaccount/{identifier}");

        let breach_fut = fetch(client, &breach_url, &hibp_headers);
        let paste_fut = fetch(client, &paste_url, &hibp_headers);
        let (breach_res, paste_res) = tokio::join!(breach_fut, paste_fut);

        let (breach_status, breach_res) = match breach_res {
            Ok(r) => r,
            Err(err) => {
                return ProviderResult::new(self.name(), identifier, url)
                    .with_status(ResultStatus::Error)
                    .with_error(err.to_string());
            }
        };
        let (paste_status, paste_res) = match paste_res {
            Ok(r) => r,
            Err(err) => {
                return ProviderResult::new(self.name(), identifier, url)
                    .with_status(ResultStatus::Error)
                    .with_error(err.to_string());
            }
        };

        let mut profile = serde_json::Map::new();
        let mut evidence = serde_json::Map::new();

        if breach_status == 200 {
            if let Ok(serde_json::Value::Array(breaches)) = serde_json::from_str::<serde_json::Value>(&breach_res) {
                let names: Vec<serde_json::Value> = breaches
                    .iter()
                    .filter_map(|b| b.get("Name").cloned())
                    .collect();
                profile.insert("breach_count".into(), serde_json::json!(names.len()));
                profile.insert("breaches".into(), serde_json::Value::Array(names));
                evidence.insert("breaches_found".into(), serde_json::json!(true));
            }
        } else if breach_status == 429 {
            profile.insert("breach_error".into(), serde_json::json!("Rate limited"));
        } else if breach_status != 404 {
            profile.insert("breach_error".into(), serde_json::json!(format!("Unexpected status: {breach_status}")));
        }

        if paste_status == 200 {
            if let Ok(serde_json::Value::Array(pastes)) = serde_json::from_str::<serde_json::Value>(&paste_res) {
                profile.insert("paste_count".into(), serde_json::json!(pastes.len()));
                evidence.insert("pastes_found".into(), serde_json::json!(true));
            }
        } else if paste_status == 429 {
            profile.insert("paste_error".into(), serde_json::json!("Rate limited"));
        } else if paste_status != 404 {
            profile.insert("paste_error".into(), serde_json::json!(format!("Unexpected status: {paste_status}")));
        }

        let breaches_found = evidence.get("breaches_found").and_then(|v| v.as_bool()).unwrap_or(false);
        let pastes_found = evidence.get("pastes_found").and_then(|v| v.as_bool()).unwrap_or(false);

        let status = if breaches_found || pastes_found {
            ResultStatus::Found
        } else if breach_status == 429 || paste_status == 429 {
            ResultStatus::Blocked
        } else if breach_status == 404 && paste_status == 404 {
            ResultStatus::NotFound
        } else if breach_status >= 500 || paste_status >= 500 {
            ResultStatus::Error
        } else {
            ResultStatus::Unknown
        };

        let error_msg = match status {
            ResultStatus::Blocked => Some("HIBP API Rate Limit Exceeded (429).".to_string()),
            ResultStatus::Error => Some(format!("HIBP API Error (Breach: {breach_status}, Paste: {paste_status})")),
            _ => None,
        };

        let mut result = ProviderResult::new(self.name(), identifier, url)
            .with_status(status)
            .with_http_status(Some(breach_status))
            .with_evidence(evidence)
            .with_profile(profile);
        if let Some(msg) = error_msg {
            result = result.with_error(msg);
        }
        result
    }
}

async fn fetch(client: &Client, url: &str, headers: &HeaderBag) -> reqwest::Result<(u16, String)> {
    let mut req = client.get(url);
    for (k, v) in headers {
        req = req.header(k.as_str(), v.as_str());
    }
    let resp = req.send().await?;
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    Ok((status, body))
}
