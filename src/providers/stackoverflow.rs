//! Stack Overflow: works best with a numeric user ID rather than a display
//! name (format: `/users/{id}`). Grounded on `providers/stackoverflow.py`.

use async_trait::async_trait;
use reqwest::Client;

use crate::provider::Provider;
use crate::types::{ProviderResult, ResultStatus};
use crate::ua::HeaderBag;

#[derive(Debug, Default)]
pub struct StackOverflowProvider;

fn digits_only(s: &str) -> String {
    s.chars().filter(|c| c.is_ascii_digit()).collect()
}

#[async_trait]
impl Provider for StackOverflowProvider {
    fn name(&self) -> &'static str {
        "stackoverflow"
    }

    fn timeout_sec(&self) -> u64 {
        10
    }

    fn build_url(&self, identifier: &str) -> String {
        let clean_id = digits_only(identifier);
        if clean_id.is_empty() {
            return "https://stackoverflow.com/".to_string();
        }
        format!("https://stackoverflow.com/users/{clean_id}")
    }

    async fn check(&self, identifier: &str, client: &Client, headers: &HeaderBag) -> ProviderResult {
        let clean_id = digits_only(identifier);
        let url = self.build_url(identifier);

        if clean_id.is_empty() {
            return ProviderResult::new(self.name(), identifier, url)
                .with_status(ResultStatus::NotFound)
                .with_error("Invalid format. Stack Overflow requires a numeric user ID.");
        }

        let mut req = client.get(&url);
        for (k, v) in headers {
            req = req.header(k.as_str(), v.as_str());
        }

        match req.send().await {
            Ok(resp) => {
                let status_code = resp.status().as_u16();
                let final_url = resp.url().to_string();
                let text = resp.text().await.unwrap_or_default().to_lowercase();

                let status = if status_code == 200 && text.contains("reputation") && text.contains("profile") {
                    ResultStatus::Found
                } else {
                    ResultStatus::NotFound
                };

                let mut evidence = serde_json::Map::new();
                evidence.insert("note".into(), serde_json::json!("Search by User ID"));

                ProviderResult::new(self.name(), &clean_id, final_url)
                    .with_status(status)
                    .with_http_status(Some(status_code))
                    .with_evidence(evidence)
            }
            Err(err) => ProviderResult::new(self.name(), identifier, url)
                .with_status(ResultStatus::Error)
                .with_error(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_url_extracts_digits() {
        let p = StackOverflowProvider;
        assert_eq!(p.build_url("user-123456"), "https://stackoverflow.com/users/123456");
    }

    #[test]
    fn build_url_falls_back_without_digits() {
        let p = StackOverflowProvider;
        assert_eq!(p.build_url("no-digits-here"), "https://stackoverflow.com/");
    }

    #[tokio::test]
    async fn non_numeric_input_is_rejected_without_network() {
        let p = StackOverflowProvider;
        let client = Client::new();
        let res = p.check("nope", &client, &HeaderBag::new()).await;
        assert_eq!(res.status, ResultStatus::NotFound);
        assert!(res.error.is_some());
    }
}
