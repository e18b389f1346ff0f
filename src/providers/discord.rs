//! Discord: Discord has no public web profiles, so a request to a valid or
//! invalid user ID typically returns the same generic login page. This
//! provider serves as a link generator and format validator only, grounded
//! on `providers/discord.py` in the original implementation.

use async_trait::async_trait;
use patterns::invite_re;
use patterns::snowflake_re;
use reqwest::Client;

use crate::provider::Provider;
use crate::types::ProviderResult;
use crate::ua::HeaderBag;

mod patterns {
    use regex::Regex;
    use std::sync::OnceLock;

    pub fn invite_re() -> &'static Regex {
        static RE: OnceLock<Regex> = OnceLock::new();
        RE.get_or_init(|| Regex::new(r"^[a-zA-Z0-9]{2,10}$").unwrap())
    }

    pub fn snowflake_re() -> &'static Regex {
        static RE: OnceLock<Regex> = OnceLock::new();
        RE.get_or_init(|| Regex::new(r"^\d{17,20}$").unwrap())
    }
}

#[derive(Debug, Default)]
pub struct DiscordProvider;

impl DiscordProvider {
    fn classify(clean: &str) -> (bool, bool) {
        let is_id = snowflake_re().is_match(clean);
        let is_invite = !is_id && invite_re().is_match(clean);
        (is_id, is_invite)
    }
}

#[async_trait]
impl Provider for DiscordProvider {
    fn name(&self) -> &'static str {
        "discord"
    }

    fn timeout_sec(&self) -> u64 {
        10
    }

    fn build_url(&self, identifier: &str) -> String {
        let clean = identifier.trim();
        if invite_re().is_match(clean) {
            return format!("https://discord.gg/{clean}");
        }
        format!("https://discord.com/users/{identifier}")
    }

    async fn check(&self, identifier: &str, _client: &Client, _headers: &HeaderBag) -> ProviderResult {
        let url = self.build_url(identifier);
        let clean = identifier.trim();
        let (is_id, is_invite) = Self::classify(clean);

        let mut evidence = serde_json::Map::new();
        evidence.insert("note".into(), serde_json::json!("Link generation only."));
        evidence.insert(
            "type".into(),
            serde_json::json!(if is_id { "User ID" } else if is_invite { "Invite" } else { "Unknown" }),
        );

        let (status, error) = if is_id || is_invite {
            (
                crate::types::ResultStatus::Unknown,
                "Verification not possible. Discord profiles are not public.",
            )
        } else {
            (crate::types::ResultStatus::NotFound, "Invalid Discord ID or invite code format.")
        };

        ProviderResult::new(self.name(), identifier, url)
            .with_status(status)
            .with_evidence(evidence)
            .with_error(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_url_prefers_invite_shape() {
        let p = DiscordProvider;
        assert_eq!(p.build_url("abc123"), "https://discord.gg/abc123");
    }

    #[test]
    fn build_url_falls_back_to_user_path() {
        let p = DiscordProvider;
        // 21 chars, not a valid snowflake or invite shape -> falls to the user path.
        assert_eq!(
            p.build_url("this-is-not-a-valid-id"),
            "https://discord.com/users/this-is-not-a-valid-id"
        );
    }

    #[tokio::test]
    async fn snowflake_id_is_unknown_not_rejected() {
        let p = DiscordProvider;
        let client = Client::new();
        let res = p.check("123456789012345678", &client, &HeaderBag::new()).await;
        assert_eq!(res.status, crate::types::ResultStatus::Unknown);
    }

    #[tokio::test]
    async fn garbage_input_is_not_found() {
        let p = DiscordProvider;
        let client = Client::new();
        let res = p.check("!!!not valid at all!!!", &client, &HeaderBag::new()).await;
        assert_eq!(res.status, crate::types::ResultStatus::NotFound);
    }
}
