//! Feature flag evaluation
//!
//! The gateway only ever asks one question of the flag service: is this flag
//! enabled for this (optional) identity. Two adapters answer it, a static rule
//! set from configuration and the Unleash frontend API.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::Result;
use crate::api;
use crate::config::{FlagRule, FlagsConfig};

/// Boolean flag evaluation for an optional caller identity
#[async_trait]
pub trait FeatureFlags: Send + Sync {
    async fn is_enabled(&self, flag: &str, identity: Option<&str>) -> Result<bool>;
}

/// Flags resolved from configured rules
#[derive(Debug, Clone, Default)]
pub struct StaticFlags {
    rules: HashMap<String, FlagRule>,
}

impl StaticFlags {
    #[must_use]
    pub fn new(rules: HashMap<String, FlagRule>) -> Self {
        Self { rules }
    }

    /// Every identity, anonymous included, sees `flag` enabled
    #[must_use]
    pub fn enabled_for_all(flag: &str) -> Self {
        let rule = FlagRule {
            enabled: true,
            identities: Vec::new(),
        };
        Self::new(HashMap::from([(flag.to_string(), rule)]))
    }

    fn evaluate(&self, flag: &str, identity: Option<&str>) -> bool {
        match self.rules.get(flag) {
            None => false,
            Some(rule) if !rule.enabled => false,
            Some(rule) if rule.identities.is_empty() => true,
            Some(rule) => {
                identity.is_some_and(|id| rule.identities.iter().any(|allowed| allowed == id))
            }
        }
    }
}

#[async_trait]
impl FeatureFlags for StaticFlags {
    async fn is_enabled(&self, flag: &str, identity: Option<&str>) -> Result<bool> {
        Ok(self.evaluate(flag, identity))
    }
}

const UNLEASH: &str = "unleash";

/// Unleash frontend API client
pub struct UnleashFlags {
    client: ClientWithMiddleware,
    base_url: String,
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FrontendResponse {
    #[serde(default)]
    toggles: Vec<Toggle>,
}

#[derive(Debug, Deserialize)]
struct Toggle {
    name: String,
    #[serde(default)]
    enabled: bool,
}

impl UnleashFlags {
    pub fn new(client: ClientWithMiddleware, base_url: String, token: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    fn url(&self, identity: Option<&str>) -> String {
        match identity {
            Some(id) => format!(
                "{}/api/frontend?userId={}",
                self.base_url,
                urlencoding::encode(id)
            ),
            None => format!("{}/api/frontend", self.base_url),
        }
    }
}

#[async_trait]
impl FeatureFlags for UnleashFlags {
    #[instrument(skip(self))]
    async fn is_enabled(&self, flag: &str, identity: Option<&str>) -> Result<bool> {
        let mut request = self.client.get(self.url(identity));
        if let Some(token) = &self.token {
            request = request.header("Authorization", token);
        }

        let response: FrontendResponse = api::send_json(request, UNLEASH).await?;
        let enabled = response
            .toggles
            .iter()
            .any(|toggle| toggle.name == flag && toggle.enabled);

        debug!("Unleash evaluated {} = {}", flag, enabled);
        Ok(enabled)
    }
}

/// Pick the adapter described by `config`
pub fn from_config(config: &FlagsConfig, client: ClientWithMiddleware) -> Arc<dyn FeatureFlags> {
    match &config.unleash_url {
        Some(url) => Arc::new(UnleashFlags::new(
            client,
            url.clone(),
            config.unleash_token.clone(),
        )),
        None => Arc::new(StaticFlags::new(config.rules.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flags() -> StaticFlags {
        StaticFlags::new(HashMap::from([
            (
                "everyone".to_string(),
                FlagRule {
                    enabled: true,
                    identities: Vec::new(),
                },
            ),
            (
                "beta".to_string(),
                FlagRule {
                    enabled: true,
                    identities: vec!["ana".to_string()],
                },
            ),
            (
                "off".to_string(),
                FlagRule {
                    enabled: false,
                    identities: vec!["ana".to_string()],
                },
            ),
        ]))
    }

    #[tokio::test]
    async fn test_static_rules() {
        let flags = flags();

        assert!(flags.is_enabled("everyone", None).await.unwrap());
        assert!(flags.is_enabled("everyone", Some("luis")).await.unwrap());

        assert!(flags.is_enabled("beta", Some("ana")).await.unwrap());
        assert!(!flags.is_enabled("beta", Some("luis")).await.unwrap());
        assert!(!flags.is_enabled("beta", None).await.unwrap());

        assert!(!flags.is_enabled("off", Some("ana")).await.unwrap());
        assert!(!flags.is_enabled("missing", Some("ana")).await.unwrap());
    }

    #[tokio::test]
    async fn test_enabled_for_all() {
        let flags = StaticFlags::enabled_for_all("new-geocoder");
        assert!(flags.is_enabled("new-geocoder", None).await.unwrap());
        assert!(!flags.is_enabled("other", None).await.unwrap());
    }

    #[test]
    fn test_unleash_url_encodes_identity() {
        let client = reqwest_middleware::ClientBuilder::new(reqwest::Client::new()).build();
        let flags = UnleashFlags::new(client, "http://flags.local/".to_string(), None);

        assert_eq!(flags.url(None), "http://flags.local/api/frontend");
        assert_eq!(
            flags.url(Some("ana maría")),
            "http://flags.local/api/frontend?userId=ana%20mar%C3%ADa"
        );
    }

    #[test]
    fn test_frontend_response_parsing() {
        let body = r#"{"toggles":[{"name":"new-geocoder","enabled":true,"variant":{"name":"disabled","enabled":false}}]}"#;
        let parsed: FrontendResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.toggles.len(), 1);
        assert!(parsed.toggles[0].enabled);
    }
}
