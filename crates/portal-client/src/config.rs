// Client configuration sourced from environment variables with an optional YAML overlay.
use anyhow::{Context, Result};
use portal_authz::ClaimRules;
use serde::Deserialize;
use std::fs;
use std::time::Duration;

pub(crate) const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";
pub(crate) const DEFAULT_HTTP_TIMEOUT_MS: u64 = 10_000;
pub(crate) const DEFAULT_SUBMIT_BATCH_SIZE: usize = 500;
pub(crate) const DEFAULT_HISTORY_PAGE_SIZE: usize = 100;
const DEFAULT_SUPERADMIN_ALIASES: &str = "all";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    // Backend base URL; API paths are appended to it.
    pub api_url: String,
    // Per-request timeout for backend calls.
    pub http_timeout_ms: u64,
    // Max phone numbers per removal-request submission.
    pub submit_batch_size: usize,
    // Page size requested when walking request history.
    pub history_page_size: usize,
    // Role-claim values treated as superadmin by the token fallback.
    pub superadmin_aliases: Vec<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
struct ClientConfigOverride {
    api_url: Option<String>,
    http_timeout_ms: Option<u64>,
    submit_batch_size: Option<usize>,
    history_page_size: Option<usize>,
    superadmin_aliases: Option<Vec<String>>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            http_timeout_ms: DEFAULT_HTTP_TIMEOUT_MS,
            submit_batch_size: DEFAULT_SUBMIT_BATCH_SIZE,
            history_page_size: DEFAULT_HISTORY_PAGE_SIZE,
            superadmin_aliases: parse_list(DEFAULT_SUPERADMIN_ALIASES),
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Self {
        let api_url = std::env::var("PORTAL_API_URL")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let http_timeout_ms = std::env::var("PORTAL_HTTP_TIMEOUT_MS")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .filter(|value| *value > 0)
            .unwrap_or(DEFAULT_HTTP_TIMEOUT_MS);
        let submit_batch_size = std::env::var("PORTAL_SUBMIT_BATCH_SIZE")
            .ok()
            .and_then(|value| value.parse::<usize>().ok())
            .filter(|value| *value > 0)
            .unwrap_or(DEFAULT_SUBMIT_BATCH_SIZE);
        let history_page_size = std::env::var("PORTAL_HISTORY_PAGE_SIZE")
            .ok()
            .and_then(|value| value.parse::<usize>().ok())
            .filter(|value| *value > 0)
            .unwrap_or(DEFAULT_HISTORY_PAGE_SIZE);
        // An explicitly empty value disables the aliases.
        let superadmin_aliases = std::env::var("PORTAL_SUPERADMIN_ALIASES")
            .map(|value| parse_list(&value))
            .unwrap_or_else(|_| parse_list(DEFAULT_SUPERADMIN_ALIASES));
        Self {
            api_url,
            http_timeout_ms,
            submit_batch_size,
            history_page_size,
            superadmin_aliases,
        }
    }

    pub fn from_env_or_yaml(config_path: Option<&str>) -> Result<Self> {
        let mut config = Self::from_env();
        let override_path = config_path
            .map(|value| value.to_string())
            .or_else(|| std::env::var("PORTAL_CLIENT_CONFIG").ok());
        if let Some(path) = override_path {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("read client config: {path}"))?;
            let override_cfg: ClientConfigOverride =
                serde_yaml::from_str(&contents).context("parse client config yaml")?;
            override_cfg.apply(&mut config);
        }
        Ok(config)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }

    pub fn claim_rules(&self) -> ClaimRules {
        ClaimRules::new(&self.superadmin_aliases)
    }
}

impl ClientConfigOverride {
    fn apply(self, config: &mut ClientConfig) {
        if let Some(value) = self.api_url {
            config.api_url = value;
        }
        if let Some(value) = self.http_timeout_ms.filter(|value| *value > 0) {
            config.http_timeout_ms = value;
        }
        if let Some(value) = self.submit_batch_size.filter(|value| *value > 0) {
            config.submit_batch_size = value;
        }
        if let Some(value) = self.history_page_size.filter(|value| *value > 0) {
            config.history_page_size = value;
        }
        if let Some(value) = self.superadmin_aliases {
            config.superadmin_aliases = value;
        }
    }
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}
