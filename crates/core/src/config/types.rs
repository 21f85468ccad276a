use serde::{Deserialize, Serialize};
use std::net::IpAddr;

use crate::zendesk::OFFICE_CODE_FIELD_ID;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    /// Zendesk account settings. When absent the service still starts but
    /// refuses ticket aggregation requests.
    #[serde(default)]
    pub zendesk: Option<ZendeskConfig>,
    #[serde(default)]
    pub aggregation: AggregationConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8080
}

/// Zendesk account configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ZendeskConfig {
    /// Account subdomain, as in `https://<subdomain>.zendesk.com`.
    pub subdomain: String,
    /// Agent email the API token belongs to.
    pub email: String,
    /// Zendesk API token.
    pub api_token: String,
    /// Override for the API base URL (default: `https://<subdomain>.zendesk.com/api/v2`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Custom field that carries the office code.
    #[serde(default = "default_office_field_id")]
    pub office_field_id: u64,
    /// Per-request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
    /// Retries for transient failures (default: 2)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Initial retry backoff in milliseconds, doubled per attempt (default: 250)
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl ZendeskConfig {
    /// API base URL without trailing slash.
    pub fn api_base_url(&self) -> String {
        match &self.base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("https://{}.zendesk.com/api/v2", self.subdomain),
        }
    }

    /// Prefix of agent-facing ticket links, `None` without a subdomain.
    pub fn agent_link_base(&self) -> Option<String> {
        let subdomain = self.subdomain.trim();
        if subdomain.is_empty() {
            return None;
        }
        Some(format!("https://{}.zendesk.com/agent/tickets", subdomain))
    }
}

fn default_office_field_id() -> u64 {
    OFFICE_CODE_FIELD_ID
}

fn default_timeout() -> u32 {
    30
}

fn default_max_retries() -> u32 {
    2
}

fn default_retry_backoff_ms() -> u64 {
    250
}

/// Aggregation engine tuning
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AggregationConfig {
    /// IANA time zone used to render ticket creation times.
    #[serde(default = "default_time_zone")]
    pub time_zone: String,
    /// Offices paginated concurrently.
    #[serde(default = "default_max_parallel_searches")]
    pub max_parallel_searches: usize,
    /// Group lookups in flight at once.
    #[serde(default = "default_max_parallel_lookups")]
    pub max_parallel_lookups: usize,
    /// Upper bound on pages followed for a single office.
    #[serde(default = "default_max_pages_per_office")]
    pub max_pages_per_office: u32,
    /// Deadline for a whole aggregation request, in seconds.
    #[serde(default = "default_aggregation_timeout")]
    pub timeout_secs: u64,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            time_zone: default_time_zone(),
            max_parallel_searches: default_max_parallel_searches(),
            max_parallel_lookups: default_max_parallel_lookups(),
            max_pages_per_office: default_max_pages_per_office(),
            timeout_secs: default_aggregation_timeout(),
        }
    }
}

fn default_time_zone() -> String {
    "America/New_York".to_string()
}

fn default_max_parallel_searches() -> usize {
    4
}

fn default_max_parallel_lookups() -> usize {
    8
}

fn default_max_pages_per_office() -> u32 {
    500
}

fn default_aggregation_timeout() -> u64 {
    120
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zendesk: Option<SanitizedZendeskConfig>,
    pub aggregation: AggregationConfig,
}

/// Sanitized Zendesk config (API token hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedZendeskConfig {
    pub subdomain: String,
    pub email: String,
    pub api_base_url: String,
    pub api_token_configured: bool,
    pub office_field_id: u64,
    pub timeout_secs: u32,
    pub max_retries: u32,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            zendesk: config.zendesk.as_ref().map(|z| SanitizedZendeskConfig {
                subdomain: z.subdomain.clone(),
                email: z.email.clone(),
                api_base_url: z.api_base_url(),
                api_token_configured: !z.api_token.is_empty(),
                office_field_id: z.office_field_id,
                timeout_secs: z.timeout_secs,
                max_retries: z.max_retries,
            }),
            aggregation: config.aggregation.clone(),
        }
    }
}
