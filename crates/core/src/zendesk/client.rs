//! reqwest-backed Zendesk client.
//!
//! Authenticates with an API token (`{email}/token:{api_token}` as HTTP
//! Basic credentials) and retries transient failures with exponential
//! backoff.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::Engine;
use reqwest::{header, Client};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::ZendeskConfig;
use crate::metrics::{ZENDESK_REQUESTS, ZENDESK_REQUEST_DURATION};

use super::types::{Group, GroupEnvelope, SearchPage};
use super::{ZendeskApi, ZendeskError};

/// Longest response body kept for diagnostics.
const MAX_ERROR_BODY_CHARS: usize = 1000;

/// Backoff schedule for transient failures.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_backoff: Duration,
    /// Upper bound for any single delay.
    pub max_backoff: Duration,
}

impl RetryPolicy {
    /// No retries at all.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }

    /// Delay before retry number `attempt` (0-based), doubling each time.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_backoff: Duration::from_millis(250),
            max_backoff: Duration::from_secs(10),
        }
    }
}

/// Zendesk REST API client.
pub struct ZendeskClient {
    client: Client,
    base_url: String,
    authorization: String,
    retry: RetryPolicy,
}

impl ZendeskClient {
    /// Create a new client from account configuration.
    pub fn new(config: &ZendeskConfig) -> Result<Self, ZendeskError> {
        if config.email.is_empty() || config.api_token.is_empty() {
            return Err(ZendeskError::NotConfigured(
                "Zendesk email and API token are required".to_string(),
            ));
        }
        if config.subdomain.is_empty() && config.base_url.is_none() {
            return Err(ZendeskError::NotConfigured(
                "Zendesk subdomain is required".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()
            .map_err(|e| ZendeskError::Request(e.to_string()))?;

        let credentials = format!("{}/token:{}", config.email, config.api_token);
        let authorization = format!(
            "Basic {}",
            base64::engine::general_purpose::STANDARD.encode(credentials)
        );

        Ok(Self {
            client,
            base_url: config.api_base_url(),
            authorization,
            retry: RetryPolicy {
                max_retries: config.max_retries,
                initial_backoff: Duration::from_millis(config.retry_backoff_ms),
                ..RetryPolicy::default()
            },
        })
    }

    /// Replace the retry policy.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// GET `url` and decode the JSON body, retrying transient failures.
    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        url: &str,
    ) -> Result<T, ZendeskError> {
        let mut attempt = 0;
        loop {
            let start = Instant::now();
            let result = self.get_json_once(url).await;

            ZENDESK_REQUEST_DURATION
                .with_label_values(&[endpoint])
                .observe(start.elapsed().as_secs_f64());
            ZENDESK_REQUESTS
                .with_label_values(&[endpoint, if result.is_ok() { "success" } else { "error" }])
                .inc();

            match result {
                Err(e) if e.is_transient() && attempt < self.retry.max_retries => {
                    let delay = self.retry.delay_for(attempt);
                    warn!(
                        endpoint,
                        url,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Transient Zendesk failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    async fn get_json_once<T: DeserializeOwned>(&self, url: &str) -> Result<T, ZendeskError> {
        let response = self
            .client
            .get(url)
            .header(header::AUTHORIZATION, &self.authorization)
            .header(header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ZendeskError::Timeout(url.to_string())
                } else if e.is_connect() {
                    ZendeskError::ConnectionFailed(e.to_string())
                } else {
                    ZendeskError::Request(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ZendeskError::Api {
                status: status.as_u16(),
                method: "GET",
                url: url.to_string(),
                body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }

        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                ZendeskError::Timeout(url.to_string())
            } else {
                ZendeskError::Request(e.to_string())
            }
        })?;

        serde_json::from_str(&body).map_err(|e| ZendeskError::Parse {
            url: url.to_string(),
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl ZendeskApi for ZendeskClient {
    fn search_url(&self, office_id: &str) -> String {
        let query = format!("type:ticket fieldvalue:{}", office_id);
        format!(
            "{}/search.json?query={}",
            self.base_url,
            urlencoding::encode(&query)
        )
    }

    async fn fetch_search_page(&self, url: &str) -> Result<SearchPage, ZendeskError> {
        debug!(url, "Fetching Zendesk search page");
        self.get_json("search", url).await
    }

    async fn fetch_group(&self, group_id: u64) -> Result<Group, ZendeskError> {
        let url = format!("{}/groups/{}.json", self.base_url, group_id);
        debug!(group_id, "Fetching Zendesk group");

        let envelope: GroupEnvelope = self.get_json("group", &url).await?;
        Ok(Group {
            id: group_id,
            name: envelope.group.and_then(|g| g.name).unwrap_or_default(),
        })
    }
}
