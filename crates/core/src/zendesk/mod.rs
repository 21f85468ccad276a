//! Zendesk API access.
//!
//! This module provides the `ZendeskApi` trait the aggregation engine is
//! written against, the wire types it returns, and `ZendeskClient`, the
//! reqwest-backed implementation.

mod client;
mod types;

pub use client::{RetryPolicy, ZendeskClient};
pub use types::*;

use async_trait::async_trait;
use thiserror::Error;

/// Custom field that carries a ticket's office code.
pub const OFFICE_CODE_FIELD_ID: FieldId = 360051507174;

/// Errors that can occur when talking to Zendesk.
#[derive(Debug, Clone, Error)]
pub enum ZendeskError {
    /// Request did not complete within the configured timeout.
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// Could not connect to Zendesk.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Zendesk answered with a non-2xx status.
    #[error("Zendesk API error: {status} for {method} {url}")]
    Api {
        status: u16,
        method: &'static str,
        url: String,
        body: String,
    },

    /// Response body was not the expected shape.
    #[error("Failed to parse response from {url}: {message}")]
    Parse { url: String, message: String },

    /// Any other request failure.
    #[error("HTTP request failed: {0}")]
    Request(String),

    /// Client not configured (missing credentials, etc.).
    #[error("Client not configured: {0}")]
    NotConfigured(String),
}

impl ZendeskError {
    /// Whether a retry has a reasonable chance of succeeding.
    pub fn is_transient(&self) -> bool {
        match self {
            ZendeskError::Timeout(_) | ZendeskError::ConnectionFailed(_) => true,
            ZendeskError::Api { status, .. } => matches!(status, 429 | 500 | 502 | 503 | 504),
            _ => false,
        }
    }

    /// Response body captured for operator logs, if any.
    pub fn response_body(&self) -> Option<&str> {
        match self {
            ZendeskError::Api { body, .. } => Some(body),
            _ => None,
        }
    }
}

/// Read access to the Zendesk endpoints the aggregation engine needs.
#[async_trait]
pub trait ZendeskApi: Send + Sync {
    /// URL of the first search page for an office code.
    fn search_url(&self, office_id: &str) -> String;

    /// Fetch one page of search results. `url` is either the value returned by
    /// `search_url` or a `next_page` cursor from a previous page.
    async fn fetch_search_page(&self, url: &str) -> Result<SearchPage, ZendeskError>;

    /// Look up a single group.
    async fn fetch_group(&self, group_id: u64) -> Result<Group, ZendeskError>;
}
