//! Ticket aggregation engine.
//!
//! For every requested office code the engine pages through the Zendesk
//! search endpoint, keeps only tickets whose office-code custom field matches
//! exactly and whose creation time falls in the requested range, and maps the
//! survivors to `OutputTicket`s with their group names resolved through a
//! per-request cache.

mod engine;
mod filter;
mod paginator;
mod resolver;
mod types;

pub use engine::{AggregatorSettings, TicketAggregator};
pub use filter::{format_created_at, MatchedTicket, TicketFilter, TicketMapper};
pub use paginator::TicketPaginator;
pub use resolver::{GroupCache, GroupNameResolver};
pub use types::*;

use std::time::Duration;

use thiserror::Error;

use crate::zendesk::ZendeskError;

/// Errors that stop a single office's pagination.
#[derive(Debug, Error)]
pub enum PaginationError {
    /// A page request failed.
    #[error("page {page} failed: {source}")]
    Remote {
        page: u32,
        #[source]
        source: ZendeskError,
    },

    /// The office produced more pages than allowed.
    #[error("exceeded the limit of {0} pages")]
    PageLimitExceeded(u32),

    /// The cursor pointed back at the page just fetched.
    #[error("next_page cursor repeated {0}")]
    CursorLoop(String),
}

/// Errors that fail a whole aggregation.
#[derive(Debug, Error)]
pub enum AggregateError {
    /// The request was rejected before any remote call.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Paginating one office failed; no partial results are returned.
    #[error("Search failed for office {office_id}: {source}")]
    Search {
        office_id: String,
        #[source]
        source: PaginationError,
    },

    /// The aggregation did not finish within its deadline.
    #[error("Aggregation timed out after {0:?}")]
    TimedOut(Duration),
}

impl AggregateError {
    /// Underlying Zendesk error, if the failure came from a remote call.
    pub fn remote_error(&self) -> Option<&ZendeskError> {
        match self {
            AggregateError::Search {
                source: PaginationError::Remote { source, .. },
                ..
            } => Some(source),
            _ => None,
        }
    }

    /// Label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            AggregateError::InvalidRequest(_) => "invalid",
            AggregateError::Search { .. } => "search_failed",
            AggregateError::TimedOut(_) => "timed_out",
        }
    }
}
