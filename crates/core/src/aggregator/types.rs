use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::AggregateError;

/// A ticket as returned to callers of the aggregation engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputTicket {
    pub id: u64,
    pub subject: String,
    pub description: String,
    /// Office code the ticket was matched on.
    pub organization_id: String,
    /// Creation time in the configured time zone, `YYYY-MM-DD HH:MM:SS`.
    pub created_at: String,
    pub status: String,
    /// Empty when the ticket has no priority.
    pub priority: String,
    /// Empty when the ticket has no group or the lookup failed.
    pub group_name: String,
    /// Agent-facing link to the ticket, empty when no subdomain is known.
    #[serde(default)]
    pub url: String,
}

/// A validated aggregation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregationRequest {
    office_ids: Vec<String>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl AggregationRequest {
    /// Build a request, trimming office codes and rejecting empty input or an
    /// inverted range. Duplicate codes are kept.
    pub fn new(
        office_ids: Vec<String>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Self, AggregateError> {
        if office_ids.is_empty() {
            return Err(AggregateError::InvalidRequest(
                "at least one organization id is required".to_string(),
            ));
        }

        let office_ids: Vec<String> = office_ids
            .into_iter()
            .map(|id| id.trim().to_string())
            .collect();
        if office_ids.iter().any(|id| id.is_empty()) {
            return Err(AggregateError::InvalidRequest(
                "organization ids cannot be blank".to_string(),
            ));
        }

        if start > end {
            return Err(AggregateError::InvalidRequest(format!(
                "start date {} is after end date {}",
                start.to_rfc3339(),
                end.to_rfc3339()
            )));
        }

        Ok(Self {
            office_ids,
            start,
            end,
        })
    }

    pub fn office_ids(&self) -> &[String] {
        &self.office_ids
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }
}
