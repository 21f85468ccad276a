//! Testing utilities and a mock Zendesk for aggregation tests.
//!
//! `MockZendesk` implements `ZendeskApi` in memory so the engine and the HTTP
//! layer can be exercised without a Zendesk account.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use roundup_core::testing::{fixtures, MockZendesk};
//! use roundup_core::{AggregatorSettings, TicketAggregator};
//!
//! let zendesk = Arc::new(MockZendesk::new());
//! zendesk.set_pages("42", vec![vec![fixtures::ticket(1, "42", "2024-03-05T10:00:00Z")]]).await;
//!
//! let aggregator = TicketAggregator::new(zendesk.clone(), AggregatorSettings::default());
//! ```

mod mock_zendesk;

pub use mock_zendesk::MockZendesk;

/// Test fixtures and helper functions.
pub mod fixtures {
    use chrono::{DateTime, Utc};
    use serde_json::json;

    use crate::zendesk::{CustomField, CustomFields, RawTicket, ZendeskError, OFFICE_CODE_FIELD_ID};

    /// Parse an RFC 3339 timestamp.
    ///
    /// # Panics
    ///
    /// Panics on malformed input.
    pub fn at(timestamp: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(timestamp)
            .unwrap_or_else(|e| panic!("bad fixture timestamp {:?}: {}", timestamp, e))
            .with_timezone(&Utc)
    }

    /// A ticket whose office-code field holds `office_id`.
    pub fn ticket(id: u64, office_id: &str, created_at: &str) -> RawTicket {
        RawTicket {
            id,
            subject: format!("Ticket {}", id),
            description: format!("Description of ticket {}", id),
            created_at: at(created_at),
            status: "open".to_string(),
            priority: Some("normal".to_string()),
            group_id: None,
            custom_fields: CustomFields::new(vec![
                CustomField {
                    id: 27642,
                    value: json!("unrelated"),
                },
                CustomField {
                    id: OFFICE_CODE_FIELD_ID,
                    value: json!(office_id),
                },
            ]),
        }
    }

    /// Same as `ticket`, assigned to a group.
    pub fn ticket_in_group(
        id: u64,
        office_id: &str,
        created_at: &str,
        group_id: Option<u64>,
    ) -> RawTicket {
        RawTicket {
            group_id,
            ..ticket(id, office_id, created_at)
        }
    }

    /// A Zendesk HTTP error with the given status.
    pub fn api_error(status: u16) -> ZendeskError {
        ZendeskError::Api {
            status,
            method: "GET",
            url: "mock://zendesk".to_string(),
            body: format!("{{\"error\":\"mock status {}\"}}", status),
        }
    }
}
