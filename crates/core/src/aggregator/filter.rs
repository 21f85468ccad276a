//! Exact-match post-filtering and output mapping.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use futures::stream::{self, StreamExt};
use tracing::debug;

use crate::metrics::TICKETS_REJECTED;
use crate::zendesk::{FieldId, RawTicket};

use super::{GroupNameResolver, OutputTicket};

const CREATED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Render a UTC instant as wall-clock time in `tz`.
pub fn format_created_at(created_at: DateTime<Utc>, tz: Tz) -> String {
    created_at.with_timezone(&tz).format(CREATED_AT_FORMAT).to_string()
}

/// A search hit that passed filtering, tagged with the office it matched.
#[derive(Debug, Clone)]
pub struct MatchedTicket {
    pub office_id: String,
    pub ticket: RawTicket,
}

/// Keeps tickets whose office-code field equals the searched code and whose
/// creation instant lies in `[start, end]`.
#[derive(Debug, Clone)]
pub struct TicketFilter {
    field_id: FieldId,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TicketFilter {
    pub fn new(field_id: FieldId, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            field_id,
            start,
            end,
        }
    }

    /// Whether `created_at` is inside the range, both bounds included.
    pub fn contains(&self, created_at: DateTime<Utc>) -> bool {
        self.start <= created_at && created_at <= self.end
    }

    /// Whether the ticket's office-code field holds exactly `office_id`.
    pub fn matches_office(&self, ticket: &RawTicket, office_id: &str) -> bool {
        ticket.custom_fields.text(self.field_id).as_deref() == Some(office_id)
    }

    /// Filter one office's search results, keeping their order.
    pub fn apply(&self, office_id: &str, tickets: Vec<RawTicket>) -> Vec<MatchedTicket> {
        let total = tickets.len();
        let mut mismatched = 0u64;
        let mut out_of_range = 0u64;

        let matched: Vec<MatchedTicket> = tickets
            .into_iter()
            .filter(|ticket| {
                if !self.matches_office(ticket, office_id) {
                    mismatched += 1;
                    return false;
                }
                if !self.contains(ticket.created_at) {
                    out_of_range += 1;
                    return false;
                }
                true
            })
            .map(|ticket| MatchedTicket {
                office_id: office_id.to_string(),
                ticket,
            })
            .collect();

        TICKETS_REJECTED
            .with_label_values(&["office_mismatch"])
            .inc_by(mismatched);
        TICKETS_REJECTED
            .with_label_values(&["out_of_range"])
            .inc_by(out_of_range);

        debug!(
            office_id,
            total,
            kept = matched.len(),
            mismatched,
            out_of_range,
            "Filtered search results"
        );

        matched
    }
}

/// Turns matched tickets into `OutputTicket`s, resolving group names
/// concurrently.
pub struct TicketMapper<'a> {
    resolver: GroupNameResolver<'a>,
    time_zone: Tz,
    agent_link_base: Option<String>,
    max_parallel_lookups: usize,
}

impl<'a> TicketMapper<'a> {
    pub fn new(resolver: GroupNameResolver<'a>, time_zone: Tz, max_parallel_lookups: usize) -> Self {
        Self {
            resolver,
            time_zone,
            agent_link_base: None,
            max_parallel_lookups: max_parallel_lookups.max(1),
        }
    }

    /// Prefix for ticket links, e.g. `https://acme.zendesk.com/agent/tickets`.
    pub fn with_agent_link_base(mut self, base: impl Into<String>) -> Self {
        self.agent_link_base = Some(base.into().trim_end_matches('/').to_string());
        self
    }

    /// Filter and map a single office's results.
    pub async fn process(
        &self,
        office_id: &str,
        tickets: Vec<RawTicket>,
        filter: &TicketFilter,
    ) -> Vec<OutputTicket> {
        self.map_all(filter.apply(office_id, tickets)).await
    }

    /// Map every ticket. Output order follows input order regardless of when
    /// each group lookup completes.
    pub async fn map_all(&self, tickets: Vec<MatchedTicket>) -> Vec<OutputTicket> {
        stream::iter(tickets)
            .map(|matched| self.map_one(matched))
            .buffered(self.max_parallel_lookups)
            .collect()
            .await
    }

    pub async fn map_one(&self, matched: MatchedTicket) -> OutputTicket {
        let MatchedTicket { office_id, ticket } = matched;
        let group_name = self.resolver.resolve(ticket.group_id).await;
        let url = self
            .agent_link_base
            .as_ref()
            .map(|base| format!("{}/{}", base, ticket.id))
            .unwrap_or_default();

        OutputTicket {
            id: ticket.id,
            subject: ticket.subject,
            description: ticket.description,
            organization_id: office_id,
            created_at: format_created_at(ticket.created_at, self.time_zone),
            status: ticket.status,
            priority: ticket.priority.unwrap_or_default(),
            group_name,
            url,
        }
    }
}
