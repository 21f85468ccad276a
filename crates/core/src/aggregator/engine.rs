//! Aggregation orchestrator.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono_tz::Tz;
use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::{info, info_span, warn, Instrument};

use crate::config::{AggregationConfig, ConfigError, ZendeskConfig};
use crate::metrics::{AGGREGATIONS, AGGREGATION_DURATION, TICKETS_REJECTED, TICKETS_RETURNED};
use crate::zendesk::{FieldId, ZendeskApi, OFFICE_CODE_FIELD_ID};

use super::{
    AggregateError, AggregationRequest, GroupCache, GroupNameResolver, MatchedTicket,
    OutputTicket, TicketFilter, TicketMapper, TicketPaginator,
};

/// Runtime settings for `TicketAggregator`.
#[derive(Debug, Clone)]
pub struct AggregatorSettings {
    pub office_field_id: FieldId,
    pub time_zone: Tz,
    pub max_parallel_searches: usize,
    pub max_parallel_lookups: usize,
    pub max_pages_per_office: u32,
    pub timeout: Duration,
    /// Prefix for `OutputTicket::url`; links are left empty when unset.
    pub agent_link_base: Option<String>,
}

impl Default for AggregatorSettings {
    fn default() -> Self {
        Self {
            office_field_id: OFFICE_CODE_FIELD_ID,
            time_zone: chrono_tz::America::New_York,
            max_parallel_searches: 4,
            max_parallel_lookups: 8,
            max_pages_per_office: 500,
            timeout: Duration::from_secs(120),
            agent_link_base: None,
        }
    }
}

impl AggregatorSettings {
    pub fn from_config(
        zendesk: &ZendeskConfig,
        aggregation: &AggregationConfig,
    ) -> Result<Self, ConfigError> {
        let time_zone: Tz = aggregation.time_zone.parse().map_err(|_| {
            ConfigError::ValidationError(format!(
                "aggregation.time_zone: unknown time zone '{}'",
                aggregation.time_zone
            ))
        })?;

        Ok(Self {
            office_field_id: zendesk.office_field_id,
            time_zone,
            max_parallel_searches: aggregation.max_parallel_searches.max(1),
            max_parallel_lookups: aggregation.max_parallel_lookups.max(1),
            max_pages_per_office: aggregation.max_pages_per_office,
            timeout: Duration::from_secs(aggregation.timeout_secs),
            agent_link_base: zendesk.agent_link_base(),
        })
    }
}

/// Collects the tickets of several offices created within a date range.
pub struct TicketAggregator {
    api: Arc<dyn ZendeskApi>,
    settings: AggregatorSettings,
}

impl TicketAggregator {
    pub fn new(api: Arc<dyn ZendeskApi>, settings: AggregatorSettings) -> Self {
        Self { api, settings }
    }

    pub fn settings(&self) -> &AggregatorSettings {
        &self.settings
    }

    /// Run one aggregation.
    ///
    /// Tickets come back grouped by office in request order, each office's
    /// tickets in search order. A ticket found under several offices appears
    /// once, attributed to the first. If any office's search fails the whole
    /// call fails and nothing is returned. Group lookup failures only blank
    /// the affected group names.
    pub async fn aggregate(
        &self,
        request: &AggregationRequest,
    ) -> Result<Vec<OutputTicket>, AggregateError> {
        let request_id = uuid::Uuid::new_v4();
        let span = info_span!("aggregate", %request_id, offices = request.office_ids().len());

        async {
            info!(
                start = %request.start(),
                end = %request.end(),
                "Starting aggregation"
            );
            let started = Instant::now();

            let result = match tokio::time::timeout(self.settings.timeout, self.run(request)).await
            {
                Ok(result) => result,
                Err(_) => Err(AggregateError::TimedOut(self.settings.timeout)),
            };

            let elapsed = started.elapsed();
            let label = match &result {
                Ok(_) => "success",
                Err(e) => e.kind(),
            };
            AGGREGATIONS.with_label_values(&[label]).inc();
            AGGREGATION_DURATION
                .with_label_values(&[label])
                .observe(elapsed.as_secs_f64());

            match &result {
                Ok(tickets) => {
                    TICKETS_RETURNED
                        .with_label_values(&[])
                        .observe(tickets.len() as f64);
                    info!(
                        tickets = tickets.len(),
                        elapsed_ms = elapsed.as_millis() as u64,
                        "Aggregation complete"
                    );
                }
                Err(e) => {
                    warn!(error = %e, elapsed_ms = elapsed.as_millis() as u64, "Aggregation failed");
                }
            }

            result
        }
        .instrument(span)
        .await
    }

    async fn run(&self, request: &AggregationRequest) -> Result<Vec<OutputTicket>, AggregateError> {
        let api: &dyn ZendeskApi = self.api.as_ref();
        let paginator = TicketPaginator::new(api, self.settings.max_pages_per_office);

        // Dropping this future on the first error cancels the other searches.
        let batches: Vec<(String, Vec<_>)> = stream::iter(request.office_ids().iter().cloned())
            .map(|office_id| {
                let paginator = &paginator;
                async move {
                    match paginator.search(&office_id).await {
                        Ok(tickets) => Ok((office_id, tickets)),
                        Err(source) => Err(AggregateError::Search { office_id, source }),
                    }
                }
            })
            .buffered(self.settings.max_parallel_searches)
            .try_collect()
            .await?;

        let filter = TicketFilter::new(self.settings.office_field_id, request.start(), request.end());
        let mut seen = HashSet::new();
        let mut duplicates = 0u64;
        let mut matched: Vec<MatchedTicket> = Vec::new();
        for (office_id, tickets) in batches {
            for hit in filter.apply(&office_id, tickets) {
                if seen.insert(hit.ticket.id) {
                    matched.push(hit);
                } else {
                    duplicates += 1;
                }
            }
        }
        TICKETS_REJECTED
            .with_label_values(&["duplicate"])
            .inc_by(duplicates);

        let cache = GroupCache::new();
        let mut mapper = TicketMapper::new(
            GroupNameResolver::new(api, &cache),
            self.settings.time_zone,
            self.settings.max_parallel_lookups,
        );
        if let Some(base) = &self.settings.agent_link_base {
            mapper = mapper.with_agent_link_base(base.as_str());
        }

        let tickets = mapper.map_all(matched).await;
        let groups = cache.len().await;
        info!(tickets = tickets.len(), duplicates, groups, "Mapped tickets");
        Ok(tickets)
    }
}
