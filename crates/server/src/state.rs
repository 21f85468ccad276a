use std::sync::Arc;
use roundup_core::{Config, SanitizedConfig, TicketAggregator};

/// Shared application state
pub struct AppState {
    config: Config,
    aggregator: Option<Arc<TicketAggregator>>,
}

impl AppState {
    pub fn new(config: Config, aggregator: Option<Arc<TicketAggregator>>) -> Self {
        Self { config, aggregator }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    /// The aggregation engine, `None` when Zendesk is not configured.
    pub fn aggregator(&self) -> Option<&Arc<TicketAggregator>> {
        self.aggregator.as_ref()
    }
}
