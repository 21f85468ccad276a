pub mod aggregator;
pub mod config;
pub mod metrics;
pub mod testing;
pub mod zendesk;

pub use aggregator::{
    format_created_at, AggregateError, AggregationRequest, AggregatorSettings, GroupCache,
    GroupNameResolver, MatchedTicket, OutputTicket, PaginationError, TicketAggregator,
    TicketFilter, TicketMapper, TicketPaginator,
};
pub use config::{
    load_config, load_config_from_str, validate_config, AggregationConfig, Config, ConfigError,
    SanitizedConfig, ServerConfig, ZendeskConfig,
};
pub use zendesk::{
    Group, RawTicket, RetryPolicy, SearchPage, ZendeskApi, ZendeskClient, ZendeskError,
    OFFICE_CODE_FIELD_ID,
};
