//! Aggregation engine integration tests.
//!
//! These tests drive `TicketAggregator` end to end against `MockZendesk`:
//! search -> paginate -> filter -> dedupe -> resolve groups -> map

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio_test::{assert_err, assert_ok};

use roundup_core::{
    testing::{fixtures, MockZendesk},
    AggregateError, AggregationRequest, AggregatorSettings, PaginationError, TicketAggregator,
    ZendeskError,
};

/// Test helper owning the mock and an aggregator wired to it.
struct TestHarness {
    zendesk: Arc<MockZendesk>,
    aggregator: TicketAggregator,
}

impl TestHarness {
    fn new() -> Self {
        Self::with_settings(AggregatorSettings {
            agent_link_base: Some("https://acme.zendesk.com/agent/tickets".to_string()),
            ..AggregatorSettings::default()
        })
    }

    fn with_settings(settings: AggregatorSettings) -> Self {
        let zendesk = Arc::new(MockZendesk::new());
        let aggregator = TicketAggregator::new(zendesk.clone(), settings);
        Self {
            zendesk,
            aggregator,
        }
    }

    async fn aggregate(
        &self,
        offices: &[&str],
    ) -> Result<Vec<roundup_core::OutputTicket>, AggregateError> {
        let request = request(offices, march_start(), march_end());
        self.aggregator.aggregate(&request).await
    }
}

fn march_start() -> DateTime<Utc> {
    fixtures::at("2024-03-01T00:00:00Z")
}

fn march_end() -> DateTime<Utc> {
    fixtures::at("2024-03-31T23:59:59Z")
}

fn request(offices: &[&str], start: DateTime<Utc>, end: DateTime<Utc>) -> AggregationRequest {
    AggregationRequest::new(offices.iter().map(|s| s.to_string()).collect(), start, end)
        .expect("valid request")
}

#[tokio::test]
async fn test_full_aggregation() {
    let harness = TestHarness::new();
    harness.zendesk.add_group(100, "Tax Support").await;
    harness.zendesk.add_group(200, "Payroll").await;
    harness
        .zendesk
        .set_pages(
            "42",
            vec![
                vec![
                    fixtures::ticket_in_group(1, "42", "2024-03-02T14:00:00Z", Some(100)),
                    // Free-text hit on another office's ticket
                    fixtures::ticket_in_group(2, "420", "2024-03-02T14:00:00Z", Some(100)),
                ],
                vec![
                    // Outside the range
                    fixtures::ticket_in_group(3, "42", "2024-04-02T14:00:00Z", Some(100)),
                    fixtures::ticket_in_group(4, "42", "2024-03-20T14:00:00Z", None),
                ],
            ],
        )
        .await;
    harness
        .zendesk
        .set_pages(
            "7",
            vec![vec![fixtures::ticket_in_group(
                5,
                "7",
                "2024-03-15T03:00:00Z",
                Some(200),
            )]],
        )
        .await;

    let tickets = assert_ok!(harness.aggregate(&["42", "7"]).await);

    let ids: Vec<u64> = tickets.iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![1, 4, 5]);

    assert_eq!(tickets[0].organization_id, "42");
    assert_eq!(tickets[0].group_name, "Tax Support");
    assert_eq!(tickets[0].created_at, "2024-03-02 09:00:00");
    assert_eq!(tickets[0].priority, "normal");
    assert_eq!(tickets[0].url, "https://acme.zendesk.com/agent/tickets/1");

    assert_eq!(tickets[1].group_name, "");

    assert_eq!(tickets[2].organization_id, "7");
    assert_eq!(tickets[2].group_name, "Payroll");
    // 2024-03-15 is after the DST switch
    assert_eq!(tickets[2].created_at, "2024-03-14 23:00:00");

    for ticket in &tickets {
        let created = chrono::NaiveDateTime::parse_from_str(&ticket.created_at, "%Y-%m-%d %H:%M:%S");
        assert!(created.is_ok(), "bad timestamp {}", ticket.created_at);
    }
}

#[tokio::test]
async fn test_only_exact_office_matches_are_returned() {
    let harness = TestHarness::new();
    harness
        .zendesk
        .set_pages(
            "42",
            vec![vec![
                fixtures::ticket(1, "42", "2024-03-05T10:00:00Z"),
                fixtures::ticket(2, "43", "2024-03-05T10:00:00Z"),
            ]],
        )
        .await;

    let tickets = assert_ok!(harness.aggregate(&["42"]).await);
    assert_eq!(tickets.len(), 1);
    assert_eq!(tickets[0].id, 1);
    assert!(tickets.iter().all(|t| t.organization_id == "42"));
}

#[tokio::test]
async fn test_every_ticket_is_inside_the_range() {
    let harness = TestHarness::new();
    harness
        .zendesk
        .set_pages(
            "42",
            vec![vec![
                fixtures::ticket(1, "42", "2024-02-29T23:59:59Z"),
                fixtures::ticket(2, "42", "2024-03-01T00:00:00Z"),
                fixtures::ticket(3, "42", "2024-03-31T23:59:59Z"),
                fixtures::ticket(4, "42", "2024-04-01T00:00:00Z"),
            ]],
        )
        .await;

    let tickets = assert_ok!(harness.aggregate(&["42"]).await);
    let ids: Vec<u64> = tickets.iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![2, 3]);
}

#[tokio::test]
async fn test_failed_search_returns_no_partial_results() {
    let harness = TestHarness::new();
    harness
        .zendesk
        .set_pages(
            "42",
            vec![vec![fixtures::ticket(1, "42", "2024-03-05T10:00:00Z")]],
        )
        .await;
    harness
        .zendesk
        .set_pages(
            "7",
            vec![
                vec![fixtures::ticket(2, "7", "2024-03-05T10:00:00Z")],
                vec![fixtures::ticket(3, "7", "2024-03-05T10:00:00Z")],
            ],
        )
        .await;
    harness
        .zendesk
        .fail_search("7", 2, fixtures::api_error(502))
        .await;

    let err = assert_err!(harness.aggregate(&["42", "7"]).await);

    match &err {
        AggregateError::Search { office_id, source } => {
            assert_eq!(office_id, "7");
            assert!(matches!(source, PaginationError::Remote { page: 2, .. }));
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(matches!(
        err.remote_error(),
        Some(ZendeskError::Api { status: 502, .. })
    ));
    assert_eq!(err.kind(), "search_failed");
}

#[tokio::test]
async fn test_malformed_payload_is_fatal() {
    let harness = TestHarness::new();
    harness
        .zendesk
        .fail_search(
            "42",
            1,
            ZendeskError::Parse {
                url: "mock://search/42/1".to_string(),
                message: "missing field `created_at`".to_string(),
            },
        )
        .await;

    let err = assert_err!(harness.aggregate(&["42"]).await);
    assert!(matches!(err.remote_error(), Some(ZendeskError::Parse { .. })));
}

#[tokio::test]
async fn test_group_failure_keeps_ticket() {
    let harness = TestHarness::new();
    harness
        .zendesk
        .fail_group(100, fixtures::api_error(500))
        .await;
    harness
        .zendesk
        .set_pages(
            "42",
            vec![vec![fixtures::ticket_in_group(
                1,
                "42",
                "2024-03-05T10:00:00Z",
                Some(100),
            )]],
        )
        .await;

    let tickets = assert_ok!(harness.aggregate(&["42"]).await);
    assert_eq!(tickets.len(), 1);
    assert_eq!(tickets[0].group_name, "");
}

#[tokio::test]
async fn test_shared_group_is_fetched_once() {
    let harness = TestHarness::new();
    harness.zendesk.add_group(100, "Tax Support").await;
    harness
        .zendesk
        .set_group_delay(Duration::from_millis(5))
        .await;
    harness
        .zendesk
        .set_pages(
            "42",
            (1..=5)
                .map(|id| {
                    vec![fixtures::ticket_in_group(
                        id,
                        "42",
                        "2024-03-05T10:00:00Z",
                        Some(100),
                    )]
                })
                .collect(),
        )
        .await;

    let tickets = assert_ok!(harness.aggregate(&["42"]).await);
    assert_eq!(tickets.len(), 5);
    assert!(tickets.iter().all(|t| t.group_name == "Tax Support"));
    assert_eq!(harness.zendesk.group_request_count(100).await, 1);
}

#[tokio::test]
async fn test_groups_are_not_shared_between_requests() {
    let harness = TestHarness::new();
    harness.zendesk.add_group(100, "Tax Support").await;
    harness
        .zendesk
        .set_pages(
            "42",
            vec![vec![fixtures::ticket_in_group(
                1,
                "42",
                "2024-03-05T10:00:00Z",
                Some(100),
            )]],
        )
        .await;

    assert_ok!(harness.aggregate(&["42"]).await);
    assert_ok!(harness.aggregate(&["42"]).await);
    assert_eq!(harness.zendesk.group_request_count(100).await, 2);
}

#[tokio::test]
async fn test_ticket_under_two_offices_appears_once() {
    let harness = TestHarness::new();
    let mut shared = fixtures::ticket(9, "42", "2024-03-05T10:00:00Z");
    harness
        .zendesk
        .set_pages("42", vec![vec![shared.clone()]])
        .await;
    // Same ticket id, now reported under office 7
    shared.custom_fields = fixtures::ticket(9, "7", "2024-03-05T10:00:00Z").custom_fields;
    harness
        .zendesk
        .set_pages(
            "7",
            vec![vec![shared, fixtures::ticket(10, "7", "2024-03-05T10:00:00Z")]],
        )
        .await;

    let tickets = assert_ok!(harness.aggregate(&["42", "7", "42"]).await);
    let ids: Vec<(u64, &str)> = tickets
        .iter()
        .map(|t| (t.id, t.organization_id.as_str()))
        .collect();
    assert_eq!(ids, vec![(9, "42"), (10, "7")]);
}

#[tokio::test]
async fn test_output_follows_request_order_with_slow_searches() {
    let harness = TestHarness::with_settings(AggregatorSettings {
        max_parallel_searches: 3,
        ..AggregatorSettings::default()
    });
    harness
        .zendesk
        .set_search_delay(Duration::from_millis(5))
        .await;
    for (office, id) in [("c", 3), ("a", 1), ("b", 2)] {
        harness
            .zendesk
            .set_pages(
                office,
                vec![vec![fixtures::ticket(id, office, "2024-03-05T10:00:00Z")]],
            )
            .await;
    }

    let tickets = assert_ok!(harness.aggregate(&["c", "a", "b"]).await);
    let ids: Vec<u64> = tickets.iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![3, 1, 2]);
    assert!(tickets.iter().all(|t| t.url.is_empty()));
}

#[tokio::test]
async fn test_empty_result_is_success() {
    let harness = TestHarness::new();

    let tickets = assert_ok!(harness.aggregate(&["404"]).await);
    assert!(tickets.is_empty());
    assert_eq!(harness.zendesk.search_requests().await.len(), 1);
}

#[tokio::test]
async fn test_slow_search_times_out() {
    let harness = TestHarness::with_settings(AggregatorSettings {
        timeout: Duration::from_millis(20),
        ..AggregatorSettings::default()
    });
    harness
        .zendesk
        .set_search_delay(Duration::from_millis(500))
        .await;

    let err = assert_err!(harness.aggregate(&["42"]).await);
    assert!(matches!(err, AggregateError::TimedOut(_)));
    assert_eq!(err.kind(), "timed_out");
}

#[tokio::test]
async fn test_page_cap_fails_aggregation() {
    let harness = TestHarness::with_settings(AggregatorSettings {
        max_pages_per_office: 2,
        ..AggregatorSettings::default()
    });
    harness
        .zendesk
        .set_pages("42", vec![vec![], vec![], vec![]])
        .await;

    let err = assert_err!(harness.aggregate(&["42"]).await);
    assert!(matches!(
        err,
        AggregateError::Search {
            source: PaginationError::PageLimitExceeded(2),
            ..
        }
    ));
}

#[tokio::test]
async fn test_single_instant_range() {
    let harness = TestHarness::new();
    harness
        .zendesk
        .set_pages(
            "42",
            vec![vec![
                fixtures::ticket(1, "42", "2024-03-05T10:00:00Z"),
                fixtures::ticket(2, "42", "2024-03-05T10:00:01Z"),
            ]],
        )
        .await;

    let instant = fixtures::at("2024-03-05T10:00:00Z");
    let tickets = assert_ok!(
        harness
            .aggregator
            .aggregate(&request(&["42"], instant, instant))
            .await
    );
    assert_eq!(tickets.len(), 1);
    assert_eq!(tickets[0].id, 1);
}
