//! Common test utilities for E2E testing with a mock Zendesk.
//!
//! This module provides a test fixture that builds the in-process router with
//! `MockZendesk` injected behind the aggregation engine, so the HTTP surface
//! can be exercised without a Zendesk account.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use roundup_core::{
    load_config_from_str, testing::MockZendesk, AggregatorSettings, Config, TicketAggregator,
};
use roundup_server::{api::create_router, state::AppState};

/// Re-export fixtures for test convenience
pub use roundup_core::testing::fixtures;

const CONFIG_WITH_ZENDESK: &str = r#"
[server]
host = "127.0.0.1"
port = 8080

[zendesk]
subdomain = "acme"
email = "ops@acme.test"
api_token = "secret"

[aggregation]
time_zone = "America/New_York"
timeout_secs = 5
"#;

/// Test fixture for E2E testing with a mock Zendesk.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_fetch() {
///     let fixture = TestFixture::new().await;
///     fixture.zendesk.set_pages("42", vec![vec![fixtures::ticket(1, "42", "2024-03-05T10:00:00Z")]]).await;
///
///     let response = fixture.post("/api/v1/tickets", json!({
///         "organizations": ["42"],
///         "start_date": "2024-03-01T00:00:00Z",
///         "end_date": "2024-03-31T23:59:59Z"
///     })).await;
///
///     assert_eq!(response.status, 200);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock Zendesk - configure search pages, groups and failures
    pub zendesk: Arc<MockZendesk>,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestFixture {
    /// Create a fixture with Zendesk configured and backed by the mock.
    pub async fn new() -> Self {
        let config = load_config_from_str(CONFIG_WITH_ZENDESK).expect("Invalid test config");
        let zendesk = Arc::new(MockZendesk::new());

        let zendesk_config = config.zendesk.as_ref().expect("zendesk section");
        let settings = AggregatorSettings::from_config(zendesk_config, &config.aggregation)
            .expect("Invalid aggregation settings");
        let aggregator = TicketAggregator::new(zendesk.clone(), settings);

        Self::build(config, Some(Arc::new(aggregator)), zendesk)
    }

    /// Create a fixture without a `[zendesk]` section.
    pub async fn without_zendesk() -> Self {
        let config = load_config_from_str("").expect("Invalid test config");
        Self::build(config, None, Arc::new(MockZendesk::new()))
    }

    fn build(
        config: Config,
        aggregator: Option<Arc<TicketAggregator>>,
        zendesk: Arc<MockZendesk>,
    ) -> Self {
        let state = Arc::new(AppState::new(config, aggregator));
        Self {
            router: create_router(state),
            zendesk,
        }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a GET request and return the raw text body.
    pub async fn get_text(&self, path: &str) -> (StatusCode, String) {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();
        (status, String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a POST request with raw string body (for testing malformed JSON).
    pub async fn post_raw(&self, path: &str, body: &str) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    /// Send a request to the test server.
    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        self.send(request_builder.body(body).unwrap()).await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}
