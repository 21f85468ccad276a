//! Ticket aggregation API handler.

use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;

use roundup_core::{AggregateError, AggregationRequest, OutputTicket};

use crate::state::AppState;

/// Message returned for every remote failure; details only go to the log.
const FETCH_FAILED: &str = "Failed to fetch tickets from Zendesk";

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for fetching tickets
#[derive(Debug, Deserialize)]
pub struct FetchTicketsBody {
    /// Office codes to search
    pub organizations: Vec<String>,
    /// Inclusive lower bound on ticket creation time
    #[serde(alias = "startDate")]
    pub start_date: DateTime<Utc>,
    /// Inclusive upper bound on ticket creation time
    #[serde(alias = "endDate")]
    pub end_date: DateTime<Utc>,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/v1/tickets
///
/// Aggregate the tickets of the given offices created within the date range.
pub async fn fetch_tickets(
    State(state): State<Arc<AppState>>,
    Json(body): Json<FetchTicketsBody>,
) -> Result<Json<Vec<OutputTicket>>, ApiError> {
    let aggregator = state.aggregator().ok_or_else(|| {
        error!("Ticket request rejected: Zendesk credentials not configured");
        api_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "Zendesk credentials not configured",
        )
    })?;

    let request = AggregationRequest::new(body.organizations, body.start_date, body.end_date)
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))?;

    match aggregator.aggregate(&request).await {
        Ok(tickets) => Ok(Json(tickets)),
        Err(AggregateError::InvalidRequest(message)) => {
            Err(api_error(StatusCode::BAD_REQUEST, message))
        }
        Err(e) => {
            match e.remote_error() {
                Some(remote) => error!(
                    error = %e,
                    body = remote.response_body().unwrap_or_default(),
                    "Error fetching tickets from Zendesk"
                ),
                None => error!(error = %e, "Error fetching tickets from Zendesk"),
            }
            Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, FETCH_FAILED))
        }
    }
}
