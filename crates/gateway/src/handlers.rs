use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use common::models::{AccountStats, NewTrade, TradeSubmission};
use tracing::{debug, error, warn};

use crate::error::ApiError;
use crate::server::AppState;

/// `POST /trades`: validates the fill and queues it for aggregation.
///
/// Responds 200 with an empty body once the trade is durably queued.
pub async fn submit_trade(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<TradeSubmission>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(submission) = payload.map_err(|e| {
        debug!("Rejected trade payload: {}", e);
        ApiError::bad_request("Invalid JSON payload")
    })?;

    let trade =
        NewTrade::try_from(submission).map_err(|e| ApiError::bad_request(e.to_string()))?;

    state.gateway.submit(trade).await.map_err(|e| {
        error!("Failed to insert trade: {}", e);
        ApiError::internal("Failed to process trade")
    })?;

    Ok(StatusCode::OK)
}

/// `GET /stats/:account`: current totals, zeroed for unknown accounts.
pub async fn get_stats(
    State(state): State<Arc<AppState>>,
    Path(account): Path<String>,
) -> Result<Json<AccountStats>, ApiError> {
    let stats = state.gateway.get_stats(&account).await.map_err(|e| {
        error!("Failed to query stats for {}: {}", account, e);
        ApiError::internal("Failed to retrieve stats")
    })?;
    Ok(Json(stats))
}

/// `GET /healthz`: 200 while the store answers, 503 otherwise.
pub async fn health(State(state): State<Arc<AppState>>) -> Result<&'static str, ApiError> {
    state.gateway.ping().await.map_err(|e| {
        warn!("Health check failed: {}", e);
        ApiError::unavailable("Storage unavailable")
    })?;
    Ok("OK")
}
