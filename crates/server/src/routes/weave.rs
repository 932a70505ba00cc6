//! `POST /v1/weave/recommendations`: the cache-first recommendation
//! coordinator entry (spec §4.8). Calling it again for the same
//! `(session_id, message_id)` is how a caller polls.

use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use aip_auction_common::recommendation::Recommendation;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct WeaveRequest {
    pub session_id: String,
    pub message_id: String,
    pub query: String,
}

pub async fn create_recommendation(
    State(state): State<AppState>,
    Json(request): Json<WeaveRequest>,
) -> Json<Recommendation> {
    let recommendation = state
        .coordinator
        .get_or_create(request.session_id, request.message_id, request.query)
        .await;
    Json(recommendation)
}
