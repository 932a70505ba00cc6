//! `POST /aip/bid-response`: a bidder submits a signed bid against an open
//! auction.

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde_json::{json, Value};

use aip_auction_common::auction::BidResponse;
use aip_auction_common::error::AuctionError;
use aip_auction_common::security::enforce;

use crate::error::ApiError;
use crate::state::AppState;

pub async fn submit_bid(
    State(state): State<AppState>,
    Json(bid): Json<BidResponse>,
) -> Result<Json<Value>, ApiError> {
    let public_key_pem = state
        .registry
        .public_key(&bid.bidder)
        .ok_or(AuctionError::NotInvited)?
        .to_owned();

    enforce(
        &bid,
        &["signature"],
        &bid.signature,
        &public_key_pem,
        bid.timestamp,
        Utc::now().timestamp_millis(),
        state.settings.max_clock_skew_ms,
        &bid.bidder,
        &bid.nonce,
        state.settings.nonce_ttl_seconds,
        state.nonce_store.as_ref(),
    )
    .await
    .map_err(AuctionError::from)?;

    state.inbox.submit_bid(bid).await?;
    Ok(Json(json!({"status": "accepted"})))
}
