//! `POST /aip/context` (alias `/context`): accepts a signed `ContextRequest`
//! from a platform, runs an auction for it end to end, and returns the
//! outcome.

use axum::extract::State;
use axum::Json;
use chrono::Utc;

use aip_auction_common::auction::ContextRequest;
use aip_auction_common::error::AuctionError;
use aip_auction_common::security::enforce;

use crate::error::ApiError;
use crate::state::AppState;

pub async fn open_auction(
    State(state): State<AppState>,
    Json(request): Json<ContextRequest>,
) -> Result<Json<aip_auction_common::auction::AuctionResult>, ApiError> {
    let public_key_pem = state
        .platforms
        .public_key(&request.platform_id)
        .ok_or(AuctionError::SignatureInvalid)?
        .to_owned();

    enforce(
        &request,
        &["auth", "signature"],
        &request.auth.signature,
        &public_key_pem,
        request.timestamp.timestamp_millis(),
        Utc::now().timestamp_millis(),
        state.settings.max_clock_skew_ms,
        &request.platform_id,
        &request.auth.nonce,
        state.settings.nonce_ttl_seconds,
        state.nonce_store.as_ref(),
    )
    .await
    .map_err(AuctionError::from)?;

    let auction_id = request.request_id.clone();
    let outcome = state.runner.run(auction_id, &request).await?;
    Ok(Json(outcome))
}
