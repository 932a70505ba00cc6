//! Wire types for the auction surface (spec §3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::classify::CategoryPool;

/// Nonce and signature carried by a `ContextRequest` (spec §3: `auth`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthEnvelope {
    pub nonce: String,
    pub signature: String,
}

/// Inbound request describing the user intent a platform wants matched
/// against an ad.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextRequest {
    pub request_id: String,
    pub session_id: String,
    pub platform_id: String,
    pub query_text: String,
    #[serde(default)]
    pub locale: Option<String>,
    #[serde(default)]
    pub geo: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub auth: AuthEnvelope,
}

/// Pricing model a bid is denominated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PricingModel {
    Cpx,
    Cpc,
    Cpa,
}

impl PricingModel {
    /// Selection priority: higher wins ties against a lower-priority model
    /// regardless of nominal price (spec §4.6.1: CPA beats CPC beats CPX).
    #[must_use]
    pub fn priority(self) -> u8 {
        match self {
            PricingModel::Cpx => 0,
            PricingModel::Cpc => 1,
            PricingModel::Cpa => 2,
        }
    }
}

/// A bid submitted by an invited bidder against an open auction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BidResponse {
    pub auction_id: String,
    pub bidder: String,
    pub pricing_model: PricingModel,
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creative: Option<serde_json::Value>,
    pub timestamp: i64,
    pub nonce: String,
    pub signature: String,
}

/// Server-side record of an open or closed auction.
#[derive(Debug, Clone)]
pub struct Auction {
    pub auction_id: String,
    pub pools: Vec<CategoryPool>,
    pub invited_bidders: Vec<String>,
    pub opened_at: DateTime<Utc>,
    pub window_ms: i64,
    pub bids: Vec<BidResponse>,
}

impl Auction {
    #[must_use]
    pub fn closes_at(&self) -> DateTime<Utc> {
        self.opened_at + chrono::Duration::milliseconds(self.window_ms)
    }

    #[must_use]
    pub fn is_closed(&self, now: DateTime<Utc>) -> bool {
        now >= self.closes_at()
    }
}

/// The winning bid's details, attached to a closed `AuctionResult` (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Winner {
    pub bidder: String,
    pub price: f64,
    pub pricing_model: PricingModel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creative: Option<serde_json::Value>,
    pub serve_token: String,
}

/// Outcome of a closed auction: either a winning bid or an explicit no-bid
/// (spec §3, §6: `AuctionResult` or `{no_bid:true}`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuctionResult {
    pub auction_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner: Option<Winner>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub no_bid: bool,
}

impl AuctionResult {
    #[must_use]
    pub fn won(auction_id: String, winner: Winner) -> Self {
        Self {
            auction_id,
            winner: Some(winner),
            no_bid: false,
        }
    }

    #[must_use]
    pub fn no_bid(auction_id: String) -> Self {
        Self {
            auction_id,
            winner: None,
            no_bid: true,
        }
    }
}

/// Body published to fanout on auction open (spec §4.5: `{auction_id,
/// context_request, window_deadline}`), one per target pool.
///
/// Carries the server's own signature over the rest of the envelope so a
/// bidder can confirm an invite came from the auction server rather than
/// whoever has access to the fanout topic.
#[derive(Debug, Clone, Serialize)]
pub struct FanoutEnvelope<'a> {
    pub auction_id: &'a str,
    pub context_request: &'a ContextRequest,
    pub window_deadline: DateTime<Utc>,
    pub server_signature: String,
}
