//! Cross-request auction rendezvous (spec §4.6).
//!
//! Each open auction lives in-memory for the lifetime of its window. The
//! inbox is a process-wide map from `auction_id` to its slot; looking a slot
//! up only needs the map locked long enough to clone an `Arc`, while mutating
//! an individual auction (appending a bid, closing it) holds only that
//! slot's own mutex. This keeps bid submission for auction A from blocking
//! on unrelated traffic for auction B.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;

use crate::auction::types::{Auction, BidResponse};
use crate::error::{AuctionError, AuctionResult};

type Slot = Arc<Mutex<Auction>>;

/// Process-wide table of currently-open auctions.
#[derive(Default)]
pub struct AuctionInbox {
    slots: Mutex<HashMap<String, Slot>>,
}

impl AuctionInbox {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a new auction slot. Fails with `AuctionError::Conflict` if
    /// `auction.auction_id` is already open.
    pub async fn open(&self, auction: Auction) -> AuctionResult<()> {
        let mut slots = self.slots.lock().await;
        if slots.contains_key(&auction.auction_id) {
            return Err(AuctionError::Conflict.into());
        }
        slots.insert(auction.auction_id.clone(), Arc::new(Mutex::new(auction)));
        Ok(())
    }

    async fn slot(&self, auction_id: &str) -> Option<Slot> {
        let slots = self.slots.lock().await;
        slots.get(auction_id).cloned()
    }

    /// Appends `bid` to the named auction if it is still open, the bidder
    /// was invited, and the bidder has not already bid.
    ///
    /// # Errors
    /// Returns `AuctionError::UnknownAuction` if no such auction is open,
    /// `AuctionError::WindowClosed` if its window has elapsed,
    /// `AuctionError::NotInvited` if `bid.bidder` was not invited, or
    /// `AuctionError::DuplicateBid` if `bid.bidder` already bid.
    pub async fn submit_bid(&self, bid: BidResponse) -> AuctionResult<()> {
        let slot = self
            .slot(&bid.auction_id)
            .await
            .ok_or(AuctionError::UnknownAuction)?;

        let mut auction = slot.lock().await;
        if auction.is_closed(Utc::now()) {
            return Err(AuctionError::WindowClosed.into());
        }
        if !auction.invited_bidders.iter().any(|b| b == &bid.bidder) {
            return Err(AuctionError::NotInvited.into());
        }
        if auction.bids.iter().any(|b| b.bidder == bid.bidder) {
            return Err(AuctionError::DuplicateBid.into());
        }
        auction.bids.push(bid);
        Ok(())
    }

    /// Removes and returns the named auction's accumulated state, for the
    /// runner to finalize. Returns `None` if the auction is not open (already
    /// closed, or never opened).
    pub async fn close(&self, auction_id: &str) -> Option<Auction> {
        let slot = {
            let mut slots = self.slots.lock().await;
            slots.remove(auction_id)?
        };
        let auction = slot.lock().await;
        Some(auction.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auction::types::PricingModel;

    fn auction(id: &str, window_ms: i64, invited: &[&str]) -> Auction {
        Auction {
            auction_id: id.into(),
            pools: vec!["sports".into()],
            invited_bidders: invited.iter().map(|s| (*s).to_owned()).collect(),
            opened_at: Utc::now(),
            window_ms,
            bids: Vec::new(),
        }
    }

    fn bid(auction_id: &str, bidder: &str) -> BidResponse {
        BidResponse {
            auction_id: auction_id.into(),
            bidder: bidder.into(),
            pricing_model: PricingModel::Cpc,
            price: 1.0,
            creative: None,
            timestamp: 0,
            nonce: "n".into(),
            signature: "s".into(),
        }
    }

    #[tokio::test]
    async fn open_then_close_returns_accumulated_bids() {
        let inbox = AuctionInbox::new();
        inbox.open(auction("a1", 50, &["acme"])).await.expect("open");
        inbox.submit_bid(bid("a1", "acme")).await.expect("bid");
        let closed = inbox.close("a1").await.expect("closed");
        assert_eq!(closed.bids.len(), 1);
    }

    #[tokio::test]
    async fn duplicate_open_is_conflict() {
        let inbox = AuctionInbox::new();
        inbox.open(auction("a1", 50, &["acme"])).await.expect("first open");
        let err = inbox
            .open(auction("a1", 50, &["acme"]))
            .await
            .expect_err("second open must conflict");
        assert_eq!(*err.current_context(), AuctionError::Conflict);
    }

    #[tokio::test]
    async fn bid_on_unknown_auction_is_rejected() {
        let inbox = AuctionInbox::new();
        let err = inbox
            .submit_bid(bid("missing", "acme"))
            .await
            .expect_err("unknown auction");
        assert_eq!(*err.current_context(), AuctionError::UnknownAuction);
    }

    #[tokio::test]
    async fn bid_from_uninvited_bidder_is_rejected() {
        let inbox = AuctionInbox::new();
        inbox.open(auction("a1", 50, &["acme"])).await.expect("open");
        let err = inbox
            .submit_bid(bid("a1", "globex"))
            .await
            .expect_err("uninvited bidder");
        assert_eq!(*err.current_context(), AuctionError::NotInvited);
    }

    #[tokio::test]
    async fn duplicate_bid_from_same_bidder_is_rejected() {
        let inbox = AuctionInbox::new();
        inbox.open(auction("a1", 50, &["acme"])).await.expect("open");
        inbox.submit_bid(bid("a1", "acme")).await.expect("first bid");
        let err = inbox
            .submit_bid(bid("a1", "acme"))
            .await
            .expect_err("duplicate bid");
        assert_eq!(*err.current_context(), AuctionError::DuplicateBid);
    }

    #[tokio::test]
    async fn bid_after_window_closes_is_rejected() {
        let inbox = AuctionInbox::new();
        inbox.open(auction("a1", 1, &["acme"])).await.expect("open");
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let err = inbox
            .submit_bid(bid("a1", "acme"))
            .await
            .expect_err("window closed");
        assert_eq!(*err.current_context(), AuctionError::WindowClosed);
    }

    #[tokio::test]
    async fn close_on_unopened_auction_returns_none() {
        let inbox = AuctionInbox::new();
        assert!(inbox.close("never-opened").await.is_none());
    }

    #[tokio::test]
    async fn closed_auction_cannot_be_closed_again() {
        let inbox = AuctionInbox::new();
        inbox.open(auction("a1", 50, &["acme"])).await.expect("open");
        assert!(inbox.close("a1").await.is_some());
        assert!(inbox.close("a1").await.is_none());
    }
}
