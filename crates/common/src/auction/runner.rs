//! Auction lifecycle orchestration (spec §4.6): open, invite, wait out the
//! window, select a winner, persist the ledger record, fan the result out.

use std::sync::Arc;

use chrono::Utc;

use crate::auction::inbox::AuctionInbox;
use crate::auction::selection::select_winner;
use crate::auction::types::{Auction, AuctionResult as AuctionOutcome, ContextRequest, FanoutEnvelope, Winner};
use crate::classify::ClassifierConfig;
use crate::codec::{to_canonical_bytes, to_canonical_bytes_excluding};
use crate::error::{AuctionError, AuctionResult};
use crate::fanout::{Envelope, FanoutTransport};
use crate::ledger_fsm::{LedgerEventKind, LedgerRecord};
use crate::registry::BidderRegistry;
use crate::security::signing::AuctionSigner;
use crate::serve_token::mint_serve_token;
use crate::storage::LedgerStore;

/// Runs auctions end to end: opens a slot in the shared inbox, sleeps out
/// the bidding window, then closes the slot and settles the outcome.
pub struct AuctionRunner {
    inbox: Arc<AuctionInbox>,
    registry: Arc<BidderRegistry>,
    classifier: Arc<ClassifierConfig>,
    store: Arc<dyn LedgerStore>,
    fanout: Arc<dyn FanoutTransport>,
    signer: Arc<AuctionSigner>,
    window_ms: i64,
}

impl AuctionRunner {
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        inbox: Arc<AuctionInbox>,
        registry: Arc<BidderRegistry>,
        classifier: Arc<ClassifierConfig>,
        store: Arc<dyn LedgerStore>,
        fanout: Arc<dyn FanoutTransport>,
        signer: Arc<AuctionSigner>,
        window_ms: i64,
    ) -> Self {
        Self {
            inbox,
            registry,
            classifier,
            store,
            fanout,
            signer,
            window_ms,
        }
    }

    /// Opens, runs, and settles one auction for `request`, returning its
    /// outcome and the serve token minted for it.
    ///
    /// # Errors
    /// Returns an error if the auction slot cannot be opened (id collision)
    /// or the resulting ledger record cannot be persisted.
    pub async fn run(&self, auction_id: String, request: &ContextRequest) -> AuctionResult<AuctionOutcome> {
        let pools = self.classifier.classify(&request.query_text);
        let invited: Vec<String> = self
            .registry
            .lookup_by_pools(&pools)
            .into_iter()
            .map(|b| b.name.clone())
            .collect();

        let opened_at = Utc::now();
        let window_deadline = opened_at + chrono::Duration::milliseconds(self.window_ms);
        let target_pools = pools.clone();
        let auction = Auction {
            auction_id: auction_id.clone(),
            pools,
            invited_bidders: invited,
            opened_at,
            window_ms: self.window_ms,
            bids: Vec::new(),
        };
        self.inbox.open(auction).await?;

        let unsigned = FanoutEnvelope {
            auction_id: &auction_id,
            context_request: request,
            window_deadline,
            server_signature: String::new(),
        };
        if let Ok(signable) = to_canonical_bytes_excluding(&unsigned, "server_signature") {
            let server_signature = self.signer.sign(&signable);
            let envelope = FanoutEnvelope {
                server_signature,
                ..unsigned
            };
            if let Ok(payload) = to_canonical_bytes(&envelope) {
                for pool in &target_pools {
                    self.fanout
                        .publish(Envelope {
                            pool,
                            payload: &payload,
                        })
                        .await;
                }
            }
        }

        tokio::time::sleep(std::time::Duration::from_millis(
            u64::try_from(self.window_ms).unwrap_or(0),
        ))
        .await;

        let closed = self
            .inbox
            .close(&auction_id)
            .await
            .ok_or(AuctionError::UnknownAuction)?;

        let now = Utc::now();

        let winner = select_winner(&closed.bids).map(|bid| Winner {
            bidder: bid.bidder.clone(),
            price: bid.price,
            pricing_model: bid.pricing_model,
            creative: bid.creative.clone(),
            serve_token: mint_serve_token(),
        });

        let (outcome, event_kind, serve_token, winning_bidder) = match winner {
            Some(winner) => {
                let serve_token = winner.serve_token.clone();
                let bidder = winner.bidder.clone();
                (
                    AuctionOutcome::won(auction_id.clone(), winner),
                    LedgerEventKind::Served,
                    Some(serve_token),
                    Some(bidder),
                )
            }
            None => (
                AuctionOutcome::no_bid(auction_id.clone()),
                LedgerEventKind::NoBid,
                None,
                None,
            ),
        };

        let mut record = LedgerRecord::new(auction_id.clone(), serve_token, now);
        record.apply(event_kind, now)?;
        record.winning_bidder = winning_bidder;
        self.store.put(record).await?;

        Ok(outcome)
    }
}
