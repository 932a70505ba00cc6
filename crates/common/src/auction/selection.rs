//! Winner selection (spec §4.6.1): highest pricing-model priority wins
//! (CPA beats CPC beats CPX), ties broken by descending price, ties broken
//! again by ascending bidder name for a fully deterministic result.

use crate::auction::types::BidResponse;

/// Picks the winning bid from `bids`, or `None` if `bids` is empty.
#[must_use]
pub fn select_winner(bids: &[BidResponse]) -> Option<&BidResponse> {
    bids.iter().max_by(|a, b| {
        a.pricing_model
            .priority()
            .cmp(&b.pricing_model.priority())
            .then_with(|| a.price.partial_cmp(&b.price).unwrap_or(std::cmp::Ordering::Equal))
            .then_with(|| b.bidder.cmp(&a.bidder))
    })
}
