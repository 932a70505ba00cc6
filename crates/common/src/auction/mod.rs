//! Auction domain: types, the cross-request inbox, winner selection, and
//! the runner that ties them together (spec §3, §4.6).

pub mod inbox;
pub mod runner;
pub mod selection;
pub mod types;

pub use inbox::AuctionInbox;
pub use runner::AuctionRunner;
pub use selection::select_winner;
pub use types::{Auction, AuctionResult, BidResponse, ContextRequest, PricingModel, Winner};
