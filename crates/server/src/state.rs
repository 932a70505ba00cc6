//! Shared application state, built once at startup and cloned (cheaply, via
//! `Arc`) into every request handler.

use std::sync::Arc;

use aip_auction_common::auction::{AuctionInbox, AuctionRunner};
use aip_auction_common::classify::ClassifierConfig;
use aip_auction_common::config::ServerSettings;
use aip_auction_common::recommendation::RecommendationCoordinator;
use aip_auction_common::registry::{BidderRegistry, PlatformRegistry};
use aip_auction_common::security::nonce::NonceStore;
use aip_auction_common::security::signing::AuctionSigner;
use aip_auction_common::storage::{LedgerStore, RecommendationStore};

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<ServerSettings>,
    pub registry: Arc<BidderRegistry>,
    pub platforms: Arc<PlatformRegistry>,
    pub inbox: Arc<AuctionInbox>,
    pub runner: Arc<AuctionRunner>,
    pub coordinator: Arc<RecommendationCoordinator>,
    pub store: Arc<dyn LedgerStore>,
    pub nonce_store: Arc<dyn NonceStore>,
    pub signer: Arc<AuctionSigner>,
}

impl AppState {
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        settings: Arc<ServerSettings>,
        registry: Arc<BidderRegistry>,
        platforms: Arc<PlatformRegistry>,
        classifier: Arc<ClassifierConfig>,
        store: Arc<dyn LedgerStore>,
        recommendation_store: Arc<dyn RecommendationStore>,
        fanout: Arc<dyn aip_auction_common::fanout::FanoutTransport>,
        nonce_store: Arc<dyn NonceStore>,
        signer: Arc<AuctionSigner>,
    ) -> Self {
        let inbox = Arc::new(AuctionInbox::new());
        let runner = Arc::new(AuctionRunner::new(
            inbox.clone(),
            registry.clone(),
            classifier.clone(),
            store.clone(),
            fanout.clone(),
            signer.clone(),
            settings.window_ms,
        ));

        // The recommendation coordinator runs its own internal auction, on a
        // distinct (typically longer) window than the primary platform
        // surface, against the same shared inbox/registry/store (spec §4.8).
        let recommendation_runner = Arc::new(AuctionRunner::new(
            inbox.clone(),
            registry.clone(),
            classifier,
            store.clone(),
            fanout,
            signer.clone(),
            settings.recommendation_window_ms,
        ));
        let coordinator = Arc::new(RecommendationCoordinator::new(
            recommendation_runner,
            recommendation_store,
        ));

        Self {
            settings,
            registry,
            platforms,
            inbox,
            runner,
            coordinator,
            store,
            nonce_store,
            signer,
        }
    }
}
