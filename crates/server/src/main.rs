//! HTTP entry point for the AIP auction server.

mod error;
mod logging;
mod routes;
mod state;

use std::str::FromStr;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tokio::signal;

use aip_auction_common::config::{
    load_bidder_config, load_platform_config, load_server_settings, FanoutBackend, StorageBackend,
};
use aip_auction_common::fanout::local::LocalFanout;
use aip_auction_common::fanout::pubsub::{HttpPostClient, PubSubFanout};
use aip_auction_common::fanout::FanoutTransport;
use aip_auction_common::registry::{BidderRegistry, PlatformRegistry};
use aip_auction_common::security::nonce::InMemoryNonceStore;
use aip_auction_common::security::signing::AuctionSigner;
use aip_auction_common::storage::firestore_store::FirestoreLedgerStore;
use aip_auction_common::storage::memory::InMemoryLedgerStore;
use aip_auction_common::storage::postgres_store::PostgresLedgerStore;
use aip_auction_common::storage::redis_store::RedisLedgerStore;
use aip_auction_common::storage::{LedgerStore, RecommendationStore};

use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path =
        std::env::var("AIP_SERVER_CONFIG").unwrap_or_else(|_| "config/server.yaml".to_owned());

    let settings = load_server_settings(&config_path).map_err(|report| {
        eprintln!("failed to load server config: {report:?}");
        std::io::Error::other("invalid server config")
    })?;

    let level = log::LevelFilter::from_str(&settings.log_level).unwrap_or(log::LevelFilter::Info);
    logging::init_logger(level).map_err(|err| std::io::Error::other(err.to_string()))?;

    let bidders = load_bidder_config(&settings.bidder_config_path)
        .map_err(|report| std::io::Error::other(format!("invalid bidder config: {report:?}")))?;
    let registry = Arc::new(BidderRegistry::new(bidders));

    let platforms = load_platform_config(&settings.platforms_config_path)
        .map_err(|report| std::io::Error::other(format!("invalid platform config: {report:?}")))?;
    let platforms = Arc::new(PlatformRegistry::new(platforms));

    let classifier = Arc::new(settings.classifier.clone());

    let (store, recommendation_store) = build_storage(&settings).await?;
    let fanout: Arc<dyn FanoutTransport> = build_fanout(&settings);
    let nonce_store = Arc::new(InMemoryNonceStore::new());
    let signer = Arc::new(
        AuctionSigner::from_hex_seed(&settings.signing_key_hex)
            .map_err(|report| std::io::Error::other(format!("invalid signing key: {report:?}")))?,
    );

    let settings = Arc::new(settings);
    let bind_addr = settings.bind_addr.clone();

    let state = AppState::new(
        settings,
        registry,
        platforms,
        classifier,
        store,
        recommendation_store,
        fanout,
        nonce_store,
        signer,
    );

    let app = Router::new()
        .route("/health", get(routes::health::health))
        .route("/aip/context", post(routes::context::open_auction))
        .route("/context", post(routes::context::open_auction))
        .route("/aip/bid-response", post(routes::bid::submit_bid))
        .route("/events/:kind", post(routes::events::report_event))
        .route(
            "/v1/weave/recommendations",
            post(routes::weave::create_recommendation),
        )
        .with_state(state.clone());

    log::info!("aip-auction-server listening on {bind_addr}");
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state))
        .await?;

    Ok(())
}

/// Builds the configured storage backend once and hands back two trait
/// objects over the same underlying instance -- ledger records and
/// recommendations share one connection pool / in-process map per backend
/// (spec §6), rather than each capability opening its own.
async fn build_storage(
    settings: &aip_auction_common::config::ServerSettings,
) -> Result<(Arc<dyn LedgerStore>, Arc<dyn RecommendationStore>), Box<dyn std::error::Error>> {
    match settings.storage.backend {
        StorageBackend::InMemory => {
            let store = Arc::new(InMemoryLedgerStore::new());
            Ok((store.clone(), store))
        }
        StorageBackend::Redis => {
            let url = settings
                .storage
                .redis_url
                .as_deref()
                .ok_or("redis backend selected but redis_url is not configured")?;
            let store = Arc::new(
                RedisLedgerStore::connect(url, settings.storage.key_prefix.clone())
                    .await
                    .map_err(|report| format!("{report:?}"))?,
            );
            Ok((store.clone(), store))
        }
        StorageBackend::Postgres => {
            let url = settings
                .storage
                .database_url
                .as_deref()
                .ok_or("postgres backend selected but database_url is not configured")?;
            let store = PostgresLedgerStore::connect(url)
                .await
                .map_err(|report| format!("{report:?}"))?;
            store.ensure_schema().await.map_err(|report| format!("{report:?}"))?;
            let store = Arc::new(store);
            Ok((store.clone(), store))
        }
        StorageBackend::Firestore => {
            let project_id = settings
                .storage
                .firestore_project_id
                .as_deref()
                .ok_or("firestore backend selected but firestore_project_id is not configured")?;
            let store = Arc::new(
                FirestoreLedgerStore::connect(project_id, settings.storage.key_prefix.clone())
                    .await
                    .map_err(|report| format!("{report:?}"))?,
            );
            Ok((store.clone(), store))
        }
    }
}

fn build_fanout(settings: &aip_auction_common::config::ServerSettings) -> Arc<dyn FanoutTransport> {
    match settings.fanout.backend {
        FanoutBackend::Local => Arc::new(LocalFanout::new()),
        FanoutBackend::PubSub => {
            let endpoint = settings
                .fanout
                .collector_endpoint
                .clone()
                .unwrap_or_default();
            let topic_prefix = settings.fanout.topic_prefix.clone().unwrap_or_default();
            Arc::new(PubSubFanout::new(HttpPostClient::new(endpoint), topic_prefix))
        }
    }
}

async fn shutdown_signal(state: AppState) {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install sigterm handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    log::info!("shutdown signal received, draining in-flight recommendations");
    state.coordinator.drain().await;
}
