//! Cache-first recommendation coordinator (spec §4.8).
//!
//! `get_or_create` takes one of three paths: a cached completed (or failed)
//! result is returned immediately; a cached in-progress request returns its
//! current status without doing any new work; a cache miss spawns a
//! background task to run the auction and weave the result, returning
//! `IN_PROGRESS` right away so the caller can poll.
//!
//! Cached state is held in a `RecommendationStore` (spec §6:
//! `recommendation:{session_id}:{message_id}`) rather than an in-process map,
//! so a restarted instance -- or a sibling instance behind the same
//! distributed backend -- still resolves an in-flight poll correctly.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Mutex;
use tokio::task::JoinSet;

use crate::auction::types::AuthEnvelope;
use crate::auction::{AuctionRunner, ContextRequest};
use crate::recommendation::types::{weave_content, Recommendation, RecommendationStatus};
use crate::storage::RecommendationStore;

/// Bound on how long shutdown waits for in-flight background auctions to
/// finish before giving up on a clean drain.
const SHUTDOWN_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

type CacheKey = (String, String);

pub struct RecommendationCoordinator {
    runner: Arc<AuctionRunner>,
    store: Arc<dyn RecommendationStore>,
    background: Mutex<JoinSet<()>>,
}

impl RecommendationCoordinator {
    #[must_use]
    pub fn new(runner: Arc<AuctionRunner>, store: Arc<dyn RecommendationStore>) -> Self {
        Self {
            runner,
            store,
            background: Mutex::new(JoinSet::new()),
        }
    }

    /// Returns the recommendation for `(session_id, message_id)`, creating
    /// it if this is the first request for that key. Never blocks on the
    /// underlying auction: a fresh request returns `IN_PROGRESS` with
    /// `retry_after_ms = 150` and the caller polls by calling again (spec
    /// §4.8).
    pub async fn get_or_create(&self, session_id: String, message_id: String, query: String) -> Recommendation {
        if let Ok(Some(existing)) = self.store.get(&session_id, &message_id).await {
            return existing.as_in_progress_response_if_pending();
        }

        let now = Utc::now();
        let placeholder = Recommendation::in_progress(session_id.clone(), message_id.clone(), query.clone(), now);
        if self.store.put(placeholder.clone()).await.is_err() {
            return placeholder;
        }

        self.spawn_background((session_id, message_id), query).await;
        placeholder
    }

    async fn spawn_background(&self, key: CacheKey, query: String) {
        let runner = self.runner.clone();
        let store = self.store.clone();

        let mut background = self.background.lock().await;
        background.spawn(async move {
            let (session_id, message_id) = key;
            let auction_id = format!("weave:{session_id}:{message_id}");
            let context = ContextRequest {
                request_id: auction_id.clone(),
                session_id: session_id.clone(),
                platform_id: "weave-coordinator".into(),
                query_text: query.clone(),
                locale: None,
                geo: None,
                timestamp: Utc::now(),
                auth: AuthEnvelope {
                    nonce: String::new(),
                    signature: String::new(),
                },
            };

            let outcome = runner.run(auction_id, &context).await;
            let now = Utc::now();

            let Ok(Some(mut record)) = store.get(&session_id, &message_id).await else {
                return;
            };
            match outcome {
                Ok(outcome) => {
                    let content = weave_content(&query, &outcome);
                    record.complete(content, outcome, now);
                }
                Err(err) => {
                    log::warn!("recommendation auction failed for {session_id}/{message_id}: {err:?}");
                    record.fail(err.to_string(), now);
                }
            }
            if let Err(err) = store.put(record).await {
                log::warn!("failed to persist recommendation for {session_id}/{message_id}: {err:?}");
            }
        });
    }

    /// Awaits any in-flight background auctions, up to a bounded timeout,
    /// so a graceful shutdown doesn't drop recommendations that are about to
    /// complete.
    pub async fn drain(&self) {
        let mut background = self.background.lock().await;
        let drain = async {
            while background.join_next().await.is_some() {}
        };
        if tokio::time::timeout(SHUTDOWN_DRAIN_TIMEOUT, drain).await.is_err() {
            log::warn!("recommendation coordinator shutdown drain timed out after {SHUTDOWN_DRAIN_TIMEOUT:?}");
        }
    }
}

impl Recommendation {
    fn as_in_progress_response_if_pending(&self) -> Self {
        if self.status == RecommendationStatus::InProgress {
            self.as_in_progress_response()
        } else {
            self.clone()
        }
    }
}
