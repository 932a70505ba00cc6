//! Nonce replay protection (spec §4.2).
//!
//! A nonce is scoped to its principal (the signing bidder or platform): two
//! different principals may reuse the same nonce value without colliding.
//! Entries are reaped lazily on reservation rather than by a background
//! sweep, since the store is expected to stay small relative to request
//! volume (TTL is measured in seconds, not hours).

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::Mutex;

/// Result of attempting to reserve a nonce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NonceOutcome {
    /// The nonce had not been seen within its TTL window; it is now reserved.
    Reserved,
    /// The nonce was already reserved and has not yet expired.
    Duplicate,
}

/// Storage for nonce replay protection.
#[async_trait]
pub trait NonceStore: Send + Sync {
    /// Attempts to reserve `nonce` for `principal`. `ttl_seconds` bounds how
    /// long the reservation blocks reuse.
    async fn reserve(&self, principal: &str, nonce: &str, ttl_seconds: u64) -> NonceOutcome;
}

/// Process-local, in-memory nonce store backed by a mutex-guarded map.
///
/// Suitable for single-instance deployments or as the default in tests; a
/// multi-instance deployment should back `NonceStore` with the shared
/// `LedgerStore` backend instead (spec §6 discusses this tradeoff).
#[derive(Default)]
pub struct InMemoryNonceStore {
    seen: Mutex<HashMap<(String, String), Instant>>,
}

impl InMemoryNonceStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NonceStore for InMemoryNonceStore {
    async fn reserve(&self, principal: &str, nonce: &str, ttl_seconds: u64) -> NonceOutcome {
        let key = (principal.to_owned(), nonce.to_owned());
        let now = Instant::now();
        let ttl = Duration::from_secs(ttl_seconds);

        let mut seen = self.seen.lock().await;
        if let Some(reserved_at) = seen.get(&key) {
            if now.duration_since(*reserved_at) < ttl {
                return NonceOutcome::Duplicate;
            }
        }
        seen.insert(key, now);
        NonceOutcome::Reserved
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_use_is_reserved() {
        let store = InMemoryNonceStore::new();
        assert_eq!(
            store.reserve("bidder-a", "n1", 60).await,
            NonceOutcome::Reserved
        );
    }

    #[tokio::test]
    async fn immediate_reuse_is_duplicate() {
        let store = InMemoryNonceStore::new();
        store.reserve("bidder-a", "n1", 60).await;
        assert_eq!(
            store.reserve("bidder-a", "n1", 60).await,
            NonceOutcome::Duplicate
        );
    }

    #[tokio::test]
    async fn same_nonce_different_principal_is_independent() {
        let store = InMemoryNonceStore::new();
        store.reserve("bidder-a", "n1", 60).await;
        assert_eq!(
            store.reserve("bidder-b", "n1", 60).await,
            NonceOutcome::Reserved
        );
    }

    #[tokio::test]
    async fn reuse_after_ttl_expiry_is_reserved_again() {
        let store = InMemoryNonceStore::new();
        store.reserve("bidder-a", "n1", 0).await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(
            store.reserve("bidder-a", "n1", 0).await,
            NonceOutcome::Reserved
        );
    }
}
