//! Bidder registry (spec §3, §4.4): the static list of bidders a server
//! instance is configured to invite, keyed by name and by the category
//! pools they subscribe to.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A configured bidder: its invitation name, the category pools it wants to
/// be invited for, and the Ed25519 public key used to verify its bids.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bidder {
    pub name: String,
    pub pools: Vec<String>,
    pub public_key_pem: String,
    pub endpoint: String,
}

/// Immutable, load-once registry of configured bidders.
///
/// Built once at startup from config and never mutated afterward, so
/// lookups need no locking.
#[derive(Debug, Clone)]
pub struct BidderRegistry {
    by_name: HashMap<String, Bidder>,
    by_pool: HashMap<String, Vec<String>>,
}

impl BidderRegistry {
    #[must_use]
    pub fn new(bidders: Vec<Bidder>) -> Self {
        let mut by_name = HashMap::new();
        let mut by_pool: HashMap<String, Vec<String>> = HashMap::new();

        for bidder in bidders {
            for pool in &bidder.pools {
                by_pool
                    .entry(pool.clone())
                    .or_default()
                    .push(bidder.name.clone());
            }
            by_name.insert(bidder.name.clone(), bidder);
        }

        Self { by_name, by_pool }
    }

    #[must_use]
    pub fn lookup_by_name(&self, name: &str) -> Option<&Bidder> {
        self.by_name.get(name)
    }

    #[must_use]
    pub fn public_key(&self, name: &str) -> Option<&str> {
        self.by_name.get(name).map(|b| b.public_key_pem.as_str())
    }

    /// Bidders invited for at least one of `pools`, deduplicated, in a
    /// deterministic order (insertion order of first appearance).
    #[must_use]
    pub fn lookup_by_pools(&self, pools: &[String]) -> Vec<&Bidder> {
        let mut seen = std::collections::HashSet::new();
        let mut result = Vec::new();
        for pool in pools {
            let Some(names) = self.by_pool.get(pool) else {
                continue;
            };
            for name in names {
                if seen.insert(name.clone()) {
                    if let Some(bidder) = self.by_name.get(name) {
                        result.push(bidder);
                    }
                }
            }
        }
        result
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

/// A configured platform: its identifier and the Ed25519 public key used to
/// verify the `auth` envelope on its `ContextRequest`s.
///
/// The spec defines a bidder registry (§4.4) but leaves the platform side of
/// signature verification implicit; this mirrors `BidderRegistry` at the
/// minimum shape `ContextRequest.auth` actually requires.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Platform {
    pub platform_id: String,
    pub public_key_pem: String,
}

/// Immutable, load-once registry of configured platforms.
#[derive(Debug, Clone)]
pub struct PlatformRegistry {
    by_id: HashMap<String, Platform>,
}

impl PlatformRegistry {
    #[must_use]
    pub fn new(platforms: Vec<Platform>) -> Self {
        let by_id = platforms.into_iter().map(|p| (p.platform_id.clone(), p)).collect();
        Self { by_id }
    }

    #[must_use]
    pub fn lookup(&self, platform_id: &str) -> Option<&Platform> {
        self.by_id.get(platform_id)
    }

    #[must_use]
    pub fn public_key(&self, platform_id: &str) -> Option<&str> {
        self.by_id.get(platform_id).map(|p| p.public_key_pem.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bidder(name: &str, pools: &[&str]) -> Bidder {
        Bidder {
            name: name.to_owned(),
            pools: pools.iter().map(|s| (*s).to_owned()).collect(),
            public_key_pem: "dummy".into(),
            endpoint: format!("https://{name}.example/bid"),
        }
    }

    #[test]
    fn lookup_by_name_finds_registered_bidder() {
        let registry = BidderRegistry::new(vec![bidder("acme", &["sports"])]);
        assert!(registry.lookup_by_name("acme").is_some());
        assert!(registry.lookup_by_name("missing").is_none());
    }

    #[test]
    fn lookup_by_pools_deduplicates_and_preserves_order() {
        let registry = BidderRegistry::new(vec![
            bidder("acme", &["sports", "news"]),
            bidder("globex", &["news"]),
        ]);
        let pools = vec!["sports".to_owned(), "news".to_owned()];
        let found: Vec<&str> = registry
            .lookup_by_pools(&pools)
            .into_iter()
            .map(|b| b.name.as_str())
            .collect();
        assert_eq!(found, vec!["acme", "globex"]);
    }

    #[test]
    fn lookup_by_pools_with_unknown_pool_returns_empty() {
        let registry = BidderRegistry::new(vec![bidder("acme", &["sports"])]);
        let found = registry.lookup_by_pools(&["unknown".to_owned()]);
        assert!(found.is_empty());
    }

    #[test]
    fn platform_registry_looks_up_public_key_by_id() {
        let registry = PlatformRegistry::new(vec![Platform {
            platform_id: "weave".into(),
            public_key_pem: "dummy".into(),
        }]);
        assert_eq!(registry.public_key("weave"), Some("dummy"));
        assert!(registry.public_key("missing").is_none());
    }
}
