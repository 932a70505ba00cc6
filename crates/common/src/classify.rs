//! Context classification: maps an inbound context request to the set of
//! category pools it should be auctioned against (spec §4.3, Open Question
//! (a)).
//!
//! Resolved as a config-driven keyword mapping rather than a caller-supplied
//! pool list: this keeps the pool taxonomy under operator control instead of
//! trusting the platform's own labeling, matching how the rest of the
//! registry (bidder-to-pool subscriptions) is configured centrally.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A category pool name, e.g. `"sports"` or `"finance"`.
pub type CategoryPool = String;

/// Keyword-to-pool mapping loaded from config. Matching is case-insensitive
/// substring matching against the context's `query_text`; a context matching
/// no configured keyword falls back to `default_pool`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    #[serde(default)]
    pub keyword_pools: HashMap<String, Vec<CategoryPool>>,
    #[serde(default = "default_pool_name")]
    pub default_pool: CategoryPool,
}

fn default_pool_name() -> CategoryPool {
    "general".to_owned()
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            keyword_pools: HashMap::new(),
            default_pool: default_pool_name(),
        }
    }
}

impl ClassifierConfig {
    /// Classifies `query_text` into the set of matching pools, deduplicated,
    /// falling back to `default_pool` if nothing matched.
    #[must_use]
    pub fn classify(&self, query_text: &str) -> Vec<CategoryPool> {
        let mut matched = Vec::new();
        let mut seen = std::collections::HashSet::new();

        let haystack = query_text.to_lowercase();

        for (keyword, pools) in &self.keyword_pools {
            if haystack.contains(&keyword.to_lowercase()) {
                for pool in pools {
                    if seen.insert(pool.clone()) {
                        matched.push(pool.clone());
                    }
                }
            }
        }

        if matched.is_empty() {
            matched.push(self.default_pool.clone());
        }

        matched.sort();
        matched
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ClassifierConfig {
        ClassifierConfig {
            keyword_pools: HashMap::from([
                ("football".to_owned(), vec!["sports".to_owned()]),
                ("stocks".to_owned(), vec!["finance".to_owned()]),
            ]),
            default_pool: "general".to_owned(),
        }
    }

    #[test]
    fn matches_keyword_in_query_text() {
        let pools = config().classify("Football scores");
        assert_eq!(pools, vec!["sports".to_owned()]);
    }

    #[test]
    fn matches_keyword_case_insensitively() {
        let pools = config().classify("FOOTBALL news");
        assert_eq!(pools, vec!["sports".to_owned()]);
    }

    #[test]
    fn matches_keyword_anywhere_in_query_text() {
        let pools = config().classify("market update: stocks rally");
        assert_eq!(pools, vec!["finance".to_owned()]);
    }

    #[test]
    fn falls_back_to_default_when_nothing_matches() {
        let pools = config().classify("weather report");
        assert_eq!(pools, vec!["general".to_owned()]);
    }

    #[test]
    fn deduplicates_pools_from_multiple_matches() {
        let mut cfg = config();
        cfg.keyword_pools
            .insert("scores".to_owned(), vec!["sports".to_owned()]);
        let pools = cfg.classify("football scores");
        assert_eq!(pools, vec!["sports".to_owned()]);
    }
}
