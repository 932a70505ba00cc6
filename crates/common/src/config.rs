//! Typed, validated server configuration (spec §6 ambient addition).
//!
//! Two YAML documents drive a deployment: a server config (windows, clock
//! skew, storage backend selection, fanout wiring) and a bidder config
//! listing the invited bidders. Both go through `serde_yaml` into strict
//! (`deny_unknown_fields`) structs, then `validator` for field-level
//! constraints, mirroring the layered config/validator approach the rest of
//! this codebase's ambient stack uses for its own settings.

use config::{Config, Environment};
use error_stack::ResultExt;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{AuctionError, AuctionResult};
use crate::registry::{Bidder, Platform};

/// Storage backend selection (spec §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    InMemory,
    Redis,
    Postgres,
    Firestore,
}

/// Fanout transport selection (spec §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FanoutBackend {
    Local,
    PubSub,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct StorageSettings {
    pub backend: StorageBackend,
    #[serde(default)]
    pub redis_url: Option<String>,
    #[serde(default)]
    pub database_url: Option<String>,
    #[serde(default)]
    pub firestore_project_id: Option<String>,
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

fn default_key_prefix() -> String {
    "aip".to_owned()
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct FanoutSettings {
    pub backend: FanoutBackend,
    #[serde(default)]
    pub topic_prefix: Option<String>,
    #[serde(default)]
    pub collector_endpoint: Option<String>,
}

/// Top-level server config (spec §6).
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct ServerSettings {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Auction bidding window, in milliseconds.
    #[validate(range(min = 30, max = 70))]
    pub window_ms: i64,

    #[serde(default = "default_max_clock_skew_ms")]
    #[validate(range(min = 0, max = 60_000))]
    pub max_clock_skew_ms: i64,

    #[serde(default = "default_nonce_ttl_seconds")]
    pub nonce_ttl_seconds: u64,

    /// Hex-encoded 32-byte Ed25519 seed the server signs outbound messages
    /// with. Never logged.
    pub signing_key_hex: String,

    #[validate(nested)]
    pub storage: StorageSettings,

    #[validate(nested)]
    pub fanout: FanoutSettings,

    pub bidder_config_path: String,

    pub platforms_config_path: String,

    /// Window used by the recommendation coordinator's internal auction,
    /// distinct from the primary `/aip/context` window (spec §4.8).
    #[serde(default = "default_recommendation_window_ms")]
    pub recommendation_window_ms: i64,

    #[serde(default)]
    pub classifier: crate::classify::ClassifierConfig,
}

fn default_recommendation_window_ms() -> i64 {
    500
}

fn default_log_level() -> String {
    "info".to_owned()
}

fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_owned()
}

fn default_max_clock_skew_ms() -> i64 {
    500
}

fn default_nonce_ttl_seconds() -> u64 {
    60
}

/// One entry in the bidder config document (spec §3).
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct BidderEntry {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(length(min = 1))]
    pub pools: Vec<String>,
    pub public_key_pem: String,
    #[validate(length(min = 1))]
    pub endpoint: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct BidderConfigDocument {
    #[validate(nested)]
    pub bidders: Vec<BidderEntry>,
}

impl From<BidderEntry> for Bidder {
    fn from(entry: BidderEntry) -> Self {
        Bidder {
            name: entry.name,
            pools: entry.pools,
            public_key_pem: entry.public_key_pem,
            endpoint: entry.endpoint,
        }
    }
}

/// One entry in the platform config document.
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct PlatformEntry {
    #[validate(length(min = 1))]
    pub platform_id: String,
    pub public_key_pem: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct PlatformConfigDocument {
    #[validate(nested)]
    pub platforms: Vec<PlatformEntry>,
}

impl From<PlatformEntry> for Platform {
    fn from(entry: PlatformEntry) -> Self {
        Platform {
            platform_id: entry.platform_id,
            public_key_pem: entry.public_key_pem,
        }
    }
}

/// Loads and validates the server config from `path`, with environment
/// overrides under the `AIP_SERVER__` prefix (double underscore separates
/// nesting, matching the layering convention used elsewhere in this
/// codebase's settings loader).
///
/// # Errors
/// Returns an error if the file cannot be read, is not valid YAML against
/// the strict schema, or fails field validation.
pub fn load_server_settings(path: &str) -> AuctionResult<ServerSettings> {
    let raw = std::fs::read_to_string(path)
        .change_context(AuctionError::Internal)
        .attach_printable_lazy(|| format!("failed to read server config at {path}"))?;

    let parsed: ServerSettings = serde_yaml::from_str(&raw)
        .change_context(AuctionError::SchemaInvalid)
        .attach_printable("server config failed YAML schema validation")?;

    let layered = Config::builder()
        .add_source(config::Config::try_from(&parsed).change_context(AuctionError::Internal)?)
        .add_source(Environment::with_prefix("AIP_SERVER").separator("__"))
        .build()
        .change_context(AuctionError::Internal)
        .attach_printable("failed to layer environment overrides onto server config")?;

    let settings: ServerSettings = layered
        .try_deserialize()
        .change_context(AuctionError::SchemaInvalid)?;

    settings
        .validate()
        .change_context(AuctionError::SchemaInvalid)
        .attach_printable("server config failed field validation")?;

    Ok(settings)
}

/// Loads and validates the bidder config from `path`.
///
/// # Errors
/// Returns an error if the file cannot be read, is not valid YAML against
/// the strict schema, or fails field validation.
pub fn load_bidder_config(path: &str) -> AuctionResult<Vec<Bidder>> {
    let raw = std::fs::read_to_string(path)
        .change_context(AuctionError::Internal)
        .attach_printable_lazy(|| format!("failed to read bidder config at {path}"))?;

    let doc: BidderConfigDocument = serde_yaml::from_str(&raw)
        .change_context(AuctionError::SchemaInvalid)
        .attach_printable("bidder config failed YAML schema validation")?;

    doc.validate()
        .change_context(AuctionError::SchemaInvalid)
        .attach_printable("bidder config failed field validation")?;

    Ok(doc.bidders.into_iter().map(Bidder::from).collect())
}

/// Loads and validates the platform config from `path`.
///
/// # Errors
/// Returns an error if the file cannot be read, is not valid YAML against
/// the strict schema, or fails field validation.
pub fn load_platform_config(path: &str) -> AuctionResult<Vec<Platform>> {
    let raw = std::fs::read_to_string(path)
        .change_context(AuctionError::Internal)
        .attach_printable_lazy(|| format!("failed to read platform config at {path}"))?;

    let doc: PlatformConfigDocument = serde_yaml::from_str(&raw)
        .change_context(AuctionError::SchemaInvalid)
        .attach_printable("platform config failed YAML schema validation")?;

    doc.validate()
        .change_context(AuctionError::SchemaInvalid)
        .attach_printable("platform config failed field validation")?;

    Ok(doc.platforms.into_iter().map(Platform::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_ms_below_range_fails_validation() {
        let settings = ServerSettings {
            log_level: "info".into(),
            bind_addr: "0.0.0.0:8080".into(),
            window_ms: 10,
            max_clock_skew_ms: 500,
            nonce_ttl_seconds: 60,
            signing_key_hex: "00".repeat(32),
            storage: StorageSettings {
                backend: StorageBackend::InMemory,
                redis_url: None,
                database_url: None,
                firestore_project_id: None,
                key_prefix: "aip".into(),
            },
            fanout: FanoutSettings {
                backend: FanoutBackend::Local,
                topic_prefix: None,
                collector_endpoint: None,
            },
            bidder_config_path: "bidders.yaml".into(),
            platforms_config_path: "platforms.yaml".into(),
            recommendation_window_ms: 500,
            classifier: crate::classify::ClassifierConfig::default(),
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn window_ms_within_range_passes_validation() {
        let settings = ServerSettings {
            log_level: "info".into(),
            bind_addr: "0.0.0.0:8080".into(),
            window_ms: 50,
            max_clock_skew_ms: 500,
            nonce_ttl_seconds: 60,
            signing_key_hex: "00".repeat(32),
            storage: StorageSettings {
                backend: StorageBackend::InMemory,
                redis_url: None,
                database_url: None,
                firestore_project_id: None,
                key_prefix: "aip".into(),
            },
            fanout: FanoutSettings {
                backend: FanoutBackend::Local,
                topic_prefix: None,
                collector_endpoint: None,
            },
            bidder_config_path: "bidders.yaml".into(),
            platforms_config_path: "platforms.yaml".into(),
            recommendation_window_ms: 500,
            classifier: crate::classify::ClassifierConfig::default(),
        };
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn bidder_entry_requires_non_empty_name() {
        let entry = BidderEntry {
            name: String::new(),
            pools: vec!["sports".into()],
            public_key_pem: "pem".into(),
            endpoint: "https://acme.example/bid".into(),
        };
        assert!(entry.validate().is_err());
    }
}
