//! Transport security: signing, verification, clock-skew gate, nonce store
//! (spec §4.2). Co-located because canonicalization and signing are tightly
//! coupled and must be tested jointly.

pub mod nonce;
pub mod signing;
pub mod timestamp;

pub use nonce::{NonceOutcome, NonceStore};
pub use signing::{verify, AuctionSigner};
pub use timestamp::check_timestamp;

use error_stack::{Report, ResultExt};
use serde::Serialize;

use crate::error::AuctionError;

/// Default maximum allowed clock skew, in milliseconds (spec §4.2).
pub const DEFAULT_MAX_CLOCK_SKEW_MS: i64 = 500;

/// Default nonce TTL, in seconds (spec §4.2).
pub const DEFAULT_NONCE_TTL_SECONDS: u64 = 60;

/// The outcome of a full transport-security check, distinguishing failure
/// kinds for operator observability as required by spec §4.2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckFailure {
    SignatureInvalid,
    TimestampOutOfRange,
    NonceDuplicate,
}

impl From<CheckFailure> for AuctionError {
    fn from(value: CheckFailure) -> Self {
        match value {
            CheckFailure::SignatureInvalid => AuctionError::SignatureInvalid,
            CheckFailure::TimestampOutOfRange => AuctionError::TimestampOutOfRange,
            CheckFailure::NonceDuplicate => AuctionError::NonceDuplicate,
        }
    }
}

/// Runs the full transport-security gauntlet in the mandated order:
/// signature verify -> timestamp gate -> nonce reservation (spec §4.2).
///
/// `payload` must already exclude the `signature` field (see
/// `crate::codec::to_canonical_bytes_excluding`).
///
/// # Errors
/// Returns the first `CheckFailure` encountered, in check order.
pub async fn enforce<T: Serialize>(
    payload: &T,
    signature_field_path: &[&str],
    signature_b64: &str,
    public_key_pem: &str,
    timestamp_ms: i64,
    now_ms: i64,
    max_clock_skew_ms: i64,
    principal: &str,
    nonce: &str,
    nonce_ttl_seconds: u64,
    nonce_store: &dyn NonceStore,
) -> Result<(), CheckFailure> {
    let canonical = crate::codec::to_canonical_bytes_excluding_path(payload, signature_field_path)
        .map_err(|_| CheckFailure::SignatureInvalid)?;

    let verified = verify(&canonical, signature_b64, public_key_pem)
        .unwrap_or(false);
    if !verified {
        return Err(CheckFailure::SignatureInvalid);
    }

    if !check_timestamp(timestamp_ms, now_ms, max_clock_skew_ms) {
        return Err(CheckFailure::TimestampOutOfRange);
    }

    match nonce_store
        .reserve(principal, nonce, nonce_ttl_seconds)
        .await
    {
        NonceOutcome::Reserved => Ok(()),
        NonceOutcome::Duplicate => Err(CheckFailure::NonceDuplicate),
    }
}

pub(crate) fn wrap_internal<E>(err: E) -> Report<AuctionError>
where
    E: std::error::Error + Send + Sync + 'static,
{
    Report::new(err).change_context(AuctionError::Internal)
}
