//! Ed25519 signing and verification over canonical payload bytes.
//!
//! Mirrors the shape of the request-signing module this crate's conventions
//! were learned from: a small signer type wrapping a private key, a free
//! `verify` function taking a PEM public key, and base64url-no-pad encoding
//! for the wire signature.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use ed25519_dalek::pkcs8::DecodePublicKey;
use ed25519_dalek::{Signature, SigningKey, Verifier, VerifyingKey};
use error_stack::ResultExt;

use crate::error::{AuctionError, AuctionResult};

/// Holds a server's (or bidder's) Ed25519 private key and signs canonical
/// payload bytes with it.
pub struct AuctionSigner {
    key: SigningKey,
}

impl AuctionSigner {
    /// Builds a signer from a raw 32-byte seed.
    ///
    /// # Errors
    /// Returns an error if `seed` is not exactly 32 bytes.
    pub fn from_seed_bytes(seed: &[u8]) -> AuctionResult<Self> {
        let seed: [u8; 32] = seed
            .try_into()
            .change_context(AuctionError::Internal)
            .attach_printable("signing key seed must be exactly 32 bytes")?;
        Ok(Self {
            key: SigningKey::from_bytes(&seed),
        })
    }

    /// Builds a signer from a hex-encoded 32-byte seed, the form operators
    /// typically store the server signing key in config or a secret store.
    ///
    /// # Errors
    /// Returns an error if `hex_seed` is not valid hex or not 32 bytes.
    pub fn from_hex_seed(hex_seed: &str) -> AuctionResult<Self> {
        let bytes = hex::decode(hex_seed)
            .change_context(AuctionError::Internal)
            .attach_printable("signing key seed is not valid hex")?;
        Self::from_seed_bytes(&bytes)
    }

    /// Signs `payload` (expected to already be canonical bytes) and returns
    /// the signature as base64url-no-pad text.
    #[must_use]
    pub fn sign(&self, payload: &[u8]) -> String {
        let signature = self.key.sign(payload);
        URL_SAFE_NO_PAD.encode(signature.to_bytes())
    }

    /// The signer's PEM-encoded public key, suitable for distribution to
    /// counterparties for verification.
    ///
    /// # Errors
    /// Returns an error if PEM encoding fails (only possible on an allocation
    /// failure).
    pub fn public_key_pem(&self) -> AuctionResult<String> {
        use ed25519_dalek::pkcs8::EncodePublicKey;
        self.key
            .verifying_key()
            .to_public_key_pem(ed25519_dalek::pkcs8::LineEnding::LF)
            .change_context(AuctionError::Internal)
            .attach_printable("failed to PEM-encode public key")
    }
}

/// Verifies `signature_b64` (base64url-no-pad) over `payload` against the
/// PEM-encoded public key `public_key_pem`.
///
/// Returns `Ok(false)` for a structurally valid but non-matching signature,
/// and `Err` only when the signature or key cannot be parsed at all.
///
/// # Errors
/// Returns an error if `public_key_pem` is not a valid Ed25519 SPKI PEM
/// document or `signature_b64` is not valid base64url.
pub fn verify(payload: &[u8], signature_b64: &str, public_key_pem: &str) -> AuctionResult<bool> {
    let verifying_key = VerifyingKey::from_public_key_pem(public_key_pem)
        .change_context(AuctionError::SignatureInvalid)
        .attach_printable("public key is not valid Ed25519 SPKI PEM")?;

    let signature_bytes = URL_SAFE_NO_PAD
        .decode(signature_b64)
        .change_context(AuctionError::SignatureInvalid)
        .attach_printable("signature is not valid base64url")?;

    let signature = Signature::from_slice(&signature_bytes)
        .change_context(AuctionError::SignatureInvalid)
        .attach_printable("signature is not 64 bytes")?;

    Ok(verifying_key.verify(payload, &signature).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    fn test_signer() -> AuctionSigner {
        let key = SigningKey::generate(&mut OsRng);
        AuctionSigner { key }
    }

    #[test]
    fn sign_and_verify_round_trip() {
        let signer = test_signer();
        let payload = br#"{"a":1,"b":2}"#;
        let sig = signer.sign(payload);
        let pem = signer.public_key_pem().expect("pem");
        assert!(verify(payload, &sig, &pem).expect("verify"));
    }

    #[test]
    fn verify_rejects_tampered_payload() {
        let signer = test_signer();
        let sig = signer.sign(br#"{"a":1}"#);
        let pem = signer.public_key_pem().expect("pem");
        assert!(!verify(br#"{"a":2}"#, &sig, &pem).expect("verify"));
    }

    #[test]
    fn verify_rejects_wrong_key() {
        let signer = test_signer();
        let other = test_signer();
        let payload = br#"{"a":1}"#;
        let sig = signer.sign(payload);
        let other_pem = other.public_key_pem().expect("pem");
        assert!(!verify(payload, &sig, &other_pem).expect("verify"));
    }

    #[test]
    fn verify_rejects_malformed_signature() {
        let signer = test_signer();
        let pem = signer.public_key_pem().expect("pem");
        assert!(verify(b"payload", "not-base64!!", &pem).is_err());
    }

    #[test]
    fn verify_rejects_malformed_key() {
        let signer = test_signer();
        let sig = signer.sign(b"payload");
        assert!(verify(b"payload", &sig, "not a pem").is_err());
    }

    #[test]
    fn from_hex_seed_matches_from_seed_bytes() {
        let seed = [7u8; 32];
        let hex_seed = hex::encode(seed);
        let a = AuctionSigner::from_seed_bytes(&seed).expect("seed");
        let b = AuctionSigner::from_hex_seed(&hex_seed).expect("hex seed");
        assert_eq!(
            a.public_key_pem().expect("pem"),
            b.public_key_pem().expect("pem")
        );
    }
}
