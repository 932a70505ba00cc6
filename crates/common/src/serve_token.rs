//! Serve token minting (spec §4.6): an opaque, unguessable identifier
//! issued each time an ad is served, used to correlate later settlement
//! events back to the auction that produced them.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;

/// Number of random bytes in a minted serve token; 16 bytes (128 bits) is
/// comfortably beyond brute-force range for a token with a short TTL.
const SERVE_TOKEN_BYTES: usize = 16;

/// Mints a fresh, cryptographically random serve token, base64url-no-pad
/// encoded.
#[must_use]
pub fn mint_serve_token() -> String {
    let mut bytes = [0u8; SERVE_TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
