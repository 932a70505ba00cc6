//! `aipctl keygen`: generates an Ed25519 keypair for a new bidder and
//! prints the PEM public key (to hand to the operator for the bidder
//! config) and the hex seed (for the bidder to keep as its private key).

use aip_auction_common::security::signing::AuctionSigner;
use rand::RngCore;

pub fn generate(name: &str) -> Result<(), String> {
    let mut seed = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut seed);

    let signer = AuctionSigner::from_seed_bytes(&seed).map_err(|report| format!("{report:?}"))?;
    let public_key_pem = signer.public_key_pem().map_err(|report| format!("{report:?}"))?;

    println!("bidder: {name}");
    println!("public_key_pem:\n{public_key_pem}");
    println!("private_key_seed_hex: {}", hex::encode(seed));
    println!("keep the private key seed secret; only the public key PEM goes in the bidder config.");

    Ok(())
}
