//! Canonical JSON codec used for signing and verification (spec §4.1).
//!
//! `serde_json::Value` stores object members in a `BTreeMap` whenever the
//! `preserve_order` feature is disabled (our default), which already gives us
//! lexicographic key ordering at every nesting level for free. Combined with
//! `serde_json`'s compact writer (no insignificant whitespace) and its
//! `ryu`-backed shortest round-trip float formatting, serializing through
//! `Value` is sufficient to produce canonical bytes. The codec is otherwise
//! pure: it never looks at a clock, an RNG, or the process locale.

use error_stack::{Report, ResultExt};
use serde::Serialize;
use serde_json::Value;

use crate::error::AuctionError;

/// Canonicalize an already-parsed JSON value into its canonical byte form.
pub fn canonicalize_value(value: &Value) -> Vec<u8> {
    // `to_vec` on a `Value` never fails: the tree is already well-formed.
    serde_json::to_vec(value).unwrap_or_default()
}

/// Parse arbitrary JSON bytes and re-emit them in canonical form.
pub fn canonicalize_bytes(input: &[u8]) -> error_stack::Result<Vec<u8>, AuctionError> {
    let value: Value = serde_json::from_slice(input)
        .change_context(AuctionError::SchemaInvalid)
        .attach_printable("input is not valid JSON")?;
    Ok(canonicalize_value(&value))
}

/// Serialize a value to canonical bytes.
///
/// # Errors
/// Returns an error if `payload` cannot be represented as JSON (only
/// possible for types with non-string map keys or NaN/Infinity floats).
pub fn to_canonical_bytes<T: Serialize>(payload: &T) -> error_stack::Result<Vec<u8>, AuctionError> {
    let value = serde_json::to_value(payload)
        .change_context(AuctionError::Internal)
        .attach_printable("failed to convert payload to JSON value")?;
    Ok(canonicalize_value(&value))
}

/// Serialize a value to canonical bytes with one top-level field removed.
///
/// Used to produce the signed payload for envelopes that carry their own
/// `signature` field: the signature itself must not be part of what it signs.
pub fn to_canonical_bytes_excluding<T: Serialize>(
    payload: &T,
    excluded_field: &str,
) -> error_stack::Result<Vec<u8>, AuctionError> {
    to_canonical_bytes_excluding_path(payload, &[excluded_field])
}

/// Serialize a value to canonical bytes with a (possibly nested) field
/// removed, e.g. `&["auth", "signature"]` for a payload that carries its
/// signature under a nested `auth` object rather than at the top level.
pub fn to_canonical_bytes_excluding_path<T: Serialize>(
    payload: &T,
    field_path: &[&str],
) -> error_stack::Result<Vec<u8>, AuctionError> {
    let mut value = serde_json::to_value(payload)
        .change_context(AuctionError::Internal)
        .attach_printable("failed to convert payload to JSON value")?;

    if let Some((leaf, parents)) = field_path.split_last() {
        let mut target = &mut value;
        for segment in parents {
            let Value::Object(map) = target else { break };
            let Some(next) = map.get_mut(*segment) else {
                break;
            };
            target = next;
        }
        if let Value::Object(map) = target {
            map.remove(*leaf);
        }
    }

    Ok(canonicalize_value(&value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sorts_keys_at_every_level() {
        let a = json!({"b": 1, "a": {"d": 2, "c": 3}});
        let b = json!({"a": {"c": 3, "d": 2}, "b": 1});
        assert_eq!(canonicalize_value(&a), canonicalize_value(&b));
    }

    #[test]
    fn no_insignificant_whitespace() {
        let v = json!({"a": 1, "b": [1, 2, 3]});
        let bytes = canonicalize_value(&v);
        let s = String::from_utf8(bytes).expect("utf8");
        assert!(!s.contains(' '));
        assert_eq!(s, r#"{"a":1,"b":[1,2,3]}"#);
    }

    #[test]
    fn integers_have_no_decimal_point() {
        let v = json!({"n": 42});
        let s = String::from_utf8(canonicalize_value(&v)).expect("utf8");
        assert_eq!(s, r#"{"n":42}"#);
    }

    #[test]
    fn reordering_object_keys_is_invariant() {
        let raw_a = br#"{"z": 1, "a": 2}"#;
        let raw_b = br#"{"a": 2, "z": 1}"#;
        assert_eq!(
            canonicalize_bytes(raw_a).expect("canonicalize"),
            canonicalize_bytes(raw_b).expect("canonicalize")
        );
    }

    #[test]
    fn equivalent_number_formatting_is_invariant() {
        let raw_a = br#"{"price": 1.50}"#;
        let raw_b = br#"{"price": 1.5}"#;
        assert_eq!(
            canonicalize_bytes(raw_a).expect("canonicalize"),
            canonicalize_bytes(raw_b).expect("canonicalize")
        );
    }

    #[test]
    fn excludes_signature_field() {
        #[derive(Serialize)]
        struct Signed {
            a: u32,
            signature: String,
        }
        let payload = Signed {
            a: 1,
            signature: "deadbeef".into(),
        };
        let bytes = to_canonical_bytes_excluding(&payload, "signature").expect("canonical");
        let s = String::from_utf8(bytes).expect("utf8");
        assert_eq!(s, r#"{"a":1}"#);
    }

    #[test]
    fn excludes_nested_signature_field() {
        let payload = json!({
            "request_id": "r1",
            "auth": {"nonce": "n1", "signature": "deadbeef"},
        });
        let bytes = to_canonical_bytes_excluding_path(&payload, &["auth", "signature"]).expect("canonical");
        let s = String::from_utf8(bytes).expect("utf8");
        assert_eq!(s, r#"{"auth":{"nonce":"n1"},"request_id":"r1"}"#);
    }

    #[test]
    fn canonicalizing_twice_is_idempotent() {
        let v = json!({"z": [3, 2, 1], "a": "hi"});
        let once = canonicalize_value(&v);
        let parsed: Value = serde_json::from_slice(&once).expect("parse");
        let twice = canonicalize_value(&parsed);
        assert_eq!(once, twice);
    }
}
