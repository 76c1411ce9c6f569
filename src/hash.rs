//! Deterministic content hashing (part of C7): a short, stable surrogate
//! key for a record, used to join rows emitted at different nesting levels.
//!
//! Sort the record's top-level key/value pairs ascending by key (no
//! recursive sort — nested structures hash in whatever order `serde_json`
//! already produced), encode as a compact JSON array of `[key, value]`
//! pairs, SHA-256 the UTF-8 bytes, and keep the first 16 hex characters.

use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::InvalidHashInput;

/// Hash a JSON object's top-level key/value pairs into a 16-hex-character
/// surrogate key. Fails if `record` is not an object or has no members.
pub fn hash_record(record: &Value) -> Result<String, InvalidHashInput> {
    let map = record.as_object().ok_or(InvalidHashInput)?;
    if map.is_empty() {
        return Err(InvalidHashInput);
    }

    let mut pairs: Vec<(&String, &Value)> = map.iter().collect();
    pairs.sort_by(|a, b| a.0.cmp(b.0));

    let canonical: Vec<Value> = pairs
        .into_iter()
        .map(|(k, v)| Value::Array(vec![Value::String(k.clone()), v.clone()]))
        .collect();
    let encoded = Value::Array(canonical).to_string();

    let digest = Sha256::digest(encoded.as_bytes());
    Ok(hex::encode(digest)[..16].to_owned())
}
