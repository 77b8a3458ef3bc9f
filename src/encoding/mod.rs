//! Offchain configuration encoding
//!
//! Deterministic serialization of the offchain config blob plus the digest
//! used to verify that a proposal being accepted matches the configuration a
//! human reviewed. The blob binds the config to the shared secrets: a wrong
//! secret produces a different blob, which is exactly the property the
//! accept-proposal guard relies on.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

/// Commitment over both secrets, mixed into the serialized blob
fn secret_commitment(secret: &str, random_secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.update([0x00]);
    hasher.update(random_secret.as_bytes());
    hex::encode(hasher.finalize())
}

/// Recursively sort object keys so serialization is order-independent
fn sorted(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            // serde_json maps are BTree-backed; rebuilding sorts nested keys too
            Value::Object(map.iter().map(|(k, v)| (k.clone(), sorted(v))).collect())
        }
        Value::Array(items) => Value::Array(items.iter().map(sorted).collect()),
        other => other.clone(),
    }
}

/// Serialize an offchain config into its canonical blob form
pub fn serialize_offchain_config(
    config: &Value,
    secret: &str,
    random_secret: &str,
) -> Vec<u8> {
    let blob = json!({
        "offchain_config": sorted(config),
        "shared_secret": secret_commitment(secret, random_secret),
    });
    blob.to_string().into_bytes()
}

/// base64 of the canonical blob, the form stored in an ocr2 proposal
pub fn offchain_config_b64(config: &Value, secret: &str, random_secret: &str) -> String {
    BASE64.encode(serialize_offchain_config(config, secret, random_secret))
}

/// sha256 fingerprint of a config blob
pub fn config_digest(blob: &[u8]) -> [u8; 32] {
    Sha256::digest(blob).into()
}

pub fn config_digest_hex(blob: &[u8]) -> String {
    hex::encode(config_digest(blob))
}
