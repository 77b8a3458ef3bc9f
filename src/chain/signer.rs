//! Local transaction signer
//!
//! secp256k1 signing key loaded from a hex file referenced by the network
//! config. Only the LCD client touches this; commands never see key material.

use secp256k1::{Message, PublicKey, Secp256k1, SecretKey};
use sha2::{Digest, Sha256};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SignerError {
    #[error("cannot read key file: {0}")]
    KeyFile(#[from] std::io::Error),
    #[error("invalid signing key: {0}")]
    InvalidKey(String),
}

/// Holds the operator's signing key for live submissions
pub struct LocalSigner {
    secret_key: SecretKey,
    public_key: PublicKey,
}

impl LocalSigner {
    /// Load a hex-encoded secp256k1 secret key from disk
    pub fn from_key_file(path: &Path) -> Result<Self, SignerError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_hex(raw.trim())
    }

    pub fn from_hex(hex_key: &str) -> Result<Self, SignerError> {
        let bytes =
            hex::decode(hex_key).map_err(|e| SignerError::InvalidKey(e.to_string()))?;
        let secret_key =
            SecretKey::from_slice(&bytes).map_err(|e| SignerError::InvalidKey(e.to_string()))?;
        let secp = Secp256k1::new();
        let public_key = PublicKey::from_secret_key(&secp, &secret_key);
        Ok(Self {
            secret_key,
            public_key,
        })
    }

    /// Compressed public key, hex-encoded
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key.serialize())
    }

    /// Sign sha256(payload), returning the compact 64-byte signature
    pub fn sign(&self, payload: &[u8]) -> Result<[u8; 64], SignerError> {
        let digest: [u8; 32] = Sha256::digest(payload).into();
        let message = Message::from_digest_slice(&digest)
            .map_err(|e| SignerError::InvalidKey(e.to_string()))?;
        let secp = Secp256k1::new();
        let signature = secp.sign_ecdsa(&message, &self.secret_key);
        Ok(signature.serialize_compact())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "4f3edf983ac636a65a842ce7c78d9aa706d3b113bce9c46f30d7d21715b23b1d";

    #[test]
    fn test_sign_is_deterministic() {
        let signer = LocalSigner::from_hex(KEY).unwrap();
        let a = signer.sign(b"sign-doc").unwrap();
        let b = signer.sign(b"sign-doc").unwrap();
        assert_eq!(a, b);
        assert_eq!(signer.public_key_hex().len(), 66);
    }

    #[test]
    fn test_rejects_bad_key() {
        assert!(LocalSigner::from_hex("not-hex").is_err());
        assert!(LocalSigner::from_hex("00").is_err());
    }
}
