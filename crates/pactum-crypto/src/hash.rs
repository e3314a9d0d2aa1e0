//! Hashing utilities for pactum

use pactum_types::{Amount, Hash32, PartyId};
use sha2::{Digest, Sha256};

use crate::{CryptoError, CryptoResult};

/// Domain prefix for allow-list leaves
pub const LEAF_PREFIX: u8 = 0x00;
/// Domain prefix for internal merkle nodes
pub const NODE_PREFIX: u8 = 0x01;

/// Compute SHA-256 hash of data
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Compute SHA-256 hash and return as hex string
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256(data))
}

/// Compute hash of multiple items
pub fn hash_all(items: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for item in items {
        hasher.update(item);
    }
    hasher.finalize().into()
}

/// Hash a JSON-serializable value
pub fn hash_json<T: serde::Serialize>(value: &T) -> CryptoResult<Hash32> {
    let bytes =
        serde_json::to_vec(value).map_err(|e| CryptoError::Serialization(e.to_string()))?;
    Ok(Hash32(sha256(&bytes)))
}

/// Leaf commitment for one allow-list entry
pub fn leaf_hash(party: &PartyId, balance: Amount) -> Hash32 {
    Hash32(hash_all(&[
        &[LEAF_PREFIX],
        party.as_bytes(),
        &balance.to_be_bytes(),
    ]))
}

/// Internal node over an ordered pair of children
pub fn node_hash(left: &Hash32, right: &Hash32) -> Hash32 {
    Hash32(hash_all(&[&[NODE_PREFIX], left.as_bytes(), right.as_bytes()]))
}
