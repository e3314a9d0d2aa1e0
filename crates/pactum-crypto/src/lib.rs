//! Pactum Crypto - Criteria commitments for admission control
//!
//! This crate provides:
//! - Hashing (SHA-256) with leaf/node domain separation
//! - Merkle allow-lists over (party, required balance) entries
//! - The criteria resolver that verifies membership at join time
//!
//! # Security Invariant
//!
//! **Sibling order is part of the proof, never inferred.** A leaf hash can
//! never collide with an internal node hash.

pub mod hash;
pub mod criteria;

pub use hash::*;
pub use criteria::*;

use thiserror::Error;

/// Cryptographic errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
    #[error("Allow-list is empty")]
    EmptyAllowList,

    #[error("Duplicate allow-list entry for {0}")]
    DuplicateEntry(String),

    #[error("Proof depth {depth} exceeds limit {limit}")]
    ProofTooDeep { depth: usize, limit: usize },

    #[error("Serialization failed: {0}")]
    Serialization(String),
}

pub type CryptoResult<T> = Result<T, CryptoError>;
