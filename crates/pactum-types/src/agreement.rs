//! Agreement types for pactum
//!
//! An agreement binds an opaque terms commitment and an eligibility
//! commitment to the set of party positions escrowed against it. Terms are
//! never parsed; they are identified by hash only.

use crate::{Amount, Hash32, PartyId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Eligibility predicate for joining parties
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CriteriaCommitment {
    /// Anyone may join with any positive deposit
    Open,
    /// Merkle root over an allow-list of (party, required balance) leaves
    MerkleRoot(Hash32),
}

impl CriteriaCommitment {
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }

    /// The committed root, if this is not the open sentinel
    pub fn root(&self) -> Option<Hash32> {
        match self {
            Self::Open => None,
            Self::MerkleRoot(root) => Some(*root),
        }
    }
}

/// Which side of the running hash a sibling sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
}

/// One step of a merkle membership path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofStep {
    /// Position of `hash` relative to the node being folded up
    pub side: Side,
    pub hash: Hash32,
}

impl ProofStep {
    pub fn left(hash: Hash32) -> Self {
        Self { side: Side::Left, hash }
    }

    pub fn right(hash: Hash32) -> Self {
        Self { side: Side::Right, hash }
    }
}

/// Caller-supplied eligibility claim presented at join time
///
/// `balance` is both the claimed eligible amount committed in the leaf and
/// the deposit taken into escrow. Consumed once per join; never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverProof {
    pub account: PartyId,
    pub balance: Amount,
    pub proof: Vec<ProofStep>,
}

impl ResolverProof {
    /// A proof for an open agreement: no path, just the deposit
    pub fn open(account: PartyId, balance: Amount) -> Self {
        Self {
            account,
            balance,
            proof: Vec::new(),
        }
    }
}

/// Immutable parameters of an agreement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgreementParams {
    pub terms_hash: Hash32,
    pub criteria: CriteriaCommitment,
    /// Human-readable pointer to the terms text; never interpreted
    pub metadata_uri: Option<String>,
}

impl AgreementParams {
    pub fn new(terms_hash: Hash32, criteria: CriteriaCommitment) -> Self {
        Self {
            terms_hash,
            criteria,
            metadata_uri: None,
        }
    }

    pub fn with_metadata_uri(mut self, uri: impl Into<String>) -> Self {
        self.metadata_uri = Some(uri.into());
        self
    }
}

/// Lifecycle status of an agreement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgreementStatus {
    /// Accepting joins, finalization signals and disputes
    Active,
    /// Awaiting an arbitration ruling
    Disputed,
    /// Terminal; positions may withdraw
    Finalized,
}

impl AgreementStatus {
    /// Check if this is a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finalized)
    }
}

/// Read-only view of an agreement's registry entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgreementSummary {
    pub id: crate::AgreementId,
    pub creator: PartyId,
    pub params: AgreementParams,
    pub status: AgreementStatus,
    pub party_count: usize,
    pub escrowed: Amount,
    pub created_at: DateTime<Utc>,
}
