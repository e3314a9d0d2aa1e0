//! Criteria resolver and allow-list commitments
//!
//! Agreements publish a [`CriteriaCommitment`]; joiners present a
//! [`ResolverProof`] that folds their leaf up to the committed root.

use std::collections::HashSet;

use pactum_types::{Amount, CriteriaCommitment, Hash32, PartyId, ProofStep, ResolverProof, Side};

use crate::{leaf_hash, node_hash, CryptoError, CryptoResult};

/// Default limit on merkle path length
pub const DEFAULT_MAX_PROOF_DEPTH: usize = 64;

/// Recompute the root reached from `leaf` along `proof`
pub fn fold_proof(leaf: Hash32, proof: &[ProofStep]) -> Hash32 {
    proof.iter().fold(leaf, |current, step| match step.side {
        Side::Left => node_hash(&step.hash, &current),
        Side::Right => node_hash(&current, &step.hash),
    })
}

/// Verify `claimant`'s eligibility against `criteria`
///
/// Pure and deterministic. The resolver must be issued to `claimant`. The
/// open sentinel then admits anyone; otherwise the leaf
/// `(claimant, proof.balance)` must fold up to the committed root.
pub fn verify(criteria: &CriteriaCommitment, claimant: &PartyId, resolver: &ResolverProof) -> bool {
    if resolver.account != *claimant {
        return false;
    }
    match criteria {
        CriteriaCommitment::Open => true,
        CriteriaCommitment::MerkleRoot(root) => {
            let leaf = leaf_hash(claimant, resolver.balance);
            fold_proof(leaf, &resolver.proof) == *root
        }
    }
}

/// Stateless verifier with a bound on proof length
#[derive(Debug, Clone, Copy)]
pub struct CriteriaResolver {
    max_proof_depth: usize,
}

impl CriteriaResolver {
    pub fn new(max_proof_depth: usize) -> Self {
        Self { max_proof_depth }
    }

    pub fn max_proof_depth(&self) -> usize {
        self.max_proof_depth
    }

    /// Verify, rejecting oversized proofs before hashing anything
    pub fn verify(
        &self,
        criteria: &CriteriaCommitment,
        claimant: &PartyId,
        resolver: &ResolverProof,
    ) -> CryptoResult<bool> {
        if resolver.proof.len() > self.max_proof_depth {
            return Err(CryptoError::ProofTooDeep {
                depth: resolver.proof.len(),
                limit: self.max_proof_depth,
            });
        }
        Ok(verify(criteria, claimant, resolver))
    }
}

impl Default for CriteriaResolver {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PROOF_DEPTH)
    }
}

/// Merkle allow-list over (party, required balance) entries
///
/// Levels are built pairwise; an unpaired last node is promoted unchanged.
#[derive(Debug, Clone)]
pub struct AllowList {
    entries: Vec<(PartyId, Amount)>,
    /// levels[0] = leaves, last = [root]
    levels: Vec<Vec<Hash32>>,
}

impl AllowList {
    /// Build the tree; parties must be unique
    pub fn build(entries: Vec<(PartyId, Amount)>) -> CryptoResult<Self> {
        if entries.is_empty() {
            return Err(CryptoError::EmptyAllowList);
        }

        let mut seen = HashSet::with_capacity(entries.len());
        for (party, _) in &entries {
            if !seen.insert(*party) {
                return Err(CryptoError::DuplicateEntry(party.to_string()));
            }
        }

        let leaves: Vec<Hash32> = entries
            .iter()
            .map(|(party, balance)| leaf_hash(party, *balance))
            .collect();

        let mut levels = vec![leaves];
        while let Some(current) = levels.last().filter(|level| level.len() > 1) {
            let next: Vec<Hash32> = current
                .chunks(2)
                .map(|pair| match pair.get(1) {
                    Some(right) => node_hash(&pair[0], right),
                    None => pair[0],
                })
                .collect();
            levels.push(next);
        }

        Ok(Self { entries, levels })
    }

    /// Root of the tree
    pub fn root(&self) -> Hash32 {
        self.levels
            .last()
            .and_then(|level| level.first())
            .copied()
            .unwrap_or(Hash32::ZERO)
    }

    /// Commitment to publish with an agreement
    pub fn commitment(&self) -> CriteriaCommitment {
        CriteriaCommitment::MerkleRoot(self.root())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Required balance committed for `party`
    pub fn balance_of(&self, party: &PartyId) -> Option<Amount> {
        self.entries
            .iter()
            .find(|(p, _)| p == party)
            .map(|(_, balance)| *balance)
    }

    /// Membership proof for `party`, if listed
    pub fn proof_for(&self, party: &PartyId) -> Option<ResolverProof> {
        let index = self.entries.iter().position(|(p, _)| p == party)?;
        let (account, balance) = self.entries[index];

        let mut proof = Vec::new();
        let mut current = index;
        for level in &self.levels[..self.levels.len() - 1] {
            let sibling = current ^ 1;
            if let Some(hash) = level.get(sibling) {
                let step = if current % 2 == 0 {
                    ProofStep::right(*hash)
                } else {
                    ProofStep::left(*hash)
                };
                proof.push(step);
            }
            current /= 2;
        }

        Some(ResolverProof {
            account,
            balance,
            proof,
        })
    }
}
