//! Agreement registry
//!
//! Agreements live in an arena indexed by their id. Records are never
//! removed; a finalized agreement stays as an archival entry.

use chrono::{DateTime, Utc};
use pactum_ledger::PositionLedger;
use pactum_types::{
    AgreementId, AgreementParams, AgreementStatus, AgreementSummary, CriteriaCommitment, Dispute,
    PactumError, PartyId, Result, Ruling,
};

use crate::FrameworkConfig;

/// Registry entry for one agreement
#[derive(Debug, Clone)]
pub struct AgreementRecord {
    pub id: AgreementId,
    pub creator: PartyId,
    pub params: AgreementParams,
    pub status: AgreementStatus,
    pub ledger: PositionLedger,
    /// Present only while the agreement is Disputed
    pub dispute: Option<Dispute>,
    /// The ruling that finalized the agreement, if any
    pub ruling: Option<Ruling>,
    pub created_at: DateTime<Utc>,
}

impl AgreementRecord {
    fn new(id: AgreementId, creator: PartyId, params: AgreementParams) -> Self {
        Self {
            id,
            creator,
            params,
            status: AgreementStatus::Active,
            ledger: PositionLedger::new(id),
            dispute: None,
            ruling: None,
            created_at: Utc::now(),
        }
    }

    /// Fail unless the agreement still accepts party actions
    pub fn require_active(&self) -> Result<()> {
        match self.status {
            AgreementStatus::Active => Ok(()),
            AgreementStatus::Disputed => Err(PactumError::AgreementAlreadyDisputed {
                agreement_id: self.id.0,
            }),
            AgreementStatus::Finalized => Err(PactumError::AgreementAlreadyFinalized {
                agreement_id: self.id.0,
            }),
        }
    }

    pub fn require_finalized(&self) -> Result<()> {
        if self.status == AgreementStatus::Finalized {
            Ok(())
        } else {
            Err(PactumError::AgreementNotFinalized {
                agreement_id: self.id.0,
            })
        }
    }

    pub fn summary(&self) -> Result<AgreementSummary> {
        Ok(AgreementSummary {
            id: self.id,
            creator: self.creator,
            params: self.params.clone(),
            status: self.status,
            party_count: self.ledger.len(),
            escrowed: self.ledger.escrowed()?,
            created_at: self.created_at,
        })
    }
}

/// Owns every agreement and assigns ids
#[derive(Debug, Default)]
pub struct AgreementRegistry {
    agreements: Vec<AgreementRecord>,
}

impl AgreementRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.agreements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agreements.is_empty()
    }

    /// Validate params and store a new Active agreement
    pub fn create(
        &mut self,
        creator: PartyId,
        params: AgreementParams,
        config: &FrameworkConfig,
    ) -> Result<AgreementId> {
        validate_params(&params, config)?;

        let id = AgreementId(self.agreements.len() as u64 + 1);
        self.agreements.push(AgreementRecord::new(id, creator, params));
        Ok(id)
    }

    pub fn get(&self, id: AgreementId) -> Result<&AgreementRecord> {
        slot(id)
            .and_then(|i| self.agreements.get(i))
            .ok_or(PactumError::NonExistentAgreement { agreement_id: id.0 })
    }

    pub fn get_mut(&mut self, id: AgreementId) -> Result<&mut AgreementRecord> {
        slot(id)
            .and_then(|i| self.agreements.get_mut(i))
            .ok_or(PactumError::NonExistentAgreement { agreement_id: id.0 })
    }

    /// Agreements in which `party` holds or held a position
    pub fn agreements_of(&self, party: &PartyId) -> Vec<AgreementId> {
        self.agreements
            .iter()
            .filter(|record| record.ledger.contains(party))
            .map(|record| record.id)
            .collect()
    }
}

fn slot(id: AgreementId) -> Option<usize> {
    id.0.checked_sub(1).and_then(|i| usize::try_from(i).ok())
}

fn validate_params(params: &AgreementParams, config: &FrameworkConfig) -> Result<()> {
    if !config.strict_params {
        return Ok(());
    }
    if params.terms_hash.is_zero() {
        return Err(PactumError::invalid_params("terms hash must be non-zero"));
    }
    if let CriteriaCommitment::MerkleRoot(root) = params.criteria {
        if root.is_zero() {
            return Err(PactumError::invalid_params(
                "criteria root must be non-zero; use the open criteria instead",
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pactum_types::Hash32;

    fn params() -> AgreementParams {
        AgreementParams::new(Hash32([1u8; 32]), CriteriaCommitment::Open)
    }

    #[test]
    fn test_ids_are_sequential() {
        let mut registry = AgreementRegistry::new();
        let config = FrameworkConfig::default();
        let creator = PartyId::new();

        let first = registry.create(creator, params(), &config).unwrap();
        let second = registry.create(creator, params(), &config).unwrap();
        assert_eq!(first, AgreementId(1));
        assert_eq!(second, AgreementId(2));

        let record = registry.get(second).unwrap();
        assert_eq!(record.status, AgreementStatus::Active);
        assert_eq!(record.creator, creator);
    }

    #[test]
    fn test_unknown_ids() {
        let mut registry = AgreementRegistry::new();
        assert_eq!(
            registry.get(AgreementId(0)).unwrap_err(),
            PactumError::NonExistentAgreement { agreement_id: 0 }
        );
        assert!(registry.get_mut(AgreementId(1)).is_err());
    }

    #[test]
    fn test_strict_params() {
        let mut registry = AgreementRegistry::new();
        let strict = FrameworkConfig::default();
        let creator = PartyId::new();

        let zero_terms = AgreementParams::new(Hash32::ZERO, CriteriaCommitment::Open);
        let err = registry.create(creator, zero_terms.clone(), &strict).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_PARAMS");

        let zero_root = AgreementParams::new(
            Hash32([1u8; 32]),
            CriteriaCommitment::MerkleRoot(Hash32::ZERO),
        );
        assert!(registry.create(creator, zero_root, &strict).is_err());
        assert!(registry.is_empty());

        let lenient = FrameworkConfig::default().with_strict_params(false);
        assert!(registry.create(creator, zero_terms, &lenient).is_ok());
    }

    #[test]
    fn test_require_active() {
        let mut registry = AgreementRegistry::new();
        let id = registry
            .create(PartyId::new(), params(), &FrameworkConfig::default())
            .unwrap();
        let record = registry.get_mut(id).unwrap();
        assert!(record.require_active().is_ok());

        record.status = AgreementStatus::Disputed;
        assert_eq!(
            record.require_active().unwrap_err().error_code(),
            "AGREEMENT_ALREADY_DISPUTED"
        );
        assert!(record.require_finalized().is_err());

        record.status = AgreementStatus::Finalized;
        assert_eq!(
            record.require_active().unwrap_err().error_code(),
            "AGREEMENT_ALREADY_FINALIZED"
        );
        assert!(record.require_finalized().is_ok());
    }
}
