//! Dispute coordinator
//!
//! ```text
//! Active ──dispute──▶ Disputed ──ruling──▶ Finalized
//!   └────────────finalize (unanimous)──────────▲
//! ```
//!
//! Once Disputed, the only way to Finalized is a ruling from the authority.

use std::collections::HashSet;

use chrono::Utc;
use pactum_arbitration::DisputeContext;
use pactum_ledger::BalanceAdjustment;
use pactum_types::{
    AgreementStatus, Amount, CaseRef, Dispute, PactumError, PartyId, Position, PositionStatus,
    Result, Ruling,
};
use tracing::info;

use crate::AgreementRecord;

/// State needed to undo an opened dispute if submission fails
#[derive(Debug, Clone, Copy)]
pub struct DisputeRollback {
    disputant: PartyId,
    previous_status: PositionStatus,
}

/// Stateless transitions between Active, Disputed and Finalized
pub struct DisputeCoordinator;

impl DisputeCoordinator {
    /// Move an Active agreement into Disputed on behalf of `disputant`
    pub fn open(record: &mut AgreementRecord, disputant: &PartyId) -> Result<DisputeRollback> {
        record.require_active()?;
        let previous_status = record.ledger.set_status(disputant, PositionStatus::Disputed)?;

        record.status = AgreementStatus::Disputed;
        record.dispute = Some(Dispute {
            disputant: *disputant,
            case_ref: None,
            opened_at: Utc::now(),
        });

        Ok(DisputeRollback {
            disputant: *disputant,
            previous_status,
        })
    }

    /// Snapshot handed to the arbitration authority
    pub fn context(record: &AgreementRecord) -> Result<DisputeContext> {
        let dispute = record.dispute.as_ref().ok_or(PactumError::AgreementNotDisputed {
            agreement_id: record.id.0,
        })?;
        Ok(DisputeContext {
            agreement_id: record.id,
            terms_hash: record.params.terms_hash,
            disputant: dispute.disputant,
            positions: record.ledger.positions().to_vec(),
            escrowed: record.ledger.escrowed()?,
            opened_at: dispute.opened_at,
        })
    }

    /// Attach the authority's case reference
    pub fn record_case(record: &mut AgreementRecord, case_ref: CaseRef) -> Result<()> {
        let dispute = record.dispute.as_mut().ok_or(PactumError::AgreementNotDisputed {
            agreement_id: record.id.0,
        })?;
        dispute.case_ref = Some(case_ref);
        Ok(())
    }

    /// Undo `open` after the authority refused the case
    pub fn rollback(record: &mut AgreementRecord, token: DisputeRollback) -> Result<()> {
        record
            .ledger
            .set_status(&token.disputant, token.previous_status)?;
        record.status = AgreementStatus::Active;
        record.dispute = None;
        Ok(())
    }

    /// Apply a ruling and finalize the agreement
    ///
    /// Every check runs before the first write. Returns the positions after
    /// the ruling, in join order.
    pub fn apply_ruling(record: &mut AgreementRecord, ruling: Ruling) -> Result<Vec<Position>> {
        let agreement_id = record.id.0;
        if record.status != AgreementStatus::Disputed {
            return Err(PactumError::AgreementNotDisputed { agreement_id });
        }

        let open_case = record.dispute.as_ref().and_then(|d| d.case_ref.as_ref());
        if open_case != Some(&ruling.case_ref) {
            return Err(PactumError::CaseMismatch {
                agreement_id,
                case_ref: ruling.case_ref.to_string(),
            });
        }

        let mut seen = HashSet::with_capacity(ruling.balances.len());
        for (party, _) in &ruling.balances {
            if !record.ledger.contains(party) {
                return Err(PactumError::NoPartOfAgreement {
                    agreement_id,
                    party: party.to_string(),
                });
            }
            if !seen.insert(*party) {
                return Err(PactumError::InvalidRuling {
                    reason: format!("{} is ruled more than once", party),
                });
            }
        }

        let ruled = Amount::try_sum(ruling.balances.iter().map(|(_, amount)| *amount))?;
        let escrowed = record.ledger.escrowed()?;
        if ruled > escrowed {
            return Err(PactumError::InsufficientBalance {
                available: escrowed.value(),
                required: ruled.value(),
            });
        }

        let targets: Vec<(PartyId, Amount)> = record
            .ledger
            .positions()
            .iter()
            .map(|position| {
                let target = ruling
                    .balances
                    .iter()
                    .find(|(party, _)| *party == position.party)
                    .map(|(_, amount)| *amount)
                    .unwrap_or_default();
                (position.party, target)
            })
            .collect();

        for (party, target) in &targets {
            let current = record
                .ledger
                .position(party)
                .map(|p| p.balance)
                .unwrap_or_default();
            if let Some(adjustment) = BalanceAdjustment::between(current, *target) {
                record.ledger.adjust_balance(party, adjustment)?;
            }
            record.ledger.set_status(party, PositionStatus::Finalized)?;
        }

        record.status = AgreementStatus::Finalized;
        record.dispute = None;
        info!(
            "Ruling on case {} applied to {}: {} of {} escrowed",
            ruling.case_ref, record.id, ruled, escrowed
        );
        record.ruling = Some(ruling);

        Ok(record.ledger.positions().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AgreementRegistry, FrameworkConfig};
    use pactum_types::{AgreementId, AgreementParams, CriteriaCommitment, Hash32};

    struct Fixture {
        registry: AgreementRegistry,
        id: AgreementId,
        a: PartyId,
        b: PartyId,
    }

    fn fixture() -> Fixture {
        let mut registry = AgreementRegistry::new();
        let id = registry
            .create(
                PartyId::new(),
                AgreementParams::new(Hash32([2u8; 32]), CriteriaCommitment::Open),
                &FrameworkConfig::default(),
            )
            .unwrap();
        let a = PartyId::new();
        let b = PartyId::new();
        let record = registry.get_mut(id).unwrap();
        record.ledger.join(a, Amount::new(100), Amount::zero()).unwrap();
        record.ledger.join(b, Amount::new(50), Amount::zero()).unwrap();
        Fixture { registry, id, a, b }
    }

    fn open_with_case(record: &mut AgreementRecord, party: &PartyId) -> CaseRef {
        DisputeCoordinator::open(record, party).unwrap();
        let case_ref = CaseRef::new("case_1");
        DisputeCoordinator::record_case(record, case_ref.clone()).unwrap();
        case_ref
    }

    #[test]
    fn test_open_and_rollback() {
        let mut f = fixture();
        let record = f.registry.get_mut(f.id).unwrap();
        record.ledger.set_status(&f.a, PositionStatus::Finalized).unwrap();

        let token = DisputeCoordinator::open(record, &f.a).unwrap();
        assert_eq!(record.status, AgreementStatus::Disputed);
        assert_eq!(record.ledger.position(&f.a).unwrap().status, PositionStatus::Disputed);

        let context = DisputeCoordinator::context(record).unwrap();
        assert_eq!(context.disputant, f.a);
        assert_eq!(context.escrowed, Amount::new(150));
        assert_eq!(context.positions.len(), 2);

        DisputeCoordinator::rollback(record, token).unwrap();
        assert_eq!(record.status, AgreementStatus::Active);
        assert!(record.dispute.is_none());
        assert_eq!(record.ledger.position(&f.a).unwrap().status, PositionStatus::Finalized);
    }

    #[test]
    fn test_open_twice_fails() {
        let mut f = fixture();
        let record = f.registry.get_mut(f.id).unwrap();
        DisputeCoordinator::open(record, &f.a).unwrap();
        let err = DisputeCoordinator::open(record, &f.b).unwrap_err();
        assert_eq!(err, PactumError::AgreementAlreadyDisputed { agreement_id: 1 });
    }

    #[test]
    fn test_open_by_outsider_fails_cleanly() {
        let mut f = fixture();
        let record = f.registry.get_mut(f.id).unwrap();
        let err = DisputeCoordinator::open(record, &PartyId::new()).unwrap_err();
        assert_eq!(err.error_code(), "NO_PART_OF_AGREEMENT");
        assert_eq!(record.status, AgreementStatus::Active);
        assert!(record.dispute.is_none());
    }

    #[test]
    fn test_apply_ruling_redistributes() {
        let mut f = fixture();
        let record = f.registry.get_mut(f.id).unwrap();
        let case_ref = open_with_case(record, &f.b);

        let ruling = Ruling::new(f.id, case_ref)
            .award(f.a, Amount::new(60))
            .award(f.b, Amount::new(90));
        let positions = DisputeCoordinator::apply_ruling(record, ruling).unwrap();

        assert_eq!(positions[0].balance, Amount::new(60));
        assert_eq!(positions[1].balance, Amount::new(90));
        assert!(positions.iter().all(|p| p.status == PositionStatus::Finalized));
        assert_eq!(record.status, AgreementStatus::Finalized);
        assert!(record.dispute.is_none());
        assert!(record.ruling.is_some());
        record.ledger.check_conservation().unwrap();
    }

    #[test]
    fn test_unlisted_party_ruled_zero() {
        let mut f = fixture();
        let record = f.registry.get_mut(f.id).unwrap();
        let case_ref = open_with_case(record, &f.a);

        let ruling = Ruling::new(f.id, case_ref).award(f.b, Amount::new(150));
        DisputeCoordinator::apply_ruling(record, ruling).unwrap();
        assert_eq!(record.ledger.position(&f.a).unwrap().balance, Amount::zero());
        assert_eq!(record.ledger.position(&f.b).unwrap().balance, Amount::new(150));
    }

    #[test]
    fn test_ruling_rejections_leave_state_untouched() {
        let mut f = fixture();
        let record = f.registry.get_mut(f.id).unwrap();
        let case_ref = open_with_case(record, &f.a);

        let too_much = Ruling::new(f.id, case_ref.clone())
            .award(f.a, Amount::new(100))
            .award(f.b, Amount::new(51));
        let err = DisputeCoordinator::apply_ruling(record, too_much).unwrap_err();
        assert_eq!(
            err,
            PactumError::InsufficientBalance {
                available: 150,
                required: 151
            }
        );

        let wrong_case = Ruling::new(f.id, CaseRef::new("case_other"));
        let err = DisputeCoordinator::apply_ruling(record, wrong_case).unwrap_err();
        assert_eq!(err.error_code(), "CASE_MISMATCH");

        let stranger = Ruling::new(f.id, case_ref.clone()).award(PartyId::new(), Amount::new(1));
        let err = DisputeCoordinator::apply_ruling(record, stranger).unwrap_err();
        assert_eq!(err.error_code(), "NO_PART_OF_AGREEMENT");

        let duplicate = Ruling::new(f.id, case_ref)
            .award(f.a, Amount::new(1))
            .award(f.a, Amount::new(1));
        let err = DisputeCoordinator::apply_ruling(record, duplicate).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_RULING");

        assert_eq!(record.status, AgreementStatus::Disputed);
        assert_eq!(record.ledger.position(&f.a).unwrap().balance, Amount::new(100));
        assert_eq!(record.ledger.position(&f.a).unwrap().status, PositionStatus::Disputed);
        assert_eq!(record.ledger.position(&f.b).unwrap().status, PositionStatus::Idle);
    }

    #[test]
    fn test_ruling_requires_dispute_and_recorded_case() {
        let mut f = fixture();
        let record = f.registry.get_mut(f.id).unwrap();

        let ruling = Ruling::new(f.id, CaseRef::new("case_1"));
        let err = DisputeCoordinator::apply_ruling(record, ruling.clone()).unwrap_err();
        assert_eq!(err, PactumError::AgreementNotDisputed { agreement_id: 1 });

        // Submission still in flight: no case recorded yet
        DisputeCoordinator::open(record, &f.a).unwrap();
        let err = DisputeCoordinator::apply_ruling(record, ruling).unwrap_err();
        assert_eq!(err.error_code(), "CASE_MISMATCH");
    }
}
