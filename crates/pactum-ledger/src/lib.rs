//! Pactum Ledger - Per-agreement position ledger
//!
//! The ledger is:
//! - Agreement-scoped (one ledger per agreement)
//! - Party-keyed (one position per party, kept in join order)
//! - Accounted (cumulative deposits and releases are tracked alongside balances)
//!
//! # Invariants
//!
//! 1. No negative balances
//! 2. Sum of balances never exceeds deposited minus released
//! 3. A withdrawn position keeps its record with a zero balance
//! 4. Every mutator validates before it writes

use std::collections::HashMap;

use pactum_types::{AgreementId, Amount, PactumError, PartyId, Position, PositionStatus, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Signed change applied to a position balance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BalanceAdjustment {
    Increase(Amount),
    Decrease(Amount),
}

impl BalanceAdjustment {
    /// Adjustment that moves `from` to `to`, `None` when equal
    pub fn between(from: Amount, to: Amount) -> Option<Self> {
        match to.cmp(&from) {
            std::cmp::Ordering::Greater => to.checked_sub(from).map(Self::Increase),
            std::cmp::Ordering::Less => from.checked_sub(to).map(Self::Decrease),
            std::cmp::Ordering::Equal => None,
        }
    }
}

/// Positions of one agreement
#[derive(Debug, Clone)]
pub struct PositionLedger {
    agreement_id: AgreementId,
    positions: Vec<Position>,
    index: HashMap<PartyId, usize>,
    deposited: Amount,
    released: Amount,
}

impl PositionLedger {
    /// Create an empty ledger for an agreement
    pub fn new(agreement_id: AgreementId) -> Self {
        Self {
            agreement_id,
            positions: Vec::new(),
            index: HashMap::new(),
            deposited: Amount::zero(),
            released: Amount::zero(),
        }
    }

    pub fn agreement_id(&self) -> AgreementId {
        self.agreement_id
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn contains(&self, party: &PartyId) -> bool {
        self.index.contains_key(party)
    }

    pub fn position(&self, party: &PartyId) -> Option<&Position> {
        self.index.get(party).map(|&i| &self.positions[i])
    }

    /// All positions in join order
    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    /// Cumulative deposits taken into escrow
    pub fn deposited(&self) -> Amount {
        self.deposited
    }

    /// Cumulative amounts released back to parties
    pub fn released(&self) -> Amount {
        self.released
    }

    /// Funds still held for this agreement
    pub fn escrowed(&self) -> Result<Amount> {
        self.deposited.checked_sub(self.released).ok_or_else(|| {
            PactumError::internal(format!(
                "{} released {} but only {} was deposited",
                self.agreement_id, self.released, self.deposited
            ))
        })
    }

    /// Sum of position balances
    pub fn total_balance(&self) -> Result<Amount> {
        Amount::try_sum(self.positions.iter().map(|p| p.balance))
    }

    /// Escrowed funds not assigned to any position (left over by a ruling)
    pub fn residual(&self) -> Result<Amount> {
        self.escrowed()?.try_sub(self.total_balance()?)
    }

    /// Whether every position has signalled finalization
    pub fn all_finalized(&self) -> bool {
        !self.positions.is_empty()
            && self
                .positions
                .iter()
                .all(|p| p.status == PositionStatus::Finalized)
    }

    /// Verify the conservation invariant
    pub fn check_conservation(&self) -> Result<()> {
        let total = self.total_balance()?;
        let escrowed = self.escrowed()?;
        if total > escrowed {
            return Err(PactumError::internal(format!(
                "conservation violated for {}: balances {} exceed escrowed {}",
                self.agreement_id, total, escrowed
            )));
        }
        Ok(())
    }

    /// Open a position for `party` with `deposit`
    ///
    /// `minimum` is the committed eligible amount; the deposit must be
    /// positive and at least that large.
    pub fn join(&mut self, party: PartyId, deposit: Amount, minimum: Amount) -> Result<&Position> {
        if self.contains(&party) {
            return Err(PactumError::PartyAlreadyJoined {
                agreement_id: self.agreement_id.0,
                party: party.to_string(),
            });
        }
        if deposit.is_zero() || deposit < minimum {
            return Err(PactumError::InsufficientBalance {
                available: deposit.value(),
                required: minimum.value().max(1),
            });
        }
        let deposited = self.deposited.try_add(deposit)?;

        self.deposited = deposited;
        self.index.insert(party, self.positions.len());
        self.positions.push(Position::new(party, deposit));
        debug!("Position opened in {}: {} with {}", self.agreement_id, party, deposit);

        let i = self.positions.len() - 1;
        Ok(&self.positions[i])
    }

    /// Undo a join whose custody transfer failed
    pub fn revert_join(&mut self, party: &PartyId) -> Result<Position> {
        let i = self.require(party)?;
        let position = self.positions.remove(i);
        self.deposited = self.deposited.try_sub(position.balance)?;
        self.rebuild_index();
        debug!("Join of {} to {} reverted", party, self.agreement_id);
        Ok(position)
    }

    /// Record an extra deposit on an existing position
    pub fn deposit(&mut self, party: &PartyId, amount: Amount) -> Result<&Position> {
        let i = self.require(party)?;
        if amount.is_zero() {
            return Err(PactumError::InsufficientBalance {
                available: 0,
                required: 1,
            });
        }
        let balance = self.positions[i].balance.try_add(amount)?;
        let deposited = self.deposited.try_add(amount)?;

        self.positions[i].balance = balance;
        self.deposited = deposited;
        Ok(&self.positions[i])
    }

    /// Undo a deposit whose custody transfer failed
    pub fn revert_deposit(&mut self, party: &PartyId, amount: Amount) -> Result<()> {
        let i = self.require(party)?;
        let balance = self.positions[i].balance.try_sub(amount)?;
        let deposited = self.deposited.try_sub(amount)?;

        self.positions[i].balance = balance;
        self.deposited = deposited;
        Ok(())
    }

    /// Set a position's status, returning the previous one
    pub fn set_status(&mut self, party: &PartyId, status: PositionStatus) -> Result<PositionStatus> {
        let i = self.require(party)?;
        let previous = std::mem::replace(&mut self.positions[i].status, status);
        debug!("Position of {} in {}: {:?} -> {:?}", party, self.agreement_id, previous, status);
        Ok(previous)
    }

    /// Apply a balance change without touching deposit accounting
    pub fn adjust_balance(&mut self, party: &PartyId, adjustment: BalanceAdjustment) -> Result<Amount> {
        let i = self.require(party)?;
        let current = self.positions[i].balance;
        let balance = match adjustment {
            BalanceAdjustment::Increase(amount) => current.try_add(amount)?,
            BalanceAdjustment::Decrease(amount) => {
                current
                    .checked_sub(amount)
                    .ok_or(PactumError::InsufficientBalance {
                        available: current.value(),
                        required: amount.value(),
                    })?
            }
        };
        self.positions[i].balance = balance;
        Ok(balance)
    }

    /// Zero a finalized position and mark it withdrawn
    ///
    /// Returns the amount to release. An already withdrawn position returns
    /// zero and changes nothing.
    pub fn begin_withdraw(&mut self, party: &PartyId) -> Result<Amount> {
        let i = self.require(party)?;
        match self.positions[i].status {
            PositionStatus::Withdrawn => return Ok(Amount::zero()),
            PositionStatus::Finalized => {}
            _ => {
                return Err(PactumError::AgreementNotFinalized {
                    agreement_id: self.agreement_id.0,
                })
            }
        }

        let amount = self.positions[i].balance;
        let released = self.released.try_add(amount)?;

        self.positions[i].balance = Amount::zero();
        self.positions[i].status = PositionStatus::Withdrawn;
        self.released = released;
        Ok(amount)
    }

    /// Undo a withdraw whose release transfer failed
    pub fn revert_withdraw(&mut self, party: &PartyId, amount: Amount) -> Result<()> {
        let i = self.require(party)?;
        let released = self.released.try_sub(amount)?;

        self.positions[i].balance = amount;
        self.positions[i].status = PositionStatus::Finalized;
        self.released = released;
        Ok(())
    }

    fn require(&self, party: &PartyId) -> Result<usize> {
        self.index
            .get(party)
            .copied()
            .ok_or_else(|| PactumError::NoPartOfAgreement {
                agreement_id: self.agreement_id.0,
                party: party.to_string(),
            })
    }

    fn rebuild_index(&mut self) {
        self.index = self
            .positions
            .iter()
            .enumerate()
            .map(|(i, p)| (p.party, i))
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger() -> PositionLedger {
        PositionLedger::new(AgreementId(1))
    }

    #[test]
    fn test_join_and_accounting() {
        let mut ledger = ledger();
        let a = PartyId::new();
        let b = PartyId::new();

        ledger.join(a, Amount::new(100), Amount::zero()).unwrap();
        ledger.join(b, Amount::new(50), Amount::new(50)).unwrap();

        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.deposited(), Amount::new(150));
        assert_eq!(ledger.total_balance().unwrap(), Amount::new(150));
        assert_eq!(ledger.positions()[0].party, a);
        assert_eq!(ledger.position(&b).unwrap().status, PositionStatus::Idle);
        ledger.check_conservation().unwrap();
    }

    #[test]
    fn test_join_twice_rejected() {
        let mut ledger = ledger();
        let a = PartyId::new();
        ledger.join(a, Amount::new(10), Amount::zero()).unwrap();

        let err = ledger.join(a, Amount::new(10), Amount::zero()).unwrap_err();
        assert_eq!(err.error_code(), "PARTY_ALREADY_JOINED");
        assert_eq!(ledger.deposited(), Amount::new(10));
    }

    #[test]
    fn test_join_below_minimum_rejected() {
        let mut ledger = ledger();
        let err = ledger
            .join(PartyId::new(), Amount::new(10), Amount::new(20))
            .unwrap_err();
        assert_eq!(
            err,
            PactumError::InsufficientBalance {
                available: 10,
                required: 20
            }
        );

        let err = ledger
            .join(PartyId::new(), Amount::zero(), Amount::zero())
            .unwrap_err();
        assert_eq!(err.error_code(), "INSUFFICIENT_BALANCE");
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_revert_join_restores_index() {
        let mut ledger = ledger();
        let a = PartyId::new();
        let b = PartyId::new();
        let c = PartyId::new();
        ledger.join(a, Amount::new(1), Amount::zero()).unwrap();
        ledger.join(b, Amount::new(2), Amount::zero()).unwrap();
        ledger.join(c, Amount::new(3), Amount::zero()).unwrap();

        ledger.revert_join(&b).unwrap();
        assert!(!ledger.contains(&b));
        assert_eq!(ledger.position(&c).unwrap().balance, Amount::new(3));
        assert_eq!(ledger.deposited(), Amount::new(4));
    }

    #[test]
    fn test_unknown_party_rejected() {
        let mut ledger = ledger();
        let stranger = PartyId::new();
        let err = ledger
            .set_status(&stranger, PositionStatus::Finalized)
            .unwrap_err();
        assert_eq!(err.error_code(), "NO_PART_OF_AGREEMENT");
        assert!(ledger
            .adjust_balance(&stranger, BalanceAdjustment::Increase(Amount::new(1)))
            .is_err());
    }

    #[test]
    fn test_withdraw_requires_finalized() {
        let mut ledger = ledger();
        let a = PartyId::new();
        ledger.join(a, Amount::new(100), Amount::zero()).unwrap();

        let err = ledger.begin_withdraw(&a).unwrap_err();
        assert_eq!(err, PactumError::AgreementNotFinalized { agreement_id: 1 });

        ledger.set_status(&a, PositionStatus::Finalized).unwrap();
        assert_eq!(ledger.begin_withdraw(&a).unwrap(), Amount::new(100));
        assert_eq!(ledger.begin_withdraw(&a).unwrap(), Amount::zero());

        let position = ledger.position(&a).unwrap();
        assert_eq!(position.balance, Amount::zero());
        assert_eq!(position.status, PositionStatus::Withdrawn);
        assert_eq!(ledger.released(), Amount::new(100));
        assert_eq!(ledger.escrowed().unwrap(), Amount::zero());
        ledger.check_conservation().unwrap();
    }

    #[test]
    fn test_escrowed_reports_broken_accounting() {
        let mut ledger = ledger();
        ledger.join(PartyId::new(), Amount::new(10), Amount::zero()).unwrap();
        ledger.released = Amount::new(11);

        assert_eq!(ledger.escrowed().unwrap_err().error_code(), "INTERNAL_ERROR");
        assert!(ledger.check_conservation().is_err());
        assert!(ledger.residual().is_err());
    }

    #[test]
    fn test_revert_withdraw() {
        let mut ledger = ledger();
        let a = PartyId::new();
        ledger.join(a, Amount::new(70), Amount::zero()).unwrap();
        ledger.set_status(&a, PositionStatus::Finalized).unwrap();

        let amount = ledger.begin_withdraw(&a).unwrap();
        ledger.revert_withdraw(&a, amount).unwrap();

        let position = ledger.position(&a).unwrap();
        assert_eq!(position.balance, Amount::new(70));
        assert_eq!(position.status, PositionStatus::Finalized);
        assert_eq!(ledger.released(), Amount::zero());
    }

    #[test]
    fn test_adjust_balance_and_residual() {
        let mut ledger = ledger();
        let a = PartyId::new();
        let b = PartyId::new();
        ledger.join(a, Amount::new(100), Amount::zero()).unwrap();
        ledger.join(b, Amount::new(50), Amount::zero()).unwrap();

        ledger
            .adjust_balance(&a, BalanceAdjustment::Decrease(Amount::new(60)))
            .unwrap();
        ledger
            .adjust_balance(&b, BalanceAdjustment::Increase(Amount::new(30)))
            .unwrap();

        assert_eq!(ledger.total_balance().unwrap(), Amount::new(120));
        assert_eq!(ledger.residual().unwrap(), Amount::new(30));
        ledger.check_conservation().unwrap();

        let err = ledger
            .adjust_balance(&a, BalanceAdjustment::Decrease(Amount::new(41)))
            .unwrap_err();
        assert_eq!(err.error_code(), "INSUFFICIENT_BALANCE");
    }

    #[test]
    fn test_balance_adjustment_between() {
        assert_eq!(
            BalanceAdjustment::between(Amount::new(100), Amount::new(60)),
            Some(BalanceAdjustment::Decrease(Amount::new(40)))
        );
        assert_eq!(
            BalanceAdjustment::between(Amount::new(50), Amount::new(90)),
            Some(BalanceAdjustment::Increase(Amount::new(40)))
        );
        assert_eq!(BalanceAdjustment::between(Amount::new(5), Amount::new(5)), None);
    }

    #[test]
    fn test_all_finalized() {
        let mut ledger = ledger();
        assert!(!ledger.all_finalized());

        let a = PartyId::new();
        let b = PartyId::new();
        ledger.join(a, Amount::new(1), Amount::zero()).unwrap();
        ledger.join(b, Amount::new(1), Amount::zero()).unwrap();
        ledger.set_status(&a, PositionStatus::Finalized).unwrap();
        assert!(!ledger.all_finalized());
        ledger.set_status(&b, PositionStatus::Finalized).unwrap();
        assert!(ledger.all_finalized());
    }
}
