//! Agreement framework - the orchestrator
//!
//! Every mutator follows the same discipline:
//!
//! 1. Take the state lock and re-check every precondition
//! 2. Commit all effects (statuses, balances)
//! 3. Mark the agreement in flight and release the lock
//! 4. Call the external primitive (custody or arbitration)
//! 5. Re-take the lock; on failure undo step 2, on success journal the events
//!
//! While an agreement is in flight, mutators on it fail with
//! `ReentrantCall`. Reads are always served.

use std::collections::HashSet;
use std::sync::Arc;

use pactum_arbitration::ArbitrationAuthority;
use pactum_crypto::CriteriaResolver;
use pactum_types::{
    AgreementEvent, AgreementId, AgreementParams, AgreementStatus, AgreementSummary, Amount,
    ArbiterId, CaseRef, Dispute, EventRecord, PactumError, PartyId, Position, PositionStatus,
    ResolverProof, Result, Ruling,
};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::{
    AgreementRecord, AgreementRegistry, CustodyProvider, DisputeCoordinator, EventJournal,
    FrameworkConfig,
};

/// Outcome of a successful dispute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisputeOpened {
    pub case_ref: CaseRef,
    pub events: Vec<EventRecord>,
}

/// Outcome of a withdraw call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Withdrawal {
    /// Amount released; zero for a repeated withdraw
    pub amount: Amount,
    pub events: Vec<EventRecord>,
}

#[derive(Debug, Default)]
struct FrameworkState {
    registry: AgreementRegistry,
    journal: EventJournal,
    in_flight: HashSet<AgreementId>,
}

impl FrameworkState {
    /// Existing agreement with no external call pending on it
    fn settled_mut(&mut self, id: AgreementId) -> Result<&mut AgreementRecord> {
        let record = self.registry.get_mut(id)?;
        if self.in_flight.contains(&id) {
            return Err(PactumError::ReentrantCall { agreement_id: id.0 });
        }
        Ok(record)
    }
}

/// The multi-party agreement engine
pub struct AgreementFramework {
    config: FrameworkConfig,
    resolver: CriteriaResolver,
    custody: Arc<dyn CustodyProvider>,
    arbitrator: Arc<dyn ArbitrationAuthority>,
    state: RwLock<FrameworkState>,
}

impl AgreementFramework {
    pub fn new(
        config: FrameworkConfig,
        custody: Arc<dyn CustodyProvider>,
        arbitrator: Arc<dyn ArbitrationAuthority>,
    ) -> Self {
        Self {
            resolver: CriteriaResolver::new(config.max_proof_depth),
            config,
            custody,
            arbitrator,
            state: RwLock::new(FrameworkState::default()),
        }
    }

    pub fn config(&self) -> &FrameworkConfig {
        &self.config
    }

    /// Identity the framework accepts rulings from
    pub fn arbiter_id(&self) -> ArbiterId {
        self.arbitrator.id()
    }

    // ========================================================================
    // Registry
    // ========================================================================

    /// Register a new Active agreement
    pub async fn create_agreement(
        &self,
        creator: &PartyId,
        params: AgreementParams,
    ) -> Result<AgreementId> {
        let mut guard = self.state.write().await;
        let state = &mut *guard;

        let event_params = (params.terms_hash, params.criteria);
        let id = state.registry.create(*creator, params, &self.config)?;
        state.journal.append(vec![AgreementEvent::AgreementCreated {
            id,
            terms_hash: event_params.0,
            criteria: event_params.1,
        }]);

        info!("Agreement {} created by {} (terms {})", id, creator, event_params.0);
        Ok(id)
    }

    pub async fn agreement_params(&self, id: AgreementId) -> Result<AgreementParams> {
        let state = self.state.read().await;
        Ok(state.registry.get(id)?.params.clone())
    }

    pub async fn agreement_status(&self, id: AgreementId) -> Result<AgreementStatus> {
        let state = self.state.read().await;
        Ok(state.registry.get(id)?.status)
    }

    pub async fn agreement_summary(&self, id: AgreementId) -> Result<AgreementSummary> {
        let state = self.state.read().await;
        state.registry.get(id)?.summary()
    }

    /// Positions in join order, withdrawn ones included
    pub async fn agreement_positions(&self, id: AgreementId) -> Result<Vec<Position>> {
        let state = self.state.read().await;
        Ok(state.registry.get(id)?.ledger.positions().to_vec())
    }

    pub async fn position(&self, id: AgreementId, party: &PartyId) -> Result<Position> {
        let state = self.state.read().await;
        let record = state.registry.get(id)?;
        record
            .ledger
            .position(party)
            .cloned()
            .ok_or_else(|| not_a_party(id, party))
    }

    /// The open dispute, if the agreement is Disputed
    pub async fn dispute(&self, id: AgreementId) -> Result<Option<Dispute>> {
        let state = self.state.read().await;
        Ok(state.registry.get(id)?.dispute.clone())
    }

    /// The ruling that finalized the agreement, if any
    pub async fn ruling(&self, id: AgreementId) -> Result<Option<Ruling>> {
        let state = self.state.read().await;
        Ok(state.registry.get(id)?.ruling.clone())
    }

    /// Deposits minus releases
    pub async fn escrowed_total(&self, id: AgreementId) -> Result<Amount> {
        let state = self.state.read().await;
        state.registry.get(id)?.ledger.escrowed()
    }

    pub async fn agreements_of(&self, party: &PartyId) -> Vec<AgreementId> {
        self.state.read().await.registry.agreements_of(party)
    }

    /// Verify that balances never exceed deposits minus releases
    pub async fn check_conservation(&self, id: AgreementId) -> Result<()> {
        let state = self.state.read().await;
        state.registry.get(id)?.ledger.check_conservation()
    }

    // ========================================================================
    // Events
    // ========================================================================

    pub async fn events(&self) -> Vec<EventRecord> {
        self.state.read().await.journal.all().to_vec()
    }

    /// Events recorded after `sequence`
    pub async fn events_since(&self, sequence: u64) -> Vec<EventRecord> {
        self.state.read().await.journal.since(sequence).to_vec()
    }

    pub async fn events_for(&self, id: AgreementId) -> Vec<EventRecord> {
        self.state.read().await.journal.for_agreement(id)
    }

    // ========================================================================
    // Positions
    // ========================================================================

    /// Join an Active agreement, depositing `resolver.balance`
    pub async fn join_agreement(
        &self,
        id: AgreementId,
        caller: &PartyId,
        resolver: &ResolverProof,
    ) -> Result<Vec<EventRecord>> {
        let deposit = resolver.balance;
        {
            let mut guard = self.state.write().await;
            let state = &mut *guard;
            let record = state.settled_mut(id)?;
            record.require_active()?;

            if record.ledger.contains(caller) {
                return Err(PactumError::PartyAlreadyJoined {
                    agreement_id: id.0,
                    party: caller.to_string(),
                });
            }
            if record.ledger.len() >= self.config.max_parties_per_agreement {
                return Err(PactumError::AgreementFull {
                    agreement_id: id.0,
                    limit: self.config.max_parties_per_agreement,
                });
            }

            let criteria = record.params.criteria;
            let eligible = self
                .resolver
                .verify(&criteria, caller, resolver)
                .map_err(|e| PactumError::InvalidProof {
                    reason: e.to_string(),
                })?;
            if !eligible {
                debug!("Criteria proof of {} rejected for {}", caller, id);
                return Err(PactumError::PartyMustMatchCriteria {
                    agreement_id: id.0,
                    party: caller.to_string(),
                });
            }

            let minimum = if criteria.is_open() {
                Amount::zero()
            } else {
                resolver.balance
            };
            record.ledger.join(*caller, deposit, minimum)?;
            state.in_flight.insert(id);
        }

        let transfer = self.custody.take_custody(id, caller, deposit).await;

        let mut guard = self.state.write().await;
        let state = &mut *guard;
        state.in_flight.remove(&id);
        let record = state.registry.get_mut(id)?;

        if let Err(err) = transfer {
            record.ledger.revert_join(caller)?;
            warn!("Join of {} to {} aborted: {}", caller, id, err);
            return Err(err);
        }

        let events = state.journal.append(vec![AgreementEvent::AgreementJoined {
            id,
            party: *caller,
            balance: deposit,
        }]);
        info!("{} joined {} with {}", caller, id, deposit);
        Ok(events)
    }

    /// Top up an Idle position in an Active agreement
    pub async fn increase_position(
        &self,
        id: AgreementId,
        caller: &PartyId,
        amount: Amount,
    ) -> Result<Vec<EventRecord>> {
        {
            let mut guard = self.state.write().await;
            let state = &mut *guard;
            let record = state.settled_mut(id)?;
            record.require_active()?;
            require_idle(record, caller)?;

            record.ledger.deposit(caller, amount)?;
            state.in_flight.insert(id);
        }

        let transfer = self.custody.take_custody(id, caller, amount).await;

        let mut guard = self.state.write().await;
        let state = &mut *guard;
        state.in_flight.remove(&id);
        let record = state.registry.get_mut(id)?;

        if let Err(err) = transfer {
            record.ledger.revert_deposit(caller, amount)?;
            warn!("Deposit of {} by {} to {} aborted: {}", amount, caller, id, err);
            return Err(err);
        }

        let balance = record
            .ledger
            .position(caller)
            .map(|p| p.balance)
            .unwrap_or_default();
        let events = state
            .journal
            .append(vec![AgreementEvent::AgreementPositionUpdated {
                id,
                party: *caller,
                balance,
                status: PositionStatus::Idle,
            }]);
        info!("{} added {} to {} (balance {})", caller, amount, id, balance);
        Ok(events)
    }

    /// Signal the will to finalize
    ///
    /// The agreement finalizes once every position has signalled.
    pub async fn finalize_agreement(
        &self,
        id: AgreementId,
        caller: &PartyId,
    ) -> Result<Vec<EventRecord>> {
        let mut guard = self.state.write().await;
        let state = &mut *guard;
        let record = state.settled_mut(id)?;
        record.require_active()?;
        require_idle(record, caller)?;

        record.ledger.set_status(caller, PositionStatus::Finalized)?;
        let balance = record
            .ledger
            .position(caller)
            .map(|p| p.balance)
            .unwrap_or_default();

        let mut events = vec![AgreementEvent::AgreementPositionUpdated {
            id,
            party: *caller,
            balance,
            status: PositionStatus::Finalized,
        }];
        if record.ledger.all_finalized() {
            record.status = AgreementStatus::Finalized;
            events.push(AgreementEvent::AgreementFinalized { id });
            info!("Agreement {} finalized by all parties", id);
        } else {
            debug!("{} signalled finalization of {}", caller, id);
        }

        Ok(state.journal.append(events))
    }

    // ========================================================================
    // Disputes
    // ========================================================================

    /// Dispute an Active agreement and hand it to the arbitration authority
    pub async fn dispute_agreement(
        &self,
        id: AgreementId,
        caller: &PartyId,
    ) -> Result<DisputeOpened> {
        let (token, context) = {
            let mut guard = self.state.write().await;
            let state = &mut *guard;
            let record = state.settled_mut(id)?;

            let token = DisputeCoordinator::open(record, caller)?;
            let context = match DisputeCoordinator::context(record) {
                Ok(context) => context,
                Err(err) => {
                    DisputeCoordinator::rollback(record, token)?;
                    return Err(err);
                }
            };
            state.in_flight.insert(id);
            (token, context)
        };

        let submitted = self.arbitrator.submit_dispute(context).await;

        let mut guard = self.state.write().await;
        let state = &mut *guard;
        state.in_flight.remove(&id);
        let record = state.registry.get_mut(id)?;

        let case_ref = match submitted {
            Ok(case_ref) => case_ref,
            Err(err) => {
                DisputeCoordinator::rollback(record, token)?;
                warn!("Dispute of {} by {} aborted: {}", id, caller, err);
                return Err(err);
            }
        };
        DisputeCoordinator::record_case(record, case_ref.clone())?;
        let balance = record
            .ledger
            .position(caller)
            .map(|p| p.balance)
            .unwrap_or_default();

        let events = state.journal.append(vec![
            AgreementEvent::AgreementPositionUpdated {
                id,
                party: *caller,
                balance,
                status: PositionStatus::Disputed,
            },
            AgreementEvent::AgreementDisputed {
                id,
                party: *caller,
            },
        ]);
        info!("Agreement {} disputed by {} (case {})", id, caller, case_ref);
        Ok(DisputeOpened { case_ref, events })
    }

    /// Ruling delivery from the arbitration authority
    pub async fn deliver_ruling(
        &self,
        arbiter: &ArbiterId,
        ruling: Ruling,
    ) -> Result<Vec<EventRecord>> {
        if *arbiter != self.arbitrator.id() {
            return Err(PactumError::UnauthorizedArbiter {
                arbiter: arbiter.to_string(),
            });
        }

        let mut guard = self.state.write().await;
        let state = &mut *guard;
        let id = ruling.agreement_id;
        let record = state.registry.get_mut(id)?;

        let positions = DisputeCoordinator::apply_ruling(record, ruling)?;
        let mut events: Vec<AgreementEvent> = positions
            .into_iter()
            .map(|position| AgreementEvent::AgreementPositionUpdated {
                id,
                party: position.party,
                balance: position.balance,
                status: position.status,
            })
            .collect();
        events.push(AgreementEvent::AgreementFinalized { id });

        Ok(state.journal.append(events))
    }

    // ========================================================================
    // Withdrawals
    // ========================================================================

    /// Release a finalized position's balance back to its party
    ///
    /// A repeated call finds the position withdrawn and returns zero.
    pub async fn withdraw_from_agreement(
        &self,
        id: AgreementId,
        caller: &PartyId,
    ) -> Result<Withdrawal> {
        let amount = {
            let mut guard = self.state.write().await;
            let state = &mut *guard;
            let record = state.registry.get(id)?;
            record.require_finalized()?;

            let status = record
                .ledger
                .position(caller)
                .map(|p| p.status)
                .ok_or_else(|| not_a_party(id, caller))?;
            if status == PositionStatus::Withdrawn {
                return Ok(Withdrawal {
                    amount: Amount::zero(),
                    events: Vec::new(),
                });
            }

            let record = state.settled_mut(id)?;
            let amount = record.ledger.begin_withdraw(caller)?;
            if amount.is_zero() {
                let events = state.journal.append(vec![withdrawn_event(id, caller)]);
                return Ok(Withdrawal { amount, events });
            }
            state.in_flight.insert(id);
            amount
        };

        let transfer = self.custody.release(id, caller, amount).await;

        let mut guard = self.state.write().await;
        let state = &mut *guard;
        state.in_flight.remove(&id);
        let record = state.registry.get_mut(id)?;

        if let Err(err) = transfer {
            record.ledger.revert_withdraw(caller, amount)?;
            warn!("Withdraw of {} by {} from {} aborted: {}", amount, caller, id, err);
            return Err(err);
        }

        let events = state.journal.append(vec![withdrawn_event(id, caller)]);
        info!("{} withdrew {} from {}", caller, amount, id);
        Ok(Withdrawal { amount, events })
    }
}

fn not_a_party(id: AgreementId, party: &PartyId) -> PactumError {
    PactumError::NoPartOfAgreement {
        agreement_id: id.0,
        party: party.to_string(),
    }
}

fn require_idle(record: &AgreementRecord, party: &PartyId) -> Result<()> {
    let position = record
        .ledger
        .position(party)
        .ok_or_else(|| not_a_party(record.id, party))?;
    match position.status {
        PositionStatus::Idle => Ok(()),
        _ => Err(PactumError::PartyAlreadyFinalized {
            agreement_id: record.id.0,
            party: party.to_string(),
        }),
    }
}

fn withdrawn_event(id: AgreementId, party: &PartyId) -> AgreementEvent {
    AgreementEvent::AgreementPositionUpdated {
        id,
        party: *party,
        balance: Amount::zero(),
        status: PositionStatus::Withdrawn,
    }
}
