//! Custody primitive
//!
//! Token movement is not the engine's business. The engine asks a
//! [`CustodyProvider`] to take a deposit into escrow or release it back, and
//! treats any failure as an abort of the enclosing operation.

use std::collections::HashMap;
use std::sync::Arc;

use pactum_types::{AgreementId, Amount, PactumError, PartyId, Result};
use tokio::sync::RwLock;
use tracing::info;

/// Ownership-transfer primitive consumed by the framework
///
/// Implementations may fail or call back into the framework before
/// returning; the framework commits its own state first.
#[async_trait::async_trait]
pub trait CustodyProvider: Send + Sync {
    /// Move `amount` from `party` into escrow for `agreement_id`
    async fn take_custody(&self, agreement_id: AgreementId, party: &PartyId, amount: Amount)
        -> Result<()>;

    /// Move `amount` held for `agreement_id` back to `party`
    async fn release(&self, agreement_id: AgreementId, party: &PartyId, amount: Amount)
        -> Result<()>;
}

/// In-memory vault: party wallets plus per-agreement escrow pools
pub struct InMemoryVault {
    wallets: Arc<RwLock<HashMap<PartyId, Amount>>>,
    escrow: Arc<RwLock<HashMap<AgreementId, Amount>>>,
}

impl InMemoryVault {
    pub fn new() -> Self {
        Self {
            wallets: Arc::new(RwLock::new(HashMap::new())),
            escrow: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Credit a party's wallet outside of any agreement
    pub async fn fund(&self, party: PartyId, amount: Amount) -> Result<()> {
        let mut wallets = self.wallets.write().await;
        let balance = wallets.entry(party).or_default();
        *balance = balance.try_add(amount)?;
        Ok(())
    }

    pub async fn balance_of(&self, party: &PartyId) -> Amount {
        self.wallets
            .read()
            .await
            .get(party)
            .copied()
            .unwrap_or_default()
    }

    /// Funds currently held for an agreement
    pub async fn held_for(&self, agreement_id: AgreementId) -> Amount {
        self.escrow
            .read()
            .await
            .get(&agreement_id)
            .copied()
            .unwrap_or_default()
    }
}

impl Default for InMemoryVault {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl CustodyProvider for InMemoryVault {
    async fn take_custody(
        &self,
        agreement_id: AgreementId,
        party: &PartyId,
        amount: Amount,
    ) -> Result<()> {
        let mut wallets = self.wallets.write().await;
        let mut escrow = self.escrow.write().await;

        let available = wallets.get(party).copied().unwrap_or_default();
        let remaining = available.checked_sub(amount).ok_or_else(|| {
            PactumError::custody(format!(
                "wallet of {} holds {}, needs {}",
                party, available, amount
            ))
        })?;
        let held = escrow
            .get(&agreement_id)
            .copied()
            .unwrap_or_default()
            .try_add(amount)?;

        wallets.insert(*party, remaining);
        escrow.insert(agreement_id, held);

        info!("Custody taken: {} from {} for {}", amount, party, agreement_id);
        Ok(())
    }

    async fn release(&self, agreement_id: AgreementId, party: &PartyId, amount: Amount) -> Result<()> {
        let mut wallets = self.wallets.write().await;
        let mut escrow = self.escrow.write().await;

        let held = escrow.get(&agreement_id).copied().unwrap_or_default();
        let remaining = held.checked_sub(amount).ok_or_else(|| {
            PactumError::custody(format!(
                "{} holds {}, cannot release {}",
                agreement_id, held, amount
            ))
        })?;
        let credited = wallets
            .get(party)
            .copied()
            .unwrap_or_default()
            .try_add(amount)?;

        escrow.insert(agreement_id, remaining);
        wallets.insert(*party, credited);

        info!("Custody released: {} to {} from {}", amount, party, agreement_id);
        Ok(())
    }
}
