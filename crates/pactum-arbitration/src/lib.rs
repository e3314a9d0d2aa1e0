//! Pactum Arbitration - External dispute resolution
//!
//! The engine never decides disputes itself. When a party disputes an
//! agreement, the engine hands a [`DisputeContext`] to the injected
//! [`ArbitrationAuthority`] and receives an opaque case reference. The
//! authority later delivers a [`Ruling`] back into the engine.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use pactum_crypto::hash_json;
use pactum_types::{
    AgreementId, Amount, ArbiterId, CaseRef, Hash32, PactumError, PartyId, Position, Result,
    Ruling,
};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Everything the authority receives about a dispute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisputeContext {
    pub agreement_id: AgreementId,
    pub terms_hash: Hash32,
    pub disputant: PartyId,
    /// Positions at the moment the dispute was opened
    pub positions: Vec<Position>,
    /// Funds the ruling may distribute
    pub escrowed: Amount,
    pub opened_at: DateTime<Utc>,
}

impl DisputeContext {
    /// Fingerprint of the context, for the authority's records
    pub fn digest(&self) -> Result<Hash32> {
        hash_json(self).map_err(|e| PactumError::internal(e.to_string()))
    }
}

/// Arbitration authority trait
///
/// Implementations may be adversarial: they can fail, take arbitrarily long,
/// or call back into the engine before returning.
#[async_trait::async_trait]
pub trait ArbitrationAuthority: Send + Sync {
    /// Identity expected on ruling delivery
    fn id(&self) -> ArbiterId;

    /// Open a case for a disputed agreement
    async fn submit_dispute(&self, context: DisputeContext) -> Result<CaseRef>;
}

/// A dispute case held by the in-memory authority
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArbitrationCase {
    pub case_ref: CaseRef,
    pub context: DisputeContext,
    pub digest: Hash32,
    pub submitted_at: DateTime<Utc>,
    /// Latest drafted ruling
    pub ruling: Option<Ruling>,
    /// Set once the engine accepted the ruling; the case is then closed
    pub delivered_at: Option<DateTime<Utc>>,
}

/// In-process arbitration authority
///
/// Records every submitted case and lets the host draft rulings for them.
/// Deterministic enough for tests; the host still delivers each ruling to
/// the engine itself.
pub struct InMemoryArbitrator {
    id: ArbiterId,
    cases: Arc<RwLock<HashMap<CaseRef, ArbitrationCase>>>,
    refuse_next: AtomicBool,
}

impl InMemoryArbitrator {
    pub fn new() -> Self {
        Self::with_id(ArbiterId::new())
    }

    pub fn with_id(id: ArbiterId) -> Self {
        Self {
            id,
            cases: Arc::new(RwLock::new(HashMap::new())),
            refuse_next: AtomicBool::new(false),
        }
    }

    /// Make the next submission fail
    pub fn refuse_next_submission(&self) {
        self.refuse_next.store(true, Ordering::SeqCst);
    }

    pub async fn case(&self, case_ref: &CaseRef) -> Option<ArbitrationCase> {
        self.cases.read().await.get(case_ref).cloned()
    }

    /// Cases opened for an agreement, oldest first
    pub async fn cases_for(&self, agreement_id: AgreementId) -> Vec<ArbitrationCase> {
        let mut cases: Vec<_> = self
            .cases
            .read()
            .await
            .values()
            .filter(|c| c.context.agreement_id == agreement_id)
            .cloned()
            .collect();
        cases.sort_by_key(|c| c.submitted_at);
        cases
    }

    /// Draft a ruling for a case; the returned ruling is ready for delivery
    ///
    /// A case stays open until [`mark_delivered`](Self::mark_delivered), so a
    /// ruling the engine rejected can be redrafted.
    pub async fn decide(
        &self,
        case_ref: &CaseRef,
        balances: Vec<(PartyId, Amount)>,
    ) -> Result<Ruling> {
        let mut cases = self.cases.write().await;
        let case = cases
            .get_mut(case_ref)
            .ok_or_else(|| PactumError::arbitration(format!("unknown case {}", case_ref)))?;

        if case.delivered_at.is_some() {
            return Err(PactumError::arbitration(format!(
                "case {} already decided",
                case_ref
            )));
        }

        let ruling = Ruling {
            agreement_id: case.context.agreement_id,
            case_ref: case_ref.clone(),
            balances,
        };
        if case.ruling.replace(ruling.clone()).is_some() {
            info!("Ruling redrafted for case {}", case_ref);
        } else {
            info!("Ruling drafted for case {} ({})", case_ref, ruling.agreement_id);
        }
        Ok(ruling)
    }

    /// Close a case after the engine accepted its drafted ruling
    pub async fn mark_delivered(&self, case_ref: &CaseRef) -> Result<()> {
        let mut cases = self.cases.write().await;
        let case = cases
            .get_mut(case_ref)
            .ok_or_else(|| PactumError::arbitration(format!("unknown case {}", case_ref)))?;

        if case.ruling.is_none() {
            return Err(PactumError::arbitration(format!(
                "case {} has no drafted ruling",
                case_ref
            )));
        }
        if case.delivered_at.is_none() {
            case.delivered_at = Some(Utc::now());
            info!("Case {} closed", case_ref);
        }
        Ok(())
    }
}

impl Default for InMemoryArbitrator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ArbitrationAuthority for InMemoryArbitrator {
    fn id(&self) -> ArbiterId {
        self.id
    }

    async fn submit_dispute(&self, context: DisputeContext) -> Result<CaseRef> {
        if self.refuse_next.swap(false, Ordering::SeqCst) {
            warn!("Submission refused for {}", context.agreement_id);
            return Err(PactumError::arbitration("submission refused"));
        }

        let digest = context.digest()?;
        let case_ref = CaseRef::new(format!("case_{}", uuid::Uuid::new_v4()));
        let case = ArbitrationCase {
            case_ref: case_ref.clone(),
            digest,
            submitted_at: Utc::now(),
            ruling: None,
            delivered_at: None,
            context,
        };

        info!("Case {} opened for {}", case_ref, case.context.agreement_id);
        self.cases.write().await.insert(case_ref.clone(), case);
        Ok(case_ref)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> DisputeContext {
        let a = PartyId::new();
        let b = PartyId::new();
        DisputeContext {
            agreement_id: AgreementId(7),
            terms_hash: Hash32([1u8; 32]),
            disputant: b,
            positions: vec![
                Position::new(a, Amount::new(100)),
                Position::new(b, Amount::new(50)),
            ],
            escrowed: Amount::new(150),
            opened_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_submit_and_decide() {
        let arbitrator = InMemoryArbitrator::new();
        let ctx = context();
        let a = ctx.positions[0].party;
        let b = ctx.positions[1].party;

        let case_ref = arbitrator.submit_dispute(ctx.clone()).await.unwrap();
        let case = arbitrator.case(&case_ref).await.unwrap();
        assert_eq!(case.context, ctx);
        assert_eq!(case.digest, ctx.digest().unwrap());
        assert!(case.ruling.is_none());

        let ruling = arbitrator
            .decide(&case_ref, vec![(a, Amount::new(60)), (b, Amount::new(90))])
            .await
            .unwrap();
        assert_eq!(ruling.agreement_id, AgreementId(7));
        assert_eq!(ruling.case_ref, case_ref);

        arbitrator.mark_delivered(&case_ref).await.unwrap();
        assert!(arbitrator.case(&case_ref).await.unwrap().delivered_at.is_some());

        let again = arbitrator.decide(&case_ref, vec![]).await;
        assert!(again.is_err());
    }

    #[tokio::test]
    async fn test_undelivered_ruling_can_be_redrafted() {
        let arbitrator = InMemoryArbitrator::new();
        let ctx = context();
        let a = ctx.positions[0].party;
        let case_ref = arbitrator.submit_dispute(ctx).await.unwrap();

        let err = arbitrator.mark_delivered(&case_ref).await.unwrap_err();
        assert_eq!(err.error_code(), "ARBITRATION_FAILED");

        arbitrator
            .decide(&case_ref, vec![(a, Amount::new(151))])
            .await
            .unwrap();
        let second = arbitrator
            .decide(&case_ref, vec![(a, Amount::new(150))])
            .await
            .unwrap();

        let case = arbitrator.case(&case_ref).await.unwrap();
        assert_eq!(case.ruling, Some(second));
        assert!(case.delivered_at.is_none());
    }

    #[tokio::test]
    async fn test_refused_submission() {
        let arbitrator = InMemoryArbitrator::new();
        arbitrator.refuse_next_submission();

        let err = arbitrator.submit_dispute(context()).await.unwrap_err();
        assert_eq!(err.error_code(), "ARBITRATION_FAILED");

        // Only the next submission is refused
        assert!(arbitrator.submit_dispute(context()).await.is_ok());
        assert_eq!(arbitrator.cases_for(AgreementId(7)).await.len(), 1);
    }

    #[tokio::test]
    async fn test_decide_unknown_case() {
        let arbitrator = InMemoryArbitrator::new();
        let err = arbitrator
            .decide(&CaseRef::new("case_missing"), vec![])
            .await
            .unwrap_err();
        assert!(err.is_external());
    }
}
