//! Dispute and ruling types
//!
//! A dispute exists only while its agreement is Disputed. The arbitration
//! authority answers it with a ruling that reallocates escrowed balances.

use crate::{AgreementId, Amount, CaseRef, PartyId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Dispute information attached to a Disputed agreement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dispute {
    /// Who opened the dispute
    pub disputant: PartyId,
    /// Case reference returned by the authority; `None` while submission is in flight
    pub case_ref: Option<CaseRef>,
    /// When opened
    pub opened_at: DateTime<Utc>,
}

/// Binding balance reallocation delivered by the arbitration authority
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ruling {
    pub agreement_id: AgreementId,
    pub case_ref: CaseRef,
    /// Final balance per party; parties absent from the list are ruled zero
    pub balances: Vec<(PartyId, Amount)>,
}

impl Ruling {
    pub fn new(agreement_id: AgreementId, case_ref: CaseRef) -> Self {
        Self {
            agreement_id,
            case_ref,
            balances: Vec::new(),
        }
    }

    pub fn award(mut self, party: PartyId, amount: Amount) -> Self {
        self.balances.push((party, amount));
        self
    }
}
