//! Position types

use crate::{Amount, PartyId};
use serde::{Deserialize, Serialize};

/// Status of a party's position within one agreement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PositionStatus {
    /// Joined, has not signalled the will to finalize
    Idle,
    /// Signalled finalization, or assigned by a ruling
    Finalized,
    /// Opened the dispute currently pending on the agreement
    Disputed,
    /// Funds released back to the party; balance is zero
    Withdrawn,
}

/// A party's escrowed balance and status within one agreement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub party: PartyId,
    pub balance: Amount,
    pub status: PositionStatus,
}

impl Position {
    pub fn new(party: PartyId, balance: Amount) -> Self {
        Self {
            party,
            balance,
            status: PositionStatus::Idle,
        }
    }
}
