//! Agreement events
//!
//! Every committed state transition produces exactly one typed event. Events
//! are appended to an ordered journal; listeners consume it by sequence.

use crate::{AgreementId, Amount, CriteriaCommitment, Hash32, PartyId, PositionStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Externally observable state transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgreementEvent {
    AgreementCreated {
        id: AgreementId,
        terms_hash: Hash32,
        criteria: CriteriaCommitment,
    },
    AgreementJoined {
        id: AgreementId,
        party: PartyId,
        balance: Amount,
    },
    AgreementPositionUpdated {
        id: AgreementId,
        party: PartyId,
        balance: Amount,
        status: PositionStatus,
    },
    AgreementFinalized {
        id: AgreementId,
    },
    AgreementDisputed {
        id: AgreementId,
        party: PartyId,
    },
}

impl AgreementEvent {
    /// The agreement this event belongs to
    pub fn agreement_id(&self) -> AgreementId {
        match self {
            Self::AgreementCreated { id, .. }
            | Self::AgreementJoined { id, .. }
            | Self::AgreementPositionUpdated { id, .. }
            | Self::AgreementFinalized { id }
            | Self::AgreementDisputed { id, .. } => *id,
        }
    }

    /// Short event name for logs
    pub fn name(&self) -> &'static str {
        match self {
            Self::AgreementCreated { .. } => "AgreementCreated",
            Self::AgreementJoined { .. } => "AgreementJoined",
            Self::AgreementPositionUpdated { .. } => "AgreementPositionUpdated",
            Self::AgreementFinalized { .. } => "AgreementFinalized",
            Self::AgreementDisputed { .. } => "AgreementDisputed",
        }
    }
}

/// An event together with its position in the journal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Monotonically increasing, starting at 1
    pub sequence: u64,
    pub recorded_at: DateTime<Utc>,
    pub event: AgreementEvent,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_agreement_id() {
        let party = PartyId::new();
        let event = AgreementEvent::AgreementDisputed {
            id: AgreementId(4),
            party,
        };
        assert_eq!(event.agreement_id(), AgreementId(4));
        assert_eq!(event.name(), "AgreementDisputed");
    }

    #[test]
    fn test_event_serializes_with_tag() {
        let event = AgreementEvent::AgreementFinalized { id: AgreementId(1) };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "agreement_finalized");
        assert_eq!(json["id"], 1);

        let back: AgreementEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }
}
